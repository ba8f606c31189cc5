//! Bulk-add: save a batch of looked-up books to one shelf.

use crate::catalog::duplicates::partition_new;
use crate::error::Result;
use crate::models::{Book, BookMetadata};
use crate::services::BookStore;

/// A book that could not be saved.
#[derive(Debug, Clone)]
pub struct FailedItem {
    pub title: String,
    pub isbn: String,
    pub error: String,
}

/// Per-item outcome of a bulk save.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub added: Vec<Book>,
    /// Candidates already in the library or repeated within the batch
    pub skipped: Vec<BookMetadata>,
    pub failed: Vec<FailedItem>,
}

impl BulkReport {
    pub fn total(&self) -> usize {
        self.added.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// One-line summary for display.
    pub fn summary(&self) -> String {
        format!(
            "{} added, {} skipped as duplicates, {} failed",
            self.added.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Save `candidates` to `shelf_id`, skipping duplicates.
///
/// The library is fetched once up front; that fetch is the only failure
/// that aborts the call. Saves run one at a time so every item gets its
/// own result.
pub async fn bulk_add(
    store: &dyn BookStore,
    shelf_id: i64,
    candidates: Vec<BookMetadata>,
    tags: &[String],
) -> Result<BulkReport> {
    let library = store.list_books(None).await?;
    let (fresh, skipped) = partition_new(candidates, &library);

    log::info!(
        "Bulk add: {} to save, {} duplicates skipped",
        fresh.len(),
        skipped.len()
    );

    let mut report = BulkReport {
        skipped,
        ..BulkReport::default()
    };

    for metadata in fresh {
        let title = metadata.title.clone();
        let isbn = metadata.isbn.clone();
        match store
            .add_book(metadata.into_new_book(shelf_id, tags.to_vec()))
            .await
        {
            Ok(book) => {
                log::debug!("Saved '{}' as #{}", book.title, book.id);
                report.added.push(book);
            }
            Err(error) => {
                log::warn!("Failed to save '{}' ({}): {}", title, isbn, error);
                report.failed.push(FailedItem {
                    title,
                    isbn,
                    error: error.to_string(),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::NewBook;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// In-memory store that rejects titles containing "reject".
    #[derive(Default)]
    struct MemoryBookStore {
        books: Mutex<Vec<Book>>,
        fail_listing: bool,
    }

    #[async_trait]
    impl BookStore for MemoryBookStore {
        async fn list_books(&self, _location_id: Option<i64>) -> Result<Vec<Book>> {
            if self.fail_listing {
                return Err(AppError::api(500, "database unavailable"));
            }
            Ok(self.books.lock().await.clone())
        }

        async fn add_book(&self, book: NewBook) -> Result<Book> {
            if book.metadata.title.contains("reject") {
                return Err(AppError::api(400, "Title rejected"));
            }
            let mut books = self.books.lock().await;
            let stored = Book {
                id: books.len() as i64 + 1,
                isbn: book.metadata.isbn,
                title: book.metadata.title,
                authors: book.metadata.authors,
                description: book.metadata.description,
                thumbnail: book.metadata.thumbnail,
                published_date: book.metadata.published_date,
                categories: book.metadata.categories,
                shelf_id: Some(book.shelf_id),
                tags: book.tags,
                enrichment: book.metadata.enrichment,
                status: Default::default(),
                checked_out_by: None,
                checked_out_date: None,
            };
            books.push(stored.clone());
            Ok(stored)
        }
    }

    fn meta(isbn: &str, title: &str) -> BookMetadata {
        BookMetadata {
            isbn: isbn.into(),
            title: title.into(),
            authors: vec!["Someone".into()],
            published_date: Some("2001".into()),
            ..BookMetadata::default()
        }
    }

    #[tokio::test]
    async fn saves_fresh_and_skips_duplicates() {
        let store = MemoryBookStore::default();
        store.add_book(meta("9780441013593", "Dune").into_new_book(1, vec![])).await.unwrap();

        let report = bulk_add(
            &store,
            2,
            vec![
                meta("9780441013593", "Dune"),
                meta("9780306406157", "Measure Theory"),
                meta("0306406152", "Measure Theory"),
            ],
            &["gift".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(report.added.len(), 1);
        assert_eq!(report.added[0].shelf_id, Some(2));
        assert_eq!(report.added[0].tags, vec!["gift"]);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.is_complete_success());
        assert_eq!(store.list_books(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn item_failures_do_not_abort_the_batch() {
        let store = MemoryBookStore::default();
        let report = bulk_add(
            &store,
            1,
            vec![
                meta("9780306406157", "please reject me"),
                meta("9780441013593", "Dune"),
            ],
            &[],
        )
        .await
        .unwrap();

        assert_eq!(report.added.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].isbn, "9780306406157");
        assert!(report.failed[0].error.contains("Title rejected"));
        assert_eq!(report.total(), 2);
        assert_eq!(report.summary(), "1 added, 0 skipped as duplicates, 1 failed");
    }

    #[tokio::test]
    async fn listing_failure_aborts() {
        let store = MemoryBookStore {
            fail_listing: true,
            ..MemoryBookStore::default()
        };
        let result = bulk_add(&store, 1, vec![meta("9780441013593", "Dune")], &[]).await;
        assert!(matches!(result, Err(AppError::Api { status: 500, .. })));
    }
}
