//! Selection state for bulk-add workflows.

use crate::models::BookMetadata;
use crate::utils::isbn;

/// Insertion-ordered set of search/scan results picked for saving.
///
/// Entries are keyed by ISBN-13 when the ISBN converts, otherwise by the
/// normalized ISBN text, otherwise by title.
#[derive(Debug, Default, Clone)]
pub struct Selection {
    items: Vec<(String, BookMetadata)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(book: &BookMetadata) -> String {
        isbn::to_isbn13(&book.isbn)
            .or_else(|| Some(isbn::normalize(&book.isbn)).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| format!("title:{}", crate::utils::fold_text(&book.title)))
    }

    /// Add a book. Returns false if it was already selected.
    pub fn select(&mut self, book: BookMetadata) -> bool {
        let key = Self::key(&book);
        if self.items.iter().any(|(k, _)| *k == key) {
            return false;
        }
        self.items.push((key, book));
        true
    }

    /// Remove a book. Returns false if it was not selected.
    pub fn deselect(&mut self, book: &BookMetadata) -> bool {
        let key = Self::key(book);
        let before = self.items.len();
        self.items.retain(|(k, _)| *k != key);
        self.items.len() != before
    }

    /// Flip selection; returns the new state.
    pub fn toggle(&mut self, book: BookMetadata) -> bool {
        if self.deselect(&book) {
            false
        } else {
            self.select(book)
        }
    }

    pub fn is_selected(&self, book: &BookMetadata) -> bool {
        let key = Self::key(book);
        self.items.iter().any(|(k, _)| *k == key)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BookMetadata> {
        self.items.iter().map(|(_, book)| book)
    }

    /// Drain the selection in insertion order.
    pub fn take(&mut self) -> Vec<BookMetadata> {
        std::mem::take(&mut self.items)
            .into_iter()
            .map(|(_, book)| book)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(isbn: &str, title: &str) -> BookMetadata {
        BookMetadata {
            isbn: isbn.into(),
            title: title.into(),
            ..BookMetadata::default()
        }
    }

    #[test]
    fn select_is_idempotent_across_isbn_forms() {
        let mut selection = Selection::new();
        assert!(selection.select(meta("0306406152", "A")));
        assert!(!selection.select(meta("978-0-306-40615-7", "A")));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn toggle_flips_state() {
        let mut selection = Selection::new();
        let book = meta("9780441013593", "Dune");
        assert!(selection.toggle(book.clone()));
        assert!(selection.is_selected(&book));
        assert!(!selection.toggle(book.clone()));
        assert!(selection.is_empty());
    }

    #[test]
    fn books_without_isbn_key_on_title() {
        let mut selection = Selection::new();
        assert!(selection.select(meta("", "Zine #4")));
        assert!(!selection.select(meta("", "zine  #4")));
        assert!(selection.select(meta("", "Zine #5")));
    }

    #[test]
    fn take_preserves_order_and_empties() {
        let mut selection = Selection::new();
        selection.select(meta("9780441013593", "Dune"));
        selection.select(meta("9780306406157", "Measure"));
        let titles: Vec<_> = selection.take().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["Dune", "Measure"]);
        assert!(selection.is_empty());
    }
}
