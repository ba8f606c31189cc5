//! Duplicate detection.
//!
//! An ISBN match is authoritative. Without one, two records are the same
//! book only when title, an author and the publication year all agree; a
//! record without a usable date never matches on title alone, so separate
//! editions are not merged.

use std::collections::HashSet;

use crate::models::{Book, BookMetadata, NewBook, published_year};
use crate::utils::{fold_text, isbn};

/// Anything that identifies an edition.
pub trait Catalogued {
    fn isbn(&self) -> &str;
    fn title(&self) -> &str;
    fn authors(&self) -> &[String];
    fn published_date(&self) -> Option<&str>;
}

impl Catalogued for Book {
    fn isbn(&self) -> &str {
        &self.isbn
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn authors(&self) -> &[String] {
        &self.authors
    }
    fn published_date(&self) -> Option<&str> {
        self.published_date.as_deref()
    }
}

impl Catalogued for BookMetadata {
    fn isbn(&self) -> &str {
        &self.isbn
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn authors(&self) -> &[String] {
        &self.authors
    }
    fn published_date(&self) -> Option<&str> {
        self.published_date.as_deref()
    }
}

impl Catalogued for NewBook {
    fn isbn(&self) -> &str {
        &self.metadata.isbn
    }
    fn title(&self) -> &str {
        &self.metadata.title
    }
    fn authors(&self) -> &[String] {
        &self.metadata.authors
    }
    fn published_date(&self) -> Option<&str> {
        self.metadata.published_date.as_deref()
    }
}

/// Whether `a` and `b` describe the same edition.
pub fn is_duplicate(a: &impl Catalogued, b: &impl Catalogued) -> bool {
    if isbn::same_isbn(a.isbn(), b.isbn()) {
        return true;
    }

    let (title_a, title_b) = (fold_text(a.title()), fold_text(b.title()));
    if title_a.is_empty() || title_a != title_b {
        return false;
    }

    if !shares_author(a.authors(), b.authors()) {
        return false;
    }

    match (
        published_year(a.published_date()),
        published_year(b.published_date()),
    ) {
        (Some(year_a), Some(year_b)) => year_a == year_b,
        _ => false,
    }
}

fn shares_author(a: &[String], b: &[String]) -> bool {
    let a: HashSet<String> = a
        .iter()
        .map(|s| fold_text(s))
        .filter(|s| !s.is_empty())
        .collect();
    b.iter().map(|s| fold_text(s)).any(|s| a.contains(&s))
}

/// First book in `library` that duplicates `candidate`.
pub fn find_duplicate<'a>(candidate: &impl Catalogued, library: &'a [Book]) -> Option<&'a Book> {
    library.iter().find(|book| is_duplicate(candidate, *book))
}

/// Split candidates into those not yet in the library and duplicates.
///
/// A candidate that repeats an earlier candidate in the same batch is
/// also treated as a duplicate.
pub fn partition_new<T: Catalogued>(candidates: Vec<T>, library: &[Book]) -> (Vec<T>, Vec<T>) {
    let mut fresh: Vec<T> = Vec::new();
    let mut duplicates = Vec::new();

    for candidate in candidates {
        let in_library = find_duplicate(&candidate, library).is_some();
        let in_batch = fresh.iter().any(|earlier| is_duplicate(&candidate, earlier));
        if in_library || in_batch {
            duplicates.push(candidate);
        } else {
            fresh.push(candidate);
        }
    }
    (fresh, duplicates)
}
