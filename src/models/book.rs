//! Book data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::genres;

/// Circulation status of a book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    #[default]
    Available,
    CheckedOut,
}

/// A book stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub id: i64,

    #[serde(default)]
    pub isbn: String,

    pub title: String,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Cover image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    /// Publication date as reported by the provider ("2004", "2004-05-01")
    #[serde(default, rename = "publishedDate", alias = "published_date")]
    pub published_date: Option<String>,

    /// Raw provider categories
    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub shelf_id: Option<i64>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(flatten)]
    pub enrichment: Enrichment,

    #[serde(default)]
    pub status: BookStatus,

    #[serde(default)]
    pub checked_out_by: Option<String>,

    #[serde(default)]
    pub checked_out_date: Option<DateTime<Utc>>,
}

/// Fields filled in by the OpenLibrary pass and the genre classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enhanced_genres: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_library_key: Option<String>,

    /// OpenLibrary description, kept only when longer than the primary one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_info: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings_count: Option<u32>,
}

impl Book {
    /// Four-digit publication year, if the date carries one.
    pub fn published_year(&self) -> Option<i32> {
        published_year(self.published_date.as_deref())
    }

    pub fn is_checked_out(&self) -> bool {
        self.status == BookStatus::CheckedOut
    }

    /// The longest description available for display.
    pub fn display_description(&self) -> Option<&str> {
        self.enrichment
            .extended_description
            .as_deref()
            .or(self.description.as_deref())
    }

    /// The single genre shown in listings.
    pub fn primary_genre(&self) -> Option<&str> {
        genres::primary_genre(&self.enrichment.enhanced_genres)
    }

    /// Authors joined for display.
    pub fn author_line(&self) -> String {
        if self.authors.is_empty() {
            "Unknown author".to_string()
        } else {
            self.authors.join(", ")
        }
    }
}

/// Descriptive data about an edition, as assembled from the metadata providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BookMetadata {
    pub isbn: String,

    pub title: String,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, rename = "publishedDate")]
    pub published_date: Option<String>,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(flatten)]
    pub enrichment: Enrichment,
}

impl BookMetadata {
    pub fn published_year(&self) -> Option<i32> {
        published_year(self.published_date.as_deref())
    }

    /// Build the save payload for a shelf.
    pub fn into_new_book(self, shelf_id: i64, tags: Vec<String>) -> NewBook {
        NewBook {
            metadata: self,
            shelf_id,
            tags,
        }
    }
}

/// Payload for adding a book to a shelf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBook {
    #[serde(flatten)]
    pub metadata: BookMetadata,

    pub shelf_id: i64,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of a stored book.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BookUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shelf_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Extract the leading four-digit year from a provider date string.
pub fn published_year(date: Option<&str>) -> Option<i32> {
    let date = date?.trim();
    let year = date.get(..4)?;
    if year.chars().all(|c| c.is_ascii_digit()) {
        year.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_year_handles_provider_formats() {
        assert_eq!(published_year(Some("2004")), Some(2004));
        assert_eq!(published_year(Some("2004-05-01")), Some(2004));
        assert_eq!(published_year(Some("May 2004")), None);
        assert_eq!(published_year(Some("")), None);
        assert_eq!(published_year(None), None);
    }

    #[test]
    fn book_deserializes_api_shape() {
        let json = r#"{
            "id": 12,
            "isbn": "9780441013593",
            "title": "Dune",
            "authors": ["Frank Herbert"],
            "publishedDate": "2005-08-02",
            "shelf_id": 3,
            "enhancedGenres": ["Science Fiction"],
            "extendedDescription": "A much longer description",
            "status": "checked_out",
            "checked_out_by": "ada@example.com"
        }"#;

        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.published_year(), Some(2005));
        assert!(book.is_checked_out());
        assert_eq!(book.primary_genre(), Some("Science Fiction"));
        assert_eq!(book.display_description(), Some("A much longer description"));
        assert!(book.tags.is_empty());
    }

    #[test]
    fn new_book_flattens_metadata() {
        let metadata = BookMetadata {
            isbn: "9780441013593".into(),
            title: "Dune".into(),
            authors: vec!["Frank Herbert".into()],
            ..BookMetadata::default()
        };
        let payload = metadata.into_new_book(7, vec!["signed".into()]);
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["title"], "Dune");
        assert_eq!(value["shelf_id"], 7);
        assert_eq!(value["tags"][0], "signed");
    }

    #[test]
    fn author_line_falls_back() {
        let mut book: Book =
            serde_json::from_str(r#"{"id": 1, "title": "Anonymous Verse"}"#).unwrap();
        assert_eq!(book.author_line(), "Unknown author");
        book.authors = vec!["A".into(), "B".into()];
        assert_eq!(book.author_line(), "A, B");
    }
}
