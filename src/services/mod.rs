//! Service layer for the LibraryCard client.
//!
//! This module contains the network-facing clients:
//! - LibraryCard REST API (`LibraryClient`)
//! - Google Books / OpenLibrary metadata (`MetadataClient`)
//! - Cloud Vision text detection for ISBN scans (`VisionClient`)

mod library;
pub mod metadata;
mod vision;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Book, NewBook};

pub use library::{LibraryClient, status_error};
pub use metadata::MetadataClient;
pub use vision::VisionClient;

/// Where books are listed and saved.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Books visible to the current user, optionally within one location.
    async fn list_books(&self, location_id: Option<i64>) -> Result<Vec<Book>>;

    /// Save a new book and return the stored record.
    async fn add_book(&self, book: NewBook) -> Result<Book>;
}
