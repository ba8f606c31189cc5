//! Client-side catalog logic.
//!
//! - `genres`: curated genre classification
//! - `duplicates`: edition-level duplicate detection
//! - `selection`: picked results awaiting a bulk save
//! - `bulk`: sequential bulk save with per-item results

pub mod bulk;
pub mod duplicates;
pub mod genres;
pub mod selection;

pub use bulk::{BulkReport, FailedItem, bulk_add};
pub use duplicates::{Catalogued, find_duplicate, is_duplicate, partition_new};
pub use genres::{CURATED_GENRES, MAX_GENRES, classify_genres, primary_genre};
pub use selection::Selection;
