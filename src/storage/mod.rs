//! Client-side key/value storage gated by cookie consent.
//!
//! Two backends mirror the browser's storage areas:
//! - `LocalStore`: persistent, one JSON file (`local.json`)
//! - `MemoryStore`: process lifetime only
//!
//! `ConsentGatedStorage` wraps either and refuses functional keys until
//! the user has granted functional consent.
//!
//! ## Directory Structure
//!
//! ```text
//! .librarycard/
//! └── local.json     # { "cookieConsent": "...", "authToken": "...", ... }
//! ```

pub mod consent;
pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use consent::{CONSENT_KEY, ConsentGatedStorage, ConsentPreferences, StorageCategory};
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Session token, essential.
pub const AUTH_TOKEN_KEY: &str = "authToken";
/// Cached signed-in user, essential.
pub const CURRENT_USER_KEY: &str = "currentUser";
/// Last shelf books were added to, functional.
pub const LAST_SHELF_KEY: &str = "lastShelfId";
/// Last location browsed, functional.
pub const LAST_LOCATION_KEY: &str = "lastLocationId";

/// A string key/value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool>;

    async fn keys(&self) -> Result<Vec<String>>;
}
