//! Consent preferences and the storage wrapper that enforces them.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{KeyValueStore, LAST_LOCATION_KEY, LAST_SHELF_KEY};

/// Key the consent record itself lives under.
pub const CONSENT_KEY: &str = "cookieConsent";

/// Functional keys purged when functional consent is withdrawn.
pub const FUNCTIONAL_KEYS: &[&str] = &[LAST_SHELF_KEY, LAST_LOCATION_KEY];

/// What a stored value is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageCategory {
    /// Needed to sign in and stay signed in. Never gated.
    Essential,
    /// Conveniences such as remembering the last shelf.
    Functional,
}

/// The user's cookie consent choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentPreferences {
    #[serde(default = "always")]
    pub essential: bool,
    #[serde(default)]
    pub functional: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn always() -> bool {
    true
}

impl Default for ConsentPreferences {
    fn default() -> Self {
        Self::essential_only()
    }
}

impl ConsentPreferences {
    pub fn essential_only() -> Self {
        Self {
            essential: true,
            functional: false,
            analytics: false,
            updated_at: None,
        }
    }

    pub fn new(functional: bool, analytics: bool) -> Self {
        Self {
            essential: true,
            functional,
            analytics,
            updated_at: Some(Utc::now()),
        }
    }

    pub fn allows(&self, category: StorageCategory) -> bool {
        match category {
            StorageCategory::Essential => true,
            StorageCategory::Functional => self.functional,
        }
    }

    /// Parse a stored record. Anything unreadable means essential only.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::essential_only();
        };
        match serde_json::from_str::<Self>(raw) {
            Ok(mut prefs) => {
                prefs.essential = true;
                prefs
            }
            Err(e) => {
                log::debug!("Ignoring malformed consent record: {}", e);
                Self::essential_only()
            }
        }
    }
}

/// Storage that only touches functional keys with the user's consent.
pub struct ConsentGatedStorage<S> {
    inner: S,
}

impl<S: KeyValueStore> ConsentGatedStorage<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Current preferences, re-read on every call.
    pub async fn consent(&self) -> Result<ConsentPreferences> {
        let raw = self.inner.get(CONSENT_KEY).await?;
        Ok(ConsentPreferences::parse(raw.as_deref()))
    }

    pub async fn set_consent(&self, prefs: &ConsentPreferences) -> Result<()> {
        let mut prefs = prefs.clone();
        prefs.essential = true;
        prefs.updated_at.get_or_insert_with(Utc::now);
        self.inner
            .set(CONSENT_KEY, &serde_json::to_string(&prefs)?)
            .await?;

        if !prefs.functional {
            for key in FUNCTIONAL_KEYS {
                if self.inner.remove(key).await? {
                    log::debug!("Purged functional key {}", key);
                }
            }
        }
        Ok(())
    }

    async fn allowed(&self, category: StorageCategory) -> Result<bool> {
        match category {
            StorageCategory::Essential => Ok(true),
            StorageCategory::Functional => Ok(self.consent().await?.functional),
        }
    }

    pub async fn get(&self, category: StorageCategory, key: &str) -> Result<Option<String>> {
        if !self.allowed(category).await? {
            return Ok(None);
        }
        self.inner.get(key).await
    }

    /// Store a value. Returns `false` when consent blocked the write.
    pub async fn set(&self, category: StorageCategory, key: &str, value: &str) -> Result<bool> {
        if !self.allowed(category).await? {
            log::debug!("Consent not given, skipping write of {}", key);
            return Ok(false);
        }
        self.inner.set(key, value).await?;
        Ok(true)
    }

    /// Removal is never gated so stale values can always be cleared.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        self.inner.remove(key).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        category: StorageCategory,
        key: &str,
    ) -> Result<Option<T>> {
        match self.get(category, key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize>(
        &self,
        category: StorageCategory,
        key: &str,
        value: &T,
    ) -> Result<bool> {
        self.set(category, key, &serde_json::to_string(value)?).await
    }
}
