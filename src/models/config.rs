//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "LIBRARYCARD_API_URL";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LibraryCard REST API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Google Books / OpenLibrary settings
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Cloud Vision settings for cover/barcode scans
    #[serde(default)]
    pub vision: VisionConfig,

    /// Local storage location
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().to_string();
            }
        }
        self
    }

    /// Write configuration as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        check_url("api.base_url", &self.api.base_url)?;
        check_url("metadata.google_books_url", &self.metadata.google_books_url)?;
        check_url("metadata.open_library_url", &self.metadata.open_library_url)?;
        check_url("vision.endpoint", &self.vision.endpoint)?;

        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.metadata.timeout_secs == 0 {
            return Err(AppError::validation("metadata.timeout_secs must be > 0"));
        }
        if self.metadata.max_search_results == 0 || self.metadata.max_search_results > 40 {
            return Err(AppError::validation(
                "metadata.max_search_results must be between 1 and 40",
            ));
        }
        if self.metadata.lookup_concurrency == 0 {
            return Err(AppError::validation(
                "metadata.lookup_concurrency must be > 0",
            ));
        }
        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is empty")));
    }
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| AppError::validation(format!("{field} is not a valid URL: {e}")))
}

/// LibraryCard REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API; the only place the host is configured
    #[serde(default = "defaults::api_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::api_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Book metadata provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "defaults::google_books_url")]
    pub google_books_url: String,

    #[serde(default = "defaults::open_library_url")]
    pub open_library_url: String,

    /// Optional Google Books API key (raises the anonymous quota)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,

    #[serde(default = "defaults::metadata_timeout")]
    pub timeout_secs: u64,

    /// Results requested per free-text search (Google caps this at 40)
    #[serde(default = "defaults::max_search_results")]
    pub max_search_results: usize,

    /// Parallel ISBN lookups during bulk scans
    #[serde(default = "defaults::lookup_concurrency")]
    pub lookup_concurrency: usize,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            google_books_url: defaults::google_books_url(),
            open_library_url: defaults::open_library_url(),
            google_api_key: None,
            timeout_secs: defaults::metadata_timeout(),
            max_search_results: defaults::max_search_results(),
            lookup_concurrency: defaults::lookup_concurrency(),
        }
    }
}

/// Google Cloud Vision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "defaults::vision_endpoint")]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "defaults::metadata_timeout")]
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::vision_endpoint(),
            api_key: None,
            timeout_secs: defaults::metadata_timeout(),
        }
    }
}

/// Local storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `local.json` (persistent key/value store)
    #[serde(default = "defaults::storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: defaults::storage_dir(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn api_url() -> String {
        "https://api.librarycard.tim52.io".into()
    }
    pub fn user_agent() -> String {
        concat!("librarycard/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }

    pub fn google_books_url() -> String {
        "https://www.googleapis.com/books/v1".into()
    }
    pub fn open_library_url() -> String {
        "https://openlibrary.org".into()
    }
    pub fn metadata_timeout() -> u64 {
        15
    }
    pub fn max_search_results() -> usize {
        20
    }
    pub fn lookup_concurrency() -> usize {
        4
    }

    pub fn vision_endpoint() -> String {
        "https://vision.googleapis.com/v1/images:annotate".into()
    }

    pub fn storage_dir() -> PathBuf {
        PathBuf::from(".librarycard")
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.api.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_url() {
        let mut config = Config::default();
        config.api.base_url = "api.librarycard".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.metadata.lookup_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "http://localhost:8080"

            [metadata]
            google_api_key = "k"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.metadata.google_api_key.as_deref(), Some("k"));
        assert_eq!(config.metadata.max_search_results, 20);
        assert_eq!(config.storage.dir, PathBuf::from(".librarycard"));
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        config.api.timeout_secs = 5;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.api.timeout_secs, 5);
    }
}
