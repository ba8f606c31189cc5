// src/error.rs

//! Unified error handling for the LibraryCard client.

use std::fmt;

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered 401, or no session token is available
    #[error("Not signed in: {0}")]
    Unauthorized(String),

    /// The API answered 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// Book metadata provider error
    #[error("Metadata error for {isbn}: {message}")]
    Metadata { isbn: String, message: String },

    /// Cloud Vision error
    #[error("Vision error: {0}")]
    Vision(String),

    /// Not a valid ISBN-10 or ISBN-13
    #[error("Invalid ISBN '{0}'")]
    InvalidIsbn(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an API status error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a metadata error for an ISBN.
    pub fn metadata(isbn: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Metadata {
            isbn: isbn.into(),
            message: message.to_string(),
        }
    }

    /// Create a vision error.
    pub fn vision(message: impl Into<String>) -> Self {
        Self::Vision(message.into())
    }

    /// Whether the error came from a missing or rejected session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_status() {
        let err = AppError::api(409, "Shelf already exists");
        assert_eq!(err.to_string(), "API error (409): Shelf already exists");
    }

    #[test]
    fn unauthorized_is_detected() {
        assert!(AppError::Unauthorized("token expired".into()).is_unauthorized());
        assert!(!AppError::validation("x").is_unauthorized());
    }
}
