// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};

/// Create a configured asynchronous HTTP client.
pub fn create_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a URL and decode a JSON body, failing on non-success status.
pub async fn fetch_json<T: DeserializeOwned>(client: &reqwest::Client, url: &str) -> Result<T> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(AppError::api(status.as_u16(), error_message(status.as_u16(), &text)));
    }
    Ok(serde_json::from_str(&text)?)
}

/// Human-readable message for a failed response.
///
/// Tries a JSON body (`error`, `message`, `detail`), then the raw text,
/// then a generic status line.
pub fn error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message", "detail"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                    return s.trim().to_string();
                }
                Some(serde_json::Value::Object(inner)) => {
                    if let Some(serde_json::Value::String(s)) = inner.get("message") {
                        if !s.trim().is_empty() {
                            return s.trim().to_string();
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let text = body.trim();
    if !text.is_empty() && !text.starts_with('{') && !text.starts_with('<') {
        return text.to_string();
    }

    format!("Request failed with status {status}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_nested_message_falls_through() {
        assert_eq!(
            error_message(500, r#"{"error": {"message": ""}, "detail": "Database down"}"#),
            "Database down"
        );
        assert_eq!(
            error_message(502, r#"{"error": {"message": "  "}}"#),
            "Request failed with status 502"
        );
    }

    #[test]
    fn error_message_prefers_json_fields() {
        assert_eq!(error_message(400, r#"{"error": "Shelf name taken"}"#), "Shelf name taken");
        assert_eq!(error_message(400, r#"{"message": "Bad ISBN"}"#), "Bad ISBN");
        assert_eq!(error_message(422, r#"{"detail": "Missing title"}"#), "Missing title");
        assert_eq!(
            error_message(403, r#"{"error": {"code": 403, "message": "Quota exceeded"}}"#),
            "Quota exceeded"
        );
    }

    #[test]
    fn error_message_falls_back_to_text() {
        assert_eq!(error_message(502, "upstream timed out\n"), "upstream timed out");
    }

    #[test]
    fn error_message_falls_back_to_status() {
        assert_eq!(error_message(500, ""), "Request failed with status 500");
        assert_eq!(error_message(500, "{}"), "Request failed with status 500");
        assert_eq!(
            error_message(503, "<html><body>down</body></html>"),
            "Request failed with status 503"
        );
    }
}
