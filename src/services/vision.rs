// src/services/vision.rs

//! ISBN scanning through Google Cloud Vision text detection.
//!
//! The endpoint may be Google's `images:annotate` (an API key is then
//! required) or a proxy exposing the same request/response shape.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::VisionConfig;
use crate::utils::{http, isbn};

const GOOGLE_VISION_HOST: &str = "vision.googleapis.com";

#[derive(Debug, Deserialize, Default)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    full_text_annotation: Option<FullText>,
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct FullText {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

/// Pull the detected text out of an annotate response body.
fn extract_text(body: &str) -> Result<String> {
    let response: AnnotateResponse = serde_json::from_str(body)?;
    let Some(image) = response.responses.into_iter().next() else {
        return Ok(String::new());
    };

    if let Some(status) = image.error {
        return Err(AppError::vision(if status.message.is_empty() {
            "text detection failed".to_string()
        } else {
            status.message
        }));
    }

    Ok(image
        .full_text_annotation
        .map(|full| full.text)
        .filter(|text| !text.is_empty())
        .or_else(|| {
            image
                .text_annotations
                .into_iter()
                .next()
                .map(|a| a.description)
        })
        .unwrap_or_default())
}

/// Client for Cloud Vision text detection.
pub struct VisionClient {
    endpoint: Url,
    client: Client,
}

impl VisionClient {
    pub fn new(config: &VisionConfig, user_agent: &str) -> Result<Self> {
        let mut endpoint = Url::parse(&config.endpoint)?;
        match &config.api_key {
            Some(key) => {
                endpoint.query_pairs_mut().append_pair("key", key);
            }
            None if endpoint.host_str() == Some(GOOGLE_VISION_HOST) => {
                return Err(AppError::config(
                    "vision.api_key is required for the Google Vision endpoint",
                ));
            }
            None => {}
        }

        Ok(Self {
            endpoint,
            client: http::create_client(user_agent, config.timeout_secs)?,
        })
    }

    /// Run text detection on an image and return any valid ISBNs found.
    pub async fn detect_isbns(&self, image: &[u8]) -> Result<Vec<String>> {
        if image.is_empty() {
            return Err(AppError::validation("Image is empty"));
        }

        let body = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(image) },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AppError::vision(http::error_message(status.as_u16(), &text)));
        }

        let detected = extract_text(&text)?;
        let found = isbn::extract_candidates(&detected);
        log::info!(
            "Vision detected {} characters of text, {} ISBN(s)",
            detected.len(),
            found.len()
        );
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_full_text_annotation() {
        let body = r#"{"responses": [{
            "fullTextAnnotation": {"text": "ISBN 978-0-441-01359-3"},
            "textAnnotations": [{"description": "other"}]
        }]}"#;
        assert_eq!(extract_text(body).unwrap(), "ISBN 978-0-441-01359-3");
    }

    #[test]
    fn falls_back_to_first_annotation() {
        let body = r#"{"responses": [{"textAnnotations": [{"description": "0306406152"}, {"description": "x"}]}]}"#;
        assert_eq!(extract_text(body).unwrap(), "0306406152");
    }

    #[test]
    fn empty_response_has_no_text() {
        assert_eq!(extract_text(r#"{"responses": [{}]}"#).unwrap(), "");
        assert_eq!(extract_text(r#"{}"#).unwrap(), "");
    }

    #[test]
    fn per_image_error_is_reported() {
        let body = r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#;
        assert!(matches!(extract_text(body), Err(AppError::Vision(m)) if m == "Bad image data."));
    }

    #[test]
    fn google_endpoint_requires_key() {
        assert!(matches!(
            VisionClient::new(&VisionConfig::default(), "test"),
            Err(AppError::Config(_))
        ));

        let keyed = VisionConfig {
            api_key: Some("k".into()),
            ..VisionConfig::default()
        };
        let client = VisionClient::new(&keyed, "test").unwrap();
        assert!(client.endpoint.as_str().ends_with("images:annotate?key=k"));

        let proxy = VisionConfig {
            endpoint: "http://localhost:3000/api/vision".into(),
            ..VisionConfig::default()
        };
        assert!(VisionClient::new(&proxy, "test").is_ok());
    }
}
