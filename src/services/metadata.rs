// src/services/metadata.rs

//! Book metadata lookup.
//!
//! Google Books is the primary source. OpenLibrary supplies subjects,
//! series names and longer descriptions, and stands in for Google when
//! Google has no record. Failures in the OpenLibrary pass are logged and
//! the Google data is returned as-is.

use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::catalog::genres::classify_genres;
use crate::error::{AppError, Result};
use crate::models::{BookMetadata, MetadataConfig};
use crate::utils::{http, isbn};

const SERIES_PREFIX: &str = "series:";
const OPEN_LIBRARY_FIELDS: &str =
    "key,title,author_name,first_publish_year,subject,publisher,number_of_pages_median,cover_i";

// --- Google Books wire types ---

#[derive(Debug, Deserialize, Default)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    volume_info: VolumeInfo,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    #[serde(default)]
    page_count: Option<u32>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    average_rating: Option<f32>,
    #[serde(default)]
    ratings_count: Option<u32>,
    #[serde(default)]
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    small_thumbnail: Option<String>,
}

// --- OpenLibrary wire types ---

#[derive(Debug, Deserialize, Default)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<OpenLibraryDoc>,
}

/// One edition hit from the OpenLibrary search endpoint.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct OpenLibraryDoc {
    /// Work key, e.g. `/works/OL45883W`
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author_name: Vec<String>,
    #[serde(default)]
    pub first_publish_year: Option<i32>,
    #[serde(default)]
    pub subject: Vec<String>,
    #[serde(default)]
    pub publisher: Vec<String>,
    #[serde(default)]
    pub number_of_pages_median: Option<u32>,
    #[serde(default)]
    pub cover_i: Option<i64>,
}

/// The work record behind an edition.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct OpenLibraryWork {
    #[serde(default)]
    pub description: Option<TextValue>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// OpenLibrary text fields are either a bare string or `{type, value}`.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum TextValue {
    Plain(String),
    Typed { value: String },
}

impl TextValue {
    pub fn text(&self) -> &str {
        match self {
            Self::Plain(s) => s,
            Self::Typed { value } => value,
        }
    }
}

// --- Pure conversions ---

fn https(url: String) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url,
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Convert a Google volume; `fallback_isbn` is used when it lists no ISBN.
fn from_volume(info: VolumeInfo, fallback_isbn: &str) -> BookMetadata {
    let pick = |kind: &str| {
        info.industry_identifiers
            .iter()
            .find(|id| id.kind == kind)
            .map(|id| isbn::normalize(&id.identifier))
    };
    let isbn = pick("ISBN_13")
        .or_else(|| pick("ISBN_10"))
        .unwrap_or_else(|| fallback_isbn.to_string());

    let title = match non_empty(info.subtitle) {
        Some(subtitle) if !info.title.is_empty() => format!("{}: {}", info.title, subtitle),
        _ => info.title,
    };

    let thumbnail = info
        .image_links
        .and_then(|links| links.thumbnail.or(links.small_thumbnail))
        .map(https);

    let mut metadata = BookMetadata {
        isbn,
        title,
        authors: info.authors,
        description: non_empty(info.description),
        thumbnail,
        published_date: non_empty(info.published_date),
        categories: info.categories,
        ..BookMetadata::default()
    };
    metadata.enrichment.publisher_info = non_empty(info.publisher);
    metadata.enrichment.page_count = info.page_count;
    metadata.enrichment.average_rating = info.average_rating;
    metadata.enrichment.ratings_count = info.ratings_count;
    metadata
}

/// Build metadata from an OpenLibrary hit when Google has nothing.
fn from_open_library(isbn: &str, doc: &OpenLibraryDoc) -> BookMetadata {
    let mut metadata = BookMetadata {
        isbn: isbn.to_string(),
        title: doc.title.clone(),
        authors: doc.author_name.clone(),
        thumbnail: doc
            .cover_i
            .map(|id| format!("https://covers.openlibrary.org/b/id/{id}-M.jpg")),
        published_date: doc.first_publish_year.map(|y| y.to_string()),
        ..BookMetadata::default()
    };
    metadata.enrichment.publisher_info = doc.publisher.first().cloned();
    metadata.enrichment.page_count = doc.number_of_pages_median;
    metadata
}

/// Split `series:` subjects off. Returns (plain subjects, first series name).
pub fn split_series(subjects: &[String]) -> (Vec<String>, Option<String>) {
    let mut plain = Vec::new();
    let mut series = None;
    for subject in subjects {
        let trimmed = subject.trim();
        let is_series = trimmed
            .get(..SERIES_PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(SERIES_PREFIX));
        if is_series {
            let name = trimmed[SERIES_PREFIX.len()..].replace('_', " ");
            let name = name.trim();
            if series.is_none() && !name.is_empty() {
                series = Some(name.to_string());
            }
        } else if !trimmed.is_empty() {
            plain.push(trimmed.to_string());
        }
    }
    (plain, series)
}

/// Fold OpenLibrary data into `metadata`.
///
/// Subjects are merged without duplicates (case-insensitive), the first
/// series wins, and the work description becomes `extended_description`
/// only when strictly longer than the primary description.
pub fn merge_open_library(
    metadata: &mut BookMetadata,
    doc: &OpenLibraryDoc,
    work: Option<&OpenLibraryWork>,
) {
    let mut raw: Vec<String> = doc.subject.clone();
    if let Some(work) = work {
        raw.extend(work.subjects.iter().cloned());
    }
    let (subjects, series) = split_series(&raw);

    let enrichment = &mut metadata.enrichment;
    for subject in subjects {
        let exists = enrichment
            .subjects
            .iter()
            .any(|s| s.eq_ignore_ascii_case(&subject));
        if !exists {
            enrichment.subjects.push(subject);
        }
    }
    if enrichment.series.is_none() {
        enrichment.series = series;
    }
    if enrichment.open_library_key.is_none() {
        enrichment.open_library_key = doc.key.clone();
    }
    if enrichment.publisher_info.is_none() {
        enrichment.publisher_info = doc.publisher.first().cloned();
    }
    if enrichment.page_count.is_none() {
        enrichment.page_count = doc.number_of_pages_median;
    }

    let extended = work
        .and_then(|w| w.description.as_ref())
        .map(|d| d.text().trim().to_string())
        .filter(|d| !d.is_empty());
    if let Some(extended) = extended {
        let current = metadata
            .description
            .as_deref()
            .map_or(0, |d| d.chars().count());
        if extended.chars().count() > current {
            metadata.enrichment.extended_description = Some(extended);
        }
    }
}

fn classify(metadata: &mut BookMetadata) {
    metadata.enrichment.enhanced_genres =
        classify_genres(&metadata.categories, &metadata.enrichment.subjects);
}

/// Client for Google Books and OpenLibrary.
pub struct MetadataClient {
    config: MetadataConfig,
    client: Client,
}

impl MetadataClient {
    /// Create a new metadata client with the given configuration.
    pub fn new(config: &MetadataConfig, user_agent: &str) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            client: http::create_client(user_agent, config.timeout_secs)?,
        })
    }

    fn volumes_url(&self, query: &str, max_results: usize) -> Result<Url> {
        let base = format!("{}/volumes", self.config.google_books_url.trim_end_matches('/'));
        let mut params = vec![
            ("q", query.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if let Some(key) = &self.config.google_api_key {
            params.push(("key", key.clone()));
        }
        Ok(Url::parse_with_params(&base, &params)?)
    }

    async fn google_by_isbn(&self, isbn: &str) -> Result<Option<BookMetadata>> {
        let url = self.volumes_url(&format!("isbn:{isbn}"), 1)?;
        let response: VolumesResponse = http::fetch_json(&self.client, url.as_str()).await?;
        Ok(response
            .items
            .into_iter()
            .next()
            .map(|volume| from_volume(volume.volume_info, isbn)))
    }

    async fn open_library_doc(&self, isbn: &str) -> Result<Option<OpenLibraryDoc>> {
        let base = format!("{}/search.json", self.config.open_library_url.trim_end_matches('/'));
        let url = Url::parse_with_params(
            &base,
            &[("isbn", isbn), ("fields", OPEN_LIBRARY_FIELDS), ("limit", "1")],
        )?;
        let response: SearchResponse = http::fetch_json(&self.client, url.as_str()).await?;
        Ok(response.docs.into_iter().next())
    }

    async fn open_library_work(&self, key: &str) -> Result<OpenLibraryWork> {
        let url = format!(
            "{}{}.json",
            self.config.open_library_url.trim_end_matches('/'),
            key
        );
        http::fetch_json(&self.client, &url).await
    }

    /// Look up one ISBN. `Ok(None)` when neither provider knows it.
    pub async fn lookup_isbn(&self, raw_isbn: &str) -> Result<Option<BookMetadata>> {
        let isbn = isbn::parse(raw_isbn)?;

        let (google, google_error) = match self.google_by_isbn(&isbn).await {
            Ok(found) => (found, None),
            Err(e) => {
                log::warn!("Google Books lookup failed for {}: {}", isbn, e);
                (None, Some(e))
            }
        };

        let doc = match self.open_library_doc(&isbn).await {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("OpenLibrary search failed for {}: {}", isbn, e);
                None
            }
        };

        let mut metadata = match (google, &doc) {
            (Some(metadata), _) => metadata,
            (None, Some(doc)) => {
                log::info!("Using OpenLibrary record for {}", isbn);
                from_open_library(&isbn, doc)
            }
            (None, None) => {
                return match google_error {
                    Some(e) => Err(AppError::metadata(&isbn, e)),
                    None => Ok(None),
                };
            }
        };

        if let Some(doc) = doc {
            let work = match &doc.key {
                Some(key) => match self.open_library_work(key).await {
                    Ok(work) => Some(work),
                    Err(e) => {
                        log::warn!("OpenLibrary work {} unavailable: {}", key, e);
                        None
                    }
                },
                None => None,
            };
            merge_open_library(&mut metadata, &doc, work.as_ref());
        }

        classify(&mut metadata);
        Ok(Some(metadata))
    }

    /// Free-text search (title, author, keywords).
    pub async fn search(&self, query: &str) -> Result<Vec<BookMetadata>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("Search query is empty"));
        }

        let url = self.volumes_url(query, self.config.max_search_results)?;
        let response: VolumesResponse = http::fetch_json(&self.client, url.as_str()).await?;

        let results: Vec<BookMetadata> = response
            .items
            .into_iter()
            .filter(|v| !v.volume_info.title.trim().is_empty())
            .map(|v| {
                let mut metadata = from_volume(v.volume_info, "");
                classify(&mut metadata);
                metadata
            })
            .collect();

        log::debug!("Search '{}' returned {} results", query, results.len());
        Ok(results)
    }

    /// Look up several ISBNs concurrently, preserving input order.
    pub async fn lookup_many(
        &self,
        isbns: &[String],
    ) -> Vec<(String, Result<Option<BookMetadata>>)> {
        let concurrency = self.config.lookup_concurrency.max(1);
        stream::iter(isbns.iter().cloned())
            .map(|isbn| async move {
                let result = self.lookup_isbn(&isbn).await;
                (isbn, result)
            })
            .buffered(concurrency)
            .collect()
            .await
    }
}
