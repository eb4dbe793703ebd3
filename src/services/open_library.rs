//! Open Library client
//!
//! Thin HTTP client over the public Open Library API with an in-memory moka
//! cache keyed by request URL. Raw responses back the proxy endpoints; the
//! search response is also mapped to [`BookCandidate`]s for book search.

use crate::config::OpenLibraryConfig;
use crate::models::BookCandidate;
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use moka::future::Cache;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Result count requested when searching for book candidates
pub const CANDIDATE_LIMIT: u32 = 20;

/// Subjects kept per candidate
const MAX_SUBJECTS: usize = 5;

pub struct OpenLibraryClient {
    http: reqwest::Client,
    base_url: String,
    covers_url: String,
    cache: Cache<String, Arc<Value>>,
}

impl std::fmt::Debug for OpenLibraryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenLibraryClient")
            .field("base_url", &self.base_url)
            .field("cached_entries", &self.cache.entry_count())
            .finish()
    }
}

impl OpenLibraryClient {
    pub fn new(config: &OpenLibraryConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("skynote/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            covers_url: config.covers_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    /// GET a JSON document, serving repeated URLs from the cache
    async fn fetch(&self, url: String) -> ServiceResult<Arc<Value>> {
        if let Some(hit) = self.cache.get(&url).await {
            tracing::debug!(url = %url, "Open Library cache hit");
            return Ok(hit);
        }

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::UpstreamError(format!("Open Library unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::UpstreamError(format!(
                "Open Library returned {}",
                status
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            ServiceError::UpstreamError(format!("Invalid Open Library response: {}", e))
        })?;

        let body = Arc::new(body);
        self.cache.insert(url, body.clone()).await;
        Ok(body)
    }

    /// Raw `search.json` response
    pub async fn search_raw(&self, query: &str, limit: u32) -> ServiceResult<Arc<Value>> {
        let url = format!(
            "{}/search.json?q={}&limit={}",
            self.base_url,
            urlencoding::encode(query),
            limit
        );
        self.fetch(url).await
    }

    /// Raw edition document for a key such as `OL7353617M` or `/books/OL7353617M`
    pub async fn edition_raw(&self, key: &str) -> ServiceResult<Arc<Value>> {
        let key = key.trim_start_matches("/books/").trim_start_matches('/');
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ServiceError::validation(format!(
                "Invalid Open Library key: {}",
                key
            )));
        }
        self.fetch(format!("{}/books/{}.json", self.base_url, key))
            .await
    }

    /// Search and map the hits to book candidates
    pub async fn search_candidates(&self, query: &str) -> ServiceResult<Vec<BookCandidate>> {
        let raw = self.search_raw(query, CANDIDATE_LIMIT).await?;
        Ok(candidates_from_search(&raw, &self.covers_url))
    }
}

/// Map the `docs` array of a search response to candidates.
///
/// Docs without a title are skipped.
pub fn candidates_from_search(response: &Value, covers_url: &str) -> Vec<BookCandidate> {
    let docs = match response.get("docs").and_then(Value::as_array) {
        Some(docs) => docs,
        None => return Vec::new(),
    };

    docs.iter()
        .filter_map(|doc| {
            let title = doc.get("title").and_then(Value::as_str)?.to_string();
            let first_str = |field: &str| {
                doc.get(field)
                    .and_then(Value::as_array)
                    .and_then(|values| values.first())
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };

            Some(BookCandidate {
                id: None,
                title,
                author: first_str("author_name").unwrap_or_else(|| "Unknown Author".to_string()),
                isbn: first_str("isbn"),
                cover_url: doc
                    .get("cover_i")
                    .and_then(Value::as_i64)
                    .map(|cover| format!("{}/b/id/{}-M.jpg", covers_url, cover)),
                description: first_str("first_sentence"),
                open_library_key: doc.get("key").and_then(Value::as_str).map(str::to_string),
                publish_year: doc.get("first_publish_year").and_then(Value::as_i64),
                page_count: doc.get("number_of_pages_median").and_then(Value::as_i64),
                subjects: doc
                    .get("subject")
                    .and_then(Value::as_array)
                    .map(|subjects| {
                        subjects
                            .iter()
                            .filter_map(Value::as_str)
                            .take(MAX_SUBJECTS)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offline_client() -> OpenLibraryClient {
        OpenLibraryClient::new(&OpenLibraryConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 1,
            ..OpenLibraryConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_candidates_mapping() {
        let response = json!({
            "numFound": 2,
            "docs": [
                {
                    "key": "/works/OL45804W",
                    "title": "Dune",
                    "author_name": ["Frank Herbert", "Someone Else"],
                    "isbn": ["9780441013593"],
                    "cover_i": 11481354,
                    "first_sentence": ["A beginning is the time..."],
                    "first_publish_year": 1965,
                    "number_of_pages_median": 612,
                    "subject": ["a", "b", "c", "d", "e", "f", "g"]
                },
                { "key": "/works/OL1W" },
                { "title": "Anonymous" }
            ]
        });

        let candidates = candidates_from_search(&response, "https://covers.openlibrary.org");
        assert_eq!(candidates.len(), 2);

        let dune = &candidates[0];
        assert_eq!(dune.author, "Frank Herbert");
        assert_eq!(dune.isbn.as_deref(), Some("9780441013593"));
        assert_eq!(
            dune.cover_url.as_deref(),
            Some("https://covers.openlibrary.org/b/id/11481354-M.jpg")
        );
        assert_eq!(dune.publish_year, Some(1965));
        assert_eq!(dune.page_count, Some(612));
        assert_eq!(dune.subjects.len(), 5);
        assert!(dune.id.is_none());

        assert_eq!(candidates[1].author, "Unknown Author");
        assert!(candidates[1].cover_url.is_none());
    }

    #[test]
    fn test_candidates_without_docs() {
        assert!(candidates_from_search(&json!({}), "x").is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_upstream_error() {
        let client = offline_client();
        assert!(matches!(
            client.search_raw("dune", 10).await,
            Err(ServiceError::UpstreamError(_))
        ));
    }

    #[tokio::test]
    async fn test_edition_key_validation() {
        let client = offline_client();
        assert!(matches!(
            client.edition_raw("../admin").await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            client.edition_raw("/books/OL7353617M").await,
            Err(ServiceError::UpstreamError(_))
        ));
    }
}
