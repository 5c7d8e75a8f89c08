use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum content length stored per page (spec.md §3).
pub const MAX_CONTENT_CHARS: usize = 50_000;

/// The unit of storage in the search index — one per URL per latest
/// crawl. Lives in the IndexGateway's backend, not in the Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub url: String,
    pub title: String,
    pub content: String,
    pub domain: String,
    pub crawled_at: DateTime<Utc>,
}

impl Document {
    /// Build a document, truncating content to `MAX_CONTENT_CHARS`.
    pub fn new(id: String, url: String, title: String, content: String, domain: String, crawled_at: DateTime<Utc>) -> Self {
        let content = if content.chars().count() > MAX_CONTENT_CHARS {
            content.chars().take(MAX_CONTENT_CHARS).collect()
        } else {
            content
        };
        Self { id, url, title, content, domain, crawled_at }
    }
}

/// `POST /search` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub domain: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

/// A single ranked search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub url: String,
    pub title: String,
    pub content_snippet: String,
    pub domain: String,
    pub crawled_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// `POST /search` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub total: i64,
    pub query: String,
    pub page: i64,
    pub page_size: i64,
}
