//! Thin client abstraction over the full-text search backend
//! (Meilisearch, reached over its HTTP API). Safe for concurrent use —
//! a single `MeiliIndexGateway` is shared across the whole process.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::common::error::{Error, Result};
use crate::model::document::{Document, SearchHit, SearchResponse};

const SNIPPET_CROP_LENGTH: usize = 200;
const SNIPPET_TRUNCATE_LENGTH: usize = 300;

/// Capability set for the search-engine backend: ensure-index, batch
/// upsert, domain-scoped delete, paged search with highlighting, and
/// stats (spec.md §4.2).
#[async_trait]
pub trait IndexGateway: Send + Sync {
    async fn ensure_index(&self) -> Result<()>;
    async fn upsert_batch(&self, docs: Vec<Document>) -> Result<()>;
    async fn delete_by_domain(&self, domain: &str) -> Result<()>;
    async fn search(&self, query: &str, domain: Option<&str>, page: i64, page_size: i64) -> Result<SearchResponse>;
    async fn stats(&self) -> Result<Value>;
}

/// Meilisearch-backed `IndexGateway`, talking to the REST API with a
/// plain `reqwest::Client`.
pub struct MeiliIndexGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    index_name: String,
}

impl MeiliIndexGateway {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            index_name: index_name.into(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, url);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        req
    }
}

#[async_trait]
impl IndexGateway for MeiliIndexGateway {
    async fn ensure_index(&self) -> Result<()> {
        // Create the index; tolerate "already exists" (Meilisearch
        // returns 202 for the async task either way, but a duplicate
        // create-index call can 400 on some backend versions).
        let create = self
            .request(reqwest::Method::POST, "/indexes")
            .json(&json!({ "uid": self.index_name, "primaryKey": "id" }))
            .send()
            .await
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        if !create.status().is_success() && create.status().as_u16() != 400 {
            return Err(Error::IndexUnavailable(format!(
                "failed to create index: HTTP {}",
                create.status()
            )));
        }

        let settings_path = format!("/indexes/{}/settings", self.index_name);
        let resp = self
            .request(reqwest::Method::PATCH, &settings_path)
            .json(&json!({
                "searchableAttributes": ["title", "content", "url"],
                "filterableAttributes": ["domain", "crawled_at"],
                "sortableAttributes": ["crawled_at"],
            }))
            .send()
            .await
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::IndexUnavailable(format!(
                "failed to configure index settings: HTTP {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn upsert_batch(&self, docs: Vec<Document>) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let path = format!("/indexes/{}/documents", self.index_name);
        let resp = self
            .request(reqwest::Method::POST, &path)
            .json(&docs)
            .send()
            .await
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::IndexUnavailable(format!(
                "batch upsert failed: HTTP {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn delete_by_domain(&self, domain: &str) -> Result<()> {
        let path = format!("/indexes/{}/documents/delete", self.index_name);
        let resp = self
            .request(reqwest::Method::POST, &path)
            .json(&json!({ "filter": format!("domain = \"{domain}\"") }))
            .send()
            .await
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::IndexUnavailable(format!(
                "delete_by_domain failed: HTTP {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn search(&self, query: &str, domain: Option<&str>, page: i64, page_size: i64) -> Result<SearchResponse> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let filter = domain.map(|d| format!("domain = \"{d}\""));

        let path = format!("/indexes/{}/search", self.index_name);
        let resp = self
            .request(reqwest::Method::POST, &path)
            .json(&json!({
                "q": query,
                "filter": filter,
                "offset": (page - 1) * page_size,
                "limit": page_size,
                "attributesToCrop": ["content"],
                "cropLength": SNIPPET_CROP_LENGTH,
                "showRankingScore": true,
            }))
            .send()
            .await
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::IndexUnavailable(format!("search failed: HTTP {}", resp.status())));
        }

        let body: Value = resp.json().await.map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        let hits = body
            .get("hits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(hit_from_json)
            .collect();
        let total = body
            .get("estimatedTotalHits")
            .and_then(Value::as_i64)
            .or_else(|| body.get("totalHits").and_then(Value::as_i64))
            .unwrap_or(0);

        Ok(SearchResponse {
            hits,
            total,
            query: query.to_string(),
            page,
            page_size,
        })
    }

    async fn stats(&self) -> Result<Value> {
        let path = format!("/indexes/{}/stats", self.index_name);
        let resp = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::IndexUnavailable(format!("stats failed: HTTP {}", resp.status())));
        }
        resp.json().await.map_err(|e| Error::IndexUnavailable(e.to_string()))
    }
}

fn hit_from_json(h: Value) -> SearchHit {
    let raw_content = h.get("content").and_then(Value::as_str).unwrap_or_default();
    let formatted = h
        .get("_formatted")
        .and_then(|f| f.get("content"))
        .and_then(Value::as_str)
        .unwrap_or(raw_content);
    let snippet: String = formatted.chars().take(SNIPPET_TRUNCATE_LENGTH).collect();

    SearchHit {
        id: h.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
        url: h.get("url").and_then(Value::as_str).unwrap_or_default().to_string(),
        title: h.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
        content_snippet: snippet,
        domain: h.get("domain").and_then(Value::as_str).unwrap_or_default().to_string(),
        crawled_at: h.get("crawled_at").and_then(Value::as_str).unwrap_or_default().to_string(),
        score: h.get("_rankingScore").and_then(Value::as_f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json as j;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_maps_hits_and_crops_snippet() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/web_pages/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(j!({
                "hits": [{
                    "id": "doc-1",
                    "url": "https://example.com/a",
                    "title": "A",
                    "content": "raw-content",
                    "domain": "example.com",
                    "crawled_at": "2026-02-21T00:00:00Z",
                    "_formatted": {"content": "formatted-content"},
                    "_rankingScore": 0.88
                }],
                "estimatedTotalHits": 1
            })))
            .mount(&server)
            .await;

        let gw = MeiliIndexGateway::new(server.uri(), "", "web_pages");
        let result = gw.search("query", Some("example.com"), 2, 5).await.unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.page, 2);
        assert_eq!(result.hits[0].content_snippet, "formatted-content");
        assert_eq!(result.hits[0].score, Some(0.88));
    }

    #[tokio::test]
    async fn upsert_batch_is_noop_for_empty_input() {
        let server = MockServer::start().await;
        // No mock registered — a call would fail the test via wiremock's
        // unmatched-request panic on drop if the gateway actually sent one.
        let gw = MeiliIndexGateway::new(server.uri(), "", "web_pages");
        gw.upsert_batch(vec![]).await.unwrap();
    }

    #[tokio::test]
    async fn delete_by_domain_sends_filter_expression() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/web_pages/documents/delete"))
            .respond_with(ResponseTemplate::new(202).set_body_json(j!({"taskUid": 1})))
            .mount(&server)
            .await;

        let gw = MeiliIndexGateway::new(server.uri(), "", "web_pages");
        gw.delete_by_domain("example.com").await.unwrap();
    }

    // S7 — search scoping: a domain-scoped search sends a matching
    // filter expression rather than relying on the backend to ignore
    // an absent one.
    #[tokio::test]
    async fn search_with_domain_sends_scoped_filter() {
        use wiremock::matchers::body_json;

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/web_pages/search"))
            .and(body_json(j!({
                "q": "rust",
                "filter": "domain = \"a.edu\"",
                "offset": 0,
                "limit": 20,
                "attributesToCrop": ["content"],
                "cropLength": SNIPPET_CROP_LENGTH,
                "showRankingScore": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(j!({
                "hits": [],
                "estimatedTotalHits": 0
            })))
            .mount(&server)
            .await;

        let gw = MeiliIndexGateway::new(server.uri(), "", "web_pages");
        let result = gw.search("rust", Some("a.edu"), 1, 20).await.unwrap();
        assert_eq!(result.total, 0);
    }

    #[tokio::test]
    async fn search_without_domain_sends_null_filter() {
        use wiremock::matchers::body_json;

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/web_pages/search"))
            .and(body_json(j!({
                "q": "rust",
                "filter": null,
                "offset": 0,
                "limit": 20,
                "attributesToCrop": ["content"],
                "cropLength": SNIPPET_CROP_LENGTH,
                "showRankingScore": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(j!({
                "hits": [],
                "estimatedTotalHits": 0
            })))
            .mount(&server)
            .await;

        let gw = MeiliIndexGateway::new(server.uri(), "", "web_pages");
        gw.search("rust", None, 1, 20).await.unwrap();
    }
}
