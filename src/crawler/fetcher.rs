use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use crate::common::error::Result;
use crate::crawler::parser::Parser;

/// What the crawl engine needs back from a single fetch attempt.
/// `success = false` (with no error) models a non-exceptional failure
/// (e.g. non-2xx status, non-HTML content); an `Err` from `fetch`
/// models a thrown/exceptional failure. The engine treats both the
/// same way — incrementing `failed_pages`, no retry within the run.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub success: bool,
    pub title: Option<String>,
    pub text: String,
    pub internal_links: Vec<String>,
}

/// Duck-typed fetcher contract (spec.md §9): given a URL, return a
/// page or an error. The concrete headless-browser / HTTP
/// implementation is swappable for tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchOutcome>;
}

/// Default `Fetcher`: plain HTTP GET via `reqwest`, text/link
/// extraction via `scraper` (teacher's existing HTML-parsing stack).
pub struct HttpFetcher {
    client: reqwest::Client,
    parser: Parser,
    max_page_size: usize,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout_seconds: u64, max_page_size: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            parser: Parser::new(),
            max_page_size,
        })
    }

    /// Only HTTP(S) URLs are ever worth asking the fetcher for.
    pub fn should_fetch(url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchOutcome> {
        if !Self::should_fetch(url) {
            return Ok(FetchOutcome::default());
        }

        let resp = self.client.get(url.clone()).send().await?;

        if !resp.status().is_success() {
            return Ok(FetchOutcome::default());
        }

        let is_html = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html") || ct.contains("text/plain"))
            .unwrap_or(true);
        if !is_html {
            return Ok(FetchOutcome::default());
        }

        let body = resp.text().await?;
        let body: String = body.chars().take(self.max_page_size).collect();

        let parsed = self.parser.parse(&body, url)?;
        if parsed.text_content.is_empty() {
            return Ok(FetchOutcome {
                success: false,
                ..Default::default()
            });
        }

        let links = self.parser.filter_links(parsed.links);

        Ok(FetchOutcome {
            success: true,
            title: parsed.title,
            text: parsed.text_content,
            internal_links: links.into_iter().map(|u| u.to_string()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn should_fetch_only_http_and_https() {
        assert!(HttpFetcher::should_fetch(&Url::parse("https://example.com").unwrap()));
        assert!(HttpFetcher::should_fetch(&Url::parse("http://example.com").unwrap()));
        assert!(!HttpFetcher::should_fetch(&Url::parse("ftp://example.com").unwrap()));
    }

    #[tokio::test]
    async fn fetch_drops_asset_links_from_internal_links() {
        let server = MockServer::start().await;
        let html = r#"
            <html><head><title>Page</title></head>
            <body>
              some text
              <a href="/about">About</a>
              <a href="/logo.png">Logo</a>
              <a href="/styles.css">Styles</a>
            </body></html>
        "#;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_header("content-type", "text/html").set_body_string(html))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new("test-agent", 5, 1_000_000).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let outcome = fetcher.fetch(&url).await.unwrap();

        assert!(outcome.success);
        assert!(outcome.internal_links.iter().any(|l| l.ends_with("/about")));
        assert!(!outcome.internal_links.iter().any(|l| l.ends_with(".png")));
        assert!(!outcome.internal_links.iter().any(|l| l.ends_with(".css")));
    }
}
