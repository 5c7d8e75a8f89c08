//! Owns in-flight crawl tasks: starts a bounded number of concurrent
//! runs, refuses to double-start a site that already has a task
//! running, and guarantees a task is cleared from the running set when
//! its engine finishes (success, failure, or panic).

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::common::error::{Error, Result};
use crate::crawler::{CrawlEngine, Fetcher, RunArgs};
use crate::index::IndexGateway;
use crate::model::task::Task;
use crate::store::Store;

/// Tracks which sites currently have a crawl in flight, so a scheduler
/// tick or a manual `POST /crawl` can't start a second overlapping run
/// for the same site (spec.md §4.4).
pub struct Supervisor {
    store: Arc<Store>,
    index: Arc<dyn IndexGateway>,
    fetcher: Arc<dyn Fetcher>,
    running_sites: Arc<Mutex<HashSet<String>>>,
}

impl Supervisor {
    pub fn new(store: Arc<Store>, index: Arc<dyn IndexGateway>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            store,
            index,
            fetcher,
            running_sites: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Create a task and spawn its crawl. `site_key` scopes overlap
    /// protection — `None` (ad-hoc, unregistered crawls) never
    /// collides with anything.
    pub async fn start_crawl(
        &self,
        site_key: Option<String>,
        start_url: String,
        max_depth: i64,
        max_pages: i64,
        same_domain_only: bool,
        crawl_delay_ms: u64,
        domain_restriction: Option<String>,
    ) -> Result<Task> {
        if let Some(key) = &site_key {
            let mut running = self.running_sites.lock().await;
            if running.contains(key) {
                return Err(Error::Conflict(format!("a crawl is already running for site {key}")));
            }
            running.insert(key.clone());
        }

        let task = self
            .store
            .create_task(site_key.clone(), start_url.clone(), max_depth, max_pages, same_domain_only)
            .await;

        let task = match task {
            Ok(t) => t,
            Err(e) => {
                if let Some(key) = &site_key {
                    self.running_sites.lock().await.remove(key);
                }
                return Err(e);
            }
        };

        if let Some(key) = &site_key {
            if let Err(e) = self.store.touch_site_last_crawl(key).await {
                warn!("failed to record last_crawl_at for site {key}: {e}");
            }
        }

        let args = RunArgs {
            task_id: task.id.clone(),
            start_url,
            max_depth,
            max_pages,
            same_domain_only,
            domain_restriction,
            crawl_delay_ms,
        };

        let store = self.store.clone();
        let index = self.index.clone();
        let fetcher = self.fetcher.clone();
        let running_sites = self.running_sites.clone();

        tokio::spawn(async move {
            info!("starting crawl task {}", args.task_id);
            if let Err(e) = CrawlEngine::run(store, index, fetcher, args.clone()).await {
                warn!("crawl task {} exited with an orchestration error: {e}", args.task_id);
            }
            if let Some(key) = site_key {
                running_sites.lock().await.remove(&key);
            }
        });

        Ok(task)
    }

    pub async fn is_running(&self, site_key: &str) -> bool {
        self.running_sites.lock().await.contains(site_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexGateway;
    use crate::model::document::{Document, SearchHit, SearchResponse};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use url::Url;

    struct NullFetcher;

    #[async_trait]
    impl Fetcher for NullFetcher {
        async fn fetch(&self, _url: &Url) -> Result<crate::crawler::fetcher::FetchOutcome> {
            Ok(crate::crawler::fetcher::FetchOutcome {
                success: true,
                title: Some("T".into()),
                text: "body".into(),
                internal_links: vec![],
            })
        }
    }

    struct NullIndex;

    #[async_trait]
    impl IndexGateway for NullIndex {
        async fn ensure_index(&self) -> Result<()> {
            Ok(())
        }
        async fn upsert_batch(&self, _docs: Vec<Document>) -> Result<()> {
            Ok(())
        }
        async fn delete_by_domain(&self, _domain: &str) -> Result<()> {
            Ok(())
        }
        async fn search(&self, query: &str, _domain: Option<&str>, page: i64, page_size: i64) -> Result<SearchResponse> {
            Ok(SearchResponse { hits: Vec::<SearchHit>::new(), total: 0, query: query.to_string(), page, page_size })
        }
        async fn stats(&self) -> Result<Value> {
            Ok(json!({}))
        }
    }

    #[tokio::test]
    async fn overlapping_start_for_same_site_is_rejected() {
        let store = Arc::new(Store::init_in_memory().await.unwrap());
        let sup = Supervisor::new(store, Arc::new(NullIndex), Arc::new(NullFetcher));

        sup.start_crawl(
            Some("site-1".into()),
            "https://example.com".into(),
            1,
            5,
            true,
            0,
            Some("example.com".into()),
        )
        .await
        .unwrap();

        let second = sup
            .start_crawl(
                Some("site-1".into()),
                "https://example.com".into(),
                1,
                5,
                true,
                0,
                Some("example.com".into()),
            )
            .await;
        assert!(matches!(second, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn ad_hoc_crawls_never_collide() {
        let store = Arc::new(Store::init_in_memory().await.unwrap());
        let sup = Supervisor::new(store, Arc::new(NullIndex), Arc::new(NullFetcher));

        sup.start_crawl(None, "https://example.com".into(), 1, 5, true, 0, Some("example.com".into()))
            .await
            .unwrap();
        sup.start_crawl(None, "https://example.com".into(), 1, 5, true, 0, Some("example.com".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn starting_a_site_bound_crawl_touches_last_crawl_at() {
        use crate::model::site::SiteCreate;

        let store = Arc::new(Store::init_in_memory().await.unwrap());
        let site = store
            .create_site(SiteCreate {
                domain: "example.com".into(),
                name: None,
                start_url: "https://example.com".into(),
                max_depth: 1,
                max_pages: 5,
                same_domain_only: true,
                crawl_frequency_minutes: 60,
                enabled: true,
            })
            .await
            .unwrap();
        assert!(site.last_crawl_at.is_none());

        let sup = Supervisor::new(store.clone(), Arc::new(NullIndex), Arc::new(NullFetcher));
        sup.start_crawl(
            Some(site.id.clone()),
            site.start_url.clone(),
            site.max_depth,
            site.max_pages,
            site.same_domain_only,
            0,
            Some(site.domain.clone()),
        )
        .await
        .unwrap();

        let refreshed = store.get_site(&site.id).await.unwrap();
        assert!(refreshed.last_crawl_at.is_some());
    }
}
