//! Periodic tick that finds sites due for a recrawl and hands them to
//! the `Supervisor`. No backlog/catch-up semantics: a tick that misses
//! a site (because the process was down, or the tick itself errored)
//! simply picks it up on the next tick once it's due again.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::common::config::CrawlerConfig;
use crate::model::site::Site;
use crate::store::{SiteFilter, Store};
use crate::supervisor::Supervisor;

pub struct Scheduler {
    store: Arc<Store>,
    supervisor: Arc<Supervisor>,
    tick_interval: Duration,
    crawler_config: CrawlerConfig,
}

impl Scheduler {
    pub fn new(store: Arc<Store>, supervisor: Arc<Supervisor>, crawler_config: CrawlerConfig) -> Self {
        let tick_interval = Duration::from_secs(crawler_config.scheduler_tick_minutes * 60);
        Self { store, supervisor, tick_interval, crawler_config }
    }

    /// Run the tick loop forever. Intended to be spawned once at
    /// process startup and left running for the process lifetime.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.tick_interval);
        loop {
            interval.tick().await;
            if let Err(e) = self.tick().await {
                error!("scheduler tick failed: {e}");
            }
        }
    }

    async fn tick(&self) -> crate::common::error::Result<()> {
        let sites = self.store.list_sites(SiteFilter { enabled: Some(true) }).await?;
        let due: Vec<Site> = sites.into_iter().filter(|s| is_due(s)).collect();
        info!("scheduler tick: {} site(s) due", due.len());

        for site in due {
            if self.supervisor.is_running(&site.id).await {
                continue;
            }
            let result = self
                .supervisor
                .start_crawl(
                    Some(site.id.clone()),
                    site.start_url.clone(),
                    site.max_depth,
                    site.max_pages,
                    site.same_domain_only,
                    self.crawler_config.crawl_delay_ms,
                    Some(site.domain.clone()),
                )
                .await;

            if let Err(e) = result {
                error!("failed to start scheduled crawl for site {}: {e}", site.id);
            }
        }

        Ok(())
    }
}

/// A site is due if it has never been crawled, or its last crawl was
/// at least `crawl_frequency_minutes` ago.
fn is_due(site: &Site) -> bool {
    match site.last_crawl_at {
        None => true,
        Some(last) => {
            let elapsed = Utc::now().signed_duration_since(last);
            elapsed.num_minutes() >= site.crawl_frequency_minutes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn site_with(last_crawl_at: Option<chrono::DateTime<Utc>>, frequency: i64) -> Site {
        Site {
            id: "s1".into(),
            domain: "example.com".into(),
            name: None,
            start_url: "https://example.com".into(),
            max_depth: 3,
            max_pages: 100,
            same_domain_only: true,
            crawl_frequency_minutes: frequency,
            enabled: true,
            last_crawl_at,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn never_crawled_is_due() {
        assert!(is_due(&site_with(None, 60)));
    }

    #[test]
    fn recently_crawled_is_not_due() {
        let site = site_with(Some(Utc::now()), 60);
        assert!(!is_due(&site));
    }

    #[test]
    fn stale_crawl_is_due() {
        let last = Utc::now() - ChronoDuration::minutes(120);
        let site = site_with(Some(last), 60);
        assert!(is_due(&site));
    }
}
