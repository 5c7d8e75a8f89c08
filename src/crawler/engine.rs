//! The crawl orchestrator: concurrent-safe, single-run bounded BFS
//! traversal with at-most-once page visitation, batched index
//! ingestion, and crash-safe task state (spec.md §4.3).

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::common::error::{Error, Result};
use crate::common::normalize::{doc_id, host_of, is_same_domain, normalize_str};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::Frontier;
use crate::index::IndexGateway;
use crate::model::document::Document;
use crate::model::task::{TaskPatch, TaskStatus};
use crate::store::Store;

/// Batch is flushed to the index gateway every this many documents
/// (spec.md §4.3 step 8).
const BATCH_SIZE: usize = 10;

/// Snapshot of the arguments a single crawl run needs. Cloned into the
/// inner task spawned by `CrawlEngine::run` so a panic there can still
/// be observed (and converted to a `failed` task) by the outer caller.
#[derive(Clone)]
pub struct RunArgs {
    pub task_id: String,
    pub start_url: String,
    pub max_depth: i64,
    pub max_pages: i64,
    pub same_domain_only: bool,
    pub domain_restriction: Option<String>,
    pub crawl_delay_ms: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct CrawlStats {
    total_pages: i64,
    success_pages: i64,
    failed_pages: i64,
}

pub struct CrawlEngine;

impl CrawlEngine {
    /// Run one crawl to completion. Always leaves the task in a
    /// terminal state (`success` or `failed`), even if the inner loop
    /// panics — a deferred finalizer (the `tokio::spawn` + join below)
    /// observes that outcome and writes the final status.
    pub async fn run(
        store: Arc<Store>,
        index: Arc<dyn IndexGateway>,
        fetcher: Arc<dyn Fetcher>,
        args: RunArgs,
    ) -> Result<()> {
        let task_id = args.task_id.clone();

        if let Err(e) = store
            .patch_task(
                &task_id,
                TaskPatch {
                    status: Some(TaskStatus::Running),
                    started_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
        {
            warn!("task {task_id}: failed to record start: {e}");
        }

        let inner_store = store.clone();
        let inner_index = index.clone();
        let inner_fetcher = fetcher.clone();
        let inner_args = args.clone();

        let handle = tokio::spawn(async move {
            Self::run_loop(inner_store, inner_index, inner_fetcher, inner_args).await
        });

        match handle.await {
            Ok(Ok(stats)) => {
                let patch = TaskPatch {
                    status: Some(TaskStatus::Success),
                    progress: Some(100),
                    total_pages: Some(stats.total_pages),
                    success_pages: Some(stats.success_pages),
                    failed_pages: Some(stats.failed_pages),
                    finished_at: Some(Utc::now()),
                    ..Default::default()
                };
                if let Err(e) = store.patch_task(&task_id, patch).await {
                    warn!("task {task_id}: failed to record success (orphan case): {e}");
                }
            }
            Ok(Err(e)) => {
                warn!("task {task_id}: crawl failed: {e}");
                let patch = TaskPatch {
                    status: Some(TaskStatus::Failed),
                    error_message: Some(e.truncated(2000)),
                    finished_at: Some(Utc::now()),
                    ..Default::default()
                };
                if let Err(e) = store.patch_task(&task_id, patch).await {
                    warn!("task {task_id}: failed to record failure (orphan case): {e}");
                }
            }
            Err(join_err) => {
                let msg = format!("unhandled error during crawl: {join_err}");
                warn!("task {task_id}: {msg}");
                let patch = TaskPatch {
                    status: Some(TaskStatus::Failed),
                    error_message: Some(msg.chars().take(2000).collect()),
                    finished_at: Some(Utc::now()),
                    ..Default::default()
                };
                if let Err(e) = store.patch_task(&task_id, patch).await {
                    warn!("task {task_id}: failed to record failure (orphan case): {e}");
                }
            }
        }

        Ok(())
    }

    async fn run_loop(
        store: Arc<Store>,
        index: Arc<dyn IndexGateway>,
        fetcher: Arc<dyn Fetcher>,
        args: RunArgs,
    ) -> Result<CrawlStats> {
        let start_url = Url::parse(&args.start_url).map_err(Error::UrlParseError)?;
        let base_domain = args
            .domain_restriction
            .clone()
            .unwrap_or_else(|| host_of(&start_url).unwrap_or_default())
            .to_lowercase();

        let max_pages = args.max_pages.max(0) as usize;
        let max_depth = args.max_depth.max(0) as usize;

        let mut frontier = Frontier::new();
        let seed = normalize_str(&args.start_url).ok_or_else(|| {
            Error::Validation(format!("invalid start_url: {}", args.start_url))
        })?;
        frontier.push(seed, 0);

        let mut visited: HashSet<String> = HashSet::new();
        let mut success: usize = 0;
        let mut failed: usize = 0;
        let mut batch: Vec<Document> = Vec::new();

        while !frontier.is_empty() && (success + failed) < max_pages {
            let (url_str, depth) = frontier.pop().expect("checked non-empty above");

            if visited.contains(&url_str) {
                continue;
            }
            visited.insert(url_str.clone());

            let url = match Url::parse(&url_str) {
                Ok(u) => u,
                Err(_) => continue,
            };

            if args.same_domain_only {
                let host = host_of(&url).unwrap_or_default();
                if !is_same_domain(&host, &base_domain) {
                    debug!("skipping off-domain url: {url_str}");
                    continue;
                }
            }

            Self::publish_progress(&store, &args.task_id, &visited, success, failed, max_pages).await;

            match fetcher.fetch(&url).await {
                Ok(outcome) if outcome.success && !outcome.text.is_empty() => {
                    let doc = Document::new(
                        doc_id(&url_str),
                        url_str.clone(),
                        outcome.title.clone().unwrap_or_else(|| url_str.clone()),
                        outcome.text.clone(),
                        base_domain.clone(),
                        Utc::now(),
                    );
                    batch.push(doc);
                    success += 1;

                    if batch.len() >= BATCH_SIZE {
                        Self::flush_batch(&index, &mut batch).await;
                    }

                    if depth < max_depth {
                        for href in &outcome.internal_links {
                            let Some(abs) = resolve_link(&url, href) else { continue };
                            if !visited.contains(&abs) {
                                frontier.push(abs, depth + 1);
                            }
                        }
                    }
                }
                Ok(_) => {
                    failed += 1;
                }
                Err(e) => {
                    warn!("fetch failed for {url_str}: {e}");
                    failed += 1;
                }
            }

            if args.crawl_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(args.crawl_delay_ms)).await;
            }
        }

        Self::flush_batch(&index, &mut batch).await;

        info!(
            "crawl {} done: {} success, {} failed, {} visited",
            args.task_id,
            success,
            failed,
            visited.len()
        );

        Ok(CrawlStats {
            total_pages: visited.len() as i64,
            success_pages: success as i64,
            failed_pages: failed as i64,
        })
    }

    async fn publish_progress(
        store: &Store,
        task_id: &str,
        visited: &HashSet<String>,
        success: usize,
        failed: usize,
        max_pages: usize,
    ) {
        let denom = max_pages.max(1);
        let progress = ((success + failed) as f64 / denom as f64 * 100.0).floor() as i64;
        let patch = TaskPatch {
            progress: Some(progress),
            total_pages: Some(visited.len() as i64),
            success_pages: Some(success as i64),
            failed_pages: Some(failed as i64),
            ..Default::default()
        };
        if let Err(e) = store.patch_task(task_id, patch).await {
            warn!("task {task_id}: progress write failed (best-effort): {e}");
        }
    }

    async fn flush_batch(index: &Arc<dyn IndexGateway>, batch: &mut Vec<Document>) {
        if batch.is_empty() {
            return;
        }
        let docs = std::mem::take(batch);
        if let Err(e) = index.upsert_batch(docs).await {
            warn!("batch flush failed, documents dropped from this batch: {e}");
        }
    }
}

/// Resolve a discovered link (absolute, relative, or protocol-relative)
/// against the page it was found on, normalizing the result. Non-HTTP
/// schemes are dropped.
fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let resolved = if let Ok(u) = Url::parse(href) {
        u
    } else {
        base.join(href).ok()?
    };
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    Some(crate::common::normalize::normalize(&resolved))
}
