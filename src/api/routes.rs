use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::common::error::Error;
use crate::model::document::{SearchRequest, SearchResponse};
use crate::model::site::{Site, SiteCreate, SitePatch};
use crate::model::task::{Task, TaskList};
use crate::store::SiteFilter;

#[derive(Deserialize)]
pub struct SitesQuery {
    pub enabled: Option<bool>,
}

pub async fn list_sites(State(state): State<AppState>, Query(q): Query<SitesQuery>) -> ApiResult<Json<serde_json::Value>> {
    let sites = state.store.list_sites(SiteFilter { enabled: q.enabled }).await?;
    Ok(Json(json!({ "items": sites })))
}

pub async fn create_site(State(state): State<AppState>, Json(body): Json<SiteCreate>) -> ApiResult<Json<Site>> {
    validate_site_create(&body)?;
    let site = state.store.create_site(body).await?;
    Ok(Json(site))
}

pub async fn update_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<SitePatch>,
) -> ApiResult<Json<Site>> {
    let site = state.store.update_site(&id, patch).await?;
    Ok(Json(site))
}

pub async fn delete_site(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<serde_json::Value>> {
    let site = state.store.get_site(&id).await?;
    state.store.delete_site(&id).await?;

    if let Err(e) = state.index.delete_by_domain(&site.domain).await {
        tracing::warn!("delete_by_domain failed for site {id} ({}): {e}", site.domain);
    }

    Ok(Json(json!({ "success": true, "message": format!("site {id} deleted") })))
}

pub async fn crawl_site(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<serde_json::Value>> {
    let site = state.store.get_site(&id).await?;
    let task = state
        .supervisor
        .start_crawl(
            Some(site.id.clone()),
            site.start_url.clone(),
            site.max_depth,
            site.max_pages,
            site.same_domain_only,
            state.config.crawler.crawl_delay_ms,
            Some(site.domain.clone()),
        )
        .await?;
    Ok(Json(json!({ "task_id": task.id, "status": task.status })))
}

#[derive(Deserialize)]
pub struct AdHocCrawlRequest {
    pub url: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: i64,
    #[serde(default = "default_max_pages")]
    pub max_pages: i64,
    #[serde(default = "default_true")]
    pub same_domain_only: bool,
    pub domain_restriction: Option<String>,
    pub site_id: Option<String>,
}

fn default_max_depth() -> i64 {
    3
}
fn default_max_pages() -> i64 {
    100
}
fn default_true() -> bool {
    true
}

pub async fn start_crawl(
    State(state): State<AppState>,
    Json(body): Json<AdHocCrawlRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let url = url::Url::parse(&body.url).map_err(|e| ApiError(Error::Validation(format!("invalid url: {e}"))))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError(Error::Validation("url must be http or https".into())));
    }
    if body.max_depth < 0 {
        return Err(ApiError(Error::Validation("max_depth must be >= 0".into())));
    }
    if body.max_pages < 1 {
        return Err(ApiError(Error::Validation("max_pages must be >= 1".into())));
    }

    let domain_restriction = body
        .domain_restriction
        .clone()
        .or_else(|| crate::common::normalize::host_of(&url));

    let task = state
        .supervisor
        .start_crawl(
            body.site_id.clone(),
            body.url.clone(),
            body.max_depth,
            body.max_pages,
            body.same_domain_only,
            state.config.crawler.crawl_delay_ms,
            domain_restriction,
        )
        .await?;
    Ok(Json(json!({ "task_id": task.id, "status": task.status })))
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn list_tasks(State(state): State<AppState>, Query(q): Query<PageQuery>) -> ApiResult<Json<TaskList>> {
    let page = q.page.unwrap_or(1);
    let page_size = q.page_size.unwrap_or(20);
    let (items, total) = state.store.list_tasks(page, page_size).await?;
    Ok(Json(TaskList { items, total, page, page_size }))
}

pub async fn get_task(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<Json<Task>> {
    let task = state.store.get_task(&task_id).await?;
    Ok(Json(task))
}

pub async fn search(State(state): State<AppState>, Json(body): Json<SearchRequest>) -> ApiResult<Json<SearchResponse>> {
    if body.page < 1 {
        return Err(ApiError(Error::Validation("page must be >= 1".into())));
    }
    if body.page_size < 1 {
        return Err(ApiError(Error::Validation("page_size must be >= 1".into())));
    }
    let result = state
        .index
        .search(&body.query, body.domain.as_deref(), body.page, body.page_size)
        .await?;
    Ok(Json(result))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    match state.index.stats().await {
        Ok(stats) => Json(json!({ "status": "ok", "meilisearch": stats })),
        Err(e) => Json(json!({ "status": "degraded", "error": e.to_string() })),
    }
}

fn validate_site_create(attrs: &SiteCreate) -> ApiResult<()> {
    if url::Url::parse(&attrs.start_url).is_err() {
        return Err(ApiError(Error::Validation("invalid start_url".into())));
    }
    if attrs.max_depth < 0 {
        return Err(ApiError(Error::Validation("max_depth must be >= 0".into())));
    }
    if attrs.max_pages < 1 {
        return Err(ApiError(Error::Validation("max_pages must be >= 1".into())));
    }
    if attrs.crawl_frequency_minutes < 1 {
        return Err(ApiError(Error::Validation("crawl_frequency_minutes must be >= 1".into())));
    }
    Ok(())
}
