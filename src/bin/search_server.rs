//! Main service entrypoint: loads configuration, opens the Store,
//! sweeps orphaned tasks, starts the Scheduler, and serves the API.

use site_crawl_search::prelude::*;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    info!("starting with database at {}", config.storage.database_path);

    let store = Arc::new(Store::init(&config.storage.database_path).await?);

    let orphaned = store.sweep_orphaned_tasks().await?;
    if orphaned > 0 {
        warn!("swept {orphaned} orphaned task(s) from a previous run to failed");
    }

    let index: Arc<dyn IndexGateway> = Arc::new(MeiliIndexGateway::new(
        config.index.url.clone(),
        config.index.api_key.clone(),
        config.index.index_name.clone(),
    ));
    if let Err(e) = index.ensure_index().await {
        warn!("ensure_index failed at startup, search may be degraded until the index backend is reachable: {e}");
    }

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
        &config.crawler.user_agent,
        30,
        2_000_000,
    )?);

    let supervisor = Arc::new(Supervisor::new(store.clone(), index.clone(), fetcher.clone()));

    let scheduler = Scheduler::new(store.clone(), supervisor.clone(), config.crawler.clone());
    tokio::spawn(scheduler.run());

    let state = site_crawl_search::api::AppState {
        store,
        index,
        supervisor,
        fetcher,
        config: Arc::new(config.clone()),
    };
    let app = site_crawl_search::api::build_router(state);

    let addr = format!("{}:{}", config.api.host, config.api.port);
    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
