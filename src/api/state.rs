use std::sync::Arc;

use crate::common::config::Config;
use crate::crawler::Fetcher;
use crate::index::IndexGateway;
use crate::store::Store;
use crate::supervisor::Supervisor;

/// Shared process state threaded through every handler via
/// `axum::extract::State`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub index: Arc<dyn IndexGateway>,
    pub supervisor: Arc<Supervisor>,
    pub fetcher: Arc<dyn Fetcher>,
    pub config: Arc<Config>,
}
