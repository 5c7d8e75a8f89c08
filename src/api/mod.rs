pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the full `axum::Router` for the service: sites CRUD, manual
/// crawl triggers, task inspection, search, and health (spec.md §6).
pub fn build_router(state: AppState) -> Router {
    let enable_cors = state.config.api.enable_cors;

    let protected = Router::new()
        .route("/sites", get(routes::list_sites).post(routes::create_site))
        .route("/sites/:id", put(routes::update_site).delete(routes::delete_site))
        .route("/sites/:id/crawl", post(routes::crawl_site))
        .route("/crawl", post(routes::start_crawl))
        .route("/crawl/tasks", get(routes::list_tasks))
        .route("/crawl/:task_id", get(routes::get_task))
        .route("/search", post(routes::search))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token));

    let mut router = Router::new()
        .route("/health", get(routes::health))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}
