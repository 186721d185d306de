use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Operational endpoints for troubleshooting a deployment. None of them
/// mutate data, and none return configuration values: only whether each
/// recognised variable is present.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/health
        // Liveness probe with the variable presence map.
        .route("/health", get(handlers::health))
        // GET /api/test-env
        .route("/test-env", get(handlers::test_env))
        // GET /api/test-blog
        // Count and a 5-post sample, to confirm the backend is reachable.
        .route("/test-blog", get(handlers::test_blog))
        // GET /api/debug/newsletters
        // All issues vs. publicly visible issues.
        .route("/debug/newsletters", get(handlers::debug_newsletters))
}
