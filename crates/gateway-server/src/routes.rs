//! Route definitions for the gateway API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Router,
};

use crate::{handlers, middleware, proxy, state::AppState};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.server.max_body_bytes;

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/healthz", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        // Metrics endpoint
        .route("/metrics", get(handlers::metrics_endpoint))
        // Management API
        .nest("/api", api_routes())
        // OpenAI-compatible proxy mount
        .nest("/v1", proxy_routes())
        // Apply middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::logging_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        // Add state
        .with_state(state)
}

/// Read-only management routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(handlers::list_models))
        .layer(middleware::cors_layer())
}

/// Every method and path under `/v1` is forwarded upstream
fn proxy_routes() -> Router<AppState> {
    Router::new()
        .route("/*path", any(proxy::proxy_handler))
        .layer(middleware::cors_layer())
}
