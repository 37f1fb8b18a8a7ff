use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/sessions/connect", post(handlers::connect_session))
        .route(
            "/sessions/disconnect/:session_id",
            post(handlers::disconnect_session),
        )
        // Session queries
        .route(
            "/sessions/:session_id/status",
            get(handlers::session_status),
        )
        .route("/sessions/:session_id/turns", get(handlers::session_turns))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
