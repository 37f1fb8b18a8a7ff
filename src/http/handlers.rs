use super::state::AppState;
use crate::error::Error;
use crate::session::{clock, SessionConfig, SessionStats};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ConnectRequest {
    /// Optional session ID (if not provided, one is generated)
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub session_id: String,
    pub status: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// A duplicate session id is a client error; everything else on the connect
/// path (NATS down, subscribe failure) is ours.
fn connect_failure_status(e: &anyhow::Error) -> StatusCode {
    match e.downcast_ref::<Error>() {
        Some(Error::SessionAlreadyConnected(_)) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Only an unknown id is a 404; a teardown failure for a session that did
/// exist must not masquerade as one.
fn disconnect_failure_status(e: &anyhow::Error) -> StatusCode {
    match e.downcast_ref::<Error>() {
        Some(Error::SessionNotFound(_)) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /sessions/connect
/// Accept a new conversation connection and start its event ingest
pub async fn connect_session(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> impl IntoResponse {
    let session_id = req.session_id.unwrap_or_else(clock::new_session_id);

    info!("Connect request for session: {}", session_id);

    if state.manager.get(&session_id).await.is_some() {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("Session {} is already connected", session_id),
            }),
        )
            .into_response();
    }

    let config = SessionConfig {
        session_id: session_id.clone(),
        nats_url: state.config.nats.url.clone(),
        recordings_dir: PathBuf::from(&state.config.storage.recordings_dir),
    };

    match state.manager.connect(config).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ConnectResponse {
                session_id: session_id.clone(),
                status: "connected".to_string(),
                message: format!("Session {} connected", session_id),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to connect session: {:#}", e);
            (
                connect_failure_status(&e),
                Json(ErrorResponse {
                    error: format!("Failed to connect session: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /sessions/disconnect/:session_id
/// Close a session: stop event ingest and flush the audio asset
pub async fn disconnect_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    info!("Disconnect request for session: {}", session_id);

    match state.manager.disconnect(&session_id).await {
        Ok(stats) => (
            StatusCode::OK,
            Json(DisconnectResponse {
                session_id,
                status: "disconnected".to_string(),
                stats,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to disconnect session {}: {}", session_id, e);
            (
                disconnect_failure_status(&e),
                Json(ErrorResponse {
                    error: format!("Failed to disconnect session {}: {}", session_id, e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /sessions/:session_id/status
/// Live statistics for a connected session
pub async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.manager.get(&session_id).await {
        Some(session) => (StatusCode::OK, Json(session.stats())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session {} not found", session_id),
            }),
        )
            .into_response(),
    }
}

/// GET /sessions/:session_id/turns
/// Stored turn records for a session (live or past)
pub async fn session_turns(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.manager.store().session_turns(&session_id) {
        Ok(turns) if turns.is_empty() => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No turns found for session {}", session_id),
            }),
        )
            .into_response(),
        Ok(turns) => (StatusCode::OK, Json(turns)).into_response(),
        Err(e) => {
            error!("Failed to query turns for {}: {}", session_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to query turns: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_session_maps_to_conflict() {
        let err = anyhow::Error::from(Error::SessionAlreadyConnected("s1".to_string()));
        assert_eq!(connect_failure_status(&err), StatusCode::CONFLICT);
    }

    #[test]
    fn other_connect_failures_map_to_server_error() {
        let err = anyhow::anyhow!("NATS connection refused");
        assert_eq!(connect_failure_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unknown_session_maps_to_not_found() {
        let err = anyhow::Error::from(Error::SessionNotFound("s1".to_string()));
        assert_eq!(disconnect_failure_status(&err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn teardown_failure_is_not_a_not_found() {
        let err = anyhow::anyhow!("event task panicked");
        assert_eq!(disconnect_failure_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
