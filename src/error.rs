use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy for turn queries and audio playback.
///
/// Live-path persistence failures are logged and swallowed by the session
/// flow; these errors are the ones surfaced to callers of the turn store
/// and the audio locator (the operator tools exit non-zero on them).
#[derive(Debug, Error)]
pub enum Error {
    #[error("no turns found for session {0}")]
    SessionNotFound(String),

    #[error("session {0} is already connected")]
    SessionAlreadyConnected(String),

    #[error("turn {turn_number} not found for session {session_id}")]
    TurnNotFound {
        session_id: String,
        turn_number: i64,
    },

    #[error("audio asset not found: {0}")]
    AssetNotFound(PathBuf),

    #[error("empty playback range ({start:.2}s - {end:.2}s)")]
    EmptyRange { start: f64, end: f64 },

    #[error("turn store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("audio asset error: {0}")]
    Asset(#[from] hound::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
