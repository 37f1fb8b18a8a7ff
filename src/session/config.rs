use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::clock;

/// Configuration for one conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (start time + random suffix)
    pub session_id: String,

    /// NATS server URL for pipeline event ingest
    pub nats_url: String,

    /// Directory where the session's audio asset is persisted
    pub recordings_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: clock::new_session_id(),
            nats_url: "nats://localhost:4222".to_string(),
            recordings_dir: PathBuf::from("data/recordings"),
        }
    }
}
