use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether the session is still connected
    pub is_active: bool,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of completed turns flushed to the turn store
    pub turns_flushed: usize,
}
