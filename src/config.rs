use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub storage: StorageConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite database holding the conversation_turn table
    pub db_path: String,
    /// Directory for per-session audio assets (conversation-{session_id}.wav)
    pub recordings_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Symmetric padding around a turn so playback audibly brackets the
    /// boundary instead of clipping it
    pub pad_secs: f64,
    /// Chunk duration when streaming a segment
    pub chunk_ms: u64,
}

impl Config {
    /// Load config from a file (optional), layered over built-in defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "voicelog")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 7860)?
            .set_default("nats.url", "nats://localhost:4222")?
            .set_default("storage.db_path", "data/turns.db")?
            .set_default("storage.recordings_dir", "data/recordings")?
            .set_default("playback.pad_secs", 1.0)?
            .set_default("playback.chunk_ms", 100)?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
