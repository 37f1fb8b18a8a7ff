use anyhow::{Context, Result};
use async_nats::Client;
use tracing::info;

use super::messages::SUBJECT_ALL;

/// Thin wrapper over the NATS connection for one session's event ingest.
///
/// All pipeline collaborators (speech recognizer, response generator,
/// turn-boundary detector, transport) publish to the shared `voice.*`
/// subjects; sessions filter by the `session_id` field in each payload.
pub struct EventClient {
    client: Client,
    session_id: String,
}

impl EventClient {
    pub async fn connect(url: &str, session_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS for session {}", session_id);

        Ok(Self { client, session_id })
    }

    /// Subscribe to every pipeline event subject. Dispatch by subject and
    /// payload session id happens in the session event loop.
    pub async fn subscribe_events(&self) -> Result<async_nats::Subscriber> {
        info!("Subscribing to pipeline events on {}", SUBJECT_ALL);

        let subscriber = self
            .client
            .subscribe(SUBJECT_ALL)
            .await
            .context("Failed to subscribe to pipeline events")?;

        Ok(subscriber)
    }

    pub async fn close(self) -> Result<()> {
        info!("Closing NATS connection for session {}", self.session_id);
        // async-nats handles cleanup on drop
        Ok(())
    }
}
