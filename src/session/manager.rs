//! Registry of live sessions.
//!
//! Per-session mutable state lives behind explicit map entries keyed by
//! session id: created on connect, removed on disconnect. Session teardown
//! is the only place state is reclaimed.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::config::SessionConfig;
use super::session::ConversationSession;
use super::stats::SessionStats;
use crate::error::Error;
use crate::turns::TurnStore;

pub struct SessionManager {
    store: Arc<TurnStore>,
    sessions: RwLock<HashMap<String, Arc<ConversationSession>>>,
}

impl SessionManager {
    pub fn new(store: Arc<TurnStore>) -> Self {
        Self {
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<TurnStore> {
        &self.store
    }

    /// Create and register a session. Fails with `SessionAlreadyConnected`
    /// if the id is already live.
    pub async fn connect(&self, config: SessionConfig) -> Result<Arc<ConversationSession>> {
        let session_id = config.session_id.clone();
        {
            let sessions = self.sessions.read().await;
            if sessions.contains_key(&session_id) {
                return Err(Error::SessionAlreadyConnected(session_id).into());
            }
        }

        let session = Arc::new(ConversationSession::connect(config, Arc::clone(&self.store)).await?);

        // Registration is decided under the write lock: a concurrent connect
        // with the same id may have won the slot while we were establishing
        // the NATS subscription, and overwriting it would orphan its event
        // task. The loser is torn down, never inserted.
        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&session_id) {
                drop(sessions);
                warn!(
                    "Session {} was registered concurrently; discarding the duplicate",
                    session_id
                );
                if let Err(e) = session.disconnect().await {
                    warn!("Failed to tear down duplicate session {}: {:#}", session_id, e);
                }
                return Err(Error::SessionAlreadyConnected(session_id).into());
            }
            sessions.insert(session_id.clone(), Arc::clone(&session));
            info!("Session {} registered ({} live)", session_id, sessions.len());
        }

        Ok(session)
    }

    /// Remove a session and run its teardown. The entry is gone afterwards
    /// whether or not the audio asset flush succeeded.
    pub async fn disconnect(&self, session_id: &str) -> Result<SessionStats> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_id)
        };

        match session {
            Some(session) => session.disconnect().await,
            None => Err(Error::SessionNotFound(session_id.to_owned()).into()),
        }
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<ConversationSession>> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    pub async fn live_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
