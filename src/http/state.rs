use std::sync::Arc;

use crate::config::Config;
use crate::session::SessionManager;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(manager: Arc<SessionManager>, config: Arc<Config>) -> Self {
        Self { manager, config }
    }
}
