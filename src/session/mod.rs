pub mod clock;
pub mod config;
pub mod manager;
pub mod session;
pub mod stats;

pub use config::SessionConfig;
pub use manager::SessionManager;
pub use session::ConversationSession;
pub use stats::SessionStats;
