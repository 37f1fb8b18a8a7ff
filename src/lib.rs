pub mod audio;
pub mod audit;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod session;
pub mod turns;

pub use audio::{
    AudioCaptureBuffer, AudioFile, AudioFrame, CaptureTake, SegmentReader, TurnAudioLocator,
    TurnSegment,
};
pub use config::Config;
pub use error::Error;
pub use http::{create_router, AppState};
pub use nats::{AudioFrameMessage, EventClient, TranscriptMessage, TurnEndedMessage};
pub use session::{ConversationSession, SessionConfig, SessionManager, SessionStats};
pub use turns::{SessionSummary, TurnRecord, TurnStore, TurnTracker};
