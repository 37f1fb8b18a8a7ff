pub mod client;
pub mod messages;

pub use client::EventClient;
pub use messages::{
    AudioFrameMessage, SpeakingMarkerMessage, TranscriptMessage, TurnEndedMessage,
};
