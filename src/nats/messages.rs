use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Subject carrying transcript fragments from the speech recognizer and
/// the response generator's final text.
pub const SUBJECT_TRANSCRIPT: &str = "voice.transcript";
/// Subject carrying speaking boundary markers used for latency tracking.
pub const SUBJECT_MARKER: &str = "voice.marker";
/// Subject carrying the turn-boundary detector's end-of-turn events.
pub const SUBJECT_TURN_ENDED: &str = "voice.turn.ended";
/// Subject carrying raw PCM frames from the transport.
pub const SUBJECT_AUDIO_FRAME: &str = "voice.audio.frame";
/// Wildcard covering all pipeline event subjects.
pub const SUBJECT_ALL: &str = "voice.>";

/// Transcript fragment attributed to a role. Only final fragments feed the
/// turn tracker; partials are display-only upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    /// "user" or "assistant"
    pub role: String,
    pub text: String,
    #[serde(rename = "final", default)]
    pub final_text: bool,
    pub timestamp: String, // RFC3339
}

/// Speaking boundary marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakingMarkerMessage {
    pub session_id: String,
    /// "user_stopped" or "bot_started"
    pub marker: String,
    pub timestamp: String,
}

pub const MARKER_USER_STOPPED: &str = "user_stopped";
pub const MARKER_BOT_STARTED: &str = "bot_started";

/// End-of-turn event. The detector reports a duration, not a start
/// timestamp; the ingest derives start = now - duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnEndedMessage {
    pub session_id: String,
    pub turn_number: i64,
    pub duration_secs: f64,
    pub interrupted: bool,
}

/// Audio frame message: base64-encoded little-endian 16-bit PCM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String,
    pub sample_rate: u32,
    pub channels: u16,
    #[serde(rename = "final")]
    pub final_frame: bool,
    pub timestamp: String,
}

impl AudioFrameMessage {
    /// Decode the payload into interleaved i16 samples.
    pub fn samples(&self) -> Result<Vec<i16>> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.pcm)
            .context("Failed to decode base64 PCM payload")?;
        Ok(bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_round_trips_through_base64() {
        let samples: Vec<i16> = vec![0, 1, -1, i16::MAX, i16::MIN];
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let msg = AudioFrameMessage {
            session_id: "s1".into(),
            sequence: 0,
            pcm: base64::engine::general_purpose::STANDARD.encode(&bytes),
            sample_rate: 16000,
            channels: 1,
            final_frame: false,
            timestamp: String::new(),
        };
        assert_eq!(msg.samples().unwrap(), samples);
    }
}
