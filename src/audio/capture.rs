//! Per-session audio capture buffer.
//!
//! Accumulates raw PCM frames from connection-open to connection-close and
//! hands the whole take back on `stop` so it can be persisted as one
//! contiguous WAV asset per session. Sample rate and channel count are fixed
//! by the first frame; frames that disagree are dropped with a warning
//! rather than silently mixed in.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

/// Raw audio samples (16-bit PCM, interleaved).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// The finalized recording for one session.
#[derive(Debug)]
pub struct CaptureTake {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl CaptureTake {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

pub struct AudioCaptureBuffer {
    session_id: String,
    recording: bool,
    format: Option<(u32, u16)>,
    samples: Vec<i16>,
}

impl AudioCaptureBuffer {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            recording: false,
            format: None,
            samples: Vec::new(),
        }
    }

    /// Begin accumulating. Called at connection open.
    pub fn start(&mut self) {
        if self.recording {
            warn!("Capture already started for session {}", self.session_id);
            return;
        }
        info!("Starting audio capture for session {}", self.session_id);
        self.recording = true;
    }

    /// Append one frame. The first frame fixes the asset's format.
    pub fn push(&mut self, frame: &AudioFrame) {
        if !self.recording {
            return;
        }
        match self.format {
            None => {
                self.format = Some((frame.sample_rate, frame.channels));
            }
            Some((rate, channels)) => {
                if rate != frame.sample_rate || channels != frame.channels {
                    warn!(
                        "Dropping mismatched frame for session {}: got {}Hz/{}ch, capture is {}Hz/{}ch",
                        self.session_id, frame.sample_rate, frame.channels, rate, channels
                    );
                    return;
                }
            }
        }
        self.samples.extend_from_slice(&frame.samples);
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Finalize accumulation. Returns `None` if no audio ever arrived.
    /// Called at connection close; capture does not resume afterwards.
    pub fn stop(&mut self) -> Option<CaptureTake> {
        if !self.recording {
            warn!("Capture not active for session {}", self.session_id);
        }
        self.recording = false;
        let (sample_rate, channels) = self.format?;
        if self.samples.is_empty() {
            return None;
        }
        let take = CaptureTake {
            samples: std::mem::take(&mut self.samples),
            sample_rate,
            channels,
        };
        info!(
            "Audio capture stopped for session {}: {:.1}s at {}Hz/{}ch",
            self.session_id,
            take.duration_seconds(),
            take.sample_rate,
            take.channels
        );
        Some(take)
    }
}

/// Deterministic asset path for a session's recording.
pub fn asset_path(recordings_dir: impl AsRef<Path>, session_id: &str) -> PathBuf {
    recordings_dir
        .as_ref()
        .join(format!("conversation-{session_id}.wav"))
}

/// Persist a finished take as one playable 16-bit PCM WAV file.
///
/// An I/O failure here loses the session's audio for this run; callers log
/// it and move on, there is no retry.
pub fn write_take(path: impl AsRef<Path>, take: &CaptureTake) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create recordings dir {:?}", parent))?;
    }

    let spec = hound::WavSpec {
        channels: take.channels,
        sample_rate: take.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    info!(
        "Saving {} samples of audio to {}",
        take.samples.len(),
        path.display()
    );

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file {:?}", path))?;
    for &sample in &take.samples {
        writer
            .write_sample(sample)
            .context("Failed to write sample to WAV")?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;

    Ok(())
}
