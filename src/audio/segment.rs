//! Locating and streaming the audio of a single turn.
//!
//! The offset arithmetic is a pure function of stored timestamps; file
//! streaming is a thin adapter over the computed range in sample frames.
//! Offsets are relative to the asset's own start, which is aligned with the
//! first stored turn's start time rather than the raw connection-open
//! timestamp. Any drift between the two is accepted as bounded imprecision.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use hound::WavReader;
use tracing::info;

use super::capture::asset_path;
use crate::error::{Error, Result};
use crate::turns::TurnStore;

/// Default symmetric padding around a turn. We are not aiming for perfect
/// alignment; we just want playback to audibly bracket the turn boundary.
pub const DEFAULT_PAD_SECS: f64 = 1.0;

/// Default chunk duration when streaming a segment.
pub const DEFAULT_CHUNK_MS: u64 = 100;

/// Compute a turn's playback window relative to the first stored turn.
///
/// `start = max(0, ts - t0 - pad)`, `end = te - t0 + pad`. The start clamps
/// at zero; a non-positive span after clamping is rejected as `EmptyRange`
/// rather than played as zero frames.
pub fn turn_offsets(t0: f64, ts: f64, te: f64, pad: f64) -> Result<(f64, f64)> {
    let start = (ts - t0 - pad).max(0.0);
    let end = te - t0 + pad;
    if end <= start {
        return Err(Error::EmptyRange { start, end });
    }
    Ok((start, end))
}

/// A located turn: which asset to read and what time window within it.
#[derive(Debug, Clone)]
pub struct TurnSegment {
    pub path: PathBuf,
    pub start_secs: f64,
    pub end_secs: f64,
}

/// Resolves (session id, turn number) to a playable byte range using stored
/// turn timestamps and the per-session audio asset.
pub struct TurnAudioLocator {
    store: Arc<TurnStore>,
    recordings_dir: PathBuf,
    pad_secs: f64,
}

impl TurnAudioLocator {
    pub fn new(store: Arc<TurnStore>, recordings_dir: impl Into<PathBuf>, pad_secs: f64) -> Self {
        Self {
            store,
            recordings_dir: recordings_dir.into(),
            pad_secs,
        }
    }

    /// Locate the audio window for one turn.
    ///
    /// Fails with `SessionNotFound` if the session has no stored turns,
    /// `TurnNotFound` if the requested turn is absent, `AssetNotFound` if
    /// the session's recording is missing, and `EmptyRange` on degenerate
    /// timestamps.
    pub fn locate(&self, session_id: &str, turn_number: i64) -> Result<TurnSegment> {
        let first = self.store.first_turn(session_id)?;
        let turn = self.store.turn(session_id, turn_number)?;

        let (start_secs, end_secs) = turn_offsets(
            first.turn_start_time,
            turn.turn_start_time,
            turn.turn_end_time,
            self.pad_secs,
        )?;

        let path = asset_path(&self.recordings_dir, session_id);
        if !path.exists() {
            return Err(Error::AssetNotFound(path));
        }

        info!(
            "Located session {} turn {}: {:.2}s - {:.2}s in {}",
            session_id,
            turn_number,
            start_secs,
            end_secs,
            path.display()
        );

        Ok(TurnSegment {
            path,
            start_secs,
            end_secs,
        })
    }
}

/// Streams a segment's sample frames in fixed-duration chunks, clamped to
/// the asset's real length, without loading the remainder into memory.
pub struct SegmentReader {
    reader: WavReader<BufReader<File>>,
    sample_rate: u32,
    channels: u16,
    chunk_frames: u32,
    frames_left: u32,
}

impl SegmentReader {
    pub fn open(segment: &TurnSegment, chunk_ms: u64) -> Result<Self> {
        if !segment.path.exists() {
            return Err(Error::AssetNotFound(segment.path.clone()));
        }
        let mut reader = WavReader::open(&segment.path)?;
        let spec = reader.spec();
        let total_frames = reader.duration();

        let start_frame =
            ((segment.start_secs * spec.sample_rate as f64) as u32).min(total_frames);
        let end_frame = ((segment.end_secs * spec.sample_rate as f64) as u32).min(total_frames);

        reader.seek(start_frame)?;

        let chunk_frames = ((chunk_ms as f64 / 1000.0) * spec.sample_rate as f64) as u32;

        Ok(Self {
            reader,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            chunk_frames: chunk_frames.max(1),
            frames_left: end_frame.saturating_sub(start_frame),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Next chunk of interleaved samples, or `None` once the computed end
    /// frame is reached or the source is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<i16>>> {
        if self.frames_left == 0 {
            return Ok(None);
        }
        let frames_to_read = self.frames_left.min(self.chunk_frames);
        let wanted = frames_to_read as usize * self.channels as usize;

        let mut chunk = Vec::with_capacity(wanted);
        for sample in self.reader.samples::<i16>().take(wanted) {
            chunk.push(sample?);
        }
        if chunk.is_empty() {
            // Source exhausted before the computed end frame
            self.frames_left = 0;
            return Ok(None);
        }
        let frames_read = (chunk.len() / self.channels as usize) as u32;
        self.frames_left -= frames_read.min(self.frames_left);
        Ok(Some(chunk))
    }
}
