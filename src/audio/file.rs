use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use tracing::info;

/// A fully-loaded session audio asset.
///
/// Convenient for inspection and tests; the playback path streams with
/// `SegmentReader` instead of loading the whole recording.
pub struct AudioFile {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
    pub duration_seconds: f64,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open audio asset {:?}", path))?;
        let spec = reader.spec();

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Loaded audio asset {}: {:.1}s, {}Hz, {}ch",
            path.display(),
            duration_seconds,
            spec.sample_rate,
            spec.channels
        );

        Ok(Self {
            path: path.to_path_buf(),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
            duration_seconds,
        })
    }

    /// Number of sample frames (interleaved samples across all channels
    /// count as one frame).
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }
}
