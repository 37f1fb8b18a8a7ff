pub mod capture;
pub mod file;
pub mod segment;

pub use capture::{asset_path, write_take, AudioCaptureBuffer, AudioFrame, CaptureTake};
pub use file::AudioFile;
pub use segment::{
    turn_offsets, SegmentReader, TurnAudioLocator, TurnSegment, DEFAULT_CHUNK_MS, DEFAULT_PAD_SECS,
};
