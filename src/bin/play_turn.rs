// Play back the audio of one conversation turn.
//
// Looks up the turn's timestamps in the turn store, computes the padded
// offset window relative to the session's first turn, and streams that range
// of the session's WAV asset to the default audio output device (or to a
// WAV file with --output).
//
// Usage: play_turn <session_id> <turn_number> [--output segment.wav]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rodio::buffer::SamplesBuffer;
use tracing::info;
use voicelog::audio::{SegmentReader, TurnAudioLocator};
use voicelog::{Config, TurnStore};

#[derive(Parser)]
#[command(name = "play_turn")]
#[command(about = "Play audio for a turn in a conversation")]
struct Args {
    /// Session ID
    session_id: String,

    /// Turn number (1-based)
    turn_number: i64,

    /// Config file path
    #[arg(long, default_value = "config/voicelog")]
    config: String,

    /// Override the turn store database path
    #[arg(long)]
    db: Option<String>,

    /// Override the recordings directory
    #[arg(long)]
    recordings: Option<String>,

    /// Write the segment to a WAV file instead of playing it
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let db_path = args.db.unwrap_or(cfg.storage.db_path);
    let db_path = shellexpand::tilde(&db_path).into_owned();
    let recordings = args.recordings.unwrap_or(cfg.storage.recordings_dir);
    let recordings = shellexpand::tilde(&recordings).into_owned();

    let store = Arc::new(TurnStore::open(&db_path)?);
    let locator = TurnAudioLocator::new(store, recordings, cfg.playback.pad_secs);

    let segment = locator.locate(&args.session_id, args.turn_number)?;

    println!(
        "Playing session {} turn {} ({:.2}s - {:.2}s)",
        args.session_id, args.turn_number, segment.start_secs, segment.end_secs
    );

    let mut reader = SegmentReader::open(&segment, cfg.playback.chunk_ms)?;

    match args.output {
        Some(path) => write_segment(&mut reader, &path),
        None => play_segment(&mut reader),
    }
}

/// Stream chunks to the default output device in order.
fn play_segment(reader: &mut SegmentReader) -> Result<()> {
    let (_stream, handle) =
        rodio::OutputStream::try_default().context("Failed to open audio output device")?;
    let sink = rodio::Sink::try_new(&handle).context("Failed to create playback sink")?;

    let channels = reader.channels();
    let sample_rate = reader.sample_rate();

    while let Some(chunk) = reader.next_chunk()? {
        sink.append(SamplesBuffer::new(channels, sample_rate, chunk));
    }

    sink.sleep_until_end();
    info!("Playback complete");
    Ok(())
}

/// Write chunks to a WAV file instead of a device.
fn write_segment(reader: &mut SegmentReader, path: &PathBuf) -> Result<()> {
    let spec = hound::WavSpec {
        channels: reader.channels(),
        sample_rate: reader.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {:?}", path))?;

    while let Some(chunk) = reader.next_chunk()? {
        for sample in chunk {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;

    println!("Segment written to {}", path.display());
    Ok(())
}
