// Inspect recorded conversations in the turn store.
//
// `list-sessions` prints every session with its first turn time and turn
// count, optionally with P50/P95 voice-to-voice response times.
// `show-session` dumps all turns of one session.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use voicelog::audit::percentile;
use voicelog::{Config, TurnStore};

#[derive(Parser)]
#[command(name = "analyze")]
#[command(about = "Analyze conversation turns in the turn store")]
struct Args {
    /// Config file path
    #[arg(long, default_value = "config/voicelog")]
    config: String,

    /// Override the turn store database path
    #[arg(long)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all sessions with first turn time and number of turns
    ListSessions {
        /// Show P50 and P95 voice-to-voice response time per session
        #[arg(long)]
        show_percentiles: bool,
    },
    /// Show all turns for a session
    ShowSession {
        /// Session ID to display
        session_id: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let db_path = args.db.unwrap_or(cfg.storage.db_path);
    let db_path = shellexpand::tilde(&db_path).into_owned();
    let store = Arc::new(TurnStore::open(&db_path)?);

    match args.command {
        Command::ListSessions { show_percentiles } => list_sessions(&store, show_percentiles),
        Command::ShowSession { session_id } => show_session(&store, &session_id),
    }
}

fn format_epoch(secs: f64) -> String {
    match Local.timestamp_micros((secs * 1_000_000.0) as i64) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        _ => format!("{:.3}", secs),
    }
}

fn list_sessions(store: &TurnStore, show_percentiles: bool) -> Result<()> {
    let sessions = store.sessions()?;
    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    if show_percentiles {
        println!(
            "{:<25} {:<25} {:<10} {:<12} {:<12}",
            "Session ID", "First Turn Start", "Num Turns", "P50 V2V (s)", "P95 V2V (s)"
        );
        println!("{}", "-".repeat(95));
    } else {
        println!(
            "{:<25} {:<25} {:<10}",
            "Session ID", "First Turn Start", "Num Turns"
        );
        println!("{}", "-".repeat(65));
    }

    for session in sessions {
        let first_turn = format_epoch(session.first_turn_start);
        if show_percentiles {
            let mut times = store.voice_to_voice_times(&session.session_id)?;
            times.sort_by(|a, b| a.total_cmp(b));
            let p50 = percentile(&times, 0.5);
            let p95 = percentile(&times, 0.95);
            let fmt = |p: Option<f64>| p.map_or("-".to_string(), |v| format!("{:.3}", v));
            println!(
                "{:<25} {:<25} {:<10} {:<12} {:<12}",
                session.session_id,
                first_turn,
                session.turn_count,
                fmt(p50),
                fmt(p95)
            );
        } else {
            println!(
                "{:<25} {:<25} {:<10}",
                session.session_id, first_turn, session.turn_count
            );
        }
    }

    Ok(())
}

fn show_session(store: &TurnStore, session_id: &str) -> Result<()> {
    let turns = store.session_turns(session_id)?;
    if turns.is_empty() {
        println!("No turns found for session: {}", session_id);
        return Ok(());
    }

    println!("Session: {}", session_id);
    println!("{}", "-".repeat(80));
    for turn in turns {
        println!("Turn {}", turn.turn_number);
        println!("  Start: {}", format_epoch(turn.turn_start_time));
        println!("  End:   {}", format_epoch(turn.turn_end_time));
        println!("  Interrupted: {}", turn.interrupted);
        println!(
            "  Voice-to-voice response time: {:.3} s",
            turn.voice_to_voice_response_time
        );
        println!("  User said: {}", turn.user_speech_text);
        println!("  LLM said:  {}", turn.llm_response_text);
        println!("{}", "-".repeat(80));
    }

    Ok(())
}
