// Batch audit of first-turn greetings.
//
// Every conversation is supposed to open with the exact scripted greeting.
// This tool reads each session's first turn from the turn store, runs it
// through a greeting classifier, and reports the percentage that matched.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use voicelog::audit::{AuditReport, ExactPhraseClassifier, GreetingClassifier};
use voicelog::{Config, TurnStore};

#[derive(Parser)]
#[command(name = "check_greeting")]
#[command(about = "Check whether each session's first turn is the exact greeting")]
struct Args {
    /// Config file path
    #[arg(long, default_value = "config/voicelog")]
    config: String,

    /// Override the turn store database path
    #[arg(long)]
    db: Option<String>,

    /// Just print the first turns without classifying them
    #[arg(long)]
    list_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let db_path = args.db.unwrap_or(cfg.storage.db_path);
    let db_path = shellexpand::tilde(&db_path).into_owned();
    let store = Arc::new(TurnStore::open(&db_path)?);

    let first_turns = store.all_first_turns()?;
    if first_turns.is_empty() {
        println!("No first turns found.");
        return Ok(());
    }

    let classifier = ExactPhraseClassifier::default();
    let mut report = AuditReport::default();

    for turn in &first_turns {
        if args.list_only {
            println!(
                "Session: {}\nFirst turn (LLM): {}\n{}",
                turn.session_id,
                turn.llm_response_text,
                "-".repeat(40)
            );
            continue;
        }

        let exact = classifier.is_exact(&turn.llm_response_text).await?;
        report.record(exact);
        println!(
            "Session: {}\nFirst turn (LLM): {}\nResult: {}\n{}",
            turn.session_id,
            turn.llm_response_text,
            if exact { "EXACT" } else { "NOT EXACT" },
            "-".repeat(40)
        );
    }

    if !args.list_only {
        println!("\nSummary:");
        println!("Total tested: {}", report.total);
        println!("Correct (EXACT): {}", report.exact);
        println!("Incorrect (NOT EXACT): {}", report.total - report.exact);
        println!("Percentage correct: {:.1}%", report.percent_exact());
    }

    Ok(())
}
