// Integration tests for the SQLite turn store.

use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;
use voicelog::{Error, TurnRecord, TurnStore};

fn record(session_id: &str, turn_number: i64, start: f64) -> TurnRecord {
    TurnRecord {
        session_id: session_id.to_string(),
        turn_number,
        turn_start_time: start,
        turn_end_time: start + 2.0,
        user_speech_text: format!("user text {turn_number}"),
        llm_response_text: format!("llm text {turn_number}"),
        voice_to_voice_response_time: 0.42,
        interrupted: turn_number % 2 == 0,
    }
}

#[test]
fn append_and_point_lookup() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TurnStore::open(dir.path().join("turns.db"))?;

    let rec = record("s1", 1, 100.0);
    store.append(&rec)?;

    let got = store.turn("s1", 1)?;
    assert_eq!(got, rec);

    Ok(())
}

#[test]
fn first_turn_picks_smallest_turn_number() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TurnStore::open(dir.path().join("turns.db"))?;

    // Insert out of order; first_turn must still find turn 1
    store.append(&record("s1", 3, 120.0))?;
    store.append(&record("s1", 1, 100.0))?;
    store.append(&record("s1", 2, 110.0))?;

    let first = store.first_turn("s1")?;
    assert_eq!(first.turn_number, 1);
    assert_eq!(first.turn_start_time, 100.0);

    Ok(())
}

#[test]
fn missing_session_and_turn_are_distinct_errors() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TurnStore::open(dir.path().join("turns.db"))?;
    store.append(&record("known", 1, 100.0))?;

    assert!(matches!(
        store.first_turn("unknown"),
        Err(Error::SessionNotFound(_))
    ));
    assert!(matches!(
        store.turn("known", 99),
        Err(Error::TurnNotFound { turn_number: 99, .. })
    ));

    Ok(())
}

#[test]
fn session_turns_ordered_by_turn_number() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TurnStore::open(dir.path().join("turns.db"))?;

    store.append(&record("s1", 2, 110.0))?;
    store.append(&record("s1", 1, 100.0))?;
    store.append(&record("other", 1, 50.0))?;

    let turns = store.session_turns("s1")?;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].turn_number, 1);
    assert_eq!(turns[1].turn_number, 2);

    Ok(())
}

#[test]
fn all_first_turns_ordered_by_session_id() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TurnStore::open(dir.path().join("turns.db"))?;

    store.append(&record("zebra", 1, 300.0))?;
    store.append(&record("alpha", 1, 100.0))?;
    store.append(&record("alpha", 2, 105.0))?;
    // A session whose rows start at turn 2 has no first-turn record
    store.append(&record("mid", 2, 200.0))?;

    let firsts = store.all_first_turns()?;
    let ids: Vec<&str> = firsts.iter().map(|t| t.session_id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "zebra"]);
    assert!(firsts.iter().all(|t| t.turn_number == 1));

    Ok(())
}

#[test]
fn session_summaries_ordered_by_first_start() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TurnStore::open(dir.path().join("turns.db"))?;

    store.append(&record("late", 1, 500.0))?;
    store.append(&record("early", 1, 100.0))?;
    store.append(&record("early", 2, 110.0))?;

    let sessions = store.sessions()?;
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].session_id, "early");
    assert_eq!(sessions[0].turn_count, 2);
    assert_eq!(sessions[0].first_turn_start, 100.0);
    assert_eq!(sessions[1].session_id, "late");
    assert_eq!(sessions[1].turn_count, 1);

    Ok(())
}

#[test]
fn voice_to_voice_times_in_turn_order() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TurnStore::open(dir.path().join("turns.db"))?;

    let mut rec = record("s1", 2, 110.0);
    rec.voice_to_voice_response_time = 0.8;
    store.append(&rec)?;
    let mut rec = record("s1", 1, 100.0);
    rec.voice_to_voice_response_time = 0.3;
    store.append(&rec)?;

    assert_eq!(store.voice_to_voice_times("s1")?, vec![0.3, 0.8]);

    Ok(())
}

#[test]
fn duplicate_turn_key_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TurnStore::open(dir.path().join("turns.db"))?;

    store.append(&record("s1", 1, 100.0))?;
    assert!(store.append(&record("s1", 1, 200.0)).is_err());

    // The original row is untouched
    assert_eq!(store.turn("s1", 1)?.turn_start_time, 100.0);

    Ok(())
}

#[test]
fn concurrent_sessions_append_without_interference() -> Result<()> {
    let dir = TempDir::new()?;
    let store = Arc::new(TurnStore::open(dir.path().join("turns.db"))?);

    let mut handles = Vec::new();
    for session in 0..4 {
        let store = Arc::clone(&store);
        handles.push(std::thread::spawn(move || -> Result<()> {
            let session_id = format!("session-{session}");
            for n in 1..=10 {
                store.append(&record(&session_id, n, n as f64))?;
            }
            Ok(())
        }));
    }
    for handle in handles {
        handle.join().expect("thread should not panic")?;
    }

    for session in 0..4 {
        let turns = store.session_turns(&format!("session-{session}"))?;
        assert_eq!(turns.len(), 10);
        for (i, turn) in turns.iter().enumerate() {
            assert_eq!(turn.turn_number, i as i64 + 1);
            assert_eq!(turn.user_speech_text, format!("user text {}", i + 1));
        }
    }

    Ok(())
}
