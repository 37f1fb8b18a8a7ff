// Integration tests for the turn accumulator.
//
// The central property: a turn completes when both the boundary timing and
// the final response text have arrived, in either order, and the stored
// record is identical either way.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;
use voicelog::{TurnStore, TurnTracker};

fn open_store(dir: &TempDir) -> Result<Arc<TurnStore>> {
    Ok(Arc::new(TurnStore::open(dir.path().join("turns.db"))?))
}

fn tracker(session_id: &str, store: &Arc<TurnStore>) -> TurnTracker {
    TurnTracker::new(
        session_id.to_string(),
        Arc::clone(store),
        Arc::new(AtomicUsize::new(0)),
    )
}

#[test]
fn close_then_response_stores_one_row() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let mut t = tracker("s1", &store);

    t.close_turn(1, 100.0, 102.0, false);
    t.set_response_text("hi");

    let row = store.turn("s1", 1)?;
    assert_eq!(row.session_id, "s1");
    assert_eq!(row.turn_number, 1);
    assert_eq!(row.turn_start_time, 100.0);
    assert_eq!(row.turn_end_time, 102.0);
    assert_eq!(row.llm_response_text, "hi");
    assert!(!row.interrupted);

    Ok(())
}

#[test]
fn completion_is_order_independent() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;

    // Session A: timing first, then response
    let mut a = tracker("order-a", &store);
    a.append_user_text("hello");
    a.close_turn(1, 10.0, 12.5, true);
    a.set_response_text("hi there");

    // Session B: response first, then timing
    let mut b = tracker("order-b", &store);
    b.append_user_text("hello");
    b.set_response_text("hi there");
    b.close_turn(1, 10.0, 12.5, true);

    let row_a = store.turn("order-a", 1)?;
    let row_b = store.turn("order-b", 1)?;

    assert_eq!(row_a.turn_start_time, row_b.turn_start_time);
    assert_eq!(row_a.turn_end_time, row_b.turn_end_time);
    assert_eq!(row_a.user_speech_text, row_b.user_speech_text);
    assert_eq!(row_a.llm_response_text, row_b.llm_response_text);
    assert_eq!(row_a.interrupted, row_b.interrupted);

    Ok(())
}

#[test]
fn user_fragments_accumulate_in_call_order() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let mut t = tracker("frag", &store);

    t.append_user_text("what is");
    t.append_user_text("the weather");
    t.append_user_text("today");
    t.close_turn(1, 0.0, 5.0, false);
    t.set_response_text("sunny");

    let row = store.turn("frag", 1)?;
    assert_eq!(row.user_speech_text, " what is the weather today");

    Ok(())
}

#[test]
fn appending_user_text_never_completes_a_turn() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let mut t = tracker("no-flush", &store);

    t.close_turn(1, 0.0, 1.0, false);
    t.append_user_text("still talking");
    t.append_user_text("and talking");

    assert!(store.session_turns("no-flush")?.is_empty());

    Ok(())
}

#[test]
fn duplicate_boundary_event_overwrites_timing() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let mut t = tracker("dup", &store);

    t.close_turn(1, 10.0, 11.0, false);
    t.close_turn(1, 10.5, 12.0, true);
    t.set_response_text("ok");

    let row = store.turn("dup", 1)?;
    assert_eq!(row.turn_start_time, 10.5);
    assert_eq!(row.turn_end_time, 12.0);
    assert!(row.interrupted);

    Ok(())
}

#[test]
fn repeated_response_text_last_write_wins() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let mut t = tracker("rewrite", &store);

    t.set_response_text("first draft");
    t.set_response_text("final answer");
    t.close_turn(1, 0.0, 2.0, false);

    let row = store.turn("rewrite", 1)?;
    assert_eq!(row.llm_response_text, "final answer");

    Ok(())
}

#[test]
fn silent_turn_is_dropped_not_resurrected() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let mut t = tracker("silent", &store);

    // Turn 1 closes but the agent never produced a response
    t.append_user_text("anyone there?");
    t.close_turn(1, 0.0, 3.0, false);

    // Turn 2's boundary must not retroactively complete turn 1
    t.close_turn(2, 3.0, 6.0, false);
    t.set_response_text("yes, hello");

    assert!(matches!(
        store.turn("silent", 1),
        Err(voicelog::Error::TurnNotFound { .. })
    ));
    let row = store.turn("silent", 2)?;
    assert_eq!(row.turn_number, 2);
    assert_eq!(row.llm_response_text, "yes, hello");

    Ok(())
}

#[test]
fn sequential_turns_keep_their_numbers() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let mut t = tracker("seq", &store);

    for n in 1..=3 {
        t.append_user_text(&format!("question {n}"));
        t.close_turn(n, n as f64 * 10.0, n as f64 * 10.0 + 5.0, false);
        t.set_response_text(&format!("answer {n}"));
    }

    let turns = store.session_turns("seq")?;
    assert_eq!(turns.len(), 3);
    for (i, turn) in turns.iter().enumerate() {
        let n = i as i64 + 1;
        assert_eq!(turn.turn_number, n);
        assert_eq!(turn.user_speech_text, format!(" question {n}"));
        assert_eq!(turn.llm_response_text, format!("answer {n}"));
    }
    assert_eq!(t.turns_flushed(), 3);

    Ok(())
}

#[test]
fn tracker_state_resets_between_turns() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let mut t = tracker("reset", &store);

    t.append_user_text("first question");
    t.close_turn(1, 0.0, 2.0, false);
    t.set_response_text("first answer");

    // Nothing from turn 1 bleeds into turn 2
    t.close_turn(2, 2.0, 4.0, false);
    t.set_response_text("second answer");

    let row = store.turn("reset", 2)?;
    assert_eq!(row.user_speech_text, "");
    assert_eq!(row.llm_response_text, "second answer");

    Ok(())
}

#[test]
fn rejected_flush_resets_the_tracker_and_keeps_the_session_alive() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let mut t = tracker("redeliver", &store);

    t.append_user_text("hello");
    t.close_turn(1, 10.0, 12.0, false);
    t.set_response_text("hi");
    assert_eq!(t.turns_flushed(), 1);

    // The boundary detector re-delivers turn 1 with different timing. The
    // primary key rejects the second append; the failure is logged, the
    // tracker resets, and the stored row keeps its original values.
    t.append_user_text("again");
    t.close_turn(1, 50.0, 55.0, true);
    t.set_response_text("duplicate");
    assert_eq!(t.turns_flushed(), 1);

    let row = store.turn("redeliver", 1)?;
    assert_eq!(row.turn_start_time, 10.0);
    assert_eq!(row.turn_end_time, 12.0);
    assert_eq!(row.user_speech_text, " hello");
    assert_eq!(row.llm_response_text, "hi");
    assert!(!row.interrupted);

    // The next turn is unaffected by the rejected flush
    t.append_user_text("moving on");
    t.close_turn(2, 60.0, 62.0, false);
    t.set_response_text("sure");
    assert_eq!(t.turns_flushed(), 2);

    let row = store.turn("redeliver", 2)?;
    assert_eq!(row.user_speech_text, " moving on");
    assert_eq!(row.llm_response_text, "sure");

    Ok(())
}

#[test]
fn latency_marks_produce_nonnegative_v2v() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let mut t = tracker("v2v", &store);

    t.mark_user_stopped();
    t.mark_bot_started();
    t.close_turn(1, 0.0, 1.0, false);
    t.set_response_text("quick");

    let row = store.turn("v2v", 1)?;
    assert!(row.voice_to_voice_response_time >= 0.0);
    assert!(row.voice_to_voice_response_time < 1.0);

    Ok(())
}

#[test]
fn v2v_without_user_marker_measures_from_session_start() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    // No mark_user_stopped before the bot speaks: the reference is the
    // tracker's creation time, so the latency is still well-defined.
    let mut t = tracker("v2v-start", &store);

    t.mark_bot_started();
    t.close_turn(1, 0.0, 1.0, false);
    t.set_response_text("greeting");

    let row = store.turn("v2v-start", 1)?;
    assert!(row.voice_to_voice_response_time >= 0.0);

    Ok(())
}
