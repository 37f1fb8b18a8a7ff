//! Per-session turn accumulator.
//!
//! Two facts complete a turn: the boundary event carrying timing and the
//! final LLM response text. They arrive asynchronously and in either order,
//! so the tracker holds whichever arrives first and flushes the record to
//! the store the moment both are present. After a flush the tracker resets
//! to an empty turn; only the voice-to-voice latency reference survives,
//! because that is a running value independent of turn boundaries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use super::store::{TurnRecord, TurnStore};
use crate::session::clock;

#[derive(Debug, Clone, Copy)]
struct TurnTiming {
    turn_number: i64,
    start_time: f64,
    end_time: f64,
    interrupted: bool,
}

pub struct TurnTracker {
    session_id: String,
    store: Arc<TurnStore>,
    timing: Option<TurnTiming>,
    user_speech_text: String,
    llm_response_text: Option<String>,
    voice_to_voice: f64,
    /// When the user last stopped speaking (or the session started)
    latency_mark: f64,
    turns_flushed: Arc<AtomicUsize>,
}

impl TurnTracker {
    /// The latency reference starts at session start, so the first turn's
    /// voice-to-voice time is measured from there if the user never speaks.
    pub fn new(session_id: String, store: Arc<TurnStore>, turns_flushed: Arc<AtomicUsize>) -> Self {
        Self {
            session_id,
            store,
            timing: None,
            user_speech_text: String::new(),
            llm_response_text: None,
            voice_to_voice: 0.0,
            latency_mark: clock::now_secs(),
            turns_flushed,
        }
    }

    /// Accumulate one user transcript fragment. The recognizer may emit
    /// several per turn; they are joined in arrival order, each preceded
    /// by a separator. Never completes a turn by itself.
    pub fn append_user_text(&mut self, fragment: &str) {
        self.user_speech_text.push(' ');
        self.user_speech_text.push_str(fragment);
    }

    /// Record the final response text. Last write wins if the generator
    /// re-emits before completion. Flushes if timing is already known.
    pub fn set_response_text(&mut self, text: &str) {
        self.llm_response_text = Some(text.to_owned());
        if self.timing.is_some() {
            self.flush();
        }
    }

    /// Record turn boundary timing. A duplicate boundary event overwrites
    /// the earlier timing. Flushes if the response text is already known.
    pub fn close_turn(&mut self, turn_number: i64, start_time: f64, end_time: f64, interrupted: bool) {
        self.timing = Some(TurnTiming {
            turn_number,
            start_time,
            end_time,
            interrupted,
        });
        if self.llm_response_text.is_some() {
            self.flush();
        }
    }

    /// The user stopped speaking; reset the latency reference.
    pub fn mark_user_stopped(&mut self) {
        self.latency_mark = clock::now_secs();
    }

    /// The bot started speaking; finalize the voice-to-voice latency.
    pub fn mark_bot_started(&mut self) {
        self.voice_to_voice = clock::now_secs() - self.latency_mark;
    }

    /// Number of turns flushed to the store so far.
    pub fn turns_flushed(&self) -> usize {
        self.turns_flushed.load(Ordering::SeqCst)
    }

    /// Session teardown. An in-flight turn that never saw both completion
    /// facts is dropped here, not persisted; known gap, logged only.
    pub fn finish(self) {
        if self.timing.is_some() || self.llm_response_text.is_some() || !self.user_speech_text.is_empty() {
            debug!(
                "Session {} ended with an incomplete turn; dropping it (user text: {:?})",
                self.session_id, self.user_speech_text
            );
        }
    }

    /// Write the completed turn and reset for the next one. A storage
    /// failure is logged with full context and the live conversation
    /// continues; there is no retry and no partial-turn recovery.
    fn flush(&mut self) {
        let timing = match self.timing.take() {
            Some(t) => t,
            None => return,
        };
        let record = TurnRecord {
            session_id: self.session_id.clone(),
            turn_number: timing.turn_number,
            turn_start_time: timing.start_time,
            turn_end_time: timing.end_time,
            user_speech_text: std::mem::take(&mut self.user_speech_text),
            llm_response_text: self.llm_response_text.take().unwrap_or_default(),
            voice_to_voice_response_time: self.voice_to_voice,
            interrupted: timing.interrupted,
        };
        self.voice_to_voice = 0.0;

        info!(
            "Saving turn {} for session {} - user: {:?}, llm: {:?}, v2v: {:.3}s, interrupted: {}",
            record.turn_number,
            record.session_id,
            record.user_speech_text,
            record.llm_response_text,
            record.voice_to_voice_response_time,
            record.interrupted
        );

        if let Err(e) = self.store.append(&record) {
            error!(
                "Failed to persist turn {} for session {}: {}",
                record.turn_number, record.session_id, e
            );
        } else {
            self.turns_flushed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
