//! Durable, append-only store for completed conversation turns.
//!
//! One SQLite database holds a single `conversation_turn` table keyed by
//! `(session_id, turn_number)`. Appends are serialized through an internal
//! `Mutex<Connection>`; rows are never updated or deleted by this subsystem.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// One completed turn, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub session_id: String,
    pub turn_number: i64,
    /// Wall-clock seconds, same epoch as `session::clock::now_secs`
    pub turn_start_time: f64,
    pub turn_end_time: f64,
    /// Accumulated user transcript fragments, separator-joined in arrival order
    pub user_speech_text: String,
    /// Final LLM response text for the turn
    pub llm_response_text: String,
    /// Seconds between the user stopping speech and the bot starting speech
    pub voice_to_voice_response_time: f64,
    pub interrupted: bool,
}

/// Per-session summary used by the batch analyzer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub first_turn_start: f64,
    pub turn_count: i64,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS conversation_turn (
    session_id TEXT NOT NULL,
    turn_number INTEGER NOT NULL,
    turn_start_time REAL NOT NULL,
    turn_end_time REAL NOT NULL,
    user_speech_text TEXT NOT NULL,
    llm_response_text TEXT NOT NULL,
    voice_to_voice_response_time REAL NOT NULL,
    interrupted INTEGER NOT NULL,
    PRIMARY KEY (session_id, turn_number)
)";

/// SQLite-backed turn store.
///
/// Thread-safe via an internal `Mutex<Connection>`; concurrent sessions
/// contend only for the duration of one bounded local write.
pub struct TurnStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl TurnStore {
    /// Open (or create) the database and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute(SCHEMA, [])?;
        info!("Turn store open at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one completed turn. Row-level atomicity is all we need; the
    /// primary key rejects duplicate (session, turn) pairs.
    pub fn append(&self, record: &TurnRecord) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO conversation_turn (session_id, turn_number, turn_start_time, \
             turn_end_time, user_speech_text, llm_response_text, \
             voice_to_voice_response_time, interrupted) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.session_id,
                record.turn_number,
                record.turn_start_time,
                record.turn_end_time,
                record.user_speech_text,
                record.llm_response_text,
                record.voice_to_voice_response_time,
                record.interrupted,
            ],
        )?;
        Ok(())
    }

    /// The turn with the smallest turn number for a session. Its start time
    /// anchors all audio offset arithmetic for the session.
    pub fn first_turn(&self, session_id: &str) -> Result<TurnRecord> {
        let conn = self.lock();
        conn.query_row(
            &format!(
                "{SELECT} WHERE session_id = ?1 ORDER BY turn_number ASC LIMIT 1",
                SELECT = SELECT_TURN
            ),
            params![session_id],
            row_to_record,
        )
        .optional()?
        .ok_or_else(|| Error::SessionNotFound(session_id.to_owned()))
    }

    /// Point lookup of one turn.
    pub fn turn(&self, session_id: &str, turn_number: i64) -> Result<TurnRecord> {
        let conn = self.lock();
        conn.query_row(
            &format!(
                "{SELECT} WHERE session_id = ?1 AND turn_number = ?2",
                SELECT = SELECT_TURN
            ),
            params![session_id, turn_number],
            row_to_record,
        )
        .optional()?
        .ok_or_else(|| Error::TurnNotFound {
            session_id: session_id.to_owned(),
            turn_number,
        })
    }

    /// All turns for a session, ordered by turn number.
    pub fn session_turns(&self, session_id: &str) -> Result<Vec<TurnRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "{SELECT} WHERE session_id = ?1 ORDER BY turn_number ASC",
            SELECT = SELECT_TURN
        ))?;
        let rows = stmt.query_map(params![session_id], row_to_record)?;
        collect(rows)
    }

    /// Every session's turn number 1, ordered by session id. Batch-audit
    /// input: the first turn should hold the agent's scripted greeting.
    pub fn all_first_turns(&self) -> Result<Vec<TurnRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "{SELECT} WHERE turn_number = 1 ORDER BY session_id ASC",
            SELECT = SELECT_TURN
        ))?;
        let rows = stmt.query_map([], row_to_record)?;
        collect(rows)
    }

    /// Session summaries ordered by first turn start time.
    pub fn sessions(&self) -> Result<Vec<SessionSummary>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT session_id, MIN(turn_start_time), COUNT(*) \
             FROM conversation_turn GROUP BY session_id \
             ORDER BY MIN(turn_start_time) ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SessionSummary {
                session_id: row.get(0)?,
                first_turn_start: row.get(1)?,
                turn_count: row.get(2)?,
            })
        })?;
        collect(rows)
    }

    /// Voice-to-voice response times for a session, in turn order.
    pub fn voice_to_voice_times(&self, session_id: &str) -> Result<Vec<f64>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT voice_to_voice_response_time FROM conversation_turn \
             WHERE session_id = ?1 ORDER BY turn_number ASC",
        )?;
        let rows = stmt.query_map(params![session_id], |row| row.get(0))?;
        collect(rows)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned mutex means another append panicked mid-write; the
        // connection itself is still usable for this subsystem's statements.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

const SELECT_TURN: &str = "SELECT session_id, turn_number, turn_start_time, \
    turn_end_time, user_speech_text, llm_response_text, \
    voice_to_voice_response_time, interrupted FROM conversation_turn";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TurnRecord> {
    Ok(TurnRecord {
        session_id: row.get(0)?,
        turn_number: row.get(1)?,
        turn_start_time: row.get(2)?,
        turn_end_time: row.get(3)?,
        user_speech_text: row.get(4)?,
        llm_response_text: row.get(5)?,
        voice_to_voice_response_time: row.get(6)?,
        interrupted: row.get(7)?,
    })
}

fn collect<T>(rows: impl Iterator<Item = rusqlite::Result<T>>) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
