//! One live conversation session.
//!
//! A session owns exactly one turn tracker and one audio capture buffer and
//! runs a single event-loop task, so all callbacks for the session are
//! serialized; there is never a second writer to per-session state. The
//! shared turn store is the only cross-session resource.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::StreamExt;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::clock;
use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::audio::{asset_path, write_take, AudioCaptureBuffer, AudioFrame};
use crate::nats::messages::{
    AudioFrameMessage, SpeakingMarkerMessage, TranscriptMessage, TurnEndedMessage,
    MARKER_BOT_STARTED, MARKER_USER_STOPPED, SUBJECT_AUDIO_FRAME, SUBJECT_MARKER,
    SUBJECT_TRANSCRIPT, SUBJECT_TURN_ENDED,
};
use crate::nats::EventClient;
use crate::turns::{TurnStore, TurnTracker};

pub struct ConversationSession {
    /// Session configuration
    config: SessionConfig,

    /// When the session was created
    started_at: chrono::DateTime<chrono::Utc>,

    /// Whether the session is still connected
    is_active: Arc<AtomicBool>,

    /// Turns flushed so far, shared with the tracker inside the event task
    turns_flushed: Arc<AtomicUsize>,

    /// Signals the event loop to stop at disconnect
    shutdown: Arc<Notify>,

    /// Handle for the event-loop task
    event_task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ConversationSession {
    /// Create a session and start its event loop.
    ///
    /// Connects to NATS, starts audio capture, and begins feeding pipeline
    /// events into the turn tracker until `disconnect` is called.
    pub async fn connect(config: SessionConfig, store: Arc<TurnStore>) -> Result<Self> {
        info!("Starting conversation with session ID: {}", config.session_id);

        let client = EventClient::connect(&config.nats_url, config.session_id.clone())
            .await
            .context("Failed to connect to NATS")?;

        let subscriber = client
            .subscribe_events()
            .await
            .context("Failed to subscribe to pipeline events")?;

        let turns_flushed = Arc::new(AtomicUsize::new(0));
        let is_active = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());

        let mut tracker = TurnTracker::new(
            config.session_id.clone(),
            Arc::clone(&store),
            Arc::clone(&turns_flushed),
        );
        let mut capture = AudioCaptureBuffer::new(config.session_id.clone());
        capture.start();

        let session_id = config.session_id.clone();
        let recordings_dir = config.recordings_dir.clone();
        let loop_shutdown = Arc::clone(&shutdown);
        let loop_active = Arc::clone(&is_active);

        let event_task = tokio::spawn(async move {
            let mut subscriber = subscriber;
            info!("Event loop started for session {}", session_id);

            loop {
                tokio::select! {
                    _ = loop_shutdown.notified() => break,
                    maybe_msg = subscriber.next() => match maybe_msg {
                        Some(msg) => {
                            dispatch_event(
                                msg.subject.as_str(),
                                &msg.payload,
                                &session_id,
                                &mut tracker,
                                &mut capture,
                            );
                        }
                        None => {
                            warn!("Event stream closed for session {}", session_id);
                            break;
                        }
                    },
                }
            }

            info!("Event loop stopped for session {}", session_id);
            loop_active.store(false, Ordering::SeqCst);

            // Teardown is the only cancellation boundary: flush the audio
            // asset even if no further turn completes, and drop whatever
            // incomplete turn state remains.
            if let Some(take) = capture.stop() {
                let path = asset_path(&recordings_dir, &session_id);
                if let Err(e) = write_take(&path, &take) {
                    error!(
                        "Failed to persist audio asset for session {}: {:#}",
                        session_id, e
                    );
                }
            } else {
                warn!("No audio captured for session {}", session_id);
            }
            tracker.finish();

            if let Err(e) = client.close().await {
                warn!("Failed to close NATS connection: {}", e);
            }
        });

        let session = Self {
            config,
            started_at: Utc::now(),
            is_active,
            turns_flushed,
            shutdown,
            event_task_handle: Arc::new(Mutex::new(Some(event_task))),
        };

        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    /// Disconnect the session: stop the event loop, finalize audio capture,
    /// and persist the asset. Idempotent.
    pub async fn disconnect(&self) -> Result<SessionStats> {
        if !self.is_active.load(Ordering::SeqCst) {
            warn!("Session {} already disconnected", self.config.session_id);
            return Ok(self.stats());
        }

        info!("Disconnecting session: {}", self.config.session_id);
        self.shutdown.notify_one();

        {
            let mut handle = self.event_task_handle.lock().await;
            if let Some(task) = handle.take() {
                if let Err(e) = task.await {
                    error!("Event task panicked: {}", e);
                }
            }
        }

        Ok(self.stats())
    }

    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);
        SessionStats {
            is_active: self.is_active.load(Ordering::SeqCst),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            turns_flushed: self.turns_flushed.load(Ordering::SeqCst),
        }
    }
}

/// Route one pipeline event into the session's tracker or capture buffer.
///
/// Events for other sessions share the same subjects and are filtered out
/// by the `session_id` field in each payload. Malformed payloads are logged
/// and skipped; nothing here can abort the session.
fn dispatch_event(
    subject: &str,
    payload: &[u8],
    session_id: &str,
    tracker: &mut TurnTracker,
    capture: &mut AudioCaptureBuffer,
) {
    match subject {
        SUBJECT_TRANSCRIPT => match serde_json::from_slice::<TranscriptMessage>(payload) {
            Ok(msg) => {
                if msg.session_id != session_id || !msg.final_text {
                    return;
                }
                match msg.role.as_str() {
                    "user" => tracker.append_user_text(&msg.text),
                    "assistant" => tracker.set_response_text(&msg.text),
                    other => warn!("Transcript with unknown role {:?}", other),
                }
            }
            Err(e) => warn!("Failed to parse transcript message: {}", e),
        },

        SUBJECT_MARKER => match serde_json::from_slice::<SpeakingMarkerMessage>(payload) {
            Ok(msg) => {
                if msg.session_id != session_id {
                    return;
                }
                match msg.marker.as_str() {
                    MARKER_USER_STOPPED => tracker.mark_user_stopped(),
                    MARKER_BOT_STARTED => tracker.mark_bot_started(),
                    other => warn!("Unknown speaking marker {:?}", other),
                }
            }
            Err(e) => warn!("Failed to parse marker message: {}", e),
        },

        SUBJECT_TURN_ENDED => match serde_json::from_slice::<TurnEndedMessage>(payload) {
            Ok(msg) => {
                if msg.session_id != session_id {
                    return;
                }
                info!(
                    "Turn {} ended, duration {:.2}s, interrupted {}",
                    msg.turn_number, msg.duration_secs, msg.interrupted
                );
                // The detector reports a duration, not a start timestamp;
                // end = now, start = end - duration is authoritative here.
                let end_time = clock::now_secs();
                tracker.close_turn(
                    msg.turn_number,
                    end_time - msg.duration_secs,
                    end_time,
                    msg.interrupted,
                );
            }
            Err(e) => warn!("Failed to parse turn-ended message: {}", e),
        },

        SUBJECT_AUDIO_FRAME => match serde_json::from_slice::<AudioFrameMessage>(payload) {
            Ok(msg) => {
                if msg.session_id != session_id || msg.final_frame {
                    return;
                }
                match msg.samples() {
                    Ok(samples) => capture.push(&AudioFrame {
                        samples,
                        sample_rate: msg.sample_rate,
                        channels: msg.channels,
                    }),
                    Err(e) => warn!("Failed to decode audio frame: {}", e),
                }
            }
            Err(e) => warn!("Failed to parse audio frame message: {}", e),
        },

        _ => {}
    }
}
