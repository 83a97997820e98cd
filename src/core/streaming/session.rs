use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::StreamingError;
use super::frames::AudioFrame;
use crate::core::synthesis::{AudioFormat, ErrorKind};

/// Lifecycle of a streaming session.
///
/// `Opening -> Ready -> Synthesizing -> Streaming -> Ready` repeats for each
/// synthesis; `Closing -> Closed` ends the session from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Opening,
    Ready,
    Synthesizing,
    Streaming,
    Closing,
    Closed,
}

/// Events delivered to the connection that owns a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Frame(AudioFrame),
    Error { kind: ErrorKind, message: String },
    Closed { reason: String },
}

#[derive(Debug)]
pub struct StreamingSession {
    id: String,
    voice_profile_id: String,
    language: String,
    format: AudioFormat,
    state: Mutex<SessionState>,
    sequence: AtomicU64,
    last_activity: Mutex<Instant>,
    outbound: mpsc::Sender<SessionEvent>,
    cancel: CancellationToken,
    created_at: Instant,
}

impl StreamingSession {
    pub(crate) fn new(
        id: String,
        voice_profile_id: String,
        language: String,
        format: AudioFormat,
        outbound: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let now = Instant::now();
        Self {
            id,
            voice_profile_id,
            language,
            format,
            state: Mutex::new(SessionState::Opening),
            sequence: AtomicU64::new(0),
            last_activity: Mutex::new(now),
            outbound,
            cancel: CancellationToken::new(),
            created_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn voice_profile_id(&self) -> &str {
        &self.voice_profile_id
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Moves `from -> to`. Returns false if the session was in another state.
    pub(crate) fn transition(&self, from: SessionState, to: SessionState) -> bool {
        let mut state = self.state.lock();
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }

    /// Claims the session for one synthesis.
    pub(crate) fn try_begin(&self) -> Result<(), StreamingError> {
        let mut state = self.state.lock();
        match *state {
            SessionState::Ready => {
                *state = SessionState::Synthesizing;
                Ok(())
            }
            SessionState::Synthesizing | SessionState::Streaming | SessionState::Opening => {
                Err(StreamingError::SessionBusy(self.id.clone()))
            }
            SessionState::Closing | SessionState::Closed => {
                Err(StreamingError::SessionClosed(self.id.clone()))
            }
        }
    }

    /// Enters `Closing` and cancels in-flight work. False if already closing.
    pub(crate) fn begin_close(&self) -> bool {
        let mut state = self.state.lock();
        if matches!(*state, SessionState::Closing | SessionState::Closed) {
            return false;
        }
        *state = SessionState::Closing;
        self.cancel.cancel();
        true
    }

    pub(crate) fn mark_closed(&self) {
        *self.state.lock() = SessionState::Closed;
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    pub(crate) fn outbound(&self) -> &mpsc::Sender<SessionEvent> {
        &self.outbound
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Events queued but not yet taken by the connection.
    pub fn backlog(&self) -> usize {
        self.outbound.max_capacity() - self.outbound.capacity()
    }
}
