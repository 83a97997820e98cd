//! Streaming session manager.
//!
//! A session is one live connection bound to a voice profile and language.
//! Each inbound synthesize request runs through the
//! [`SynthesisCoordinator`](crate::core::synthesis::SynthesisCoordinator) and
//! the resulting audio is pushed back as ordered [`AudioFrame`]s over a
//! bounded channel, so a slow client applies backpressure to its own session
//! only.

pub mod frames;
pub mod manager;
pub mod session;

pub use frames::{AudioFrame, chunk_duration_ms, segment};
pub use manager::{SessionHandshake, StreamingConfig, StreamingSessionManager};
pub use session::{SessionEvent, SessionState, StreamingSession};

use thiserror::Error;

use crate::core::synthesis::ErrorKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamingError {
    #[error("Handshake rejected: {0}")]
    Handshake(String),

    #[error("Session {0} is busy with another synthesis")]
    SessionBusy(String),

    #[error("Session {0} is closed")]
    SessionClosed(String),

    #[error("Session {0} not found")]
    NotFound(String),
}

impl StreamingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamingError::Handshake(_) => ErrorKind::Handshake,
            StreamingError::SessionBusy(_) => ErrorKind::SessionBusy,
            StreamingError::SessionClosed(_) | StreamingError::NotFound(_) => {
                ErrorKind::Validation
            }
        }
    }
}
