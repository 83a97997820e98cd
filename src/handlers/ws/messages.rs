//! WebSocket message types
//!
//! JSON messages exchanged with streaming clients, tagged by `type`.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::core::streaming::AudioFrame;
use crate::core::synthesis::ErrorKind;

/// Incoming WebSocket message types
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingMessage {
    /// Synthesize text on the session
    Synthesize { text: String },
    /// End the session
    Close,
}

/// Outgoing WebSocket message types
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingMessage {
    Ready {
        session_id: String,
    },
    AudioFrame {
        sequence: u64,
        /// Base64-encoded audio chunk
        payload: String,
        is_final: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u32>,
        processing_time_ms: u64,
        cached: bool,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
    SessionClosed {
        session_id: String,
        reason: String,
    },
}

impl From<AudioFrame> for OutgoingMessage {
    fn from(frame: AudioFrame) -> Self {
        OutgoingMessage::AudioFrame {
            sequence: frame.sequence,
            payload: BASE64.encode(&frame.payload),
            is_final: frame.is_final,
            duration_ms: frame.duration_ms,
            processing_time_ms: frame.processing_time_ms,
            cached: frame.cached,
        }
    }
}
