//! WebSocket error types
//!
//! Failures that happen at the connection layer, before a request reaches the
//! session manager.

use thiserror::Error;

use crate::core::synthesis::ErrorKind;

/// WebSocket handler error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebSocketError {
    /// A required query parameter was not supplied on upgrade
    #[error("Missing query parameter: {0}")]
    MissingParameter(&'static str),

    /// The requested audio format is not supported
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// An inbound message could not be parsed
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// Binary frames are not part of the protocol
    #[error("Binary messages are not supported")]
    BinaryNotSupported,
}

impl WebSocketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WebSocketError::MissingParameter(_) | WebSocketError::UnsupportedFormat(_) => {
                ErrorKind::Handshake
            }
            WebSocketError::InvalidMessage(_) | WebSocketError::BinaryNotSupported => {
                ErrorKind::Validation
            }
        }
    }
}
