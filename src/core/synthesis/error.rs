use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::cache::CacheError;
use crate::core::tts::TTSError;
use crate::core::voices::VoiceError;

/// Stable machine-readable failure kind shared by HTTP and streaming surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Provider,
    Timeout,
    SessionBusy,
    Handshake,
    Cache,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Provider => "provider",
            ErrorKind::Timeout => "timeout",
            ErrorKind::SessionBusy => "session_busy",
            ErrorKind::Handshake => "handshake",
            ErrorKind::Cache => "cache",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Provider error: {0}")]
    Provider(#[from] TTSError),

    #[error("Synthesis exceeded its {budget_ms}ms budget after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64, budget_ms: u64 },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl SynthesisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SynthesisError::Validation(_) => ErrorKind::Validation,
            SynthesisError::Provider(_) => ErrorKind::Provider,
            SynthesisError::Timeout { .. } => ErrorKind::Timeout,
            SynthesisError::Cache(_) => ErrorKind::Cache,
        }
    }
}

impl From<VoiceError> for SynthesisError {
    fn from(err: VoiceError) -> Self {
        SynthesisError::Validation(err.to_string())
    }
}
