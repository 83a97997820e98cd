//! # Synthesis provider interface
//!
//! The gateway talks to text-to-speech vendors through the narrow
//! [`SynthesisProvider`] trait: text plus voice parameters in, audio plus
//! metadata out. Nothing outside the adapters depends on a vendor wire format.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use voxgate::core::tts::{StubTTS, SynthesisProvider, VoiceParams};
//! use voxgate::core::synthesis::AudioFormat;
//!
//! async fn example() -> Result<(), voxgate::core::tts::TTSError> {
//!     let provider = StubTTS::new();
//!     let params = VoiceParams {
//!         voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
//!         model: "eleven_multilingual_v2".to_string(),
//!         stability: 0.5,
//!         similarity_boost: 0.75,
//!         style: 0.0,
//!         language: "en".to_string(),
//!         format: AudioFormat::Pcm,
//!         optimize_for_speed: false,
//!     };
//!
//!     let audio = provider.synthesize("Hello, world!", &params).await?;
//!     println!("{} bytes of {}", audio.data.len(), audio.format);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::synthesis::AudioFormat;

/// Acoustic parameters sent to the provider for one synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    /// Provider-side voice identifier
    pub voice_id: String,
    /// Provider model identifier
    pub model: String,
    /// Voice stability (0.0 to 1.0)
    pub stability: f32,
    /// Similarity boost (0.0 to 1.0)
    pub similarity_boost: f32,
    /// Style exaggeration (0.0 to 1.0)
    pub style: f32,
    /// Language code, e.g. "en"
    pub language: String,
    /// Requested output encoding
    pub format: AudioFormat,
    /// Advisory: the provider may trade fidelity for latency
    pub optimize_for_speed: bool,
}

/// Audio returned by a provider.
#[derive(Debug, Clone)]
pub struct ProviderAudio {
    /// Encoded audio bytes
    pub data: Bytes,
    /// Encoding of `data`
    pub format: AudioFormat,
    /// Sample rate of the audio in Hz
    pub sample_rate: u32,
    /// Duration in milliseconds, when the provider reports or it can be derived
    pub duration_ms: Option<u32>,
    /// Provider-reported synthesis confidence in [0, 1]
    pub confidence: Option<f32>,
    /// Set when the provider signals that output was cut short
    pub truncated: bool,
    /// Opaque provider metadata (request ids, character counts, ...)
    pub metadata: Map<String, Value>,
}

/// Provider-specific error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum TTSError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request rejected by provider: {0}")]
    Rejected(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type for provider operations
pub type TTSResult<T> = Result<T, TTSError>;

/// A text-to-speech backend.
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Synthesize `text` with the given voice parameters.
    async fn synthesize(&self, text: &str, params: &VoiceParams) -> TTSResult<ProviderAudio>;

    /// Short provider name used in logs and cache metadata.
    fn name(&self) -> &str;

    /// Provider-specific information (supported formats, endpoints, ...).
    fn get_provider_info(&self) -> Value {
        serde_json::json!({
            "provider": self.name(),
        })
    }
}

/// Shared provider handle
pub type BoxedProvider = Arc<dyn SynthesisProvider>;

/// Duration in milliseconds of 16-bit mono PCM.
pub fn pcm16_duration_ms(byte_len: usize, sample_rate: u32) -> Option<u32> {
    if sample_rate == 0 {
        return None;
    }
    let samples = byte_len as u64 / 2;
    Some((samples * 1000 / sample_rate as u64) as u32)
}
