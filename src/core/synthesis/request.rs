use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::core::cache::TtlClass;

/// Output encoding of synthesized audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// 16-bit little-endian mono PCM at 24 kHz
    #[default]
    Pcm,
    Mp3,
    /// 8 kHz mu-law, for telephony
    Ulaw,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Pcm => "pcm",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ulaw => "ulaw",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Pcm => "audio/pcm",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Ulaw => "audio/basic",
        }
    }

    pub fn sample_rate(&self) -> u32 {
        match self {
            AudioFormat::Pcm => 24_000,
            AudioFormat::Mp3 => 44_100,
            AudioFormat::Ulaw => 8_000,
        }
    }

    /// Parses a format name, accepting a few common aliases.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pcm" | "linear16" | "pcm16" => Some(AudioFormat::Pcm),
            "mp3" | "mpeg" => Some(AudioFormat::Mp3),
            "ulaw" | "mulaw" | "mu-law" => Some(AudioFormat::Ulaw),
            _ => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// One synthesis call. Constructed per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_profile_id: String,
    pub language: String,
    #[serde(default)]
    pub format: AudioFormat,
    #[serde(default)]
    pub optimize_for_speed: bool,
    #[serde(default = "default_true")]
    pub enable_caching: bool,
    /// Overrides the phrase classifier when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_hint: Option<TtlClass>,
    /// Monitoring scope (tenant or deployment).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Caller correlation id. Not part of the cache key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl SynthesisRequest {
    pub fn new(
        text: impl Into<String>,
        voice_profile_id: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            voice_profile_id: voice_profile_id.into(),
            language: language.into(),
            format: AudioFormat::default(),
            optimize_for_speed: false,
            enable_caching: true,
            ttl_hint: None,
            scope: None,
            trace_id: None,
        }
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_caching(mut self, enable_caching: bool) -> Self {
        self.enable_caching = enable_caching;
        self
    }

    pub fn with_optimize_for_speed(mut self, optimize_for_speed: bool) -> Self {
        self.optimize_for_speed = optimize_for_speed;
        self
    }

    pub fn with_ttl_hint(mut self, ttl_class: TtlClass) -> Self {
        self.ttl_hint = Some(ttl_class);
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

/// Outcome of a successful synthesis.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub audio: Bytes,
    pub format: AudioFormat,
    pub cached: bool,
    pub processing_time_ms: u64,
    pub quality_score: f32,
    pub duration_ms: Option<u32>,
    /// Profile that actually produced the audio (differs on fallback).
    pub voice_profile_id: String,
    pub metadata: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_from_json() {
        let request: SynthesisRequest = serde_json::from_str(
            r#"{"text": "Hello", "voice_profile_id": "rachel", "language": "en"}"#,
        )
        .unwrap();

        assert_eq!(request.format, AudioFormat::Pcm);
        assert!(request.enable_caching);
        assert!(!request.optimize_for_speed);
        assert!(request.ttl_hint.is_none());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(AudioFormat::parse("MP3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::parse("linear16"), Some(AudioFormat::Pcm));
        assert_eq!(AudioFormat::parse("mulaw"), Some(AudioFormat::Ulaw));
        assert_eq!(AudioFormat::parse("flac"), None);
        assert_eq!(AudioFormat::Ulaw.to_string(), "ulaw");
    }
}
