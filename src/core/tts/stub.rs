use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use xxhash_rust::xxh3::xxh3_64;

use super::base::{ProviderAudio, SynthesisProvider, TTSError, TTSResult, VoiceParams};
use crate::core::synthesis::AudioFormat;

/// Milliseconds of generated audio per non-whitespace character.
pub const STUB_MS_PER_CHAR: u64 = 60;

/// Deterministic local provider.
///
/// Produces reproducible audio derived from the text and voice parameters,
/// with adjustable latency and failure injection. Used for local runs
/// without credentials and throughout the test suite.
#[derive(Default)]
pub struct StubTTS {
    latency_ms: AtomicU64,
    calls: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    fail_all: AtomicBool,
    failing_voices: Mutex<HashSet<String>>,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StubTTS {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        let stub = Self::default();
        stub.set_latency(latency);
        stub
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Makes every call fail with a provider error.
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Makes calls for a provider voice id fail.
    pub fn fail_voice(&self, voice_id: impl Into<String>) {
        self.failing_voices.lock().insert(voice_id.into());
    }

    pub fn restore_voice(&self, voice_id: &str) {
        self.failing_voices.lock().remove(voice_id);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn render(text: &str, params: &VoiceParams) -> (Bytes, u32, u32) {
        let chars = text.chars().filter(|c| !c.is_whitespace()).count().max(1) as u64;
        let duration_ms = chars * STUB_MS_PER_CHAR;
        let sample_rate = params.format.sample_rate();

        let len = match params.format {
            AudioFormat::Pcm => (duration_ms * sample_rate as u64 / 1000 * 2) as usize,
            AudioFormat::Ulaw => (duration_ms * sample_rate as u64 / 1000) as usize,
            // 128 kbit/s
            AudioFormat::Mp3 => (duration_ms * 16) as usize,
        };

        let seed_input = format!(
            "{}|{}|{}|{:.3}|{:.3}|{:.3}|{}|{}",
            text,
            params.voice_id,
            params.model,
            params.stability,
            params.similarity_boost,
            params.style,
            params.language,
            params.optimize_for_speed
        );
        let mut state = xxh3_64(seed_input.as_bytes()) | 1;
        let mut data = Vec::with_capacity(len);
        while data.len() < len {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let take = (len - data.len()).min(8);
            data.extend_from_slice(&state.to_le_bytes()[..take]);
        }

        (Bytes::from(data), sample_rate, duration_ms as u32)
    }
}

#[async_trait]
impl SynthesisProvider for StubTTS {
    async fn synthesize(&self, text: &str, params: &VoiceParams) -> TTSResult<ProviderAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(active, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.fail_all.load(Ordering::SeqCst)
            || self.failing_voices.lock().contains(&params.voice_id)
        {
            return Err(TTSError::ProviderError(format!(
                "stub provider unavailable for voice {}",
                params.voice_id
            )));
        }

        let (data, sample_rate, duration_ms) = Self::render(text, params);
        let mut metadata = Map::new();
        metadata.insert("provider".to_string(), Value::from("stub"));
        metadata.insert("characters".to_string(), Value::from(text.chars().count()));

        Ok(ProviderAudio {
            data,
            format: params.format,
            sample_rate,
            duration_ms: Some(duration_ms),
            confidence: Some(0.95),
            truncated: false,
            metadata,
        })
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn get_provider_info(&self) -> Value {
        json!({
            "provider": "stub",
            "formats": ["pcm", "mp3", "ulaw"],
            "latency_ms": self.latency_ms.load(Ordering::SeqCst),
        })
    }
}
