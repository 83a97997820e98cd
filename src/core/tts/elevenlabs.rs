use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::base::{ProviderAudio, SynthesisProvider, TTSError, TTSResult, VoiceParams, pcm16_duration_ms};
use crate::core::synthesis::AudioFormat;

pub const ELEVENLABS_TTS_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";

/// Model used when the caller asks for speed over fidelity.
pub const ELEVENLABS_FAST_MODEL: &str = "eleven_flash_v2_5";

const PCM_SAMPLE_RATE: u32 = 24_000;

/// Voice settings for ElevenLabs TTS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Voice stability (0.0 to 1.0)
    pub stability: f32,
    /// Similarity boost (0.0 to 1.0)
    pub similarity_boost: f32,
    /// Style strength (0.0 to 1.0)
    pub style: f32,
    /// Use speaker boost
    pub use_speaker_boost: bool,
}

impl From<&VoiceParams> for VoiceSettings {
    fn from(params: &VoiceParams) -> Self {
        Self {
            stability: params.stability,
            similarity_boost: params.similarity_boost,
            style: params.style,
            use_speaker_boost: true,
        }
    }
}

/// ElevenLabs connection settings
#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ElevenLabsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ELEVENLABS_TTS_URL.to_string(),
            connect_timeout: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// ElevenLabs TTS provider using the HTTP REST API
pub struct ElevenLabsTTS {
    client: Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsTTS {
    pub fn new(config: ElevenLabsConfig) -> TTSResult<Self> {
        if config.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "API key is required for ElevenLabs".to_string(),
            ));
        }

        let client = Client::builder()
            .pool_max_idle_per_host(64)
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(5))
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent("voxgate/0.1")
            .build()
            .map_err(|e| TTSError::InvalidConfiguration(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// ElevenLabs `output_format` for the requested encoding.
    fn output_format(format: AudioFormat) -> &'static str {
        match format {
            AudioFormat::Pcm => "pcm_24000",
            AudioFormat::Mp3 => "mp3_44100_128",
            AudioFormat::Ulaw => "ulaw_8000",
        }
    }

    fn build_http_request(&self, text: &str, params: &VoiceParams) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            params.voice_id
        );

        let model_id = if params.optimize_for_speed {
            ELEVENLABS_FAST_MODEL
        } else {
            params.model.as_str()
        };

        let body = json!({
            "text": text,
            "model_id": model_id,
            "language_code": params.language,
            "voice_settings": VoiceSettings::from(params),
        });

        let mut query = vec![("output_format", Self::output_format(params.format).to_string())];
        if params.optimize_for_speed {
            query.push(("optimize_streaming_latency", "3".to_string()));
        }

        self.client
            .post(url)
            .query(&query)
            .header("xi-api-key", &self.config.api_key)
            .header("Accept", params.format.content_type())
            .json(&body)
    }

    fn collect_metadata(headers: &reqwest::header::HeaderMap) -> Map<String, Value> {
        let mut metadata = Map::new();
        for name in ["request-id", "x-character-count", "history-item-id"] {
            if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
                metadata.insert(name.to_string(), Value::String(value.to_string()));
            }
        }
        metadata
    }
}

#[async_trait]
impl SynthesisProvider for ElevenLabsTTS {
    async fn synthesize(&self, text: &str, params: &VoiceParams) -> TTSResult<ProviderAudio> {
        let response = self
            .build_http_request(text, params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TTSError::TimeoutError(e.to_string())
                } else if e.is_connect() {
                    TTSError::ConnectionFailed(e.to_string())
                } else {
                    TTSError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_REQUEST
                | StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::NOT_FOUND
                | StatusCode::UNPROCESSABLE_ENTITY => {
                    TTSError::Rejected(format!("{status}: {body}"))
                }
                _ => TTSError::ProviderError(format!("{status}: {body}")),
            });
        }

        let metadata = Self::collect_metadata(response.headers());
        let data = response
            .bytes()
            .await
            .map_err(|e| TTSError::NetworkError(format!("reading audio body: {e}")))?;

        debug!(
            "ElevenLabs returned {} bytes for voice {}",
            data.len(),
            params.voice_id
        );

        let (sample_rate, duration_ms) = match params.format {
            AudioFormat::Pcm => (PCM_SAMPLE_RATE, pcm16_duration_ms(data.len(), PCM_SAMPLE_RATE)),
            AudioFormat::Ulaw => (8_000, Some((data.len() as u64 * 1000 / 8_000) as u32)),
            AudioFormat::Mp3 => (44_100, None),
        };

        Ok(ProviderAudio {
            data,
            format: params.format,
            sample_rate,
            duration_ms,
            confidence: None,
            truncated: false,
            metadata,
        })
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }

    fn get_provider_info(&self) -> Value {
        json!({
            "provider": "elevenlabs",
            "endpoint": self.config.base_url,
            "formats": ["pcm", "mp3", "ulaw"],
        })
    }
}
