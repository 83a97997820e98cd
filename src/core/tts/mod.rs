mod base;
pub mod elevenlabs;
pub mod stub;

pub use base::{
    BoxedProvider, ProviderAudio, SynthesisProvider, TTSError, TTSResult, VoiceParams,
    pcm16_duration_ms,
};
pub use elevenlabs::{ELEVENLABS_TTS_URL, ElevenLabsConfig, ElevenLabsTTS};
pub use stub::StubTTS;

use std::sync::Arc;

/// Provider selection and credentials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderConfig {
    /// `elevenlabs` or `stub`
    pub name: String,
    pub api_key: Option<String>,
    /// Overrides the provider's default endpoint
    pub base_url: Option<String>,
}

/// Factory function to create a synthesis provider.
///
/// # Supported Providers
///
/// - `"elevenlabs"` - ElevenLabs TTS API
/// - `"stub"` - deterministic local generator, no credentials needed
pub fn create_tts_provider(config: &ProviderConfig) -> TTSResult<BoxedProvider> {
    match config.name.to_lowercase().as_str() {
        "elevenlabs" => {
            let mut el = ElevenLabsConfig::new(config.api_key.clone().unwrap_or_default());
            if let Some(base_url) = &config.base_url {
                el.base_url = base_url.clone();
            }
            Ok(Arc::new(ElevenLabsTTS::new(el)?))
        }
        "stub" => Ok(Arc::new(StubTTS::new())),
        other => Err(TTSError::InvalidConfiguration(format!(
            "Unsupported TTS provider: {other}. Supported providers: elevenlabs, stub"
        ))),
    }
}
