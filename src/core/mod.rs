pub mod cache;
pub mod limiter;
pub mod monitor;
pub mod pregen;
pub mod state;
pub mod streaming;
pub mod synthesis;
pub mod task;
pub mod tts;
pub mod voices;

// Re-export commonly used types for convenience
pub use limiter::{ConcurrencyLimiter, LimiterError, LimiterPermit};
pub use monitor::{AlertEvent, AnomalyAlert, QualityMonitor};
pub use synthesis::{
    AudioFormat, ErrorKind, SynthesisCoordinator, SynthesisError, SynthesisRequest,
    SynthesisResult,
};
pub use tts::{BoxedProvider, SynthesisProvider, TTSError, TTSResult, create_tts_provider};
pub use voices::{VoiceProfile, VoiceRegistry};

// Re-export CoreState for external use
pub use state::CoreState;
