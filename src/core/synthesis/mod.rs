//! Synthesis coordination: request types, cache key derivation, quality
//! scoring, phrase classification and the [`SynthesisCoordinator`].

pub mod cache_key;
pub mod coordinator;
pub mod error;
pub mod phrases;
pub mod quality;
pub mod request;

pub use cache_key::{CacheKey, normalize_text};
pub use coordinator::{CoordinatorConfig, MAX_TEXT_CHARS, SynthesisCoordinator};
pub use error::{ErrorKind, SynthesisError};
pub use phrases::{CommonPhrases, DEFAULT_COMMON_PHRASES};
pub use quality::{HeuristicScorer, QualityScorer};
pub use request::{AudioFormat, SynthesisRequest, SynthesisResult};
