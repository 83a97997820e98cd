use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::cache::CacheStore;
use crate::core::limiter::ConcurrencyLimiter;
use crate::core::monitor::QualityMonitor;
use crate::core::pregen::{JobRegistry, PregenerationScheduler};
use crate::core::streaming::StreamingSessionManager;
use crate::core::synthesis::{CommonPhrases, SynthesisCoordinator};
use crate::core::tts::{BoxedProvider, create_tts_provider};
use crate::core::voices::VoiceRegistry;

/// Core-specific shared state for the application.
///
/// Owns one instance of every core component. All request paths, live and
/// background, go through the same coordinator, so they share the cache, the
/// provider permit pool and the monitor.
pub struct CoreState {
    /// Audio cache (in-memory unless a cache path is configured)
    pub cache: Arc<CacheStore>,
    /// Permit pool guarding outbound provider calls
    pub limiter: Arc<ConcurrencyLimiter>,
    /// Active synthesis provider
    pub provider: BoxedProvider,
    pub voices: Arc<VoiceRegistry>,
    pub monitor: Arc<QualityMonitor>,
    pub coordinator: Arc<SynthesisCoordinator>,
    pub sessions: Arc<StreamingSessionManager>,
    pub jobs: Arc<JobRegistry>,
    pub scheduler: Arc<PregenerationScheduler>,
}

impl CoreState {
    /// Initialize core state with the provider named in the configuration.
    pub async fn new(config: &ServerConfig) -> anyhow::Result<Arc<Self>> {
        let provider = create_tts_provider(&config.provider_config())
            .context("failed to create synthesis provider")?;
        Self::with_provider(config, provider).await
    }

    /// Initialize core state around an already constructed provider.
    pub async fn with_provider(
        config: &ServerConfig,
        provider: BoxedProvider,
    ) -> anyhow::Result<Arc<Self>> {
        let cache = Arc::new(
            CacheStore::from_config(config.cache_config(), config.cache_ttls())
                .await
                .context("failed to initialize audio cache")?,
        );
        info!("Audio cache ready ({} backend)", cache.backend_type());

        let limiter = Arc::new(ConcurrencyLimiter::new(config.max_concurrent_provider_calls)?);
        let voices = Arc::new(VoiceRegistry::new(config.voice_profiles.clone())?);
        let monitor = Arc::new(QualityMonitor::new(config.monitor_config()));
        let phrases = Arc::new(CommonPhrases::new(config.common_phrases.iter().cloned()));

        info!(
            "Synthesis provider: {} ({} voice profiles, {} concurrent calls)",
            provider.name(),
            voices.len(),
            limiter.max_concurrent()
        );

        let coordinator = Arc::new(
            SynthesisCoordinator::new(
                Arc::clone(&cache),
                Arc::clone(&limiter),
                Arc::clone(&provider),
                Arc::clone(&voices),
                Arc::clone(&monitor),
                config.coordinator_config(),
            )
            .with_phrases(phrases),
        );

        let sessions = Arc::new(StreamingSessionManager::new(
            Arc::clone(&coordinator),
            config.streaming_config(),
        ));

        let jobs = Arc::new(JobRegistry::new());
        let scheduler = Arc::new(PregenerationScheduler::new(
            Arc::clone(&coordinator),
            Arc::clone(&jobs),
            config.pregen_targets.clone(),
            config.pregen_interval(),
        ));

        Ok(Arc::new(Self {
            cache,
            limiter,
            provider,
            voices,
            monitor,
            coordinator,
            sessions,
            jobs,
            scheduler,
        }))
    }
}
