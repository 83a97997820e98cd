use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::cache_key::CacheKey;
use super::error::SynthesisError;
use super::phrases::CommonPhrases;
use super::quality::{HeuristicScorer, QualityScorer};
use super::request::{SynthesisRequest, SynthesisResult};
use crate::core::cache::{CacheEntry, CacheStore};
use crate::core::limiter::ConcurrencyLimiter;
use crate::core::monitor::{CacheOutcome, DEFAULT_SCOPE, QualityMonitor, RequestSample};
use crate::core::tts::{BoxedProvider, ProviderAudio, TTSError};
use crate::core::voices::{VoiceProfile, VoiceRegistry};

/// Longest accepted text, in characters.
pub const MAX_TEXT_CHARS: usize = 5000;

/// How long a profile stays switched to its fallback before the primary is
/// tried first again.
const FALLBACK_PROBE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// End-to-end budget for a cache miss, including the permit wait
    pub timeout: Duration,
    /// Consecutive provider failures before a profile is switched to its fallback
    pub fallback_failure_threshold: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
            fallback_failure_threshold: 3,
        }
    }
}

#[derive(Debug, Default)]
struct ProfileHealth {
    consecutive_failures: u32,
    switched_at: Option<Instant>,
}

/// Audio produced by the provider along with the profile that produced it.
struct Produced<'a> {
    audio: ProviderAudio,
    profile: &'a VoiceProfile,
    fallback_from: Option<&'a str>,
}

/// Orchestrates a single synthesis: cache lookup, permit, provider call,
/// quality scoring and cache write-back.
///
/// Background and live traffic share this path, so pregenerated entries are
/// keyed exactly like live ones.
pub struct SynthesisCoordinator {
    cache: Arc<CacheStore>,
    limiter: Arc<ConcurrencyLimiter>,
    provider: BoxedProvider,
    voices: Arc<VoiceRegistry>,
    monitor: Arc<QualityMonitor>,
    phrases: Arc<CommonPhrases>,
    scorer: Arc<dyn QualityScorer>,
    config: CoordinatorConfig,
    health: Mutex<HashMap<String, ProfileHealth>>,
}

impl SynthesisCoordinator {
    pub fn new(
        cache: Arc<CacheStore>,
        limiter: Arc<ConcurrencyLimiter>,
        provider: BoxedProvider,
        voices: Arc<VoiceRegistry>,
        monitor: Arc<QualityMonitor>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            cache,
            limiter,
            provider,
            voices,
            monitor,
            phrases: Arc::new(CommonPhrases::default()),
            scorer: Arc::new(HeuristicScorer::default()),
            config,
            health: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_phrases(mut self, phrases: Arc<CommonPhrases>) -> Self {
        self.phrases = phrases;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn QualityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesisResult, SynthesisError> {
        let start = Instant::now();
        let scope = request.scope.as_deref().unwrap_or(DEFAULT_SCOPE);

        let profile = self.validate(request)?;
        let key = CacheKey::derive(request, profile);

        let mut cache_outcome = CacheOutcome::Bypassed;
        if request.enable_caching {
            match self.cache.get(&key).await {
                Ok(Some(entry)) => {
                    let processing_time_ms = start.elapsed().as_millis() as u64;
                    self.monitor.record(
                        scope,
                        RequestSample::success(
                            processing_time_ms,
                            CacheOutcome::Hit,
                            entry.quality_score,
                        ),
                    );

                    let mut metadata = Map::new();
                    metadata.insert("cache_key".to_string(), Value::from(key.as_str()));
                    metadata.insert("ttl_class".to_string(), Value::from(entry.ttl_class.as_str()));
                    metadata.insert("created_at_ms".to_string(), Value::from(entry.created_at_ms));

                    return Ok(SynthesisResult {
                        audio: entry.audio,
                        format: entry.format,
                        cached: true,
                        processing_time_ms,
                        quality_score: entry.quality_score,
                        duration_ms: entry.duration_ms,
                        voice_profile_id: profile.id.clone(),
                        metadata,
                    });
                }
                Ok(None) => cache_outcome = CacheOutcome::Miss,
                Err(e) => warn!("Cache lookup failed for {}, synthesizing without cache: {}", key, e),
            }
        }

        let deadline = tokio::time::Instant::from_std(start + self.config.timeout);
        let produced =
            match tokio::time::timeout_at(deadline, self.call_provider(request, profile)).await {
                Ok(Ok(produced)) => produced,
                Ok(Err(e)) => {
                    self.monitor.record(
                        scope,
                        RequestSample::failure(
                            start.elapsed().as_millis() as u64,
                            cache_outcome,
                            e.kind(),
                        ),
                    );
                    return Err(e);
                }
                Err(_) => {
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    warn!(
                        "Synthesis for profile {} timed out after {}ms",
                        profile.id, elapsed_ms
                    );
                    let err = SynthesisError::Timeout {
                        elapsed_ms,
                        budget_ms: self.config.timeout.as_millis() as u64,
                    };
                    self.monitor.record(
                        scope,
                        RequestSample::failure(elapsed_ms, cache_outcome, err.kind()),
                    );
                    return Err(err);
                }
            };

        let quality_score = self.scorer.score(&request.text, &produced.audio);
        let ttl_class = request
            .ttl_hint
            .unwrap_or_else(|| self.phrases.classify(&request.text));

        let mut metadata = produced.audio.metadata.clone();
        metadata.insert("provider".to_string(), Value::from(self.provider.name()));
        metadata.insert("cache_key".to_string(), Value::from(key.as_str()));
        metadata.insert("ttl_class".to_string(), Value::from(ttl_class.as_str()));

        if let Some(primary) = produced.fallback_from {
            // Fallback audio does not match the requested profile's key
            metadata.insert("fallback_from".to_string(), Value::from(primary));
        } else if request.enable_caching {
            let entry = CacheEntry::new(
                produced.audio.data.clone(),
                produced.audio.format,
                quality_score,
                produced.audio.duration_ms,
                ttl_class,
            );
            if let Err(e) = self.cache.put(&key, &entry).await {
                warn!("Failed to cache synthesis result {}: {}", key, e);
            }
        }

        let processing_time_ms = start.elapsed().as_millis() as u64;
        self.monitor.record(
            scope,
            RequestSample::success(processing_time_ms, cache_outcome, quality_score),
        );

        debug!(
            "Synthesized {} bytes with {} in {}ms (quality {:.2})",
            produced.audio.data.len(),
            produced.profile.id,
            processing_time_ms,
            quality_score
        );

        Ok(SynthesisResult {
            audio: produced.audio.data,
            format: produced.audio.format,
            cached: false,
            processing_time_ms,
            quality_score,
            duration_ms: produced.audio.duration_ms,
            voice_profile_id: produced.profile.id.clone(),
            metadata,
        })
    }

    /// Synthesizes every request concurrently. Results keep input order.
    pub async fn synthesize_batch(
        &self,
        requests: &[SynthesisRequest],
    ) -> Vec<Result<SynthesisResult, SynthesisError>> {
        futures::future::join_all(requests.iter().map(|r| self.synthesize(r))).await
    }

    /// Removes the cached audio for `request`, returning the key it used.
    pub async fn invalidate(&self, request: &SynthesisRequest) -> Result<CacheKey, SynthesisError> {
        let profile = self.validate(request)?;
        let key = CacheKey::derive(request, profile);
        self.cache.invalidate(&key).await?;
        Ok(key)
    }

    fn validate<'a>(&'a self, request: &SynthesisRequest) -> Result<&'a VoiceProfile, SynthesisError> {
        if request.text.trim().is_empty() {
            return Err(SynthesisError::Validation("text must not be empty".to_string()));
        }
        if request.text.chars().count() > MAX_TEXT_CHARS {
            return Err(SynthesisError::Validation(format!(
                "text exceeds {MAX_TEXT_CHARS} characters"
            )));
        }
        if request.language.trim().is_empty() {
            return Err(SynthesisError::Validation("language must not be empty".to_string()));
        }
        Ok(self
            .voices
            .resolve(&request.voice_profile_id, &request.language)?)
    }

    /// Provider call with at most one retry on the fallback profile.
    async fn call_provider<'a>(
        &'a self,
        request: &SynthesisRequest,
        primary: &'a VoiceProfile,
    ) -> Result<Produced<'a>, SynthesisError> {
        let fallback = self.voices.fallback_for(&primary.id, &request.language);

        let mut order = vec![primary];
        if let Some(fallback) = fallback {
            if self.is_switched(&primary.id) {
                order.insert(0, fallback);
            } else {
                order.push(fallback);
            }
        }

        let mut last_error = None;
        for profile in order {
            match self.attempt(request, profile).await {
                Ok(audio) => {
                    if profile.id == primary.id {
                        self.record_primary_success(&primary.id);
                    }
                    let fallback_from = (profile.id != primary.id).then_some(primary.id.as_str());
                    return Ok(Produced {
                        audio,
                        profile,
                        fallback_from,
                    });
                }
                Err(e) => {
                    warn!("Provider call failed for profile {}: {}", profile.id, e);
                    if profile.id == primary.id {
                        self.record_primary_failure(&primary.id);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| SynthesisError::Provider(TTSError::InternalError("no attempt made".into()))))
    }

    async fn attempt(
        &self,
        request: &SynthesisRequest,
        profile: &VoiceProfile,
    ) -> Result<ProviderAudio, SynthesisError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| TTSError::InternalError(e.to_string()))?;

        let params = profile.voice_params(&request.language, request.format, request.optimize_for_speed);
        let mut recorder = AttemptRecorder::new(&self.monitor, &profile.id);
        let result = self.provider.synthesize(&request.text, &params).await;
        recorder.succeeded = result.is_ok();

        Ok(result?)
    }

    fn is_switched(&self, profile_id: &str) -> bool {
        let mut health = self.health.lock();
        let Some(state) = health.get_mut(profile_id) else {
            return false;
        };
        match state.switched_at {
            Some(at) if at.elapsed() < FALLBACK_PROBE_INTERVAL => true,
            Some(_) => {
                // Probe the primary again; one more failure re-arms the switch
                state.switched_at = None;
                state.consecutive_failures = self.config.fallback_failure_threshold.saturating_sub(1);
                false
            }
            None => false,
        }
    }

    fn record_primary_failure(&self, profile_id: &str) {
        let mut health = self.health.lock();
        let state = health.entry(profile_id.to_string()).or_default();
        state.consecutive_failures += 1;
        if state.switched_at.is_none()
            && state.consecutive_failures >= self.config.fallback_failure_threshold.max(1)
        {
            warn!(
                "Profile {} failed {} times in a row, switching to fallback",
                profile_id, state.consecutive_failures
            );
            state.switched_at = Some(Instant::now());
        }
    }

    fn record_primary_success(&self, profile_id: &str) {
        let mut health = self.health.lock();
        if let Some(state) = health.remove(profile_id)
            && state.switched_at.is_some()
        {
            info!("Profile {} recovered, leaving fallback", profile_id);
        }
    }

    /// Whether `profile_id` currently routes to its fallback first.
    pub fn fallback_active(&self, profile_id: &str) -> bool {
        self.health
            .lock()
            .get(profile_id)
            .is_some_and(|s| s.switched_at.is_some())
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn limiter(&self) -> &Arc<ConcurrencyLimiter> {
        &self.limiter
    }

    pub fn provider(&self) -> &BoxedProvider {
        &self.provider
    }

    pub fn voices(&self) -> &Arc<VoiceRegistry> {
        &self.voices
    }

    pub fn monitor(&self) -> &Arc<QualityMonitor> {
        &self.monitor
    }

    pub fn phrases(&self) -> &Arc<CommonPhrases> {
        &self.phrases
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }
}

/// Records one provider attempt when dropped, so an attempt cancelled by
/// the request deadline is still counted as a failure.
struct AttemptRecorder<'a> {
    monitor: &'a QualityMonitor,
    profile_id: &'a str,
    started: Instant,
    succeeded: bool,
}

impl<'a> AttemptRecorder<'a> {
    fn new(monitor: &'a QualityMonitor, profile_id: &'a str) -> Self {
        Self {
            monitor,
            profile_id,
            started: Instant::now(),
            succeeded: false,
        }
    }
}

impl Drop for AttemptRecorder<'_> {
    fn drop(&mut self) {
        self.monitor.record_attempt(
            self.profile_id,
            self.succeeded,
            self.started.elapsed().as_millis() as u64,
        );
    }
}
