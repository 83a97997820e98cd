use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::jobs::{JobKind, JobRegistry, JobStatus};
use crate::core::cache::TtlClass;
use crate::core::synthesis::{AudioFormat, SynthesisCoordinator, SynthesisRequest};
use crate::core::task::PeriodicTask;

/// Monitoring scope for pregeneration traffic, kept apart from live scopes.
pub const PREGENERATION_SCOPE: &str = "pregeneration";

/// Requests of one job in flight at once.
const JOB_CONCURRENCY: usize = 4;

/// A voice/language pair refreshed on every recurring run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PregenTarget {
    pub voice_profile_id: String,
    pub language: String,
    #[serde(default)]
    pub format: AudioFormat,
}

/// Handle to a spawned background job.
pub struct JobHandle {
    pub job_id: String,
    handle: JoinHandle<Option<JobStatus>>,
}

impl JobHandle {
    /// Waits for the job and returns its final status.
    pub async fn wait(self) -> Option<JobStatus> {
        self.handle.await.ok().flatten()
    }
}

/// Drives batch synthesis through the coordinator: on-demand pregeneration,
/// recurring pregeneration for configured targets, and background bulk jobs.
pub struct PregenerationScheduler {
    coordinator: Arc<SynthesisCoordinator>,
    jobs: Arc<JobRegistry>,
    targets: Vec<PregenTarget>,
    interval: Duration,
}

impl PregenerationScheduler {
    pub fn new(
        coordinator: Arc<SynthesisCoordinator>,
        jobs: Arc<JobRegistry>,
        targets: Vec<PregenTarget>,
        interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            jobs,
            targets,
            interval,
        }
    }

    pub fn jobs(&self) -> &Arc<JobRegistry> {
        &self.jobs
    }

    pub fn targets(&self) -> &[PregenTarget] {
        &self.targets
    }

    /// Enqueues `phrases` for one voice as long-lived cache entries.
    pub fn schedule<I, S>(
        &self,
        phrases: I,
        voice_profile_id: &str,
        language: &str,
        format: AudioFormat,
    ) -> JobHandle
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requests = phrases
            .into_iter()
            .map(|phrase| {
                SynthesisRequest::new(phrase, voice_profile_id, language)
                    .with_format(format)
                    .with_caching(true)
                    .with_ttl_hint(TtlClass::Common)
                    .with_scope(PREGENERATION_SCOPE)
            })
            .collect();
        self.spawn_job(JobKind::Pregeneration, requests)
    }

    /// Enqueues the configured common-phrase set for one voice.
    pub fn schedule_common(&self, voice_profile_id: &str, language: &str, format: AudioFormat) -> JobHandle {
        let phrases = self.coordinator.phrases().phrases().to_vec();
        info!(
            "Scheduling pregeneration of {} phrases for {} / {}",
            phrases.len(),
            voice_profile_id,
            language
        );
        self.schedule(phrases, voice_profile_id, language, format)
    }

    /// Runs arbitrary requests as a background bulk job.
    pub fn schedule_bulk(&self, requests: Vec<SynthesisRequest>) -> JobHandle {
        self.spawn_job(JobKind::Bulk, requests)
    }

    fn spawn_job(&self, kind: JobKind, requests: Vec<SynthesisRequest>) -> JobHandle {
        let job_id = self.jobs.create(kind, requests.len());
        let coordinator = Arc::clone(&self.coordinator);
        let jobs = Arc::clone(&self.jobs);
        let id = job_id.clone();

        let handle = tokio::spawn(async move { run_job(coordinator, jobs, id, requests).await });
        JobHandle { job_id, handle }
    }

    /// One recurring pass over every configured target.
    pub async fn run_recurring(&self) {
        for target in &self.targets {
            let status = self
                .schedule_common(&target.voice_profile_id, &target.language, target.format)
                .wait()
                .await;
            if let Some(status) = status {
                info!(
                    "Pregeneration for {} / {} finished: {} ok, {} failed",
                    target.voice_profile_id, target.language, status.succeeded, status.failed
                );
            }
        }
    }

    /// Starts the recurring schedule. The first pass runs immediately.
    pub fn start(self: &Arc<Self>) -> PeriodicTask {
        let scheduler = Arc::clone(self);
        PeriodicTask::spawn("pregeneration", self.interval, true, move || {
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run_recurring().await }
        })
    }
}

async fn run_job(
    coordinator: Arc<SynthesisCoordinator>,
    jobs: Arc<JobRegistry>,
    job_id: String,
    requests: Vec<SynthesisRequest>,
) -> Option<JobStatus> {
    jobs.mark_running(&job_id);

    futures::stream::iter(requests)
        .for_each_concurrent(JOB_CONCURRENCY, |request| {
            let coordinator = &coordinator;
            let jobs = &jobs;
            let job_id = &job_id;
            async move {
                match coordinator.synthesize(&request).await {
                    Ok(_) => jobs.record(job_id, true),
                    Err(e) => {
                        // one bad phrase never aborts the batch
                        warn!("Job {}: failed to synthesize {:?}: {}", job_id, request.text, e);
                        jobs.record(job_id, false);
                    }
                }
            }
        })
        .await;

    jobs.complete(&job_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::{CacheConfig, CacheStore, CacheTtls};
    use crate::core::limiter::ConcurrencyLimiter;
    use crate::core::monitor::QualityMonitor;
    use crate::core::pregen::JobState;
    use crate::core::synthesis::{CommonPhrases, CoordinatorConfig};
    use crate::core::tts::StubTTS;
    use crate::core::voices::VoiceRegistry;

    async fn scheduler(stub: Arc<StubTTS>, targets: Vec<PregenTarget>) -> Arc<PregenerationScheduler> {
        let cache = CacheStore::from_config(CacheConfig::default(), CacheTtls::default())
            .await
            .unwrap();
        let coordinator = SynthesisCoordinator::new(
            Arc::new(cache),
            Arc::new(ConcurrencyLimiter::new(10).unwrap()),
            stub,
            Arc::new(VoiceRegistry::default()),
            Arc::new(QualityMonitor::default()),
            CoordinatorConfig::default(),
        )
        .with_phrases(Arc::new(CommonPhrases::new(["Hello!", "Goodbye!"])));
        Arc::new(PregenerationScheduler::new(
            Arc::new(coordinator),
            Arc::new(JobRegistry::new()),
            targets,
            Duration::from_secs(3600),
        ))
    }

    #[tokio::test]
    async fn test_pregenerated_phrases_hit_live_traffic() {
        let stub = Arc::new(StubTTS::new());
        let scheduler = scheduler(stub.clone(), vec![]).await;

        let status = scheduler
            .schedule_common("rachel", "en", AudioFormat::Pcm)
            .wait()
            .await
            .unwrap();
        assert_eq!(status.state, JobState::Completed);
        assert_eq!((status.succeeded, status.failed), (2, 0));
        assert_eq!(stub.calls(), 2);

        let live = scheduler
            .coordinator
            .synthesize(&SynthesisRequest::new("Hello!", "rachel", "en"))
            .await
            .unwrap();
        assert!(live.cached);
        assert_eq!(live.metadata["ttl_class"], "common");
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let stub = Arc::new(StubTTS::new());
        let scheduler = scheduler(stub, vec![]).await;

        let status = scheduler
            .schedule(["Fine", "", "Also fine"], "rachel", "en", AudioFormat::Pcm)
            .wait()
            .await
            .unwrap();
        assert_eq!((status.total, status.succeeded, status.failed), (3, 2, 1));
        assert_eq!(scheduler.jobs().get(&status.job_id).unwrap(), status);
    }

    #[tokio::test]
    async fn test_recurring_task_covers_targets() {
        let stub = Arc::new(StubTTS::new());
        let targets = vec![
            PregenTarget {
                voice_profile_id: "rachel".to_string(),
                language: "en".to_string(),
                format: AudioFormat::Pcm,
            },
            PregenTarget {
                voice_profile_id: "bella".to_string(),
                language: "es".to_string(),
                format: AudioFormat::Mp3,
            },
        ];
        let scheduler = scheduler(stub.clone(), targets).await;

        let task = scheduler.start();
        for _ in 0..50 {
            if stub.calls() >= 4 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        task.shutdown().await;

        assert_eq!(stub.calls(), 4);
        assert_eq!(scheduler.jobs().len(), 2);
    }
}
