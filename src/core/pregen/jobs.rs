use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Completed jobs kept for status queries.
const MAX_RETAINED_JOBS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Bulk,
    Pregeneration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub job_id: String,
    pub kind: JobKind,
    pub state: JobState,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub created_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
}

/// In-memory status table for background jobs.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobStatus>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, kind: JobKind, total: usize) -> String {
        let job_id = Uuid::new_v4().to_string();
        let status = JobStatus {
            job_id: job_id.clone(),
            kind,
            state: JobState::Pending,
            total,
            succeeded: 0,
            failed: 0,
            created_at_ms: unix_millis(),
            finished_at_ms: None,
        };

        let mut jobs = self.jobs.write();
        if jobs.len() >= MAX_RETAINED_JOBS {
            evict_oldest_completed(&mut jobs);
        }
        jobs.insert(job_id.clone(), status);
        job_id
    }

    pub fn mark_running(&self, job_id: &str) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            job.state = JobState::Running;
        }
    }

    pub fn record(&self, job_id: &str, succeeded: bool) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            if succeeded {
                job.succeeded += 1;
            } else {
                job.failed += 1;
            }
        }
    }

    pub fn complete(&self, job_id: &str) -> Option<JobStatus> {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(job_id)?;
        job.state = JobState::Completed;
        job.finished_at_ms = Some(unix_millis());
        Some(job.clone())
    }

    pub fn get(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().get(job_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}

fn evict_oldest_completed(jobs: &mut HashMap<String, JobStatus>) {
    let oldest = jobs
        .values()
        .filter(|j| j.state == JobState::Completed)
        .min_by_key(|j| j.created_at_ms)
        .map(|j| j.job_id.clone());
    if let Some(id) = oldest {
        jobs.remove(&id);
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
