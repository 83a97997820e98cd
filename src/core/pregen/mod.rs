//! Background pregeneration of common phrases, and the job registry shared
//! with background bulk synthesis.

pub mod jobs;
pub mod scheduler;

pub use jobs::{JobKind, JobRegistry, JobState, JobStatus};
pub use scheduler::{JobHandle, PREGENERATION_SCOPE, PregenTarget, PregenerationScheduler};
