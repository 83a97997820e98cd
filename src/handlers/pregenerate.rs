use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::core::pregen::JobStatus;
use crate::core::synthesis::{AudioFormat, SynthesisError};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Request body for `POST /pregenerate`
#[derive(Debug, Deserialize)]
pub struct PregenerateRequest {
    pub voice_profile_id: String,
    pub language: String,
    #[serde(default)]
    pub format: AudioFormat,
    /// Phrases to warm; the configured common set when omitted
    #[serde(default)]
    pub phrases: Option<Vec<String>>,
}

/// Handler for `POST /pregenerate`
pub async fn pregenerate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PregenerateRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let core = &state.core_state;
    core.voices
        .resolve(&request.voice_profile_id, &request.language)
        .map_err(SynthesisError::from)?;

    let (handle, phrases) = match request.phrases {
        Some(phrases) if phrases.is_empty() => {
            return Err(AppError::BadRequest("phrases must not be empty".to_string()));
        }
        Some(phrases) => {
            let count = phrases.len();
            let handle = core.scheduler.schedule(
                phrases,
                &request.voice_profile_id,
                &request.language,
                request.format,
            );
            (handle, count)
        }
        None => {
            let count = core.coordinator.phrases().phrases().len();
            let handle = core.scheduler.schedule_common(
                &request.voice_profile_id,
                &request.language,
                request.format,
            );
            (handle, count)
        }
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "job_id": handle.job_id,
            "phrases": phrases,
        })),
    ))
}

/// Handler for `GET /jobs/{id}`
pub async fn job_status_handler(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> AppResult<Json<JobStatus>> {
    state
        .core_state
        .jobs
        .get(&job_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("job {job_id}")))
}
