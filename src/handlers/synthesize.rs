use axum::{
    extract::State,
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::info;

use crate::core::synthesis::{
    AudioFormat, ErrorKind, SynthesisError, SynthesisRequest, SynthesisResult,
};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Largest accepted bulk request.
pub const MAX_BULK_TEXTS: usize = 500;

/// Handler for `POST /synthesize`
///
/// Returns the audio as the response body; synthesis details travel in
/// `x-*` headers so the body stays raw audio.
pub async fn synthesize_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SynthesisRequest>,
) -> AppResult<Response> {
    info!(
        "Synthesize request - profile: {}, language: {}, text length: {}",
        request.voice_profile_id,
        request.language,
        request.text.len()
    );

    let result = state.core_state.coordinator.synthesize(&request).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, result.format.content_type().to_string()),
            (header::CONTENT_LENGTH, result.audio.len().to_string()),
            (HeaderName::from_static("x-cached"), result.cached.to_string()),
            (
                HeaderName::from_static("x-processing-time-ms"),
                result.processing_time_ms.to_string(),
            ),
            (
                HeaderName::from_static("x-quality-score"),
                format!("{:.3}", result.quality_score),
            ),
            (HeaderName::from_static("x-audio-format"), result.format.to_string()),
            (HeaderName::from_static("x-voice-profile"), result.voice_profile_id),
        ],
        result.audio,
    )
        .into_response())
}

fn default_true() -> bool {
    true
}

/// Request body for `POST /synthesize/bulk`
#[derive(Debug, Deserialize)]
pub struct BulkSynthesisRequest {
    pub texts: Vec<String>,
    pub voice_profile_id: String,
    pub language: String,
    #[serde(default)]
    pub format: AudioFormat,
    #[serde(default)]
    pub optimize_for_speed: bool,
    #[serde(default = "default_true")]
    pub enable_caching: bool,
    /// Run as a background job and return its id immediately
    #[serde(default)]
    pub background: bool,
    #[serde(default)]
    pub scope: Option<String>,
}

impl BulkSynthesisRequest {
    fn into_requests(self) -> Vec<SynthesisRequest> {
        let Self {
            texts,
            voice_profile_id,
            language,
            format,
            optimize_for_speed,
            enable_caching,
            scope,
            ..
        } = self;

        texts
            .into_iter()
            .map(|text| {
                let mut request = SynthesisRequest::new(text, &voice_profile_id, &language)
                    .with_format(format)
                    .with_optimize_for_speed(optimize_for_speed)
                    .with_caching(enable_caching);
                if let Some(scope) = &scope {
                    request = request.with_scope(scope);
                }
                request
            })
            .collect()
    }
}

/// One entry of a foreground bulk response.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BulkItem {
    Audio {
        /// Base64-encoded audio
        audio: String,
        format: AudioFormat,
        cached: bool,
        processing_time_ms: u64,
        quality_score: f32,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u32>,
        voice_profile_id: String,
        metadata: Map<String, Value>,
    },
    Failed {
        error: String,
        kind: ErrorKind,
    },
}

impl From<Result<SynthesisResult, SynthesisError>> for BulkItem {
    fn from(outcome: Result<SynthesisResult, SynthesisError>) -> Self {
        match outcome {
            Ok(result) => BulkItem::Audio {
                audio: BASE64.encode(&result.audio),
                format: result.format,
                cached: result.cached,
                processing_time_ms: result.processing_time_ms,
                quality_score: result.quality_score,
                duration_ms: result.duration_ms,
                voice_profile_id: result.voice_profile_id,
                metadata: result.metadata,
            },
            Err(e) => BulkItem::Failed {
                kind: e.kind(),
                error: e.to_string(),
            },
        }
    }
}

/// Handler for `POST /synthesize/bulk`
///
/// In the foreground every text is synthesized concurrently and the results
/// come back in input order; a failed text yields an error entry in its slot
/// without failing its neighbours. With `background: true` the batch runs as a
/// job and the response is `202 {job_id}`.
pub async fn bulk_synthesize_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkSynthesisRequest>,
) -> AppResult<Response> {
    if request.texts.is_empty() {
        return Err(AppError::BadRequest("texts must not be empty".to_string()));
    }
    if request.texts.len() > MAX_BULK_TEXTS {
        return Err(AppError::BadRequest(format!(
            "at most {MAX_BULK_TEXTS} texts per bulk request"
        )));
    }

    let core = &state.core_state;
    // Reject an unusable voice up front rather than once per text
    core.voices
        .resolve(&request.voice_profile_id, &request.language)
        .map_err(SynthesisError::from)?;

    let background = request.background;
    let requests = request.into_requests();
    info!(
        "Bulk synthesis of {} texts ({})",
        requests.len(),
        if background { "background" } else { "foreground" }
    );

    if background {
        let handle = core.scheduler.schedule_bulk(requests);
        return Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "job_id": handle.job_id })),
        )
            .into_response());
    }

    let results: Vec<BulkItem> = core
        .coordinator
        .synthesize_batch(&requests)
        .await
        .into_iter()
        .map(BulkItem::from)
        .collect();

    Ok(Json(json!({ "results": results })).into_response())
}
