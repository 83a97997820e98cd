use axum::{extract::State, response::Json};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use crate::core::synthesis::SynthesisRequest;
use crate::errors::AppResult;
use crate::state::AppState;

/// Handler for `DELETE /cache`
///
/// Takes the same body as `/synthesize` and drops the entry that request
/// would be served from.
pub async fn invalidate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SynthesisRequest>,
) -> AppResult<Json<Value>> {
    let key = state.core_state.coordinator.invalidate(&request).await?;
    info!("Invalidated cache entry {}", key);

    Ok(Json(json!({
        "invalidated": key.as_str(),
    })))
}
