use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;

use crate::core::voices::VoiceProfile;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceProfile>,
}

/// Lists the configured voice profiles in declaration order.
pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<VoicesResponse> {
    Json(VoicesResponse {
        voices: state.core_state.voices.profiles().to_vec(),
    })
}
