pub mod api;
pub mod ws;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::handlers;
use crate::state::AppState;

/// Builds the complete application router: liveness, REST API and
/// WebSocket streaming.
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::api::health_check))
        .merge(api::create_api_router())
        .merge(ws::create_ws_router())
        .with_state(state)
}
