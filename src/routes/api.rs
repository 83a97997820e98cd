use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, cache, pregenerate, synthesize, voices};
use crate::state::AppState;
use std::sync::Arc;

pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(api::health_report))
        .route("/voices", get(voices::list_voices))
        .route("/synthesize", post(synthesize::synthesize_handler))
        .route("/synthesize/bulk", post(synthesize::bulk_synthesize_handler))
        .route("/pregenerate", post(pregenerate::pregenerate_handler))
        .route("/jobs/{id}", get(pregenerate::job_status_handler))
        .route("/cache", delete(cache::invalidate_handler))
        .layer(TraceLayer::new_for_http())
}
