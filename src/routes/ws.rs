use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::ws;
use crate::state::AppState;
use std::sync::Arc;

/// Create the WebSocket router
///
/// `/ws/{session_id}` opens one streaming session per connection. The
/// session id is chosen by the client and must be unique among live sessions.
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/{session_id}", get(ws::ws_stream_handler))
        .layer(TraceLayer::new_for_http())
}
