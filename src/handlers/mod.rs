//! HTTP and WebSocket request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Liveness and health report endpoints
//! - `synthesize` - Single and bulk synthesis
//! - `pregenerate` - On-demand pregeneration and job status
//! - `cache` - Explicit cache invalidation
//! - `voices` - Voice profile listing
//! - `ws` - WebSocket streaming sessions

pub mod api;
pub mod cache;
pub mod pregenerate;
pub mod synthesize;
pub mod voices;
pub mod ws;

// Re-export commonly used handlers for convenient access
pub use ws::ws_stream_handler;
