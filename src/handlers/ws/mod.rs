//! # WebSocket Streaming Module
//!
//! Exposes streaming sessions over WebSocket. Each connection owns exactly one
//! session, opened from the URL during the upgrade.
//!
//! ## Connection Flow
//! 1. Client connects to `/ws/{session_id}?voice_profile_id=rachel&language=en&format=pcm`
//! 2. Server validates the handshake and replies `ready`, or sends an
//!    `error` with kind `handshake` and closes
//! 3. Client sends `synthesize` messages; audio comes back as ordered
//!    `audio_frame` messages, the last one with `is_final: true`
//! 4. Client sends `close` (or disconnects); the server answers
//!    `session_closed` and ends the connection
//!
//! ### Message Types
//!
//! **Incoming Messages:**
//! - `{"type": "synthesize", "text": "Hello"}` - Synthesize text on this session
//! - `{"type": "close"}` - End the session
//!
//! **Outgoing Messages:**
//! - `{"type": "ready", "session_id": "abc"}` - Session is open
//! - `{"type": "audio_frame", "sequence": 0, "payload": "<base64>", "is_final": false, "duration_ms": 100, "processing_time_ms": 42, "cached": false}`
//! - `{"type": "error", "kind": "session_busy", "message": "..."}` - A request failed; the session stays open
//! - `{"type": "session_closed", "session_id": "abc", "reason": "client_close"}`
//!
//! A session runs one synthesis at a time. A `synthesize` sent while another
//! is still streaming is answered with an `error` of kind `session_busy`.
//!
//! ## Rust Client Example
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use serde_json::json;
//! use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let url = "ws://localhost:3001/ws/call-42?voice_profile_id=rachel&language=en";
//!     let (ws_stream, _) = connect_async(url).await?;
//!     let (mut write, mut read) = ws_stream.split();
//!
//!     while let Some(message) = read.next().await {
//!         if let Message::Text(text) = message? {
//!             let parsed: serde_json::Value = serde_json::from_str(&text)?;
//!             match parsed["type"].as_str() {
//!                 Some("ready") => {
//!                     let request = json!({"type": "synthesize", "text": "Hello!"});
//!                     write.send(Message::Text(request.to_string().into())).await?;
//!                 }
//!                 Some("audio_frame") if parsed["is_final"] == true => {
//!                     write.send(Message::Text(json!({"type": "close"}).to_string().into())).await?;
//!                 }
//!                 Some("session_closed") => break,
//!                 _ => {}
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod handler;
pub mod messages;

// Re-export commonly used items
pub use error::WebSocketError;
pub use handler::{StreamParams, ws_stream_handler};
pub use messages::{IncomingMessage, OutgoingMessage};
