//! Axum WebSocket handler
//!
//! Upgrades the connection, opens the streaming session and pumps session
//! events out to the client while reading client commands.

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::streaming::{SessionEvent, SessionHandshake, StreamingSessionManager};
use crate::core::synthesis::AudioFormat;
use crate::state::AppState;

use super::error::WebSocketError;
use super::messages::{IncomingMessage, OutgoingMessage};

/// Messages queued for the socket writer
const CHANNEL_BUFFER_SIZE: usize = 256;

/// How long pending messages get to flush once the session ends
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Query parameters accepted on upgrade.
#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    pub voice_profile_id: Option<String>,
    pub language: Option<String>,
    pub format: Option<String>,
}

impl StreamParams {
    fn into_handshake(self, session_id: String) -> Result<SessionHandshake, WebSocketError> {
        let voice_profile_id = self
            .voice_profile_id
            .filter(|v| !v.trim().is_empty())
            .ok_or(WebSocketError::MissingParameter("voice_profile_id"))?;
        let language = self
            .language
            .filter(|v| !v.trim().is_empty())
            .ok_or(WebSocketError::MissingParameter("language"))?;
        let format = match self.format {
            Some(raw) => {
                AudioFormat::parse(&raw).ok_or(WebSocketError::UnsupportedFormat(raw))?
            }
            None => AudioFormat::default(),
        };

        Ok(SessionHandshake {
            session_id,
            voice_profile_id,
            language,
            format,
        })
    }
}

/// WebSocket streaming handler
/// Upgrades the HTTP connection to WebSocket for a streaming session
pub async fn ws_stream_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    Query(params): Query<StreamParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("WebSocket upgrade requested for session {}", session_id);
    ws.on_upgrade(move |socket| handle_stream_socket(socket, session_id, params, state))
}

/// Handles one streaming connection from handshake to close.
async fn handle_stream_socket(
    socket: WebSocket,
    session_id: String,
    params: StreamParams,
    app_state: Arc<AppState>,
) {
    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<OutgoingMessage>(CHANNEL_BUFFER_SIZE);

    // Writer task: serialize and send in order, then close the socket
    let sender_task = tokio::spawn(async move {
        while let Some(message) = message_rx.recv().await {
            let json_str = match serde_json::to_string(&message) {
                Ok(json_str) => json_str,
                Err(e) => {
                    error!("Failed to serialize outgoing message: {}", e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json_str.into())).await {
                debug!("Failed to send WebSocket message: {}", e);
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let manager = Arc::clone(&app_state.core_state.sessions);

    // The handshake is checked in-band so the client learns why it was refused
    let opened = params
        .into_handshake(session_id.clone())
        .map_err(|e| (e.kind(), e.to_string()))
        .and_then(|handshake| {
            manager
                .open(handshake)
                .map_err(|e| (e.kind(), e.to_string()))
        });

    let mut events = match opened {
        Ok((_, events)) => events,
        Err((kind, message)) => {
            warn!("Rejected streaming session {}: {}", session_id, message);
            let _ = message_tx
                .send(OutgoingMessage::Error { kind, message })
                .await;
            drop(message_tx);
            finish(sender_task).await;
            return;
        }
    };

    let _ = message_tx
        .send(OutgoingMessage::Ready {
            session_id: session_id.clone(),
        })
        .await;

    loop {
        select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    SessionEvent::Frame(frame) => {
                        if message_tx.send(frame.into()).await.is_err() {
                            break;
                        }
                    }
                    SessionEvent::Error { kind, message } => {
                        let _ = message_tx.send(OutgoingMessage::Error { kind, message }).await;
                    }
                    SessionEvent::Closed { reason } => {
                        let _ = message_tx
                            .send(OutgoingMessage::SessionClosed {
                                session_id: session_id.clone(),
                                reason,
                            })
                            .await;
                        break;
                    }
                }
            }
            msg_result = receiver.next() => {
                match msg_result {
                    Some(Ok(msg)) => {
                        if !process_message(msg, &session_id, &manager, &message_tx).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error on session {}: {}", session_id, e);
                        manager.close(&session_id, "connection_error");
                        break;
                    }
                    None => {
                        info!("WebSocket connection for session {} closed by client", session_id);
                        manager.close(&session_id, "disconnected");
                        break;
                    }
                }
            }
        }
    }

    // No-op when the session already closed
    manager.close(&session_id, "connection_closed");
    drop(message_tx);
    finish(sender_task).await;

    info!("WebSocket connection for session {} terminated", session_id);
}

/// Process one inbound WebSocket message
///
/// Returns `false` when the connection should end.
async fn process_message(
    msg: Message,
    session_id: &str,
    manager: &StreamingSessionManager,
    message_tx: &mpsc::Sender<OutgoingMessage>,
) -> bool {
    let incoming = match msg {
        Message::Text(text) => match serde_json::from_str::<IncomingMessage>(&text) {
            Ok(incoming) => incoming,
            Err(e) => {
                send_error(message_tx, WebSocketError::InvalidMessage(e.to_string())).await;
                return true;
            }
        },
        Message::Binary(_) => {
            send_error(message_tx, WebSocketError::BinaryNotSupported).await;
            return true;
        }
        Message::Ping(_) | Message::Pong(_) => return true,
        Message::Close(_) => {
            info!("Session {} closed by client", session_id);
            manager.close(session_id, "disconnected");
            return false;
        }
    };

    match incoming {
        IncomingMessage::Synthesize { text } => {
            debug!("Session {}: synthesize {} chars", session_id, text.len());
            if let Err(e) = manager.spawn_synthesis(session_id, text) {
                let _ = message_tx
                    .send(OutgoingMessage::Error {
                        kind: e.kind(),
                        message: e.to_string(),
                    })
                    .await;
            }
            true
        }
        IncomingMessage::Close => {
            manager.close(session_id, "client_close");
            let _ = message_tx
                .send(OutgoingMessage::SessionClosed {
                    session_id: session_id.to_string(),
                    reason: "client_close".to_string(),
                })
                .await;
            false
        }
    }
}

async fn send_error(message_tx: &mpsc::Sender<OutgoingMessage>, err: WebSocketError) {
    let _ = message_tx
        .send(OutgoingMessage::Error {
            kind: err.kind(),
            message: err.to_string(),
        })
        .await;
}

/// Waits for queued messages to drain, then gives up on the writer.
async fn finish(sender_task: tokio::task::JoinHandle<()>) {
    let abort = sender_task.abort_handle();
    if tokio::time::timeout(FLUSH_TIMEOUT, sender_task).await.is_err() {
        abort.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(voice: Option<&str>, language: Option<&str>, format: Option<&str>) -> StreamParams {
        StreamParams {
            voice_profile_id: voice.map(str::to_string),
            language: language.map(str::to_string),
            format: format.map(str::to_string),
        }
    }

    #[test]
    fn test_handshake_from_params() {
        let handshake = params(Some("rachel"), Some("en"), Some("mp3"))
            .into_handshake("s1".to_string())
            .unwrap();
        assert_eq!(handshake.voice_profile_id, "rachel");
        assert_eq!(handshake.format, AudioFormat::Mp3);

        let default_format = params(Some("rachel"), Some("en"), None)
            .into_handshake("s1".to_string())
            .unwrap();
        assert_eq!(default_format.format, AudioFormat::Pcm);
    }

    #[test]
    fn test_handshake_rejects_missing_or_bad_params() {
        assert_eq!(
            params(None, Some("en"), None).into_handshake("s1".to_string()),
            Err(WebSocketError::MissingParameter("voice_profile_id"))
        );
        assert_eq!(
            params(Some("rachel"), Some(" "), None).into_handshake("s1".to_string()),
            Err(WebSocketError::MissingParameter("language"))
        );
        assert_eq!(
            params(Some("rachel"), Some("en"), Some("flac")).into_handshake("s1".to_string()),
            Err(WebSocketError::UnsupportedFormat("flac".to_string()))
        );
    }
}
