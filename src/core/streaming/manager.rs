use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::StreamingError;
use super::frames::{AudioFrame, chunk_duration_ms, segment};
use super::session::{SessionEvent, SessionState, StreamingSession};
use crate::core::synthesis::{AudioFormat, SynthesisCoordinator, SynthesisRequest};

const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct StreamingConfig {
    /// Maximum payload bytes per frame
    pub frame_bytes: usize,
    /// Sessions with no activity for longer than this are closed
    pub idle_timeout: Duration,
    pub max_sessions: usize,
    /// Outbound events buffered per session before synthesis waits
    pub outbound_buffer: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            frame_bytes: 4800,
            idle_timeout: Duration::from_secs(60),
            max_sessions: 1000,
            outbound_buffer: 64,
        }
    }
}

/// Parameters a client supplies when opening a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHandshake {
    pub session_id: String,
    pub voice_profile_id: String,
    pub language: String,
    pub format: AudioFormat,
}

pub struct StreamingSessionManager {
    coordinator: Arc<SynthesisCoordinator>,
    config: StreamingConfig,
    sessions: RwLock<HashMap<String, Arc<StreamingSession>>>,
}

impl StreamingSessionManager {
    pub fn new(coordinator: Arc<SynthesisCoordinator>, config: StreamingConfig) -> Self {
        Self {
            coordinator,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Validates the handshake and registers a `Ready` session.
    ///
    /// The returned receiver carries every frame, error and close event for
    /// the session.
    pub fn open(
        &self,
        handshake: SessionHandshake,
    ) -> Result<(Arc<StreamingSession>, mpsc::Receiver<SessionEvent>), StreamingError> {
        let SessionHandshake {
            session_id,
            voice_profile_id,
            language,
            format,
        } = handshake;

        if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
            return Err(StreamingError::Handshake(format!(
                "session id must be 1-{MAX_SESSION_ID_LEN} characters"
            )));
        }
        if !session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(StreamingError::Handshake(
                "session id may only contain letters, digits, '-', '_' and '.'".to_string(),
            ));
        }
        self.coordinator
            .voices()
            .resolve(&voice_profile_id, &language)
            .map_err(|e| StreamingError::Handshake(e.to_string()))?;

        let (tx, rx) = mpsc::channel(self.config.outbound_buffer.max(1));
        let session = Arc::new(StreamingSession::new(
            session_id.clone(),
            voice_profile_id,
            language,
            format,
            tx,
        ));

        {
            let mut sessions = self.sessions.write();
            if sessions.contains_key(&session_id) {
                return Err(StreamingError::Handshake(format!(
                    "session {session_id} is already active"
                )));
            }
            if sessions.len() >= self.config.max_sessions {
                return Err(StreamingError::Handshake(format!(
                    "session limit of {} reached",
                    self.config.max_sessions
                )));
            }
            sessions.insert(session_id.clone(), Arc::clone(&session));
        }

        session.transition(SessionState::Opening, SessionState::Ready);
        info!(
            "Streaming session {} opened ({} / {})",
            session_id,
            session.voice_profile_id(),
            session.language()
        );

        Ok((session, rx))
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<StreamingSession>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Starts a synthesis on the session.
    ///
    /// Fails immediately with `SessionBusy` unless the session is `Ready`.
    /// Frames, or an error event, are delivered on the session's channel.
    pub fn spawn_synthesis(
        &self,
        session_id: &str,
        text: String,
    ) -> Result<JoinHandle<()>, StreamingError> {
        let session = self
            .get(session_id)
            .ok_or_else(|| StreamingError::NotFound(session_id.to_string()))?;
        session.try_begin()?;
        session.touch();

        let request = SynthesisRequest::new(text, session.voice_profile_id(), session.language())
            .with_format(session.format())
            .with_trace_id(session.id());
        let coordinator = Arc::clone(&self.coordinator);
        let frame_bytes = match session.format() {
            // keep 16-bit samples whole
            AudioFormat::Pcm => (self.config.frame_bytes & !1).max(2),
            _ => self.config.frame_bytes.max(1),
        };

        Ok(tokio::spawn(async move {
            run_synthesis(session, coordinator, request, frame_bytes).await;
        }))
    }

    /// Closes a session, cancelling any in-flight synthesis.
    pub fn close(&self, session_id: &str, reason: &str) -> bool {
        let Some(session) = self.sessions.write().remove(session_id) else {
            return false;
        };

        session.begin_close();
        // A full buffer means the client is gone or stalled; nothing to wait for
        let _ = session.outbound().try_send(SessionEvent::Closed {
            reason: reason.to_string(),
        });
        session.mark_closed();

        info!("Streaming session {} closed: {}", session_id, reason);
        true
    }

    /// Closes sessions with no activity for longer than the idle timeout.
    ///
    /// A stream whose client stopped reading stops delivering frames and
    /// goes idle too, so it is swept along with sessions left in `Ready`.
    pub fn sweep_idle(&self) -> usize {
        let idle: Vec<String> = self
            .sessions
            .read()
            .values()
            .filter(|s| {
                matches!(
                    s.state(),
                    SessionState::Ready | SessionState::Synthesizing | SessionState::Streaming
                ) && s.idle_for() > self.config.idle_timeout
            })
            .map(|s| s.id().to_string())
            .collect();

        idle.iter()
            .filter(|id| self.close(id, "idle_timeout"))
            .count()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Closes every session.
    pub fn close_all(&self, reason: &str) {
        for id in self.session_ids() {
            self.close(&id, reason);
        }
    }
}

async fn run_synthesis(
    session: Arc<StreamingSession>,
    coordinator: Arc<SynthesisCoordinator>,
    request: SynthesisRequest,
    frame_bytes: usize,
) {
    let cancel = session.cancel_token().clone();

    let outcome = tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Synthesis on session {} cancelled", session.id());
            return;
        }
        outcome = coordinator.synthesize(&request) => outcome,
    };

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            warn!("Synthesis failed on session {}: {}", session.id(), e);
            let event = SessionEvent::Error {
                kind: e.kind(),
                message: e.to_string(),
            };
            let Some(permit) = reserve(&session, &cancel).await else {
                return;
            };
            // Ready before the client can see the outcome
            session.transition(SessionState::Synthesizing, SessionState::Ready);
            session.touch();
            permit.send(event);
            return;
        }
    };

    if !session.transition(SessionState::Synthesizing, SessionState::Streaming) {
        return;
    }

    let chunks = segment(&result.audio, frame_bytes);
    let last = chunks.len() - 1;
    for (i, payload) in chunks.into_iter().enumerate() {
        let frame = AudioFrame {
            sequence: session.next_sequence(),
            duration_ms: chunk_duration_ms(result.duration_ms, result.audio.len(), payload.len()),
            payload,
            is_final: i == last,
            processing_time_ms: result.processing_time_ms,
            cached: result.cached,
        };

        let Some(permit) = reserve(&session, &cancel).await else {
            return;
        };
        if frame.is_final {
            session.transition(SessionState::Streaming, SessionState::Ready);
        }
        session.touch();
        permit.send(SessionEvent::Frame(frame));
    }
}

/// Waits for room on the session channel. `None` if the session was closed
/// or its receiver dropped.
async fn reserve<'a>(
    session: &'a StreamingSession,
    cancel: &CancellationToken,
) -> Option<mpsc::Permit<'a, SessionEvent>> {
    tokio::select! {
        _ = cancel.cancelled() => None,
        permit = session.outbound().reserve() => match permit {
            Ok(permit) => Some(permit),
            Err(_) => {
                debug!("Session {} receiver dropped mid-stream", session.id());
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::{CacheConfig, CacheStore, CacheTtls};
    use crate::core::limiter::ConcurrencyLimiter;
    use crate::core::monitor::QualityMonitor;
    use crate::core::synthesis::{CoordinatorConfig, ErrorKind};
    use crate::core::tts::StubTTS;
    use crate::core::voices::VoiceRegistry;

    async fn manager(stub: Arc<StubTTS>, config: StreamingConfig) -> StreamingSessionManager {
        let cache = CacheStore::from_config(CacheConfig::default(), CacheTtls::default())
            .await
            .unwrap();
        let coordinator = SynthesisCoordinator::new(
            Arc::new(cache),
            Arc::new(ConcurrencyLimiter::new(10).unwrap()),
            stub,
            Arc::new(VoiceRegistry::default()),
            Arc::new(QualityMonitor::default()),
            CoordinatorConfig::default(),
        );
        StreamingSessionManager::new(Arc::new(coordinator), config)
    }

    fn handshake(id: &str) -> SessionHandshake {
        SessionHandshake {
            session_id: id.to_string(),
            voice_profile_id: "rachel".to_string(),
            language: "en".to_string(),
            format: AudioFormat::Pcm,
        }
    }

    #[tokio::test]
    async fn test_handshake_validation() {
        let manager = manager(Arc::new(StubTTS::new()), StreamingConfig::default()).await;

        let mut bad_voice = handshake("s1");
        bad_voice.voice_profile_id = "nobody".to_string();
        assert!(matches!(manager.open(bad_voice), Err(StreamingError::Handshake(_))));

        let mut bad_language = handshake("s1");
        bad_language.language = "de".to_string();
        assert!(matches!(manager.open(bad_language), Err(StreamingError::Handshake(_))));

        assert!(matches!(manager.open(handshake("bad id!")), Err(StreamingError::Handshake(_))));

        let (session, _rx) = manager.open(handshake("s1")).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert!(matches!(manager.open(handshake("s1")), Err(StreamingError::Handshake(_))));
        assert_eq!(manager.active_count(), 1);
    }

    #[tokio::test]
    async fn test_session_limit() {
        let config = StreamingConfig {
            max_sessions: 1,
            ..Default::default()
        };
        let manager = manager(Arc::new(StubTTS::new()), config).await;
        let _first = manager.open(handshake("a")).unwrap();
        let err = manager.open(handshake("b")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Handshake);
    }

    #[tokio::test]
    async fn test_frames_are_ordered_with_single_final() {
        let config = StreamingConfig {
            frame_bytes: 1000,
            ..Default::default()
        };
        let manager = manager(Arc::new(StubTTS::new()), config).await;
        let (session, mut rx) = manager.open(handshake("s1")).unwrap();

        manager
            .spawn_synthesis("s1", "Hello there".to_string())
            .unwrap()
            .await
            .unwrap();

        let mut frames = Vec::new();
        while let Ok(SessionEvent::Frame(frame)) = rx.try_recv() {
            frames.push(frame);
        }

        // 10 chars * 60ms * 48 bytes/ms
        let total: usize = frames.iter().map(|f| f.payload.len()).sum();
        assert_eq!(total, 28_800);
        assert_eq!(frames.len(), 29);
        assert!(frames.windows(2).all(|w| w[0].sequence < w[1].sequence));
        assert_eq!(frames.iter().filter(|f| f.is_final).count(), 1);
        assert!(frames.last().unwrap().is_final);
        assert_eq!(session.state(), SessionState::Ready);

        // next synthesis continues the sequence
        manager
            .spawn_synthesis("s1", "Hello there".to_string())
            .unwrap()
            .await
            .unwrap();
        let Ok(SessionEvent::Frame(next)) = rx.try_recv() else {
            panic!("expected frame");
        };
        assert!(next.cached);
        assert_eq!(next.sequence, 29);
    }

    #[tokio::test]
    async fn test_busy_session_rejects_second_request() {
        let stub = Arc::new(StubTTS::with_latency(Duration::from_millis(100)));
        let manager = manager(stub, StreamingConfig::default()).await;
        let (_session, mut rx) = manager.open(handshake("s1")).unwrap();

        let first = manager.spawn_synthesis("s1", "First".to_string()).unwrap();
        let second = manager.spawn_synthesis("s1", "Second".to_string());
        assert!(matches!(second, Err(StreamingError::SessionBusy(_))));

        // other sessions are unaffected
        let (_other, _other_rx) = manager.open(handshake("s2")).unwrap();
        assert!(manager.spawn_synthesis("s2", "Other".to_string()).is_ok());

        first.await.unwrap();
        assert!(matches!(rx.recv().await, Some(SessionEvent::Frame(_))));
    }

    #[tokio::test]
    async fn test_provider_failure_reports_error_and_returns_to_ready() {
        let stub = Arc::new(StubTTS::new());
        stub.set_fail_all(true);
        let manager = manager(stub, StreamingConfig::default()).await;
        let (session, mut rx) = manager.open(handshake("s1")).unwrap();

        manager
            .spawn_synthesis("s1", "Hello".to_string())
            .unwrap()
            .await
            .unwrap();

        match rx.recv().await {
            Some(SessionEvent::Error { kind, .. }) => assert_eq!(kind, ErrorKind::Provider),
            other => panic!("expected error event, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_close_cancels_in_flight_synthesis() {
        let stub = Arc::new(StubTTS::with_latency(Duration::from_secs(5)));
        let manager = manager(stub.clone(), StreamingConfig::default()).await;
        let (session, mut rx) = manager.open(handshake("s1")).unwrap();

        let task = manager.spawn_synthesis("s1", "Hello".to_string()).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(stub.in_flight(), 1);

        assert!(manager.close("s1", "client_close"));
        task.await.unwrap();

        assert_eq!(stub.in_flight(), 0);
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(manager.active_count(), 0);
        assert!(matches!(rx.recv().await, Some(SessionEvent::Closed { .. })));
        assert!(!manager.close("s1", "again"));
    }

    #[tokio::test]
    async fn test_sweep_idle() {
        let config = StreamingConfig {
            idle_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let manager = manager(Arc::new(StubTTS::new()), config).await;
        let (_session, mut rx) = manager.open(handshake("s1")).unwrap();

        assert_eq!(manager.sweep_idle(), 0);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(manager.sweep_idle(), 1);
        assert_eq!(manager.active_count(), 0);

        match rx.recv().await {
            Some(SessionEvent::Closed { reason }) => assert_eq!(reason, "idle_timeout"),
            other => panic!("expected close, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sweep_idle_closes_stalled_stream() {
        let config = StreamingConfig {
            frame_bytes: 100,
            outbound_buffer: 1,
            idle_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let manager = manager(Arc::new(StubTTS::new()), config).await;
        let (session, _rx) = manager.open(handshake("s1")).unwrap();

        // receiver is never read, so the stream stalls after one frame
        let task = manager.spawn_synthesis("s1", "Hello there".to_string()).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(session.state(), SessionState::Streaming);

        assert_eq!(manager.sweep_idle(), 1);
        assert_eq!(manager.active_count(), 0);
        assert_eq!(session.state(), SessionState::Closed);

        // the blocked synthesis task observes the cancellation and exits
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweep_idle_spares_active_stream() {
        let config = StreamingConfig {
            frame_bytes: 100,
            outbound_buffer: 1,
            idle_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let manager = manager(Arc::new(StubTTS::new()), config).await;
        let (_session, mut rx) = manager.open(handshake("s1")).unwrap();

        let task = manager.spawn_synthesis("s1", "Hello there".to_string()).unwrap();
        // a slow but steady reader keeps the session active
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(matches!(rx.recv().await, Some(SessionEvent::Frame(_))));
            assert_eq!(manager.sweep_idle(), 0);
        }

        task.abort();
    }
}
