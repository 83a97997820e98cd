//! Quality and anomaly monitor.
//!
//! Every coordinator call lands here as one [`RequestSample`]. Samples are
//! folded into a per-scope [`PerformanceWindow`]; after each sample, and on
//! every [`QualityMonitor::refresh`], the scope's metrics are checked against
//! [`MonitorThresholds`] and an [`AlertEvent`] is published only when a
//! metric crosses its threshold in either direction.

pub mod alerts;
pub mod forwarder;
pub mod window;

pub use alerts::{AlertEvent, AlertKind, AnomalyAlert, MonitorThresholds};
pub use forwarder::spawn_alert_forwarder;
pub use window::{CacheOutcome, PerformanceWindow, RequestSample, WindowSnapshot};

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tracing::{info, warn};

pub const DEFAULT_SCOPE: &str = "default";

const ALERT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub thresholds: MonitorThresholds,
    pub window: Duration,
    pub max_samples: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            thresholds: MonitorThresholds::default(),
            window: Duration::from_secs(300),
            max_samples: 1000,
        }
    }
}

/// Outcome counts of provider calls for one voice profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderAttempts {
    pub succeeded: u64,
    pub failed: u64,
    pub total_ms: u64,
}

struct ScopeState {
    window: PerformanceWindow,
    active: HashMap<AlertKind, AnomalyAlert>,
}

pub struct QualityMonitor {
    config: MonitorConfig,
    scopes: Mutex<HashMap<String, ScopeState>>,
    attempts: Mutex<HashMap<String, ProviderAttempts>>,
    events: broadcast::Sender<AlertEvent>,
}

impl QualityMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let (events, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        Self {
            config,
            scopes: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Receives every alert transition published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.events.subscribe()
    }

    /// Records one request and returns the alert transitions it caused.
    pub fn record(&self, scope: &str, sample: RequestSample) -> Vec<AlertEvent> {
        self.record_at(scope, sample, Instant::now())
    }

    pub fn record_at(&self, scope: &str, sample: RequestSample, at: Instant) -> Vec<AlertEvent> {
        let transitions = {
            let mut scopes = self.scopes.lock();
            let state = scopes
                .entry(scope.to_string())
                .or_insert_with(|| ScopeState {
                    window: PerformanceWindow::new(self.config.window, self.config.max_samples),
                    active: HashMap::new(),
                });
            state.window.push_at(at, sample);
            self.evaluate(scope, state)
        };

        self.publish(&transitions);
        transitions
    }

    /// Ages every window and re-checks its alerts.
    ///
    /// Alerts otherwise only change when a request is recorded; this lets a
    /// raised alert clear after traffic stops.
    pub fn refresh(&self) -> Vec<AlertEvent> {
        self.refresh_at(Instant::now())
    }

    pub fn refresh_at(&self, now: Instant) -> Vec<AlertEvent> {
        let transitions: Vec<AlertEvent> = {
            let mut scopes = self.scopes.lock();
            scopes
                .iter_mut()
                .flat_map(|(scope, state)| {
                    state.window.prune(now);
                    self.evaluate(scope, state)
                })
                .collect()
        };

        self.publish(&transitions);
        transitions
    }

    fn publish(&self, transitions: &[AlertEvent]) {
        for event in transitions {
            match event {
                AlertEvent::Raised(alert) => warn!(
                    "Anomaly raised [{}] {}: observed {:.3}, threshold {:.3}",
                    alert.scope, alert.kind, alert.observed, alert.threshold
                ),
                AlertEvent::Cleared {
                    kind,
                    scope,
                    observed,
                    ..
                } => info!("Anomaly cleared [{}] {}: observed {:.3}", scope, kind, observed),
            }
            // No receivers is fine
            let _ = self.events.send(event.clone());
        }
    }

    fn evaluate(&self, scope: &str, state: &mut ScopeState) -> Vec<AlertEvent> {
        let thresholds = &self.config.thresholds;
        let rates = state
            .window
            .rates(thresholds.latency_sla_ms, thresholds.quality_floor);
        let now_ms = unix_millis();
        let mut transitions = Vec::new();

        for kind in AlertKind::ALL {
            let evaluation = thresholds.evaluate(kind, &rates);

            match (evaluation.breached, state.active.contains_key(&kind)) {
                (true, false) => {
                    let alert = AnomalyAlert {
                        kind,
                        scope: scope.to_string(),
                        observed: evaluation.observed,
                        threshold: evaluation.threshold,
                        raised_at_ms: now_ms,
                    };
                    state.active.insert(kind, alert.clone());
                    transitions.push(AlertEvent::Raised(alert));
                }
                (false, true) => {
                    state.active.remove(&kind);
                    transitions.push(AlertEvent::Cleared {
                        kind,
                        scope: scope.to_string(),
                        observed: evaluation.observed,
                        threshold: evaluation.threshold,
                        cleared_at_ms: now_ms,
                    });
                }
                _ => {}
            }
        }

        transitions
    }

    /// Records the outcome of one provider call for `profile_id`.
    pub fn record_attempt(&self, profile_id: &str, succeeded: bool, elapsed_ms: u64) {
        let mut attempts = self.attempts.lock();
        let entry = attempts.entry(profile_id.to_string()).or_default();
        if succeeded {
            entry.succeeded += 1;
        } else {
            entry.failed += 1;
        }
        entry.total_ms += elapsed_ms;
    }

    pub fn provider_attempts(&self) -> BTreeMap<String, ProviderAttempts> {
        self.attempts
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn snapshot(&self, scope: &str) -> Option<WindowSnapshot> {
        self.refresh();
        let thresholds = &self.config.thresholds;
        let scopes = self.scopes.lock();
        let state = scopes.get(scope)?;
        Some(
            state
                .window
                .snapshot(thresholds.latency_sla_ms, thresholds.quality_floor),
        )
    }

    pub fn snapshots(&self) -> BTreeMap<String, WindowSnapshot> {
        self.refresh();
        let thresholds = &self.config.thresholds;
        let scopes = self.scopes.lock();
        scopes
            .iter()
            .map(|(scope, state)| {
                (
                    scope.clone(),
                    state
                        .window
                        .snapshot(thresholds.latency_sla_ms, thresholds.quality_floor),
                )
            })
            .collect()
    }

    /// Alerts currently in the raised state, across all scopes.
    pub fn active_alerts(&self) -> Vec<AnomalyAlert> {
        let scopes = self.scopes.lock();
        let mut alerts: Vec<AnomalyAlert> = scopes
            .values()
            .flat_map(|state| state.active.values().cloned())
            .collect();
        alerts.sort_by(|a, b| a.scope.cmp(&b.scope).then(a.kind.cmp(&b.kind)));
        alerts
    }
}

impl Default for QualityMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synthesis::ErrorKind;

    fn monitor(min_samples: usize, max_samples: usize) -> QualityMonitor {
        QualityMonitor::new(MonitorConfig {
            thresholds: MonitorThresholds {
                min_samples,
                // keep other alerts quiet
                min_cache_hit_rate: 0.0,
                ..Default::default()
            },
            window: Duration::from_secs(300),
            max_samples,
        })
    }

    fn fast() -> RequestSample {
        RequestSample::success(100, CacheOutcome::Miss, 0.95)
    }

    fn slow() -> RequestSample {
        RequestSample::success(2500, CacheOutcome::Miss, 0.95)
    }

    #[test]
    fn test_latency_alert_is_edge_triggered() {
        let monitor = monitor(10, 10);
        let mut rx = monitor.subscribe();

        for _ in 0..10 {
            assert!(monitor.record(DEFAULT_SCOPE, fast()).is_empty());
        }

        // Second slow sample pushes over-SLA fraction to 0.2 > 0.1
        assert!(monitor.record(DEFAULT_SCOPE, slow()).is_empty());
        let raised = monitor.record(DEFAULT_SCOPE, slow());
        assert_eq!(raised.len(), 1);
        assert!(matches!(&raised[0], AlertEvent::Raised(a) if a.kind == AlertKind::Latency));

        // Still breached: no duplicates
        for _ in 0..5 {
            assert!(monitor.record(DEFAULT_SCOPE, slow()).is_empty());
        }
        assert_eq!(monitor.active_alerts().len(), 1);

        // Recover once the slow samples age out of the 10-sample window
        let mut cleared = Vec::new();
        for _ in 0..10 {
            cleared.extend(monitor.record(DEFAULT_SCOPE, fast()));
        }
        assert_eq!(cleared.len(), 1);
        assert!(matches!(
            &cleared[0],
            AlertEvent::Cleared { kind: AlertKind::Latency, .. }
        ));
        assert!(monitor.active_alerts().is_empty());

        assert_eq!(rx.try_recv().unwrap().kind(), AlertKind::Latency);
        assert!(matches!(rx.try_recv().unwrap(), AlertEvent::Cleared { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_scopes_are_independent() {
        let monitor = monitor(2, 100);

        for _ in 0..3 {
            monitor.record(
                "tenant-a",
                RequestSample::failure(10, CacheOutcome::Bypassed, ErrorKind::Provider),
            );
            monitor.record("tenant-b", fast());
        }

        let alerts = monitor.active_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].scope, "tenant-a");
        assert_eq!(alerts[0].kind, AlertKind::ErrorRate);

        let snapshots = monitor.snapshots();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots["tenant-a"].errors, 3);
        assert_eq!(snapshots["tenant-b"].errors, 0);
    }

    #[test]
    fn test_no_alerts_below_min_samples() {
        let monitor = monitor(20, 100);
        for _ in 0..19 {
            assert!(monitor.record(DEFAULT_SCOPE, slow()).is_empty());
        }
        assert_eq!(monitor.record(DEFAULT_SCOPE, slow()).len(), 1);
    }

    #[test]
    fn test_alert_clears_when_failures_age_out() {
        let monitor = monitor(20, 100);
        let start = Instant::now();

        for _ in 0..20 {
            monitor.record_at(
                DEFAULT_SCOPE,
                RequestSample::failure(10, CacheOutcome::Bypassed, ErrorKind::Provider),
                start,
            );
        }
        assert_eq!(monitor.active_alerts()[0].kind, AlertKind::ErrorRate);

        // failures have left the 300s window; five successes are under min_samples
        let later = start + Duration::from_secs(600);
        let mut cleared = Vec::new();
        for _ in 0..5 {
            cleared.extend(monitor.record_at(DEFAULT_SCOPE, fast(), later));
        }

        assert_eq!(cleared.len(), 1);
        assert!(matches!(
            &cleared[0],
            AlertEvent::Cleared { kind: AlertKind::ErrorRate, observed, .. } if *observed == 0.0
        ));
        assert!(monitor.active_alerts().is_empty());
    }

    #[test]
    fn test_refresh_clears_alert_without_traffic() {
        let monitor = QualityMonitor::new(MonitorConfig {
            thresholds: MonitorThresholds {
                min_samples: 5,
                min_cache_hit_rate: 0.0,
                ..Default::default()
            },
            window: Duration::from_secs(300),
            max_samples: 100,
        });
        let mut rx = monitor.subscribe();
        let start = Instant::now();

        for _ in 0..5 {
            monitor.record_at(
                DEFAULT_SCOPE,
                RequestSample::failure(10, CacheOutcome::Bypassed, ErrorKind::Timeout),
                start,
            );
        }
        assert!(matches!(rx.try_recv().unwrap(), AlertEvent::Raised(_)));

        assert!(monitor.refresh_at(start + Duration::from_secs(10)).is_empty());
        assert_eq!(monitor.active_alerts().len(), 1);

        let cleared = monitor.refresh_at(start + Duration::from_secs(301));
        assert_eq!(cleared.len(), 1);
        assert!(monitor.active_alerts().is_empty());
        assert!(matches!(
            rx.try_recv().unwrap(),
            AlertEvent::Cleared { kind: AlertKind::ErrorRate, .. }
        ));
        assert_eq!(monitor.snapshots()[DEFAULT_SCOPE].total, 0);
    }

    #[test]
    fn test_provider_attempts() {
        let monitor = QualityMonitor::default();
        monitor.record_attempt("rachel", false, 30);
        monitor.record_attempt("rachel", true, 20);
        monitor.record_attempt("adam", true, 10);

        let attempts = monitor.provider_attempts();
        assert_eq!(attempts["rachel"].failed, 1);
        assert_eq!(attempts["rachel"].succeeded, 1);
        assert_eq!(attempts["rachel"].total_ms, 50);
        assert_eq!(attempts["adam"].succeeded, 1);
    }
}
