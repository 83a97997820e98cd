use serde::{Deserialize, Serialize};
use std::fmt;

use super::window::WindowSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Too many requests over the latency SLA
    Latency,
    /// Too many results under the quality floor
    Quality,
    ErrorRate,
    /// Cache hit rate under the minimum
    CacheRate,
}

impl AlertKind {
    pub const ALL: [AlertKind; 4] = [
        AlertKind::Latency,
        AlertKind::Quality,
        AlertKind::ErrorRate,
        AlertKind::CacheRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Latency => "latency",
            AlertKind::Quality => "quality",
            AlertKind::ErrorRate => "error_rate",
            AlertKind::CacheRate => "cache_rate",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyAlert {
    pub kind: AlertKind,
    pub scope: String,
    pub observed: f64,
    pub threshold: f64,
    /// Unix timestamp in milliseconds
    pub raised_at_ms: u64,
}

/// Alert state transition published by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AlertEvent {
    Raised(AnomalyAlert),
    Cleared {
        kind: AlertKind,
        scope: String,
        observed: f64,
        threshold: f64,
        cleared_at_ms: u64,
    },
}

impl AlertEvent {
    pub fn kind(&self) -> AlertKind {
        match self {
            AlertEvent::Raised(alert) => alert.kind,
            AlertEvent::Cleared { kind, .. } => *kind,
        }
    }

    pub fn scope(&self) -> &str {
        match self {
            AlertEvent::Raised(alert) => &alert.scope,
            AlertEvent::Cleared { scope, .. } => scope,
        }
    }
}

/// Anomaly thresholds. Fractions are in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorThresholds {
    pub latency_sla_ms: u64,
    pub max_over_sla_fraction: f64,
    pub quality_floor: f32,
    pub max_low_quality_fraction: f64,
    pub max_error_rate: f64,
    pub min_cache_hit_rate: f64,
    /// Samples a metric needs before it can raise an alert
    pub min_samples: usize,
}

impl Default for MonitorThresholds {
    fn default() -> Self {
        Self {
            latency_sla_ms: 2000,
            max_over_sla_fraction: 0.10,
            quality_floor: 0.8,
            max_low_quality_fraction: 0.05,
            max_error_rate: 0.05,
            min_cache_hit_rate: 0.30,
            min_samples: 20,
        }
    }
}

/// Outcome of checking one metric against its threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Evaluation {
    pub breached: bool,
    pub observed: f64,
    pub threshold: f64,
}

impl MonitorThresholds {
    /// Checks one metric. A metric without enough samples is never breached,
    /// so an alert raised earlier clears once its window drains.
    pub(crate) fn evaluate(&self, kind: AlertKind, snapshot: &WindowSnapshot) -> Evaluation {
        let enough = |n: usize| n >= self.min_samples.max(1);

        let (observed, threshold, breached) = match kind {
            AlertKind::Latency => {
                let t = self.max_over_sla_fraction;
                let rate = snapshot.over_sla_rate;
                (rate, t, enough(snapshot.total) && rate > t)
            }
            AlertKind::Quality => {
                let t = self.max_low_quality_fraction;
                let rate = snapshot.low_quality_rate;
                (rate, t, enough(snapshot.quality_samples) && rate > t)
            }
            AlertKind::ErrorRate => {
                let t = self.max_error_rate;
                let rate = snapshot.error_rate;
                (rate, t, enough(snapshot.total) && rate > t)
            }
            AlertKind::CacheRate => {
                let t = self.min_cache_hit_rate;
                match snapshot.cache_hit_rate {
                    Some(rate) => (
                        rate,
                        t,
                        enough(snapshot.cache_hits + snapshot.cache_misses) && rate < t,
                    ),
                    None => (0.0, t, false),
                }
            }
        };

        Evaluation {
            breached,
            observed,
            threshold,
        }
    }
}
