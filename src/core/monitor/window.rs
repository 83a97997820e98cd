use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::core::synthesis::ErrorKind;

/// How the cache participated in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOutcome {
    Hit,
    Miss,
    /// Caching disabled for the request, or it failed before the lookup
    Bypassed,
}

/// One coordinator call as seen by the monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSample {
    pub latency_ms: u64,
    pub cache: CacheOutcome,
    /// Present for successful calls
    pub quality: Option<f32>,
    /// Present for failed calls
    pub error: Option<ErrorKind>,
}

impl RequestSample {
    pub fn success(latency_ms: u64, cache: CacheOutcome, quality: f32) -> Self {
        Self {
            latency_ms,
            cache,
            quality: Some(quality),
            error: None,
        }
    }

    pub fn failure(latency_ms: u64, cache: CacheOutcome, kind: ErrorKind) -> Self {
        Self {
            latency_ms,
            cache,
            quality: None,
            error: Some(kind),
        }
    }
}

/// Number of buckets in [`WindowSnapshot::quality_histogram`].
pub const QUALITY_BUCKETS: usize = 5;

/// Aggregates over the live portion of a [`PerformanceWindow`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub total: usize,
    pub errors: usize,
    pub error_rate: f64,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// `None` until at least one request consulted the cache
    pub cache_hit_rate: Option<f64>,
    pub avg_latency_ms: f64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
    pub p99_latency_ms: u64,
    pub over_sla: usize,
    pub over_sla_rate: f64,
    pub quality_samples: usize,
    pub avg_quality: Option<f64>,
    pub low_quality_rate: f64,
    /// Counts of quality scores in [0, 0.2), [0.2, 0.4), ... [0.8, 1.0]
    pub quality_histogram: [usize; QUALITY_BUCKETS],
}

/// Trailing window bounded by both age and sample count.
#[derive(Debug)]
pub struct PerformanceWindow {
    samples: VecDeque<(Instant, RequestSample)>,
    max_age: Duration,
    max_samples: usize,
}

impl PerformanceWindow {
    pub fn new(max_age: Duration, max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples.min(1024)),
            max_age,
            max_samples: max_samples.max(1),
        }
    }

    pub fn push(&mut self, sample: RequestSample) {
        self.push_at(Instant::now(), sample);
    }

    pub fn push_at(&mut self, at: Instant, sample: RequestSample) {
        self.samples.push_back((at, sample));
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
        self.prune(at);
    }

    /// Drops samples older than the window.
    pub fn prune(&mut self, now: Instant) {
        while let Some((at, _)) = self.samples.front() {
            if now.saturating_duration_since(*at) > self.max_age {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Full aggregates, including latency percentiles.
    pub fn snapshot(&self, latency_sla_ms: u64, quality_floor: f32) -> WindowSnapshot {
        let mut snapshot = self.rates(latency_sla_ms, quality_floor);
        if snapshot.total == 0 {
            return snapshot;
        }

        let mut latencies: Vec<u64> = self.samples.iter().map(|(_, s)| s.latency_ms).collect();
        latencies.sort_unstable();
        snapshot.p50_latency_ms = percentile(&latencies, 50.0);
        snapshot.p95_latency_ms = percentile(&latencies, 95.0);
        snapshot.p99_latency_ms = percentile(&latencies, 99.0);
        snapshot
    }

    /// Counts and rates in one pass, without percentiles.
    pub fn rates(&self, latency_sla_ms: u64, quality_floor: f32) -> WindowSnapshot {
        let total = self.samples.len();
        if total == 0 {
            return WindowSnapshot::default();
        }

        let mut snapshot = WindowSnapshot {
            total,
            ..Default::default()
        };
        let mut latency_sum = 0u64;
        let mut quality_sum = 0f64;
        let mut low_quality = 0usize;

        for (_, sample) in &self.samples {
            latency_sum += sample.latency_ms;
            if sample.latency_ms > latency_sla_ms {
                snapshot.over_sla += 1;
            }
            if sample.error.is_some() {
                snapshot.errors += 1;
            }
            match sample.cache {
                CacheOutcome::Hit => snapshot.cache_hits += 1,
                CacheOutcome::Miss => snapshot.cache_misses += 1,
                CacheOutcome::Bypassed => {}
            }
            if let Some(quality) = sample.quality {
                snapshot.quality_samples += 1;
                quality_sum += quality as f64;
                if quality < quality_floor {
                    low_quality += 1;
                }
                let bucket = ((quality.clamp(0.0, 1.0) * QUALITY_BUCKETS as f32) as usize)
                    .min(QUALITY_BUCKETS - 1);
                snapshot.quality_histogram[bucket] += 1;
            }
        }

        snapshot.avg_latency_ms = latency_sum as f64 / total as f64;
        snapshot.over_sla_rate = snapshot.over_sla as f64 / total as f64;
        snapshot.error_rate = snapshot.errors as f64 / total as f64;

        let lookups = snapshot.cache_hits + snapshot.cache_misses;
        if lookups > 0 {
            snapshot.cache_hit_rate = Some(snapshot.cache_hits as f64 / lookups as f64);
        }
        if snapshot.quality_samples > 0 {
            snapshot.avg_quality = Some(quality_sum / snapshot.quality_samples as f64);
            snapshot.low_quality_rate = low_quality as f64 / snapshot.quality_samples as f64;
        }

        snapshot
    }
}

/// Nearest-rank percentile of sorted values.
fn percentile(sorted: &[u64], pct: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
