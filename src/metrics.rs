//! Process-wide pipeline metrics.
//!
//! All counters are lock-free atomics so the detector hot path and the feed
//! tasks never contend. Min/max latency use compare-and-swap loops and are
//! exact under concurrent updaters; the average derived from the running sum
//! may lag by a few updates but is eventually consistent. Console reads are
//! relaxed and need not be linearizable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct PipelineMetrics {
    /// Number of detector rounds (one per acquired ingest signal)
    pub updates_processed: AtomicU64,
    /// Total opportunity records ever emitted
    pub opportunities_found: AtomicU64,
    /// Cumulative detection latency, for the average
    pub total_latency_us: AtomicU64,
    /// Maximum observed detection latency
    pub max_latency_us: AtomicU64,
    /// Minimum observed detection latency (u64::MAX until first sample)
    pub min_latency_us: AtomicU64,
    /// Venue messages dropped by the ingest adapters as malformed
    pub parse_errors: AtomicU64,
    /// Venue transport reconnect attempts
    pub reconnects: AtomicU64,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            updates_processed: AtomicU64::new(0),
            opportunities_found: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            max_latency_us: AtomicU64::new(0),
            min_latency_us: AtomicU64::new(u64::MAX),
            parse_errors: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    #[inline]
    pub fn increment_updates(&self) {
        self.updates_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_opportunities(&self) {
        self.opportunities_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one detection latency sample.
    #[inline]
    pub fn record_latency(&self, latency_us: u64) {
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);

        // Update max (CAS loop)
        let mut current = self.max_latency_us.load(Ordering::Relaxed);
        while latency_us > current {
            match self.max_latency_us.compare_exchange_weak(
                current,
                latency_us,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => current = x,
            }
        }

        // Update min (CAS loop)
        let mut current = self.min_latency_us.load(Ordering::Relaxed);
        while latency_us < current {
            match self.min_latency_us.compare_exchange_weak(
                current,
                latency_us,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => current = x,
            }
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Consistent-enough view for operator display.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let opportunities = self.opportunities_found.load(Ordering::Relaxed);
        let latency = if opportunities > 0 {
            Some(LatencyStats {
                min_us: self.min_latency_us.load(Ordering::Relaxed),
                avg_us: self.total_latency_us.load(Ordering::Relaxed) / opportunities,
                max_us: self.max_latency_us.load(Ordering::Relaxed),
            })
        } else {
            None
        };

        MetricsSnapshot {
            runtime_secs: self.start_time.elapsed().as_secs(),
            updates_processed: self.updates_processed.load(Ordering::Relaxed),
            opportunities_found: opportunities,
            latency,
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub runtime_secs: u64,
    pub updates_processed: u64,
    pub opportunities_found: u64,
    pub latency: Option<LatencyStats>,
    pub parse_errors: u64,
    pub reconnects: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct LatencyStats {
    pub min_us: u64,
    pub avg_us: u64,
    pub max_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn latency_min_max_track_extremes() {
        let m = PipelineMetrics::new();
        m.record_latency(50);
        m.record_latency(10);
        m.record_latency(400);
        m.record_latency(200);

        assert_eq!(m.min_latency_us.load(Ordering::Relaxed), 10);
        assert_eq!(m.max_latency_us.load(Ordering::Relaxed), 400);
        assert_eq!(m.total_latency_us.load(Ordering::Relaxed), 660);
    }

    #[test]
    fn snapshot_without_samples_has_no_latency() {
        let m = PipelineMetrics::new();
        let snap = m.snapshot();
        assert_eq!(snap.opportunities_found, 0);
        assert!(snap.latency.is_none());
    }

    #[test]
    fn min_avg_max_ordering_holds_under_concurrent_updates() {
        let m = Arc::new(PipelineMetrics::new());

        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    for i in 0..10_000u64 {
                        let sample = 1 + (i * 7 + t * 13) % 1_000;
                        m.record_latency(sample);
                        m.increment_opportunities();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = m.snapshot();
        assert_eq!(snap.opportunities_found, 40_000);
        let lat = snap.latency.unwrap();
        assert!(lat.min_us <= lat.avg_us && lat.avg_us <= lat.max_us);
        // The sample space is [1, 1000]; exact extremes must survive the races.
        assert_eq!(lat.min_us, 1);
        assert_eq!(lat.max_us, 1_000);
    }
}
