//! Round-trip time aggregation.
//!
//! Every ACK received by the listener yields one sample; the tracker keeps
//! running totals and publishes a fresh snapshot per sample.

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::core::constants::RTT_LOG_INTERVAL;

const NANOS_PER_MILLI: i64 = 1_000_000;

/// A snapshot of round-trip statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct RttStats {
    /// Mean round-trip time, truncated to whole milliseconds.
    pub average_ms: f64,
    /// Smallest sample in milliseconds, -1 before the first sample.
    pub min_ms: i64,
    /// Largest sample in milliseconds, -1 before the first sample.
    pub max_ms: i64,
    /// Number of samples aggregated.
    pub count: u32,
}

impl fmt::Display for RttStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min = if self.min_ms == -1 {
            "N/A".to_owned()
        } else {
            format!("{}ms", self.min_ms)
        };
        let max = if self.max_ms == -1 {
            "N/A".to_owned()
        } else {
            format!("{}ms", self.max_ms)
        };
        write!(
            f,
            "Avg={:.2}ms, Min={}, Max={} (Count={})",
            self.average_ms, min, max, self.count
        )
    }
}

/// Aggregates round-trip samples into running statistics.
///
/// `record` is safe to call concurrently; each accumulator is an atomic and
/// the published snapshot is recomputed from their current values. Reset
/// happens only at the start of a fresh connect.
#[derive(Debug)]
pub struct RttTracker {
    sum_nanos: AtomicI64,
    count: AtomicU32,
    /// `i64::MAX` while no sample has been recorded.
    min_nanos: AtomicI64,
    /// 0 while no sample has been recorded.
    max_nanos: AtomicI64,
    stats_tx: watch::Sender<Option<RttStats>>,
}

impl RttTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        let (stats_tx, _) = watch::channel(None);
        Self {
            sum_nanos: AtomicI64::new(0),
            count: AtomicU32::new(0),
            min_nanos: AtomicI64::new(i64::MAX),
            max_nanos: AtomicI64::new(0),
            stats_tx,
        }
    }

    /// Fold one round-trip sample into the statistics and publish the
    /// updated snapshot.
    pub fn record(&self, rtt_nanos: i64) {
        let sum = self.sum_nanos.fetch_add(rtt_nanos, Ordering::SeqCst) + rtt_nanos;
        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        self.min_nanos.fetch_min(rtt_nanos, Ordering::SeqCst);
        self.max_nanos.fetch_max(rtt_nanos, Ordering::SeqCst);

        let average_ms = (sum / i64::from(count) / NANOS_PER_MILLI) as f64;
        let min = self.min_nanos.load(Ordering::SeqCst);
        let max = self.max_nanos.load(Ordering::SeqCst);

        let stats = RttStats {
            average_ms,
            min_ms: if min == i64::MAX {
                -1
            } else {
                min / NANOS_PER_MILLI
            },
            max_ms: if max == 0 { -1 } else { max / NANOS_PER_MILLI },
            count,
        };

        if count % RTT_LOG_INTERVAL == 0 {
            info!(%stats, "round-trip statistics");
        }
        self.stats_tx.send_replace(Some(stats));
    }

    /// The most recent snapshot, `None` before the first sample.
    pub fn snapshot(&self) -> Option<RttStats> {
        self.stats_tx.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<Option<RttStats>> {
        self.stats_tx.subscribe()
    }

    /// Clear all accumulators and publish an empty snapshot.
    pub fn reset(&self) {
        self.sum_nanos.store(0, Ordering::SeqCst);
        self.count.store(0, Ordering::SeqCst);
        self.min_nanos.store(i64::MAX, Ordering::SeqCst);
        self.max_nanos.store(0, Ordering::SeqCst);
        self.stats_tx.send_replace(None);
        debug!("round-trip statistics reset");
    }
}

impl Default for RttTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: i64 = NANOS_PER_MILLI;

    #[test]
    fn test_no_samples_no_snapshot() {
        let tracker = RttTracker::new();
        assert!(tracker.snapshot().is_none());
    }

    #[test]
    fn test_known_samples() {
        let tracker = RttTracker::new();
        tracker.record(10 * MS);
        tracker.record(20 * MS);
        tracker.record(30 * MS);

        let stats = tracker.snapshot().unwrap();
        assert_eq!(stats.average_ms, 20.0);
        assert_eq!(stats.min_ms, 10);
        assert_eq!(stats.max_ms, 30);
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn test_average_truncates_to_whole_millis() {
        let tracker = RttTracker::new();
        tracker.record(MS);
        tracker.record(2 * MS);
        // Mean is 1.5ms; the nanosecond mean truncates to 1ms.
        assert_eq!(tracker.snapshot().unwrap().average_ms, 1.0);
    }

    #[test]
    fn test_negative_sample_keeps_max_unset() {
        let tracker = RttTracker::new();
        tracker.record(-5 * MS);

        let stats = tracker.snapshot().unwrap();
        assert_eq!(stats.min_ms, -5);
        assert_eq!(stats.max_ms, -1);
        assert_eq!(stats.count, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let tracker = RttTracker::new();
        tracker.record(7 * MS);
        tracker.reset();
        assert!(tracker.snapshot().is_none());

        tracker.record(4 * MS);
        let stats = tracker.snapshot().unwrap();
        assert_eq!(stats.min_ms, 4);
        assert_eq!(stats.max_ms, 4);
        assert_eq!(stats.count, 1);
    }

    #[test]
    fn test_subscriber_sees_updates() {
        let tracker = RttTracker::new();
        let rx = tracker.subscribe();
        tracker.record(12 * MS);
        assert_eq!(rx.borrow().as_ref().unwrap().count, 1);
    }

    #[test]
    fn test_display_format() {
        let stats = RttStats {
            average_ms: 12.0,
            min_ms: 5,
            max_ms: 20,
            count: 100,
        };
        assert_eq!(stats.to_string(), "Avg=12.00ms, Min=5ms, Max=20ms (Count=100)");

        let unset = RttStats {
            average_ms: 0.0,
            min_ms: -1,
            max_ms: -1,
            count: 0,
        };
        assert_eq!(unset.to_string(), "Avg=0.00ms, Min=N/A, Max=N/A (Count=0)");
    }
}
