//! The metrics collaborator interface named in the spec's external
//! interfaces section: the core's only obligation is to emit `message++`
//! and `lookup(latency)` events. CSV formatting and file handling belong to
//! a collaborator outside this crate; `Node` holds its sink as a
//! `dyn MetricsSink` so a caller that wants its own aggregation (file,
//! network, in-memory histogram) can supply one in place of the default
//! in-process counters.
//!
//! An implementation is also the one a node's own accessors
//! (`message_count`, `lookup_count`) read back through, so the trait covers
//! both writing and reading the counts rather than being write-only.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Receives the two events a node emits, and reports back the counts a
/// node's own accessors expose. Implementations are expected to be cheap
/// and non-blocking, since `on_message`/`on_lookup` are invoked from hot
/// paths (every inbound RPC, every completed lookup).
pub trait MetricsSink: Send + Sync {
    fn on_message(&self);
    fn on_lookup(&self, latency: Duration);
    fn message_count(&self) -> u64;
    fn lookup_count(&self) -> u64;
    fn mean_lookup_latency(&self) -> Duration;
}

/// The default sink: plain atomic counters, with a running total of lookup
/// latency so an average can be derived without external aggregation.
#[derive(Default)]
pub struct CountingMetrics {
    message_count: AtomicU64,
    lookup_count: AtomicU64,
    lookup_latency_micros_total: AtomicU64,
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsSink for CountingMetrics {
    fn on_message(&self) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
    }

    fn on_lookup(&self, latency: Duration) {
        self.lookup_count.fetch_add(1, Ordering::Relaxed);
        self.lookup_latency_micros_total
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::Relaxed)
    }

    fn lookup_count(&self) -> u64 {
        self.lookup_count.load(Ordering::Relaxed)
    }

    fn mean_lookup_latency(&self) -> Duration {
        let count = self.lookup_count();
        if count == 0 {
            return Duration::ZERO;
        }
        let total_micros = self.lookup_latency_micros_total.load(Ordering::Relaxed);
        Duration::from_micros(total_micros / count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_messages_and_lookups_independently() {
        let metrics = CountingMetrics::new();
        metrics.on_message();
        metrics.on_message();
        metrics.on_lookup(Duration::from_millis(10));
        assert_eq!(metrics.message_count(), 2);
        assert_eq!(metrics.lookup_count(), 1);
        assert_eq!(metrics.mean_lookup_latency(), Duration::from_millis(10));
    }
}
