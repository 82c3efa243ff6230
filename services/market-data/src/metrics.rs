//! Feed metrics
//!
//! Atomic counters for the producer and the subscriber fan-out. Cheap to
//! bump from any task; read by the health endpoint and at shutdown.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the snapshot feed.
#[derive(Debug, Default)]
pub struct FeedMetrics {
    pub snapshots_built: AtomicU64,
    pub frames_sent: AtomicU64,
    /// Frames overwritten in a subscriber's slot before it consumed them
    pub frames_dropped: AtomicU64,
    pub subscribers_connected: AtomicU64,
    pub subscribers_rejected: AtomicU64,
    /// Subscribers removed after a failed send
    pub subscribers_dropped: AtomicU64,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = FeedMetrics::new();
        FeedMetrics::incr(&metrics.frames_sent);
        FeedMetrics::add(&metrics.frames_dropped, 5);

        assert_eq!(FeedMetrics::get(&metrics.frames_sent), 1);
        assert_eq!(FeedMetrics::get(&metrics.frames_dropped), 5);
        assert_eq!(FeedMetrics::get(&metrics.snapshots_built), 0);
    }
}
