//! Per-sink delivery counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Marker for "no reading written yet"
const NO_SEQ: u64 = u64::MAX;

/// Counters for a single sink worker
#[derive(Debug)]
pub struct SinkMetrics {
    queue_len: AtomicUsize,
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    missed: AtomicU64,
    last_seq: AtomicU64,
}

impl Default for SinkMetrics {
    fn default() -> Self {
        Self {
            queue_len: AtomicUsize::new(0),
            written: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            missed: AtomicU64::new(0),
            last_seq: AtomicU64::new(NO_SEQ),
        }
    }
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Readings the sink accepted
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Record a successful write of reading `seq`
    pub fn record_written(&self, seq: u32) {
        self.written.fetch_add(1, Ordering::Relaxed);
        self.last_seq.store(u64::from(seq), Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Readings dropped because the sink queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Sequence numbers skipped between readings that reached the worker
    pub fn missed(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }

    pub fn record_missed(&self, count: u64) {
        self.missed.fetch_add(count, Ordering::Relaxed);
    }

    /// Sequence number of the last reading written
    pub fn last_seq(&self) -> Option<u32> {
        match self.last_seq.load(Ordering::Relaxed) {
            NO_SEQ => None,
            seq => u32::try_from(seq).ok(),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            written: self.written(),
            failed: self.failed(),
            dropped: self.dropped(),
            missed: self.missed(),
            last_seq: self.last_seq(),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub written: u64,
    pub failed: u64,
    pub dropped: u64,
    pub missed: u64,
    pub last_seq: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_seq_tracking() {
        let metrics = SinkMetrics::new();
        assert_eq!(metrics.last_seq(), None);

        metrics.record_written(0);
        metrics.record_written(7);
        metrics.record_failed();
        metrics.record_missed(6);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.written, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.missed, 6);
        assert_eq!(snapshot.last_seq, Some(7));
    }
}
