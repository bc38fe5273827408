//! SinkHandle - one queued worker per sink
//!
//! Readings reach a sink through a bounded queue. When the queue is full the
//! newest reading is dropped, so a slow sink never stalls the dispatcher or its
//! siblings. The worker follows the reading sequence and counts every number
//! that never arrived, whether it was dropped here or lagged upstream.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{DataSink, IlluminanceReading};

use crate::metrics::SinkMetrics;

/// Result of offering a reading to a sink queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queue full, the reading with this sequence number was discarded
    Dropped { seq: u32 },
    /// Worker is gone
    Closed,
}

impl Delivery {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued)
    }
}

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<IlluminanceReading>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker for `sink` behind a queue of `queue_capacity` readings
    pub fn spawn<S: DataSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker = tokio::spawn(sink_worker(sink, rx, Arc::clone(&metrics), name.clone()));

        Self {
            name,
            tx,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Offer a reading without waiting
    pub fn offer(&self, reading: IlluminanceReading) -> Delivery {
        let seq = reading.seq();
        match self.tx.try_send(reading) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                Delivery::Queued
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.record_dropped();
                warn!(sink = %self.name, seq, "Queue full, reading dropped");
                Delivery::Dropped { seq }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, seq, "Sink worker closed unexpectedly");
                Delivery::Closed
            }
        }
    }

    /// Drain the queue, then flush and close the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(
            sink = %self.name,
            last_seq = ?self.metrics.last_seq(),
            missed = self.metrics.missed(),
            "SinkHandle shutdown complete"
        );
    }
}

/// Follows the reading sequence seen by one sink
#[derive(Debug, Default)]
struct SequenceTracker {
    expected: Option<u32>,
}

/// Distance past which a smaller sequence number counts as a restart, not a gap
const RESTART_WINDOW: u32 = u32::MAX / 2;

impl SequenceTracker {
    /// Record `seq` and return how many numbers were skipped before it
    fn observe(&mut self, seq: u32) -> u32 {
        let missed = match self.expected {
            Some(expected) => {
                let ahead = seq.wrapping_sub(expected);
                if ahead > RESTART_WINDOW {
                    debug!(expected, seq, "Reading sequence restarted");
                    0
                } else {
                    ahead
                }
            }
            None => 0,
        };
        self.expected = Some(seq.wrapping_add(1));
        missed
    }
}

#[instrument(name = "sink_worker_loop", skip(sink, rx, metrics), fields(sink = %name))]
async fn sink_worker<S: DataSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<IlluminanceReading>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!("Sink worker started");
    let mut sequence = SequenceTracker::default();

    while let Some(reading) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        let seq = reading.seq();
        let missed = sequence.observe(seq);
        if missed > 0 {
            metrics.record_missed(u64::from(missed));
            debug!(seq, missed, "Readings missing before this one");
        }

        match sink.write(&reading).await {
            Ok(()) => {
                metrics.record_written(seq);
                observability::record_sink_write(&name, true);
            }
            Err(e) => {
                metrics.record_failed();
                observability::record_sink_write(&name, false);
                error!(seq, error = %e, "Write failed");
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(error = %e, "Close failed on shutdown");
    }

    debug!("Sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ContractError, Stamp};
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration};

    /// Records the sequence numbers it was asked to write
    struct SeqSink {
        name: String,
        seen: Arc<Mutex<Vec<u32>>>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl SeqSink {
        fn new(name: &str) -> (Self, Arc<Mutex<Vec<u32>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = Self {
                name: name.to_string(),
                seen: seen.clone(),
                should_fail: false,
                delay_ms: 0,
            };
            (sink, seen)
        }
    }

    impl DataSink for SeqSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, reading: &IlluminanceReading) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "refused"));
            }
            self.seen.lock().unwrap().push(reading.seq());
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn reading(seq: u32) -> IlluminanceReading {
        IlluminanceReading::new(seq, Stamp::default(), 10.0 * seq as f64)
    }

    #[test]
    fn test_sequence_tracker() {
        let mut tracker = SequenceTracker::default();
        assert_eq!(tracker.observe(5), 0);
        assert_eq!(tracker.observe(6), 0);
        assert_eq!(tracker.observe(9), 2);
        // 序号回绕
        let mut tracker = SequenceTracker::default();
        tracker.observe(u32::MAX);
        assert_eq!(tracker.observe(0), 0);
        assert_eq!(tracker.observe(2), 1);
        // 插件重新计数
        assert_eq!(tracker.observe(0), 0);
        assert_eq!(tracker.observe(1), 0);
    }

    #[tokio::test]
    async fn test_drains_in_order_on_shutdown() {
        let (sink, seen) = SeqSink::new("seq");
        let handle = SinkHandle::spawn(sink, 10);

        for seq in 0..5 {
            assert!(handle.offer(reading(seq)).is_queued());
        }

        let metrics = handle.metrics().clone();
        handle.shutdown().await;
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(metrics.last_seq(), Some(4));
        assert_eq!(metrics.missed(), 0);
    }

    #[tokio::test]
    async fn test_upstream_gaps_counted() {
        let (sink, seen) = SeqSink::new("gappy");
        let handle = SinkHandle::spawn(sink, 10);

        for seq in [0, 1, 4, 5, 9] {
            handle.offer(reading(seq));
        }

        let metrics = handle.metrics().clone();
        handle.shutdown().await;
        assert_eq!(seen.lock().unwrap().len(), 5);
        assert_eq!(metrics.missed(), 5);
        assert_eq!(metrics.dropped(), 0);
    }

    #[tokio::test]
    async fn test_queue_full_drops_newest() {
        let (mut sink, seen) = SeqSink::new("slow");
        sink.delay_ms = 100;
        let handle = SinkHandle::spawn(sink, 2);

        let outcomes: Vec<Delivery> = (0..10).map(|seq| handle.offer(reading(seq))).collect();
        assert!(outcomes.contains(&Delivery::Dropped { seq: 9 }));

        let metrics = handle.metrics().clone();
        handle.shutdown().await;

        // 丢弃的读数在 sink 侧表现为序号缺口
        let written = seen.lock().unwrap().len() as u64;
        assert_eq!(written + metrics.dropped(), 10);
        assert!(metrics.dropped() > 0);
        let last = u64::from(metrics.last_seq().unwrap());
        assert_eq!(metrics.missed(), last + 1 - written);
    }

    #[tokio::test]
    async fn test_failure_isolation() {
        let (mut sink, _) = SeqSink::new("failing");
        sink.should_fail = true;
        let handle = SinkHandle::spawn(sink, 10);

        for seq in 0..3 {
            assert!(handle.offer(reading(seq)).is_queued());
        }

        let metrics = handle.metrics().clone();
        handle.shutdown().await;
        assert_eq!(metrics.failed(), 3);
        assert_eq!(metrics.written(), 0);
        assert_eq!(metrics.last_seq(), None);
    }
}
