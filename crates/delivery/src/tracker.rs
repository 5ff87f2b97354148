//! DeliveryTracker - consumes delivery outcomes on a dedicated task

use std::sync::Arc;
use std::time::Duration;

use contracts::{DeliveryCallback, DeliveryOutcome};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::state::PipelineState;

/// Handle to the running tracker task
///
/// Transports receive [`DeliveryTracker::callback`] and may invoke it from
/// any thread. Outcomes are queued on an unbounded channel, so the callback
/// never blocks the transport's delivery thread.
pub struct DeliveryTracker {
    /// Shared counters
    state: Arc<PipelineState>,
    /// Outcome channel (kept to close it on shutdown)
    tx: async_channel::Sender<DeliveryOutcome>,
    /// Callback handed to transports
    callback: DeliveryCallback,
    /// Number of outcomes the task has accounted for
    processed_rx: watch::Receiver<u64>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl DeliveryTracker {
    /// Spawn the tracker task on the current runtime
    pub fn spawn(state: Arc<PipelineState>) -> Self {
        let (tx, rx) = async_channel::unbounded();
        let (processed_tx, processed_rx) = watch::channel(0u64);

        let worker_state = Arc::clone(&state);
        let worker_handle = tokio::spawn(async move {
            tracker_worker(rx, worker_state, processed_tx).await;
        });

        let callback_tx = tx.clone();
        let callback: DeliveryCallback = Arc::new(move |outcome: DeliveryOutcome| {
            if let Err(e) = callback_tx.try_send(outcome) {
                // 仅在 tracker 已关闭后发生
                warn!(row_id = e.into_inner().row_id, "Delivery outcome after tracker shutdown");
            }
        });

        Self {
            state,
            tx,
            callback,
            processed_rx,
            worker_handle,
        }
    }

    /// Callback to pass with every submission
    pub fn callback(&self) -> DeliveryCallback {
        Arc::clone(&self.callback)
    }

    /// Shared counters
    pub fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }

    /// Outcomes accounted for so far
    pub fn processed(&self) -> u64 {
        *self.processed_rx.borrow()
    }

    /// Wait until `expected` outcomes have been accounted for
    ///
    /// Returns false if the timeout elapses or the task is gone first.
    pub async fn settle(&self, expected: u64, timeout: Option<Duration>) -> bool {
        let mut rx = self.processed_rx.clone();
        match timeout {
            Some(limit) => {
                matches!(
                    tokio::time::timeout(limit, rx.wait_for(|n| *n >= expected)).await,
                    Ok(Ok(_))
                )
            }
            None => rx.wait_for(|n| *n >= expected).await.is_ok(),
        }
    }

    /// Close the channel and wait for queued outcomes to be processed
    #[instrument(name = "delivery_tracker_shutdown", skip(self))]
    pub async fn shutdown(self) {
        self.tx.close();
        if let Err(e) = self.worker_handle.await {
            error!(error = ?e, "Tracker task panicked");
        }
        debug!(
            delivered = self.state.delivered(),
            failed = self.state.failed(),
            "DeliveryTracker shutdown complete"
        );
    }
}

/// Worker task that turns outcomes into counter updates
#[instrument(name = "delivery_tracker_loop", skip_all)]
async fn tracker_worker(
    rx: async_channel::Receiver<DeliveryOutcome>,
    state: Arc<PipelineState>,
    processed_tx: watch::Sender<u64>,
) {
    debug!("Tracker worker started");
    let mut processed = 0u64;

    while let Ok(outcome) = rx.recv().await {
        match outcome.result {
            Ok(position) => {
                state.inc_delivered();
                observability::record_delivered(&position.topic, position.partition);
                debug!(
                    row_id = outcome.row_id,
                    topic = %position.topic,
                    partition = position.partition,
                    offset = position.offset,
                    "Record delivered"
                );
            }
            Err(reason) => {
                state.inc_failed();
                observability::record_delivery_failed();
                error!(row_id = outcome.row_id, error = %reason, "Delivery failed");
            }
        }

        processed += 1;
        processed_tx.send_replace(processed);
        observability::record_in_flight(state.in_flight());
    }

    debug!(processed, "Tracker worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::TopicPosition;
    use rand::seq::SliceRandom;

    fn delivered(row_id: i64) -> DeliveryOutcome {
        DeliveryOutcome::delivered(
            row_id,
            TopicPosition {
                topic: "clicks".to_string(),
                partition: 0,
                offset: row_id,
            },
        )
    }

    #[tokio::test]
    async fn test_counts_outcomes() {
        let state = Arc::new(PipelineState::new());
        let tracker = DeliveryTracker::spawn(Arc::clone(&state));
        let callback = tracker.callback();

        callback(delivered(0));
        callback(DeliveryOutcome::failed(1, "broker down"));
        callback(delivered(2));

        assert!(tracker.settle(3, Some(Duration::from_secs(5))).await);
        assert_eq!(state.delivered(), 2);
        assert_eq!(state.failed(), 1);
        assert_eq!(tracker.processed(), 3);
        tracker.shutdown().await;
    }

    #[tokio::test]
    async fn test_settle_times_out_when_outcomes_missing() {
        let tracker = DeliveryTracker::spawn(Arc::new(PipelineState::new()));
        tracker.callback()(delivered(0));

        assert!(!tracker.settle(2, Some(Duration::from_millis(50))).await);
        assert!(tracker.settle(1, None).await);
        tracker.shutdown().await;
    }

    #[tokio::test]
    async fn test_settle_zero_is_immediate() {
        let tracker = DeliveryTracker::spawn(Arc::new(PipelineState::new()));
        assert!(tracker.settle(0, None).await);
        tracker.shutdown().await;
    }

    #[tokio::test]
    async fn test_shuffled_acks_from_many_threads() {
        let state = Arc::new(PipelineState::new());
        let tracker = DeliveryTracker::spawn(Arc::clone(&state));

        let mut outcomes: Vec<DeliveryOutcome> = (0..400)
            .map(|row| {
                if row % 50 == 7 {
                    DeliveryOutcome::failed(row, "message timed out")
                } else {
                    delivered(row)
                }
            })
            .collect();
        outcomes.shuffle(&mut rand::rng());

        let threads: Vec<_> = outcomes
            .chunks(100)
            .map(|chunk| {
                let chunk = chunk.to_vec();
                let callback = tracker.callback();
                std::thread::spawn(move || {
                    for outcome in chunk {
                        callback(outcome);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert!(tracker.settle(400, Some(Duration::from_secs(5))).await);
        assert_eq!(state.failed(), 8);
        assert_eq!(state.delivered(), 392);
        tracker.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_outcomes() {
        let state = Arc::new(PipelineState::new());
        let tracker = DeliveryTracker::spawn(Arc::clone(&state));
        let callback = tracker.callback();
        for row in 0..10 {
            callback(delivered(row));
        }
        tracker.shutdown().await;
        assert_eq!(state.delivered(), 10);

        // 关闭后的回调不 panic
        callback(delivered(10));
        assert_eq!(state.delivered(), 10);
    }
}
