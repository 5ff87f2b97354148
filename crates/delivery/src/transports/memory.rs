//! MemoryTransport - in-process, scriptable transport
//!
//! Submissions wait in a local queue until `flush`, which acknowledges them
//! in queue order (or reversed, to exercise out-of-order acks). Chosen row
//! ids can be scripted to fail, and the queue can be made to report
//! queue-full.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    ContractError, DeliveryCallback, DeliveryOutcome, OutboundEvent, QueueFull, TopicPosition,
    Transport,
};
use tracing::{debug, warn};

/// One observable interaction with the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCall {
    /// Accepted submission
    Submit { row_id: i64 },
    /// Flush request
    Flush,
}

/// Event acknowledged as stored
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub row_id: i64,
    pub key: String,
    pub payload: Bytes,
}

struct Pending {
    topic: String,
    event: OutboundEvent,
    on_ack: DeliveryCallback,
}

#[derive(Default)]
struct Inner {
    pending: VecDeque<Pending>,
    published: Vec<PublishedEvent>,
    calls: Vec<TransportCall>,
    fail_rows: HashSet<i64>,
    /// Scripted queue-full answers still to give
    queue_full_remaining: usize,
    queue_full_rejections: usize,
    next_offset: i64,
    closed: bool,
}

type Acks = Vec<(DeliveryCallback, DeliveryOutcome)>;

/// In-memory transport
pub struct MemoryTransport {
    name: String,
    /// Local queue bound (None = unbounded)
    queue_capacity: Option<usize>,
    partitions: i32,
    reverse_acks: bool,
    /// Flush never drains the queue
    stall_flush: bool,
    inner: Mutex<Inner>,
}

impl MemoryTransport {
    /// Unbounded transport that acknowledges everything
    pub fn new() -> Self {
        Self {
            name: "memory".to_string(),
            queue_capacity: None,
            partitions: 1,
            reverse_acks: false,
            stall_flush: false,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Bound the local queue
    ///
    /// A submission into a full queue is refused with `QueueFull`; the queued
    /// events are then delivered in the background, so a retry succeeds.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity.max(1));
        self
    }

    /// Spread events over `partitions` partitions by row id
    pub fn with_partitions(mut self, partitions: i32) -> Self {
        self.partitions = partitions.max(1);
        self
    }

    /// Fail delivery of the given rows
    pub fn failing_rows(self, rows: impl IntoIterator<Item = i64>) -> Self {
        self.lock().fail_rows.extend(rows);
        self
    }

    /// Refuse the next `times` submissions with `QueueFull`
    pub fn queue_full_times(self, times: usize) -> Self {
        self.lock().queue_full_remaining = times;
        self
    }

    /// Acknowledge each flushed batch in reverse order
    pub fn reverse_acks(mut self) -> Self {
        self.reverse_acks = true;
        self
    }

    /// Make flush hang until its timeout
    pub fn stalling_flush(mut self) -> Self {
        self.stall_flush = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Call log, in order
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Number of flush requests
    pub fn flush_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, TransportCall::Flush))
            .count()
    }

    /// Number of accepted submissions
    pub fn submit_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, TransportCall::Submit { .. }))
            .count()
    }

    /// Events acknowledged as stored, in acknowledgment order
    pub fn published(&self) -> Vec<PublishedEvent> {
        self.lock().published.clone()
    }

    /// Submissions refused with `QueueFull`
    pub fn queue_full_rejections(&self) -> usize {
        self.lock().queue_full_rejections
    }

    /// Fail everything still queued; later submissions fail immediately
    pub fn close(&self) {
        let acks: Acks = {
            let mut inner = self.lock();
            inner.closed = true;
            inner
                .pending
                .drain(..)
                .map(|p| {
                    let outcome = DeliveryOutcome::failed(p.event.row_id, "transport closed");
                    (p.on_ack, outcome)
                })
                .collect()
        };
        if !acks.is_empty() {
            warn!(transport = %self.name, in_flight = acks.len(), "Closed with events in flight");
        }
        invoke(acks);
    }

    /// Acknowledge every queued event
    fn drain(&self, inner: &mut Inner) -> Acks {
        let mut batch: Vec<Pending> = inner.pending.drain(..).collect();
        if self.reverse_acks {
            batch.reverse();
        }

        batch
            .into_iter()
            .map(|p| {
                let row_id = p.event.row_id;
                if inner.fail_rows.contains(&row_id) {
                    return (p.on_ack, DeliveryOutcome::failed(row_id, "scripted delivery failure"));
                }
                let position = TopicPosition {
                    topic: p.topic.clone(),
                    partition: row_id.rem_euclid(i64::from(self.partitions)) as i32,
                    offset: inner.next_offset,
                };
                inner.next_offset += 1;
                inner.published.push(PublishedEvent {
                    topic: p.topic,
                    partition: position.partition,
                    offset: position.offset,
                    row_id,
                    key: p.event.key,
                    payload: p.event.payload,
                });
                (p.on_ack, DeliveryOutcome::delivered(row_id, position))
            })
            .collect()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Run callbacks outside the lock
fn invoke(acks: Acks) {
    for (on_ack, outcome) in acks {
        on_ack(outcome);
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(
        &self,
        topic: &str,
        event: OutboundEvent,
        on_ack: DeliveryCallback,
    ) -> Result<(), QueueFull> {
        let mut inner = self.lock();

        if inner.closed {
            drop(inner);
            on_ack(DeliveryOutcome::failed(event.row_id, "transport closed"));
            return Ok(());
        }

        if inner.queue_full_remaining > 0 {
            inner.queue_full_remaining -= 1;
            inner.queue_full_rejections += 1;
            return Err(QueueFull(event));
        }

        if self
            .queue_capacity
            .is_some_and(|capacity| inner.pending.len() >= capacity)
        {
            inner.queue_full_rejections += 1;
            let acks = self.drain(&mut inner);
            drop(inner);
            debug!(transport = %self.name, delivered = acks.len(), "Background delivery");
            invoke(acks);
            return Err(QueueFull(event));
        }

        inner.calls.push(TransportCall::Submit {
            row_id: event.row_id,
        });
        inner.pending.push_back(Pending {
            topic: topic.to_string(),
            event,
            on_ack,
        });
        Ok(())
    }

    async fn flush(&self, timeout: Option<Duration>) -> Result<(), ContractError> {
        let started = Instant::now();
        let stalled = {
            let mut inner = self.lock();
            inner.calls.push(TransportCall::Flush);
            if self.stall_flush && !inner.pending.is_empty() {
                Some(inner.pending.len())
            } else {
                let acks = self.drain(&mut inner);
                drop(inner);
                invoke(acks);
                None
            }
        };

        let Some(in_flight) = stalled else {
            return Ok(());
        };
        match timeout {
            Some(limit) => {
                tokio::time::sleep(limit).await;
                Err(ContractError::FlushTimeout {
                    waited_ms: started.elapsed().as_millis() as u64,
                    in_flight,
                })
            }
            None => std::future::pending().await,
        }
    }

    fn queue_depth(&self) -> usize {
        self.lock().pending.len()
    }
}
