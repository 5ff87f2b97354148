//! Transport trait - publish/acknowledge interface
//!
//! Defines the abstract interface for the outbound stream.

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::{ContractError, DeliveryCallback};

/// Encoded event ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEvent {
    /// Source row (for acknowledgment bookkeeping)
    pub row_id: i64,

    /// Message key
    pub key: String,

    /// Encoded value
    pub payload: Bytes,
}

impl OutboundEvent {
    /// Build an event keyed by its stringified row id
    pub fn keyed_by_row(row_id: i64, payload: Bytes) -> Self {
        Self {
            row_id,
            key: row_id.to_string(),
            payload,
        }
    }
}

/// Local outbound queue is full; the event is handed back for retry
#[derive(Debug, Error)]
#[error("local queue full, row {} not accepted", .0.row_id)]
pub struct QueueFull(pub OutboundEvent);

/// Outbound stream
///
/// All implementations must implement this trait.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Queue an event for asynchronous delivery
    ///
    /// Returns before the event is acknowledged. `on_ack` is invoked exactly
    /// once with the outcome. Only a full local queue is reported here; every
    /// other rejection is reported through `on_ack` as a failed delivery.
    fn submit(
        &self,
        topic: &str,
        event: OutboundEvent,
        on_ack: DeliveryCallback,
    ) -> Result<(), QueueFull>;

    /// Block until every queued event is acknowledged
    ///
    /// # Errors
    /// Returns `FlushTimeout` if `timeout` elapses first
    async fn flush(&self, timeout: Option<Duration>) -> Result<(), ContractError>;

    /// Events queued locally and not yet acknowledged
    fn queue_depth(&self) -> usize;
}
