//! Delivery acknowledgment types
//!
//! Transports report the fate of every submitted event through a
//! `DeliveryCallback`. Failures are data here, never control flow.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Position assigned by the stream to a stored event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPosition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl fmt::Display for TopicPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] @ {}", self.topic, self.partition, self.offset)
    }
}

/// Outcome of one submission
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    /// Row the event was built from
    pub row_id: i64,

    /// Stored position, or the failure cause
    pub result: Result<TopicPosition, String>,
}

impl DeliveryOutcome {
    pub fn delivered(row_id: i64, position: TopicPosition) -> Self {
        Self {
            row_id,
            result: Ok(position),
        }
    }

    pub fn failed(row_id: i64, reason: impl Into<String>) -> Self {
        Self {
            row_id,
            result: Err(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Delivery callback type
///
/// Invoked exactly once per submission, from whatever thread the transport
/// acknowledges on. Implementations must not block.
pub type DeliveryCallback = Arc<dyn Fn(DeliveryOutcome) + Send + Sync>;

/// Totals reported when a run completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    pub submitted: u64,
    pub delivered: u64,
    pub failed: u64,
}

impl FinalReport {
    /// Every submission has an outcome
    pub fn is_settled(&self) -> bool {
        self.submitted == self.delivered + self.failed
    }
}
