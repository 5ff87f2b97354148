//! Pipeline counters shared between the submission loop and the tracker

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::FinalReport;

/// Process-wide run counters
///
/// `submitted` is written by the submission loop only; `delivered` and
/// `failed` by the delivery tracker only.
#[derive(Debug, Default)]
pub struct PipelineState {
    /// Events accepted by the transport
    submitted: AtomicU64,
    /// Events acknowledged as stored
    delivered: AtomicU64,
    /// Events acknowledged as failed
    failed: AtomicU64,
    /// Submissions retried after a full local queue
    queue_full_retries: AtomicU64,
    /// Blocking flushes performed (periodic and final)
    flushes: AtomicU64,
}

impl PipelineState {
    /// Create new state, all counters zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Get submitted count
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Acquire)
    }

    /// Increment submitted count, returning the new total
    pub fn inc_submitted(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Get delivered count
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    /// Increment delivered count
    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::AcqRel);
    }

    /// Get failed count
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    /// Increment failed count
    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::AcqRel);
    }

    /// Get queue-full retry count
    pub fn queue_full_retries(&self) -> u64 {
        self.queue_full_retries.load(Ordering::Relaxed)
    }

    /// Increment queue-full retry count
    pub fn inc_queue_full_retries(&self) {
        self.queue_full_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Get flush count
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Increment flush count
    pub fn inc_flushes(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Submitted events without an outcome yet
    pub fn in_flight(&self) -> u64 {
        self.submitted()
            .saturating_sub(self.delivered() + self.failed())
    }

    /// Get snapshot of the three reported counters
    pub fn snapshot(&self) -> FinalReport {
        FinalReport {
            submitted: self.submitted(),
            delivered: self.delivered(),
            failed: self.failed(),
        }
    }
}
