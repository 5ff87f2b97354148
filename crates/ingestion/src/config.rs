//! Pipeline options

use std::time::Duration;

use contracts::PipelineSettings;

/// Options for one ingestion run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Destination topic
    pub topic: String,

    /// Flush interval, in submitted records
    pub chunk_size: usize,

    /// Flush timeout (None = wait indefinitely)
    pub flush_timeout: Option<Duration>,

    /// Wait before retrying a submission refused by a full queue
    pub queue_full_backoff: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default())
    }
}

impl PipelineOptions {
    /// Options with default tuning for `topic`
    pub fn new(topic: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            topic: topic.into(),
            chunk_size,
            ..Default::default()
        }
    }

    /// Options from validated settings
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            topic: settings.topic.clone(),
            chunk_size: settings.chunk_size,
            flush_timeout: settings.flush_timeout_secs.map(Duration::from_secs),
            queue_full_backoff: Duration::from_millis(settings.queue_full_backoff_ms),
        }
    }

    /// Set flush timeout
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = Some(timeout);
        self
    }

    /// Set queue-full backoff
    pub fn with_queue_full_backoff(mut self, backoff: Duration) -> Self {
        self.queue_full_backoff = backoff;
        self
    }
}
