//! IngestionPipeline - source → codec → transport with periodic flush

use std::sync::Arc;

use contracts::{
    ContractError, DeliveryCallback, FinalReport, NormalizedRecord, OutboundEvent, QueueFull,
    SchemaRegistry, Transport,
};
use delivery::DeliveryTracker;
use observability::RunMetricsAggregator;
use schema_codec::SchemaCodec;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::PipelineOptions;
use crate::error::IngestionError;

/// Run phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Not started
    Idle,
    /// Submitting records
    Streaming,
    /// Source exhausted, final flush in progress
    Draining,
    /// Final report produced
    Done,
}

/// Ingestion Pipeline
///
/// Drives one bounded run. Every `chunk_size` submissions the transport is
/// flushed and the tracker settled, which bounds the records in flight.
pub struct IngestionPipeline {
    options: PipelineOptions,
    phase: PipelinePhase,
    run_metrics: RunMetricsAggregator,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            phase: PipelinePhase::Idle,
            run_metrics: RunMetricsAggregator::new(),
        }
    }

    /// Current phase
    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Run options
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Flush and retry statistics of the run
    pub fn run_metrics(&self) -> &RunMetricsAggregator {
        &self.run_metrics
    }

    /// Publish every record of `source`
    ///
    /// Any error is fatal: the run stops at once and no report is produced.
    /// Delivery failures are not errors; they are counted in the report.
    #[instrument(
        name = "ingestion_pipeline_run",
        skip_all,
        fields(topic = %self.options.topic, chunk_size = self.options.chunk_size)
    )]
    pub async fn run<I, R, T>(
        &mut self,
        source: I,
        codec: &SchemaCodec<R>,
        tracker: &DeliveryTracker,
        transport: &T,
    ) -> Result<FinalReport, ContractError>
    where
        I: IntoIterator<Item = Result<NormalizedRecord, IngestionError>>,
        R: SchemaRegistry + Sync,
        T: Transport + Sync,
    {
        self.phase = PipelinePhase::Streaming;
        let chunk_size = self.options.chunk_size.max(1) as u64;
        let callback = tracker.callback();
        let mut schema_reported = false;
        info!(transport = %transport.name(), "Ingestion started");

        for item in source {
            let record = item?;
            let payload = codec.encode(&record).await?;
            if !schema_reported {
                if let Some(schema_id) = codec.schema_id() {
                    observability::record_schema_id(codec.subject(), schema_id);
                    schema_reported = true;
                }
            }

            let event = OutboundEvent::keyed_by_row(record.row_id, payload);
            self.submit(transport, tracker, event, &callback).await;
            let submitted = tracker.state().inc_submitted();
            observability::record_submitted(&self.options.topic);

            if submitted % chunk_size == 0 {
                self.flush_and_settle(transport, tracker, submitted, false)
                    .await?;
                info!(processed = submitted, "Processed {submitted} records");
            }
        }

        self.phase = PipelinePhase::Draining;
        let submitted = tracker.state().submitted();
        self.flush_and_settle(transport, tracker, submitted, true)
            .await?;

        let report = tracker.state().snapshot();
        self.phase = PipelinePhase::Done;
        info!(
            submitted = report.submitted,
            delivered = report.delivered,
            failed = report.failed,
            "Processed {} total records",
            report.submitted
        );
        Ok(report)
    }

    /// Submit, waiting out a full local queue
    async fn submit<T: Transport>(
        &mut self,
        transport: &T,
        tracker: &DeliveryTracker,
        mut event: OutboundEvent,
        callback: &DeliveryCallback,
    ) {
        loop {
            match transport.submit(&self.options.topic, event, Arc::clone(callback)) {
                Ok(()) => return,
                Err(QueueFull(returned)) => {
                    event = returned;
                    tracker.state().inc_queue_full_retries();
                    self.run_metrics.observe_queue_full();
                    warn!(
                        row_id = event.row_id,
                        queue_depth = transport.queue_depth(),
                        backoff_ms = self.options.queue_full_backoff.as_millis() as u64,
                        "Local queue full, retrying"
                    );
                    tokio::time::sleep(self.options.queue_full_backoff).await;
                }
            }
        }
    }

    /// Blocking flush, then wait until every submission has an outcome
    async fn flush_and_settle<T: Transport>(
        &mut self,
        transport: &T,
        tracker: &DeliveryTracker,
        submitted: u64,
        final_flush: bool,
    ) -> Result<(), ContractError> {
        let started = Instant::now();
        transport.flush(self.options.flush_timeout).await?;

        let state = tracker.state();
        state.inc_flushes();
        self.run_metrics.observe_flush(started.elapsed(), final_flush);

        // flush 与 settle 共用同一个超时预算
        let remaining = self
            .options
            .flush_timeout
            .map(|limit| limit.saturating_sub(started.elapsed()));
        if !tracker.settle(submitted, remaining).await {
            return Err(ContractError::FlushTimeout {
                waited_ms: started.elapsed().as_millis() as u64,
                in_flight: state.in_flight() as usize,
            });
        }

        observability::record_in_flight(state.in_flight());
        debug!(
            submitted,
            delivered = state.delivered(),
            failed = state.failed(),
            final_flush,
            "Flush settled"
        );
        Ok(())
    }
}
