//! # Ingestion Pipeline
//!
//! Click-event ingestion module.
//!
//! Responsibilities:
//! - Stream CSV rows in bounded windows and normalize them (`RecordSource`)
//! - Encode each record against the registered schema
//! - Submit to the transport, waiting out a full local queue
//! - Flush every `chunk_size` records and report the delivery totals
//!
//! ## Usage Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use delivery::{DeliveryTracker, MemoryTransport, PipelineState};
//! use ingestion::{IngestionPipeline, PipelineOptions, RecordSource};
//!
//! let source = RecordSource::open("clicks.csv", 10_000, &settings.columns)?;
//! let tracker = DeliveryTracker::spawn(Arc::new(PipelineState::new()));
//! let report = IngestionPipeline::new(PipelineOptions::from_settings(&settings))
//!     .run(source, &codec, &tracker, &transport)
//!     .await?;
//! tracker.shutdown().await;
//! ```

mod config;
mod error;
mod pipeline;
mod source;

// Re-exports
pub use config::PipelineOptions;
pub use contracts::{FinalReport, NormalizedRecord};
pub use error::{IngestionError, Result};
pub use pipeline::{IngestionPipeline, PipelinePhase};
pub use source::RecordSource;
