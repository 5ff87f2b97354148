//! # Schema Codec
//!
//! Schema-constrained serialization of click events.
//!
//! Responsibilities:
//! - Register the record contract with a schema registry (once per run)
//! - Encode `NormalizedRecord`s as Confluent wire-format Avro
//! - Reject records that drifted from the contract
//!
//! ## Usage Example
//!
//! ```ignore
//! use schema_codec::{HttpSchemaRegistry, RegistryConfig, SchemaCodec};
//! use contracts::SchemaDescriptor;
//!
//! let registry = HttpSchemaRegistry::new(RegistryConfig::from_connection(&connection))?;
//! let codec = SchemaCodec::new(SchemaDescriptor::movie_click(), registry, "clicks-value");
//! let payload = codec.encode(&record).await?;
//! ```

mod avro;
mod codec;
mod memory;
mod registry;

pub use avro::{framed_schema_id, CONFLUENT_HEADER_SIZE, CONFLUENT_MAGIC};
pub use codec::SchemaCodec;
pub use memory::{MemoryRegistryMode, MemorySchemaRegistry};
pub use registry::{HttpSchemaRegistry, RegistryConfig};
