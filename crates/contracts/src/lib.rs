//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Delivery Model
//! - Events are published at-least-once; duplicates are left to consumers
//! - Delivery outcomes are reported through callbacks, never as errors

mod delivery;
mod error;
mod record;
mod registry;
mod schema;
mod settings;
mod transport;

pub use delivery::*;
pub use error::*;
pub use record::*;
pub use registry::{LocalSchemaRegistry, SchemaRegistry};
pub use schema::*;
pub use settings::*;
pub use transport::{LocalTransport, OutboundEvent, QueueFull, Transport};
