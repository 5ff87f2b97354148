//! Transport implementations

mod kafka;
mod memory;

pub use kafka::{AckContext, KafkaConfig, KafkaTransport, PendingDelivery};
pub use memory::{MemoryTransport, PublishedEvent, TransportCall};
