//! SchemaRegistry trait - external schema id authority

use crate::ContractError;

/// Schema registry collaborator
///
/// Assigns stable ids to schemas and enforces compatibility between versions
/// registered under the same subject.
#[trait_variant::make(SchemaRegistry: Send)]
pub trait LocalSchemaRegistry {
    /// Register `schema` (Avro JSON) under `subject`, or look up its existing id
    ///
    /// # Errors
    /// Returns `SchemaResolution` if the registry is unreachable or rejects
    /// the schema as incompatible
    async fn register(&self, subject: &str, schema: &str) -> Result<u32, ContractError>;
}
