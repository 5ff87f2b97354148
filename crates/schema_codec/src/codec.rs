//! SchemaCodec - schema-constrained record encoder

use arrow_schema::SchemaRef;
use bytes::Bytes;
use contracts::{ContractError, NormalizedRecord, SchemaDescriptor, SchemaRegistry};
use tokio::sync::OnceCell;
use tracing::{info, instrument};

use crate::avro;

/// Encodes records against a fixed descriptor
///
/// The descriptor is resolved with the registry on first use; the assigned id
/// is cached for the rest of the run.
pub struct SchemaCodec<R> {
    descriptor: SchemaDescriptor,
    arrow_schema: SchemaRef,
    avro_json: String,
    subject: String,
    registry: R,
    schema_id: OnceCell<u32>,
}

impl<R: SchemaRegistry + Sync> SchemaCodec<R> {
    /// Create a new codec
    ///
    /// # Arguments
    /// * `descriptor` - Record contract
    /// * `registry` - Registry that assigns the schema id
    /// * `subject` - Registry subject (e.g. `<topic>-value`)
    pub fn new(descriptor: SchemaDescriptor, registry: R, subject: impl Into<String>) -> Self {
        let arrow_schema = avro::arrow_schema(&descriptor);
        let avro_json = descriptor.to_avro_json();
        Self {
            descriptor,
            arrow_schema,
            avro_json,
            subject: subject.into(),
            registry,
            schema_id: OnceCell::new(),
        }
    }

    /// Resolve the descriptor against the registry
    ///
    /// Performs the registry round trip at most once; later calls return the
    /// cached id.
    #[instrument(name = "schema_codec_resolve", skip(self), fields(subject = %self.subject))]
    pub async fn resolve(&self) -> Result<u32, ContractError> {
        let id = self
            .schema_id
            .get_or_try_init(|| async {
                let id = self
                    .registry
                    .register(&self.subject, &self.avro_json)
                    .await
                    .map_err(|e| match e {
                        ContractError::SchemaResolution { .. } => e,
                        other => ContractError::schema_resolution(&self.subject, other.to_string()),
                    })?;
                info!(
                    subject = %self.subject,
                    schema = %self.descriptor.full_name(),
                    schema_id = id,
                    "schema resolved"
                );
                Ok::<u32, ContractError>(id)
            })
            .await?;
        Ok(*id)
    }

    /// Encode a record into a Confluent-framed Avro payload
    ///
    /// # Errors
    /// - `SchemaResolution` on the first call if the registry rejects the schema
    /// - `SchemaEncode` if the record does not fit the descriptor
    pub async fn encode(&self, record: &NormalizedRecord) -> Result<Bytes, ContractError> {
        let schema_id = self.resolve().await?;
        self.encode_with_id(record, schema_id)
    }

    fn encode_with_id(&self, record: &NormalizedRecord, schema_id: u32) -> Result<Bytes, ContractError> {
        let batch = avro::record_batch(&self.descriptor, &self.arrow_schema, record)?;
        avro::encode_batch(&self.arrow_schema, &batch, schema_id, record.row_id)
    }

    /// Cached schema id, if already resolved
    pub fn schema_id(&self) -> Option<u32> {
        self.schema_id.get().copied()
    }

    /// Registry subject
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Record contract
    pub fn descriptor(&self) -> &SchemaDescriptor {
        &self.descriptor
    }

    /// Underlying registry
    pub fn registry(&self) -> &R {
        &self.registry
    }
}
