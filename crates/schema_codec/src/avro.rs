//! Avro single-record encoding
//!
//! Builds a one-row Arrow batch from a `NormalizedRecord`, column by column
//! as the descriptor dictates, and writes it with `arrow-avro` using an ID
//! fingerprint. The output is the Confluent wire format:
//! `0x00` + schema ID (4-byte BE) + Avro binary body.

use std::sync::Arc;

use arrow_array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_avro::schema::FingerprintStrategy;
use arrow_avro::writer::format::AvroSoeFormat;
use arrow_avro::writer::WriterBuilder;
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use bytes::Bytes;
use contracts::{ContractError, FieldType, FieldValue, NormalizedRecord, SchemaDescriptor};

/// Confluent wire format magic byte.
pub const CONFLUENT_MAGIC: u8 = 0x00;

/// Size of the Confluent wire format header (1 magic + 4 schema ID).
pub const CONFLUENT_HEADER_SIZE: usize = 5;

/// Arrow schema equivalent of a descriptor; all fields non-nullable
pub fn arrow_schema(descriptor: &SchemaDescriptor) -> SchemaRef {
    let fields: Vec<Field> = descriptor
        .fields
        .iter()
        .map(|f| Field::new(&f.name, arrow_type(f.field_type), false))
        .collect();
    Arc::new(Schema::new(fields))
}

fn arrow_type(field_type: FieldType) -> DataType {
    match field_type {
        FieldType::Long => DataType::Int64,
        FieldType::Double => DataType::Float64,
        FieldType::String => DataType::Utf8,
    }
}

/// Build a one-row batch, checking every value against the descriptor
pub fn record_batch(
    descriptor: &SchemaDescriptor,
    schema: &SchemaRef,
    record: &NormalizedRecord,
) -> Result<RecordBatch, ContractError> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(descriptor.fields.len());

    for field in &descriptor.fields {
        let column: ArrayRef = match (field.field_type, record.field(&field.name)) {
            (FieldType::Long, Some(FieldValue::Long(v))) => Arc::new(Int64Array::from(vec![v])),
            (FieldType::Double, Some(FieldValue::Double(v))) => {
                Arc::new(Float64Array::from(vec![v]))
            }
            (FieldType::String, Some(FieldValue::String(s))) => {
                Arc::new(StringArray::from(vec![s]))
            }
            (_, None) => {
                return Err(ContractError::SchemaEncode {
                    row_id: record.row_id,
                    message: format!("record has no field '{}'", field.name),
                })
            }
            (expected, Some(actual)) => {
                return Err(ContractError::SchemaEncode {
                    row_id: record.row_id,
                    message: format!(
                        "field '{}' expects {}, got {:?}",
                        field.name,
                        expected.avro_name(),
                        actual
                    ),
                })
            }
        };
        columns.push(column);
    }

    RecordBatch::try_new(schema.clone(), columns).map_err(|e| ContractError::SchemaEncode {
        row_id: record.row_id,
        message: format!("failed to build batch: {e}"),
    })
}

/// Encode a one-row batch into a Confluent-framed payload
pub fn encode_batch(
    schema: &SchemaRef,
    batch: &RecordBatch,
    schema_id: u32,
    row_id: i64,
) -> Result<Bytes, ContractError> {
    let encode_err = |message: String| ContractError::SchemaEncode { row_id, message };

    let mut buf = Vec::new();
    let mut writer = WriterBuilder::new((**schema).clone())
        .with_fingerprint_strategy(FingerprintStrategy::Id(schema_id))
        .build::<_, AvroSoeFormat>(&mut buf)
        .map_err(|e| encode_err(format!("failed to build Avro writer: {e}")))?;

    writer
        .write(batch)
        .map_err(|e| encode_err(format!("Avro encode error: {e}")))?;
    writer
        .finish()
        .map_err(|e| encode_err(format!("Avro flush error: {e}")))?;

    if buf.len() < CONFLUENT_HEADER_SIZE || buf[0] != CONFLUENT_MAGIC {
        return Err(encode_err("writer did not emit a Confluent header".to_string()));
    }

    Ok(Bytes::from(buf))
}

/// Schema id embedded in a Confluent-framed payload
pub fn framed_schema_id(payload: &[u8]) -> Option<u32> {
    if payload.len() < CONFLUENT_HEADER_SIZE || payload[0] != CONFLUENT_MAGIC {
        return None;
    }
    let id: [u8; 4] = payload[1..CONFLUENT_HEADER_SIZE].try_into().ok()?;
    Some(u32::from_be_bytes(id))
}
