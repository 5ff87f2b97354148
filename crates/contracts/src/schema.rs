//! SchemaDescriptor - the structural contract for published events
//!
//! Immutable for the lifetime of a run; registered once with the schema
//! registry, then used for every encode.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Primitive field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 64-bit signed integer
    Long,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
}

impl FieldType {
    /// Avro primitive name
    pub fn avro_name(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Double => "double",
            Self::String => "string",
        }
    }
}

/// One named field of the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub field_type: FieldType,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Versioned record contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Record name
    pub name: String,

    /// Record namespace
    pub namespace: String,

    /// Contract version (informational, the registry assigns ids)
    pub version: u32,

    /// Ordered fields; order defines the binary layout
    pub fields: Vec<SchemaField>,
}

impl SchemaDescriptor {
    /// The movie click contract (`com.streaming.movies.MovieClick`, v1)
    pub fn movie_click() -> Self {
        Self {
            name: "MovieClick".to_string(),
            namespace: "com.streaming.movies".to_string(),
            version: 1,
            fields: vec![
                SchemaField::new("row_id", FieldType::Long),
                SchemaField::new("datetime", FieldType::String),
                SchemaField::new("duration", FieldType::Double),
                SchemaField::new("title", FieldType::String),
                SchemaField::new("genres", FieldType::String),
                SchemaField::new("release_date", FieldType::String),
                SchemaField::new("movie_id", FieldType::String),
                SchemaField::new("user_id", FieldType::String),
            ],
        }
    }

    /// Fully qualified record name
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Avro record schema as JSON text
    pub fn to_avro_json(&self) -> String {
        let fields: Vec<_> = self
            .fields
            .iter()
            .map(|f| json!({ "name": f.name, "type": f.field_type.avro_name() }))
            .collect();

        json!({
            "type": "record",
            "name": self.name,
            "namespace": self.namespace,
            "fields": fields,
        })
        .to_string()
    }
}
