//! Layered error definitions
//!
//! Categorized by source: config / record / schema / transport

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Required configuration values are absent
    #[error("missing required configuration: {}", missing.join(", "))]
    ConfigMissing { missing: Vec<String> },

    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Record Errors =====
    /// Source header lacks a required column
    #[error("source is missing required column '{column}'")]
    MissingColumn { column: String },

    /// A source row failed type coercion
    #[error("malformed record at row {row}, field '{field}': {message}")]
    MalformedRecord {
        row: u64,
        field: String,
        message: String,
    },

    // ===== Schema Errors =====
    /// Registry unreachable or schema rejected
    #[error("schema resolution failed for subject '{subject}': {message}")]
    SchemaResolution { subject: String, message: String },

    /// Record does not fit the schema descriptor
    #[error("failed to encode row {row_id}: {message}")]
    SchemaEncode { row_id: i64, message: String },

    // ===== Transport Errors =====
    /// Transport could not be created or used
    #[error("transport '{transport}' error: {message}")]
    Transport { transport: String, message: String },

    /// Flush did not drain the outbound queue in time
    #[error("flush timed out after {waited_ms}ms with {in_flight} records in flight")]
    FlushTimeout { waited_ms: u64, in_flight: usize },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create malformed record error
    pub fn malformed(row: u64, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            row,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create schema resolution error
    pub fn schema_resolution(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaResolution {
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            transport: transport.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration family
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigMissing { .. } | Self::ConfigParse { .. } | Self::ConfigValidation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_missing_lists_names() {
        let err = ContractError::ConfigMissing {
            missing: vec!["KAFKA_KEY".to_string(), "SR_SECRET".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "missing required configuration: KAFKA_KEY, SR_SECRET"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_malformed_mentions_row_and_field() {
        let err = ContractError::malformed(41, "duration", "invalid float");
        let msg = err.to_string();
        assert!(msg.contains("row 41"));
        assert!(msg.contains("'duration'"));
        assert!(!err.is_configuration());
    }
}
