//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Environment or settings are incomplete or invalid
    #[error("Configuration error: {0}")]
    Config(#[source] ContractError),

    /// Source file could not be opened
    #[error("Failed to open source {path}: {message}")]
    SourceOpen { path: String, message: String },

    /// Broker or registry client could not be created
    #[error("Failed to set up {component}: {message}")]
    Setup { component: String, message: String },

    /// The run stopped on a fatal error
    #[error("Pipeline execution failed: {0}")]
    PipelineExecution(#[source] ContractError),

    /// Interrupted by a signal before completion
    #[error("Interrupted before completion")]
    Interrupted,
}

impl CliError {
    pub fn source_open(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceOpen {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn setup(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Setup {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_lists_missing_vars() {
        let err = CliError::Config(ContractError::ConfigMissing {
            missing: vec!["KAFKA_SECRET".to_string(), "SR_SECRET".to_string()],
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: missing required configuration: KAFKA_SECRET, SR_SECRET"
        );
    }
}
