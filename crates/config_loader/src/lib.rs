//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Read connection endpoints and credentials from the environment
//! - Parse TOML/JSON pipeline settings files
//! - Validate configuration legality
//! - Produce a `RunConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let connection = ConfigLoader::load_connection().unwrap();
//! let settings = ConfigLoader::load_settings_from_path(Path::new("ingest.toml")).unwrap();
//! println!("Topic: {} via {}", settings.topic, connection.bootstrap_server);
//! ```

mod env;
mod parser;
mod validator;

pub use contracts::{ConnectionSettings, PipelineSettings};
pub use env::REQUIRED_VARS;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;
use tracing::debug;

/// Everything a run needs, validated once at startup
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub connection: ConnectionSettings,
    pub settings: PipelineSettings,
}

/// Configuration loader
///
/// Provides static methods to load configuration from the environment and files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate connection settings from the process environment
    pub fn load_connection() -> Result<ConnectionSettings, ContractError> {
        Self::load_connection_with(|name| std::env::var(name).ok())
    }

    /// Load and validate connection settings from an arbitrary lookup
    pub fn load_connection_with<F>(lookup: F) -> Result<ConnectionSettings, ContractError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let connection = env::connection_from_lookup(lookup)?;
        validator::validate_connection(&connection)?;
        debug!(connection = ?connection, "connection settings loaded");
        Ok(connection)
    }

    /// Load settings from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    pub fn load_settings_from_path(path: &Path) -> Result<PipelineSettings, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_settings_from_str(&content, format)
    }

    /// Load settings from string
    pub fn load_settings_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<PipelineSettings, ContractError> {
        let settings = parser::parse(content, format)?;
        validator::validate_settings(&settings)?;
        Ok(settings)
    }

    /// Validated default settings
    pub fn default_settings() -> Result<PipelineSettings, ContractError> {
        let settings = PipelineSettings::default();
        validator::validate_settings(&settings)?;
        Ok(settings)
    }

    /// Re-validate settings after CLI overrides were applied
    pub fn validate_settings(settings: &PipelineSettings) -> Result<(), ContractError> {
        validator::validate_settings(settings)
    }

    /// Serialize settings to TOML string
    pub fn to_toml(settings: &PipelineSettings) -> Result<String, ContractError> {
        toml::to_string_pretty(settings)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}
