//! Settings resolution shared by all commands.

use config_loader::{ConfigLoader, PipelineSettings};
use tracing::info;

use crate::cli::SettingsArgs;
use crate::error::{CliError, Result};

/// Load the settings file (or defaults), apply CLI overrides, re-validate
pub fn resolve_settings(args: &SettingsArgs) -> Result<PipelineSettings> {
    let mut settings = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading settings");
            ConfigLoader::load_settings_from_path(path).map_err(CliError::Config)?
        }
        None => ConfigLoader::default_settings().map_err(CliError::Config)?,
    };

    if let Some(ref csv_path) = args.csv_path {
        info!(csv_path = %csv_path.display(), "Overriding source path from CLI");
        settings.csv_path = csv_path.clone();
    }
    if let Some(ref topic) = args.topic {
        info!(topic = %topic, "Overriding topic from CLI");
        settings.topic = topic.clone();
    }
    if let Some(chunk_size) = args.chunk_size {
        info!(chunk_size, "Overriding chunk size from CLI");
        settings.chunk_size = chunk_size;
    }

    ConfigLoader::validate_settings(&settings).map_err(CliError::Config)?;
    Ok(settings)
}
