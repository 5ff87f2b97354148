//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, PipelineSettings};
use contracts::ContractError;
use serde::Serialize;
use tracing::info;

use super::settings::resolve_settings;
use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_env: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SettingsSummary>,
}

#[derive(Serialize)]
struct SettingsSummary {
    topic: String,
    subject: String,
    csv_path: String,
    chunk_size: usize,
    security_protocol: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!("Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let mut result = ValidationResult {
        valid: true,
        config_path: args
            .settings
            .config
            .as_ref()
            .map(|p| p.display().to_string()),
        errors: Vec::new(),
        missing_env: Vec::new(),
        warnings: Vec::new(),
        summary: None,
    };

    match resolve_settings(&args.settings) {
        Ok(settings) => {
            result.warnings = collect_warnings(&settings);
            result.summary = Some(SettingsSummary {
                topic: settings.topic.clone(),
                subject: settings.value_subject(),
                csv_path: settings.csv_path.display().to_string(),
                chunk_size: settings.chunk_size,
                security_protocol: settings.security_protocol.clone(),
            });
        }
        Err(e) => {
            result.valid = false;
            result.errors.push(e.to_string());
        }
    }

    if !args.settings_only {
        match ConfigLoader::load_connection() {
            Ok(_) => {}
            Err(ContractError::ConfigMissing { missing }) => {
                result.valid = false;
                result.missing_env = missing;
            }
            Err(e) => {
                result.valid = false;
                result.errors.push(CliError::Config(e).to_string());
            }
        }
    }

    result
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(settings: &PipelineSettings) -> Vec<String> {
    let mut warnings = Vec::new();

    if !settings.csv_path.exists() {
        warnings.push(format!(
            "Source file {} does not exist (yet)",
            settings.csv_path.display()
        ));
    }

    if settings.flush_timeout_secs.is_none() {
        warnings.push("flush_timeout_secs is unset - flushes wait indefinitely".to_string());
    }

    if settings.security_protocol.eq_ignore_ascii_case("PLAINTEXT") {
        warnings.push("security_protocol is PLAINTEXT - credentials are not used".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    let target = result.config_path.as_deref().unwrap_or("<defaults>");
    if result.valid {
        println!("✓ Configuration is valid: {}", target);

        if let Some(ref summary) = result.summary {
            println!("\n  Topic: {}", summary.topic);
            println!("  Subject: {}", summary.subject);
            println!("  Source: {}", summary.csv_path);
            println!("  Chunk size: {}", summary.chunk_size);
            println!("  Security: {}", summary.security_protocol);
        }
    } else {
        println!("✗ Configuration is invalid: {}", target);
        for error in &result.errors {
            println!("\n  Error: {}", error);
        }
        if !result.missing_env.is_empty() {
            println!("\n  Missing environment variables:");
            for name in &result.missing_env {
                println!("  - {}", name);
            }
        }
    }

    if !result.warnings.is_empty() {
        println!("\n⚠ Warnings:");
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }
}
