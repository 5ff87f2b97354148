//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, PipelineSettings, REQUIRED_VARS};
use contracts::SchemaDescriptor;
use serde::Serialize;
use tracing::info;

use super::settings::resolve_settings;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    settings: PipelineSettings,
    subject: String,
    environment: Vec<EnvInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<serde_json::Value>,
}

/// Presence of a required variable; values are never shown
#[derive(Serialize)]
struct EnvInfo {
    name: &'static str,
    set: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!("Loading configuration info");

    let settings = resolve_settings(&args.settings)?;
    let info = build_config_info(settings, args, |name| std::env::var(name).ok())?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info)?;
    }

    Ok(())
}

fn build_config_info<F>(settings: PipelineSettings, args: &InfoArgs, lookup: F) -> Result<ConfigInfo>
where
    F: Fn(&str) -> Option<String>,
{
    let environment = REQUIRED_VARS
        .iter()
        .map(|&name| EnvInfo {
            name,
            set: lookup(name).is_some_and(|v| !v.trim().is_empty()),
        })
        .collect();

    let schema = if args.schema {
        let text = SchemaDescriptor::movie_click().to_avro_json();
        Some(serde_json::from_str(&text).context("Built-in schema is not valid JSON")?)
    } else {
        None
    };

    Ok(ConfigInfo {
        subject: settings.value_subject(),
        settings,
        environment,
        schema,
    })
}

fn print_config_info(info: &ConfigInfo) -> Result<()> {
    println!("\n=== Effective Settings ===\n");
    print!("{}", ConfigLoader::to_toml(&info.settings)?);

    println!("\n=== Environment ===\n");
    for env in &info.environment {
        let mark = if env.set { "✓" } else { "✗" };
        println!("  {} {}", mark, env.name);
    }

    println!("\nRegistry subject: {}", info.subject);

    if let Some(ref schema) = info.schema {
        println!("\n=== Value Schema ===\n");
        println!(
            "{}",
            serde_json::to_string_pretty(schema).context("Failed to render schema")?
        );
    }

    println!();
    Ok(())
}
