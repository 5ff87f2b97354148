//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Click Ingest - publish click-stream CSV rows to Kafka as Avro events
#[derive(Parser, Debug)]
#[command(
    name = "click-ingest",
    author,
    version,
    about = "Click-event ingestion pipeline",
    long_about = "Streams a click-event CSV, encodes every row as schema-registered Avro \n\
                  and publishes it to Kafka with delivery tracking and periodic flush.\n\n\
                  Broker and registry credentials are read from the environment \n\
                  (a .env file is loaded if present)."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CLICK_INGEST_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CLICK_INGEST_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingestion pipeline
    Run(RunArgs),

    /// Validate settings and environment without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Settings file plus per-field overrides
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Path to settings file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "CLICK_INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override source CSV path
    #[arg(long, env = "CSV_PATH")]
    pub csv_path: Option<PathBuf>,

    /// Override destination topic
    #[arg(long, env = "TOPIC_NAME")]
    pub topic: Option<String>,

    /// Override read window / flush interval
    #[arg(long, env = "CHUNK_SIZE")]
    pub chunk_size: Option<usize>,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Flush timeout in seconds (0 = wait indefinitely)
    #[arg(long, env = "CLICK_INGEST_FLUSH_TIMEOUT")]
    pub flush_timeout: Option<u64>,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CLICK_INGEST_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Skip the broker/registry environment check
    #[arg(long)]
    pub settings_only: bool,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the Avro schema registered for event values
    #[arg(long)]
    pub schema: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
