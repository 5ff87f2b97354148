//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, PipelineSettings, RunConfig};
use tracing::{info, warn};

use super::settings::resolve_settings;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::Orchestrator;

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    run_pipeline_with(args, |name| std::env::var(name).ok()).await
}

/// Execute the `run` command with connection values from `lookup`
pub(crate) async fn run_pipeline_with<F>(args: &RunArgs, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    // Secrets first: a missing variable aborts before the source is touched
    let connection = ConfigLoader::load_connection_with(lookup)
        .map_err(CliError::Config)
        .context("Failed to load broker/registry settings from environment")?;

    let mut settings = resolve_settings(&args.settings)?;
    if let Some(secs) = args.flush_timeout {
        settings.flush_timeout_secs = (secs > 0).then_some(secs);
    }

    info!(
        topic = %settings.topic,
        csv_path = %settings.csv_path.display(),
        chunk_size = settings.chunk_size,
        flush_timeout_secs = ?settings.flush_timeout_secs,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&settings);
        return Ok(());
    }

    let orchestrator = Orchestrator::new(RunConfig {
        connection,
        settings,
    });
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting pipeline...");

    tokio::select! {
        result = orchestrator.run() => {
            let stats = result.context("Ingestion run failed")?;
            stats.print_summary();
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, abandoning run");
            return Err(CliError::Interrupted.into());
        }
    }

    info!("Click ingest finished");
    Ok(())
}

/// Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(settings: &PipelineSettings) {
    println!("\n=== Configuration Summary ===\n");
    println!("Source:");
    println!("  CSV: {}", settings.csv_path.display());
    println!("  Window: {} rows", settings.chunk_size);
    println!("\nDestination:");
    println!("  Topic: {}", settings.topic);
    println!("  Subject: {}", settings.value_subject());
    println!(
        "  Security: {} / {}",
        settings.security_protocol, settings.sasl_mechanism
    );
    println!("\nFlow control:");
    match settings.flush_timeout_secs {
        Some(secs) => println!("  Flush timeout: {secs}s"),
        None => println!("  Flush timeout: none"),
    }
    println!("  Queue-full backoff: {}ms", settings.queue_full_backoff_ms);
    if !settings.producer_properties.is_empty() {
        println!("\nProducer properties:");
        for (key, value) in &settings.producer_properties {
            println!("  {key} = {value}");
        }
    }
    println!();
}
