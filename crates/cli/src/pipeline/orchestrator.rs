//! Pipeline orchestrator - wires registry, codec, transport and source.

use std::sync::Arc;
use std::time::Instant;

use config_loader::RunConfig;
use contracts::{SchemaDescriptor, SchemaRegistry, Transport};
use delivery::{DeliveryTracker, KafkaConfig, KafkaTransport, PipelineState};
use ingestion::{IngestionPipeline, NormalizedRecord, PipelineOptions, RecordSource};
use schema_codec::{HttpSchemaRegistry, RegistryConfig, SchemaCodec};
use tracing::info;

use super::RunStats;
use crate::error::{CliError, Result};

/// Main pipeline orchestrator
pub struct Orchestrator {
    config: RunConfig,
}

impl Orchestrator {
    /// Create an orchestrator for a validated configuration
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Run against the configured registry and Kafka cluster
    pub async fn run(self) -> Result<RunStats> {
        let RunConfig {
            connection,
            settings,
        } = &self.config;

        let registry = HttpSchemaRegistry::new(RegistryConfig::from_connection(connection))
            .map_err(|e| CliError::setup("schema registry client", e.to_string()))?;
        let transport = KafkaTransport::new(&KafkaConfig::from_settings(connection, settings))
            .map_err(|e| CliError::setup("kafka producer", e.to_string()))?;

        info!(
            bootstrap = %connection.bootstrap_server,
            registry = %connection.schema_registry_url,
            topic = %settings.topic,
            "Clients created"
        );

        let source = RecordSource::open(&settings.csv_path, settings.chunk_size, &settings.columns)
            .map_err(|e| CliError::source_open(settings.csv_path.display().to_string(), e.to_string()))?;

        let result = self.run_with(source, registry, &transport).await;
        if result.is_err() {
            // 未确认的消息按投递失败处理
            transport.close();
        }
        result
    }

    /// Run with explicit registry and transport
    pub async fn run_with<I, R, T>(&self, source: I, registry: R, transport: &T) -> Result<RunStats>
    where
        I: IntoIterator<Item = ingestion::Result<NormalizedRecord>>,
        R: SchemaRegistry + Sync,
        T: Transport + Sync,
    {
        let settings = &self.config.settings;
        let start_time = Instant::now();

        let codec = SchemaCodec::new(
            SchemaDescriptor::movie_click(),
            registry,
            settings.value_subject(),
        );
        let tracker = DeliveryTracker::spawn(Arc::new(PipelineState::new()));
        let mut pipeline = IngestionPipeline::new(PipelineOptions::from_settings(settings));

        let result = pipeline.run(source, &codec, &tracker, transport).await;
        tracker.shutdown().await;
        let report = result.map_err(CliError::PipelineExecution)?;

        let stats = RunStats {
            topic: settings.topic.clone(),
            subject: codec.subject().to_string(),
            schema_id: codec.schema_id(),
            report,
            duration: start_time.elapsed(),
            metrics: pipeline.run_metrics().clone(),
        };

        info!(
            submitted = stats.report.submitted,
            delivered = stats.report.delivered,
            failed = stats.report.failed,
            duration_secs = stats.duration.as_secs_f64(),
            "Pipeline finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use contracts::{ConnectionSettings, ContractError, PipelineSettings, SourceColumns};
    use delivery::MemoryTransport;
    use schema_codec::MemorySchemaRegistry;

    fn config(chunk_size: usize) -> RunConfig {
        RunConfig {
            connection: ConnectionSettings {
                bootstrap_server: "broker:9092".to_string(),
                schema_registry_url: "https://sr.example.com".to_string(),
                kafka_key: "k".to_string(),
                kafka_secret: "s".to_string(),
                sr_key: "sk".to_string(),
                sr_secret: "ss".to_string(),
            },
            settings: PipelineSettings {
                topic: "clicks".to_string(),
                chunk_size,
                ..Default::default()
            },
        }
    }

    fn source(rows: usize) -> RecordSource<Cursor<Vec<u8>>> {
        let mut text =
            String::from(",datetime,duration,title,genres,release_date,movie_id,user_id\n");
        for id in 0..rows {
            text.push_str(&format!("{id},2017-01-01,1.0,T,G,2010-01-01,m,u\n"));
        }
        RecordSource::from_reader(Cursor::new(text.into_bytes()), 10, &SourceColumns::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_run_with_memory_transport() {
        let transport = MemoryTransport::new().failing_rows([3]);
        let stats = Orchestrator::new(config(2))
            .run_with(source(5), MemorySchemaRegistry::new(), &transport)
            .await
            .unwrap();

        assert_eq!(stats.report.submitted, 5);
        assert_eq!(stats.report.delivered, 4);
        assert_eq!(stats.report.failed, 1);
        assert_eq!(stats.subject, "clicks-value");
        assert!(stats.schema_id.is_some());
        assert_eq!(stats.metrics.total_flushes(), 3);
        assert!(transport.published().iter().all(|e| e.topic == "clicks"));
    }

    #[tokio::test]
    async fn test_registry_rejection_surfaces_as_pipeline_error() {
        let transport = MemoryTransport::new();
        let err = Orchestrator::new(config(2))
            .run_with(source(2), MemorySchemaRegistry::rejecting("incompatible"), &transport)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CliError::PipelineExecution(ContractError::SchemaResolution { .. })
        ));
        assert_eq!(transport.submit_count(), 0);
    }
}
