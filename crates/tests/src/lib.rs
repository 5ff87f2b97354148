//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试（schema、配置默认值）
//! - 端到端场景：CSV → codec → 内存 transport → tracker

#[cfg(test)]
mod contract_tests {
    use contracts::{PipelineSettings, SchemaDescriptor};
    use serde_json::json;

    #[test]
    fn test_movie_click_schema_snapshot() {
        let rendered: serde_json::Value =
            serde_json::from_str(&SchemaDescriptor::movie_click().to_avro_json()).unwrap();
        assert_eq!(
            rendered,
            json!({
                "type": "record",
                "name": "MovieClick",
                "namespace": "com.streaming.movies",
                "fields": [
                    {"name": "row_id", "type": "long"},
                    {"name": "datetime", "type": "string"},
                    {"name": "duration", "type": "double"},
                    {"name": "title", "type": "string"},
                    {"name": "genres", "type": "string"},
                    {"name": "release_date", "type": "string"},
                    {"name": "movie_id", "type": "string"},
                    {"name": "user_id", "type": "string"}
                ]
            })
        );
    }

    #[test]
    fn test_default_settings_snapshot() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.topic, "netflix_click_events");
        assert_eq!(settings.value_subject(), "netflix_click_events-value");
        assert_eq!(settings.chunk_size, 10_000);
        assert_eq!(settings.security_protocol, "SASL_SSL");
        assert_eq!(settings.sasl_mechanism, "PLAIN");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::{Cursor, Write};
    use std::sync::{Arc, Mutex};

    use contracts::{ContractError, FinalReport, SchemaDescriptor, SourceColumns, Transport};
    use delivery::{DeliveryTracker, MemoryTransport, PipelineState, TransportCall};
    use ingestion::{IngestionPipeline, PipelineOptions, RecordSource};
    use schema_codec::{framed_schema_id, MemorySchemaRegistry, SchemaCodec};

    const HEADER: &str = ",datetime,duration,title,genres,release_date,movie_id,user_id\n";

    /// CSV text with `rows` well-formed click rows
    fn csv_text(rows: usize) -> String {
        let mut text = HEADER.to_string();
        for id in 0..rows {
            text.push_str(&format!(
                "{id},2017-01-01 01:15:{:02},{}.0,Title {id},\"Action, Drama\",2013-06-30,m{id},u{id}\n",
                id % 60,
                id * 10
            ));
        }
        text
    }

    fn source_from(text: String, window: usize) -> RecordSource<Cursor<Vec<u8>>> {
        RecordSource::from_reader(Cursor::new(text.into_bytes()), window, &SourceColumns::default())
            .unwrap()
    }

    fn codec(registry: MemorySchemaRegistry) -> SchemaCodec<MemorySchemaRegistry> {
        SchemaCodec::new(
            SchemaDescriptor::movie_click(),
            registry,
            "netflix_click_events-value",
        )
    }

    async fn run(
        rows: usize,
        chunk_size: usize,
        transport: &MemoryTransport,
        registry: MemorySchemaRegistry,
    ) -> Result<FinalReport, ContractError> {
        let tracker = DeliveryTracker::spawn(Arc::new(PipelineState::new()));
        let result = IngestionPipeline::new(PipelineOptions::new("netflix_click_events", chunk_size))
            .run(source_from(csv_text(rows), chunk_size), &codec(registry), &tracker, transport)
            .await;
        tracker.shutdown().await;
        result
    }

    /// 3 rows, chunk 2: submit, submit, flush, submit, final flush
    #[tokio::test]
    async fn test_three_rows_call_order() {
        let transport = MemoryTransport::new();
        let report = run(3, 2, &transport, MemorySchemaRegistry::new()).await.unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                TransportCall::Submit { row_id: 0 },
                TransportCall::Submit { row_id: 1 },
                TransportCall::Flush,
                TransportCall::Submit { row_id: 2 },
                TransportCall::Flush,
            ]
        );
        assert_eq!(report.submitted, 3);
        assert!(report.is_settled());
    }

    /// N records with chunk C flush floor(N/C) + 1 times
    #[tokio::test]
    async fn test_flush_count() {
        for (rows, chunk) in [(0, 3), (1, 1), (5, 5), (7, 3), (10, 1), (25, 4)] {
            let transport = MemoryTransport::new();
            let report = run(rows, chunk, &transport, MemorySchemaRegistry::new())
                .await
                .unwrap();
            assert_eq!(
                transport.flush_count(),
                rows / chunk + 1,
                "rows={rows} chunk={chunk}"
            );
            assert_eq!(report.submitted, rows as u64);
            assert_eq!(report.submitted, report.delivered + report.failed);
        }
    }

    /// Registry rejects: nothing submitted, counters zero
    #[tokio::test]
    async fn test_registry_rejection() {
        let transport = MemoryTransport::new();
        let tracker = DeliveryTracker::spawn(Arc::new(PipelineState::new()));
        let err = IngestionPipeline::new(PipelineOptions::new("netflix_click_events", 2))
            .run(
                source_from(csv_text(4), 2),
                &codec(MemorySchemaRegistry::rejecting("schema being registered is incompatible")),
                &tracker,
                &transport,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ContractError::SchemaResolution { .. }));
        assert_eq!(transport.submit_count(), 0);
        assert_eq!(transport.flush_count(), 0);
        assert_eq!(tracker.state().snapshot(), FinalReport::default());
        tracker.shutdown().await;
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    /// Only row 7 fails: N-1 delivered, 1 failed, error log names row 7
    #[tokio::test]
    async fn test_single_delivery_failure() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = MemoryTransport::new().failing_rows([7]);
        let report = run(20, 6, &transport, MemorySchemaRegistry::new()).await.unwrap();

        assert_eq!(report, FinalReport { submitted: 20, delivered: 19, failed: 1 });
        assert!(transport.published().iter().all(|e| e.row_id != 7));

        let output = logs.text();
        let failure_line = output
            .lines()
            .find(|line| line.contains("Delivery failed"))
            .expect("delivery failure is logged");
        assert!(failure_line.contains("ERROR"));
        assert!(failure_line.contains("row_id=7"));
        assert_eq!(output.matches("Delivery failed").count(), 1);
        assert!(output.contains("Processed 18 records"));
    }

    /// A malformed row aborts the run before it is encoded or submitted
    #[tokio::test]
    async fn test_malformed_row_is_fatal() {
        let mut text = csv_text(3);
        text.push_str("3,2017-01-01,not-a-number,T,G,2013-06-30,m,u\n");
        text.push_str("4,2017-01-01,1.0,T,G,2013-06-30,m,u\n");

        let transport = MemoryTransport::new();
        let tracker = DeliveryTracker::spawn(Arc::new(PipelineState::new()));
        let err = IngestionPipeline::new(PipelineOptions::new("netflix_click_events", 10))
            .run(
                source_from(text, 10),
                &codec(MemorySchemaRegistry::new()),
                &tracker,
                &transport,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ContractError::MalformedRecord { row: 4, ref field, .. } if field == "duration"
        ));
        let submitted: Vec<TransportCall> = transport.calls();
        assert_eq!(
            submitted,
            vec![
                TransportCall::Submit { row_id: 0 },
                TransportCall::Submit { row_id: 1 },
                TransportCall::Submit { row_id: 2 },
            ]
        );
        assert_eq!(tracker.state().submitted(), 3);
        tracker.shutdown().await;
    }

    /// Published events carry the row key and the registered schema id
    #[tokio::test]
    async fn test_published_events_are_framed() {
        let registry = MemorySchemaRegistry::new();
        let seeded = registry
            .seed(
                "netflix_click_events-value",
                &SchemaDescriptor::movie_click().to_avro_json(),
            )
            .await;
        let transport = MemoryTransport::new().with_partitions(3);
        run(6, 4, &transport, registry).await.unwrap();

        let published = transport.published();
        assert_eq!(published.len(), 6);
        for event in &published {
            assert_eq!(event.key, event.row_id.to_string());
            assert_eq!(framed_schema_id(&event.payload), Some(seeded));
            assert_eq!(event.topic, "netflix_click_events");
        }
        let offsets: Vec<i64> = published.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, (0..6).collect::<Vec<_>>());
    }

    /// Out-of-order acks and a saturated queue still settle every record
    #[tokio::test]
    async fn test_backpressure_with_reordered_acks() {
        let transport = MemoryTransport::new()
            .with_queue_capacity(3)
            .reverse_acks()
            .failing_rows([4, 11]);
        let tracker = DeliveryTracker::spawn(Arc::new(PipelineState::new()));
        let options = PipelineOptions::new("netflix_click_events", 8)
            .with_queue_full_backoff(std::time::Duration::from_millis(1));

        let report = IngestionPipeline::new(options)
            .run(
                source_from(csv_text(17), 5),
                &codec(MemorySchemaRegistry::new()),
                &tracker,
                &transport,
            )
            .await
            .unwrap();

        assert_eq!(report, FinalReport { submitted: 17, delivered: 15, failed: 2 });
        assert!(tracker.state().queue_full_retries() > 0);
        assert_eq!(transport.queue_depth(), 0);
        tracker.shutdown().await;
    }
}
