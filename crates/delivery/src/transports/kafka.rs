//! KafkaTransport - librdkafka-backed transport
//!
//! Wraps a `ThreadedProducer`: its background thread polls the client and
//! runs [`AckContext::delivery`] once per message. Every message carries its
//! row id and acknowledgment callback as the delivery opaque.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    ConnectionSettings, ContractError, DeliveryCallback, DeliveryOutcome, OutboundEvent,
    PipelineSettings, QueueFull, TopicPosition, Transport,
};
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::Message;
use rdkafka::producer::{
    BaseRecord, DeliveryResult, Producer, ProducerContext, PurgeConfig, ThreadedProducer,
};
use rdkafka::util::Timeout;
use rdkafka::ClientContext;
use tracing::{debug, info, instrument, warn};

/// Per-message delivery opaque
pub struct PendingDelivery {
    row_id: i64,
    on_ack: DeliveryCallback,
}

/// Producer context that routes delivery reports to callbacks
pub struct AckContext;

impl ClientContext for AckContext {}

impl ProducerContext for AckContext {
    type DeliveryOpaque = Box<PendingDelivery>;

    fn delivery(&self, result: &DeliveryResult<'_>, pending: Self::DeliveryOpaque) {
        let outcome = match result {
            Ok(message) => DeliveryOutcome::delivered(
                pending.row_id,
                TopicPosition {
                    topic: message.topic().to_string(),
                    partition: message.partition(),
                    offset: message.offset(),
                },
            ),
            Err((err, _)) => DeliveryOutcome::failed(pending.row_id, err.to_string()),
        };
        (pending.on_ack)(outcome);
    }
}

/// Producer configuration
#[derive(Clone)]
pub struct KafkaConfig {
    /// Kafka bootstrap servers
    pub bootstrap_servers: String,
    /// security.protocol
    pub security_protocol: String,
    /// sasl.mechanisms
    pub sasl_mechanism: String,
    /// SASL username
    pub username: Option<String>,
    /// SASL password
    pub password: Option<String>,
    /// client.id
    pub client_id: String,
    /// Pass-through librdkafka properties, applied last
    pub properties: BTreeMap<String, String>,
}

impl std::fmt::Debug for KafkaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaConfig")
            .field("bootstrap_servers", &self.bootstrap_servers)
            .field("security_protocol", &self.security_protocol)
            .field("sasl_mechanism", &self.sasl_mechanism)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("properties", &self.properties)
            .finish()
    }
}

impl KafkaConfig {
    /// Producer config from the run configuration
    pub fn from_settings(connection: &ConnectionSettings, settings: &PipelineSettings) -> Self {
        Self {
            bootstrap_servers: connection.bootstrap_server.clone(),
            security_protocol: settings.security_protocol.to_uppercase(),
            sasl_mechanism: settings.sasl_mechanism.clone(),
            username: Some(connection.kafka_key.clone()),
            password: Some(connection.kafka_secret.clone()),
            client_id: "click-ingest".to_string(),
            properties: settings.producer_properties.clone(),
        }
    }

    fn uses_sasl(&self) -> bool {
        self.security_protocol.starts_with("SASL")
    }

    /// Build the librdkafka client config
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("security.protocol", &self.security_protocol)
            .set("client.id", &self.client_id);

        if self.uses_sasl() {
            config.set("sasl.mechanisms", &self.sasl_mechanism);
            if let Some(username) = &self.username {
                config.set("sasl.username", username);
            }
            if let Some(password) = &self.password {
                config.set("sasl.password", password);
            }
        }

        for (key, value) in &self.properties {
            config.set(key, value);
        }
        config
    }
}

/// Transport publishing to Kafka
pub struct KafkaTransport {
    name: String,
    producer: Arc<ThreadedProducer<AckContext>>,
}

impl KafkaTransport {
    /// Create the producer
    ///
    /// No broker round trip happens here; connection problems surface as
    /// delivery failures or a flush timeout.
    #[instrument(name = "kafka_transport_new", skip(config), fields(bootstrap = %config.bootstrap_servers))]
    pub fn new(config: &KafkaConfig) -> Result<Self, ContractError> {
        let producer: ThreadedProducer<AckContext> = config
            .client_config()
            .create_with_context(AckContext)
            .map_err(|e| ContractError::transport("kafka", format!("failed to create producer: {e}")))?;

        info!(
            security_protocol = %config.security_protocol,
            "Kafka producer created"
        );

        Ok(Self {
            name: "kafka".to_string(),
            producer: Arc::new(producer),
        })
    }

    /// Fail everything still queued or in flight
    ///
    /// Purged messages are reported through their callbacks as delivery
    /// failures by the producer's polling thread.
    pub fn close(&self) {
        let in_flight = self.producer.in_flight_count();
        self.producer.purge(PurgeConfig::default().queue().inflight());
        if in_flight > 0 {
            warn!(transport = %self.name, in_flight, "Closed with events in flight");
        }
    }
}

impl Transport for KafkaTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(
        &self,
        topic: &str,
        event: OutboundEvent,
        on_ack: DeliveryCallback,
    ) -> Result<(), QueueFull> {
        let pending = Box::new(PendingDelivery {
            row_id: event.row_id,
            on_ack,
        });
        let record = BaseRecord::<str, [u8], Box<PendingDelivery>>::with_opaque_to(topic, pending)
            .key(event.key.as_str())
            .payload(event.payload.as_ref());

        let (err, pending) = match self.producer.send(record) {
            Ok(()) => return Ok(()),
            Err((err, record)) => (err, record.delivery_opaque),
        };

        match err {
            KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull) => Err(QueueFull(event)),
            other => {
                // 非队列满错误按投递失败上报
                warn!(row_id = event.row_id, error = %other, "Produce rejected");
                (pending.on_ack)(DeliveryOutcome::failed(event.row_id, other.to_string()));
                Ok(())
            }
        }
    }

    async fn flush(&self, timeout: Option<Duration>) -> Result<(), ContractError> {
        let producer = Arc::clone(&self.producer);
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            let limit = timeout.map(Timeout::After).unwrap_or(Timeout::Never);
            producer
                .flush(limit)
                .map_err(|e| (e, producer.in_flight_count()))
        })
        .await
        .map_err(|e| ContractError::transport(&self.name, format!("flush task failed: {e}")))?;

        match result {
            Ok(()) => {
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Kafka flush complete");
                Ok(())
            }
            Err((KafkaError::Flush(RDKafkaErrorCode::OperationTimedOut), in_flight)) => {
                Err(ContractError::FlushTimeout {
                    waited_ms: started.elapsed().as_millis() as u64,
                    in_flight: in_flight.max(0) as usize,
                })
            }
            Err((e, _)) => Err(ContractError::transport(&self.name, format!("flush failed: {e}"))),
        }
    }

    fn queue_depth(&self) -> usize {
        self.producer.in_flight_count().max(0) as usize
    }
}
