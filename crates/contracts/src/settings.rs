//! Run configuration - Config Loader output
//!
//! `ConnectionSettings` comes from the environment (secrets), while
//! `PipelineSettings` comes from an optional settings file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Broker and registry endpoints plus their credentials
#[derive(Clone, Validate)]
pub struct ConnectionSettings {
    /// Kafka bootstrap servers
    #[validate(length(min = 1))]
    pub bootstrap_server: String,

    /// Schema registry base URL
    #[validate(url)]
    pub schema_registry_url: String,

    /// Broker SASL username
    pub kafka_key: String,

    /// Broker SASL password
    pub kafka_secret: String,

    /// Registry basic-auth user
    pub sr_key: String,

    /// Registry basic-auth password
    pub sr_secret: String,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("bootstrap_server", &self.bootstrap_server)
            .field("schema_registry_url", &self.schema_registry_url)
            .field("kafka_key", &self.kafka_key)
            .field("kafka_secret", &"<redacted>")
            .field("sr_key", &self.sr_key)
            .field("sr_secret", &"<redacted>")
            .finish()
    }
}

/// Pipeline tuning, all fields defaulted
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineSettings {
    /// Destination topic
    #[validate(length(min = 1))]
    pub topic: String,

    /// Source CSV path
    pub csv_path: PathBuf,

    /// Read window and flush interval, in records
    #[validate(range(min = 1))]
    pub chunk_size: usize,

    /// Flush timeout in seconds (None = wait indefinitely)
    pub flush_timeout_secs: Option<u64>,

    /// Wait before retrying a submission rejected by a full queue
    #[validate(range(min = 1, max = 60000))]
    pub queue_full_backoff_ms: u64,

    /// Broker security protocol
    #[validate(length(min = 1))]
    pub security_protocol: String,

    /// Broker SASL mechanism
    #[validate(length(min = 1))]
    pub sasl_mechanism: String,

    /// Source column names
    #[validate(nested)]
    pub columns: SourceColumns,

    /// Extra librdkafka producer properties, passed through verbatim
    pub producer_properties: BTreeMap<String, String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            topic: "netflix_click_events".to_string(),
            csv_path: PathBuf::from("vodclickstream_uk_movies_03.csv"),
            chunk_size: 10_000,
            flush_timeout_secs: None,
            queue_full_backoff_ms: 100,
            security_protocol: "SASL_SSL".to_string(),
            sasl_mechanism: "PLAIN".to_string(),
            columns: SourceColumns::default(),
            producer_properties: BTreeMap::new(),
        }
    }
}

impl PipelineSettings {
    /// Registry subject for event values (topic-name strategy)
    pub fn value_subject(&self) -> String {
        format!("{}-value", self.topic)
    }
}

/// CSV header names for each record field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SourceColumns {
    /// Row index column; the dataset ships it with an empty header
    pub row_index: String,
    #[validate(length(min = 1))]
    pub datetime: String,
    #[validate(length(min = 1))]
    pub duration: String,
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub genres: String,
    #[validate(length(min = 1))]
    pub release_date: String,
    #[validate(length(min = 1))]
    pub movie_id: String,
    #[validate(length(min = 1))]
    pub user_id: String,
}

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            row_index: String::new(),
            datetime: "datetime".to_string(),
            duration: "duration".to_string(),
            title: "title".to_string(),
            genres: "genres".to_string(),
            release_date: "release_date".to_string(),
            movie_id: "movie_id".to_string(),
            user_id: "user_id".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> ConnectionSettings {
        ConnectionSettings {
            bootstrap_server: "broker:9092".to_string(),
            schema_registry_url: "https://registry.example.com".to_string(),
            kafka_key: "key".to_string(),
            kafka_secret: "hunter2".to_string(),
            sr_key: "sr".to_string(),
            sr_secret: "s3cret".to_string(),
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", connection());
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("broker:9092"));
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = PipelineSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.chunk_size, 10_000);
        assert_eq!(settings.value_subject(), "netflix_click_events-value");
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let settings = PipelineSettings {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_registry_url_validated() {
        let mut conn = connection();
        assert!(conn.validate().is_ok());
        conn.schema_registry_url = "not a url".to_string();
        assert!(conn.validate().is_err());
    }
}
