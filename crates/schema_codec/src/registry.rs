//! HttpSchemaRegistry - Confluent-compatible REST client

use std::time::Duration;

use contracts::{ConnectionSettings, ContractError, SchemaRegistry};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

/// Configuration for HttpSchemaRegistry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Registry base URL
    pub url: String,
    /// Basic-auth user
    pub username: Option<String>,
    /// Basic-auth password
    pub password: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl RegistryConfig {
    /// Registry config from validated connection settings
    pub fn from_connection(connection: &ConnectionSettings) -> Self {
        Self {
            url: connection.schema_registry_url.clone(),
            username: Some(connection.sr_key.clone()),
            password: Some(connection.sr_secret.clone()),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    schema: &'a str,
}

#[derive(Deserialize)]
struct RegisterResponse {
    id: u32,
}

/// Registry client speaking the Confluent REST protocol
pub struct HttpSchemaRegistry {
    config: RegistryConfig,
    client: reqwest::Client,
}

impl HttpSchemaRegistry {
    /// Create a new registry client
    pub fn new(config: RegistryConfig) -> Result<Self, ContractError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ContractError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn versions_url(&self, subject: &str) -> String {
        format!(
            "{}/subjects/{}/versions",
            self.config.url.trim_end_matches('/'),
            subject
        )
    }
}

impl SchemaRegistry for HttpSchemaRegistry {
    #[instrument(name = "schema_registry_register", skip(self, schema), fields(subject = %subject))]
    async fn register(&self, subject: &str, schema: &str) -> Result<u32, ContractError> {
        let url = self.versions_url(subject);
        let mut request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .json(&RegisterRequest { schema });

        if let Some(user) = &self.config.username {
            request = request.basic_auth(user, self.config.password.as_ref());
        }

        let response = request.send().await.map_err(|e| {
            ContractError::schema_resolution(subject, format!("registry unreachable: {e}"))
        })?;

        let status = response.status();
        if status.is_success() {
            let body: RegisterResponse = response.json().await.map_err(|e| {
                ContractError::schema_resolution(subject, format!("invalid registry response: {e}"))
            })?;
            debug!(subject = %subject, schema_id = body.id, "registry assigned schema id");
            return Ok(body.id);
        }

        let detail = response.text().await.unwrap_or_default();
        let message = match status {
            StatusCode::CONFLICT => format!("schema incompatible with registered versions: {detail}"),
            StatusCode::UNPROCESSABLE_ENTITY => format!("schema rejected as invalid: {detail}"),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                format!("registry denied access ({status})")
            }
            _ => format!("registry returned {status}: {detail}"),
        };
        Err(ContractError::schema_resolution(subject, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response, returning the raw request text
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });

        (format!("http://{addr}"), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    fn registry(url: String) -> HttpSchemaRegistry {
        HttpSchemaRegistry::new(RegistryConfig {
            url,
            username: Some("sr-key".to_string()),
            password: Some("sr-secret".to_string()),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_returns_id() {
        let (url, server) = serve_once("200 OK", r#"{"id":42}"#).await;
        let id = registry(url)
            .register("clicks-value", r#"{"type":"string"}"#)
            .await
            .unwrap();
        assert_eq!(id, 42);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /subjects/clicks-value/versions"));
        assert!(request.to_lowercase().contains("authorization: basic"));
        assert!(request.contains(r#"{"schema":"{\"type\":\"string\"}"}"#));
    }

    #[tokio::test]
    async fn test_conflict_is_incompatible() {
        let (url, server) = serve_once(
            "409 Conflict",
            r#"{"error_code":409,"message":"incompatible"}"#,
        )
        .await;
        let err = registry(url)
            .register("clicks-value", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::SchemaResolution { .. }));
        assert!(err.to_string().contains("incompatible"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_registry() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = registry(format!("http://127.0.0.1:{port}"))
            .register("clicks-value", "{}")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }

    #[test]
    fn test_versions_url_trims_slash() {
        let registry = registry("https://sr.example.com/".to_string());
        assert_eq!(
            registry.versions_url("clicks-value"),
            "https://sr.example.com/subjects/clicks-value/versions"
        );
    }
}
