//! MemorySchemaRegistry - in-process registry for tests and offline runs

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use contracts::{ContractError, SchemaRegistry};
use tokio::sync::Mutex;
use tracing::debug;

/// Compatibility behaviour of the in-memory registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MemoryRegistryMode {
    /// Any schema is accepted; new text under a subject becomes a new version
    #[default]
    Permissive,
    /// A subject accepts only the schema it was first registered with
    Strict,
    /// Every registration fails with the given reason
    Reject(String),
}

#[derive(Default)]
struct Inner {
    /// subject -> registered schema texts with their ids
    subjects: HashMap<String, Vec<(String, u32)>>,
    /// schema text -> id (ids are global, as in Confluent)
    ids: HashMap<String, u32>,
    next_id: u32,
}

/// In-memory schema registry
pub struct MemorySchemaRegistry {
    mode: MemoryRegistryMode,
    inner: Mutex<Inner>,
    calls: AtomicUsize,
}

impl MemorySchemaRegistry {
    /// Create a permissive registry
    pub fn new() -> Self {
        Self::with_mode(MemoryRegistryMode::Permissive)
    }

    /// Create a registry with the given mode
    pub fn with_mode(mode: MemoryRegistryMode) -> Self {
        Self {
            mode,
            inner: Mutex::new(Inner {
                next_id: 1,
                ..Default::default()
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a registry that rejects every schema
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self::with_mode(MemoryRegistryMode::Reject(reason.into()))
    }

    /// Number of `register` calls received
    pub fn register_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Pre-register a schema, returning its id
    pub async fn seed(&self, subject: &str, schema: &str) -> u32 {
        let mut inner = self.inner.lock().await;
        Self::insert(&mut inner, subject, schema)
    }

    fn insert(inner: &mut Inner, subject: &str, schema: &str) -> u32 {
        let id = match inner.ids.get(schema) {
            Some(id) => *id,
            None => {
                let id = inner.next_id;
                inner.next_id += 1;
                inner.ids.insert(schema.to_string(), id);
                id
            }
        };
        let versions = inner.subjects.entry(subject.to_string()).or_default();
        if !versions.iter().any(|(text, _)| text == schema) {
            versions.push((schema.to_string(), id));
        }
        id
    }
}

impl Default for MemorySchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry for MemorySchemaRegistry {
    async fn register(&self, subject: &str, schema: &str) -> Result<u32, ContractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let MemoryRegistryMode::Reject(reason) = &self.mode {
            return Err(ContractError::schema_resolution(subject, reason.clone()));
        }

        let mut inner = self.inner.lock().await;

        if let Some(versions) = inner.subjects.get(subject) {
            if let Some((_, id)) = versions.iter().find(|(text, _)| text == schema) {
                return Ok(*id);
            }
            if self.mode == MemoryRegistryMode::Strict && !versions.is_empty() {
                return Err(ContractError::schema_resolution(
                    subject,
                    "schema incompatible with registered versions",
                ));
            }
        }

        let id = Self::insert(&mut inner, subject, schema);
        debug!(subject = %subject, schema_id = id, "registered schema in memory");
        Ok(id)
    }
}
