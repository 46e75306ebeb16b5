//! Hierarchical document store.
//!
//! Documents are JSON objects addressed by `collection/doc/collection/doc`
//! paths. Handlers only talk to the `DocumentStore` trait; the concrete
//! backend is picked at startup from `StoreConfig`.

pub mod memory;
pub mod path;
pub mod postgres;
pub mod update;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryStore;
pub use path::{CollectionPath, DocPath, PathError};
pub use postgres::PgStore;
pub use update::{apply_updates, FieldUpdate};

use crate::config::{StoreBackend, StoreConfig};

pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Field '{field}' has the wrong type, expected {expected}")]
    TypeMismatch { field: String, expected: &'static str },

    #[error("Counter '{0}' would overflow")]
    CounterOverflow(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// One write inside an atomic `WriteBatch`
#[derive(Debug, Clone)]
pub enum Write {
    Set(DocPath, Document),
    Update(DocPath, Vec<FieldUpdate>),
    Delete(DocPath),
}

/// Ordered list of writes committed all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: DocPath, doc: Document) -> Self {
        self.writes.push(Write::Set(path, doc));
        self
    }

    pub fn update(mut self, path: DocPath, updates: Vec<FieldUpdate>) -> Self {
        self.writes.push(Write::Update(path, updates));
        self
    }

    pub fn delete(mut self, path: DocPath) -> Self {
        self.writes.push(Write::Delete(path));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// Create or fully replace a document
    async fn set(&self, path: &DocPath, doc: Document) -> Result<(), StoreError>;

    /// Fails with `StoreError::NotFound` when the document does not exist
    async fn update(&self, path: &DocPath, updates: Vec<FieldUpdate>) -> Result<(), StoreError>;

    /// Returns whether the document existed
    async fn delete(&self, path: &DocPath) -> Result<bool, StoreError>;

    /// Documents directly under `collection`, ordered by path
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<(DocPath, Document)>, StoreError>;

    /// Deletes every document directly under `collection`; returns the count
    async fn delete_collection(&self, collection: &CollectionPath) -> Result<usize, StoreError>;

    /// Applies every write or none of them
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn DocumentStore>;

/// Builds the configured backend
pub async fn connect(config: &StoreConfig) -> Result<SharedStore, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
            let store = PgStore::connect(url, config.max_connections).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Serialize a model into a document
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::InvalidDocument("model did not serialize to an object".to_string())),
        Err(e) => Err(StoreError::InvalidDocument(e.to_string())),
    }
}

pub fn from_document<T: DeserializeOwned>(path: &DocPath, doc: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| StoreError::InvalidDocument(format!("{}: {}", path, e)))
}

/// Typed read helper
pub async fn get_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    path: &DocPath,
) -> Result<Option<T>, StoreError> {
    match store.get(path).await? {
        Some(doc) => Ok(Some(from_document(path, doc)?)),
        None => Ok(None),
    }
}

/// Typed write helper
pub async fn set_as<T: Serialize>(store: &dyn DocumentStore, path: &DocPath, value: &T) -> Result<(), StoreError> {
    store.set(path, to_document(value)?).await
}
