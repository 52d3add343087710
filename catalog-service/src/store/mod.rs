//! Document storage
//!
//! [`DocumentStore`] is the only way the service touches persisted data.
//! A handle is opened once at startup by [`open`] and passed down through
//! [`crate::state::AppState`].
//!
//! Every failure a store reports is a [`StorageError`]; callers surface it
//! as "storage unavailable" and never retry on their own.

mod memory;
#[cfg(feature = "surrealdb")]
mod surreal;

pub use memory::MemoryStore;
#[cfg(feature = "surrealdb")]
pub use surreal::SurrealStore;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StorageBackend, StorageConfig};
use crate::listing::{Predicate, SortSpec};
use crate::schema::Document;

/// Result type for store operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Store operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOperation {
    Connect,
    Ping,
    Count,
    Find,
    Get,
    Insert,
    Patch,
    Delete,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Ping => write!(f, "ping"),
            Self::Count => write!(f, "count"),
            Self::Find => write!(f, "find"),
            Self::Get => write!(f, "get"),
            Self::Insert => write!(f, "insert"),
            Self::Patch => write!(f, "patch"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    /// Could not reach or authenticate with the store
    ConnectionFailed,
    /// The store did not answer in time
    Timeout,
    /// The store rejected or failed the query
    QueryFailed,
    /// A stored record could not be decoded
    Corrupt,
    /// The backend named in configuration is not compiled in
    Unsupported,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::QueryFailed => write!(f, "query_failed"),
            Self::Corrupt => write!(f, "corrupt"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    pub operation: StorageOperation,
    pub kind: StorageErrorKind,
    pub message: String,
    /// Collection involved, when there is one
    pub collection: Option<String>,
}

impl StorageError {
    pub fn new(operation: StorageOperation, kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            collection: None,
        }
    }

    #[must_use]
    pub fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Transient failures a caller higher up might retry
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            StorageErrorKind::ConnectionFailed | StorageErrorKind::Timeout
        )
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Storage {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref collection) = self.collection {
            write!(f, " [collection: {}]", collection)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {}

/// Backing store for entity collections.
///
/// Documents are flat JSON objects whose `id` field holds the entity id.
/// Single-document writes are atomic; nothing spans documents.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Short backend name for logs and readiness output
    fn backend(&self) -> &'static str;

    /// Number of documents in `collection` satisfying every predicate
    async fn count(&self, collection: &str, predicates: &[Predicate]) -> StorageResult<u64>;

    /// Matching documents ordered by `sort` then id, after skipping `skip`,
    /// at most `limit` of them
    async fn find(
        &self,
        collection: &str,
        predicates: &[Predicate],
        sort: &SortSpec,
        skip: u64,
        limit: u64,
    ) -> StorageResult<Vec<Document>>;

    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Document>>;

    async fn insert(&self, collection: &str, id: &str, document: Document) -> StorageResult<()>;

    /// Atomically set the fields in `set` and remove those in `unset` on an
    /// existing document, returning the result; `None` if `id` is not present.
    ///
    /// Fields named in neither are left as they are, whatever else wrote them.
    async fn patch(
        &self,
        collection: &str,
        id: &str,
        set: Document,
        unset: &[String],
    ) -> StorageResult<Option<Document>>;

    /// Remove and return the document, `None` if `id` is not present
    async fn delete(&self, collection: &str, id: &str) -> StorageResult<Option<Document>>;

    /// Cheap round trip proving the store is reachable
    async fn ping(&self) -> StorageResult<()>;
}

/// Open the store selected by configuration
pub async fn open(config: &StorageConfig) -> StorageResult<Arc<dyn DocumentStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "surrealdb")]
        StorageBackend::Surrealdb => Ok(Arc::new(SurrealStore::connect(config).await?)),
        #[cfg(not(feature = "surrealdb"))]
        StorageBackend::Surrealdb => Err(StorageError::new(
            StorageOperation::Connect,
            StorageErrorKind::Unsupported,
            "storage.backend is 'surrealdb' but the surrealdb feature is not enabled",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_with_collection() {
        let err = StorageError::new(StorageOperation::Find, StorageErrorKind::Timeout, "deadline elapsed")
            .in_collection("movies");
        assert_eq!(
            err.to_string(),
            "Storage timeout error during find: deadline elapsed [collection: movies]"
        );
        assert!(err.is_retriable());
    }

    #[test]
    fn test_query_failure_is_not_retriable() {
        let err = StorageError::new(StorageOperation::Count, StorageErrorKind::QueryFailed, "parse error");
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_open_memory_backend() {
        let store = open(&StorageConfig::default()).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert!(store.ping().await.is_ok());
    }

    #[cfg(not(feature = "surrealdb"))]
    #[tokio::test]
    async fn test_open_surrealdb_without_feature() {
        let config = StorageConfig {
            backend: StorageBackend::Surrealdb,
            ..StorageConfig::default()
        };
        let err = open(&config).await.err().unwrap();
        assert_eq!(err.kind, StorageErrorKind::Unsupported);
    }
}
