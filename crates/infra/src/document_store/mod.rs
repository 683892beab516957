//! Document store abstraction.
//!
//! The production substrate is a managed document database; the core only
//! relies on the contract here: documents addressed by (collection, id), each
//! carrying a revision, and an atomic multi-document `commit` guarded by
//! revision preconditions. That is enough to express the read-modify-write
//! transaction every engine operation needs.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use std::sync::Arc;

/// Collection names used by the core, matching the legacy store layout.
pub mod collections {
    pub const PRODUCTS: &str = "produtos";
    pub const ASSEMBLY_GROUPS: &str = "gruposMontagem";
    pub const PRODUCTION_GROUPS: &str = "gruposProducao";
    pub const FILAMENT_GROUPS: &str = "gruposFilamento";
    pub const SPOOLS: &str = "spools";
    pub const INSUMOS: &str = "insumos";
    pub const CONFIG: &str = "configuracao";
}

/// Document id of the service-rate configuration record.
pub const RATES_DOC_ID: &str = "taxas";

/// A stored document with its current revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub collection: String,
    pub id: String,
    /// Monotonically increasing per-document revision (starts at 1).
    pub revision: u64,
    pub body: JsonValue,
}

impl Document {
    /// Deserialize the body into a typed contract.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DocumentStoreError> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            DocumentStoreError::Serialization(format!(
                "{}/{}: {e}",
                self.collection, self.id
            ))
        })
    }
}

/// Revision precondition for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Skip the check (full-recompute writers that are serialized per id).
    Any,
    /// The document must currently be at exactly this revision.
    Revision(u64),
    /// The document must not exist.
    Missing,
}

impl Expected {
    pub fn matches(self, current: Option<u64>) -> bool {
        match self {
            Expected::Any => true,
            Expected::Revision(rev) => current == Some(rev),
            Expected::Missing => current.is_none(),
        }
    }
}

/// One write of an atomic commit.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentWrite {
    Put {
        collection: String,
        id: String,
        expected: Expected,
        body: JsonValue,
    },
    Delete {
        collection: String,
        id: String,
        expected: Expected,
    },
}

impl DocumentWrite {
    pub fn put<T: Serialize>(
        collection: &str,
        id: impl Into<String>,
        expected: Expected,
        body: &T,
    ) -> Result<Self, DocumentStoreError> {
        let body = serde_json::to_value(body)
            .map_err(|e| DocumentStoreError::Serialization(e.to_string()))?;
        Ok(Self::Put {
            collection: collection.to_string(),
            id: id.into(),
            expected,
            body,
        })
    }

    pub fn delete(collection: &str, id: impl Into<String>, expected: Expected) -> Self {
        Self::Delete {
            collection: collection.to_string(),
            id: id.into(),
            expected,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            DocumentWrite::Put { id, .. } | DocumentWrite::Delete { id, .. } => id,
        }
    }
}

/// Document store operation error.
///
/// `Conflict` and `Io` are the transient class: the whole event/stage is
/// retried, never partially applied.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// A revision precondition failed (concurrent writer won).
    #[error("revision conflict: {0}")]
    Conflict(String),

    /// Backend/transport failure.
    #[error("document store io failure: {0}")]
    Io(String),

    #[error("document serialization failed: {0}")]
    Serialization(String),

    #[error("invalid write: {0}")]
    InvalidWrite(String),
}

impl DocumentStoreError {
    /// True for failures the caller should retry wholesale.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::Conflict(_) | DocumentStoreError::Io(_)
        )
    }
}

/// Revision-checked document store.
///
/// Implementations must:
/// - return documents with their current revision
/// - apply `commit` atomically: every precondition is checked first and
///   either all writes land or none do
/// - bump the revision on every successful put
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError>;

    fn list(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError>;

    fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), DocumentStoreError>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError> {
        (**self).get(collection, id)
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError> {
        (**self).list(collection)
    }

    fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), DocumentStoreError> {
        (**self).commit(writes)
    }
}

impl<S> DocumentStore for &S
where
    S: DocumentStore + ?Sized,
{
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError> {
        (**self).get(collection, id)
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError> {
        (**self).list(collection)
    }

    fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), DocumentStoreError> {
        (**self).commit(writes)
    }
}
