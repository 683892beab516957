//! In-memory revision-checked document store.
//!
//! Intended for tests/dev. Not optimized for performance.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use super::{Document, DocumentStore, DocumentStoreError, DocumentWrite};

#[derive(Debug, Clone)]
struct Stored {
    revision: u64,
    body: JsonValue,
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<(String, String), Stored>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without revision checks (test setup convenience).
    pub fn seed<T: serde::Serialize>(&self, collection: &str, id: &str, body: &T) {
        let body = serde_json::to_value(body).expect("seed body must serialize");
        if let Ok(mut docs) = self.docs.write() {
            let key = (collection.to_string(), id.to_string());
            let revision = docs.get(&key).map(|s| s.revision + 1).unwrap_or(1);
            docs.insert(key, Stored { revision, body });
        }
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError> {
        let docs = self
            .docs
            .read()
            .map_err(|_| DocumentStoreError::Io("lock poisoned".to_string()))?;

        Ok(docs
            .get(&(collection.to_string(), id.to_string()))
            .map(|s| Document {
                collection: collection.to_string(),
                id: id.to_string(),
                revision: s.revision,
                body: s.body.clone(),
            }))
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError> {
        let docs = self
            .docs
            .read()
            .map_err(|_| DocumentStoreError::Io("lock poisoned".to_string()))?;

        let mut out: Vec<Document> = docs
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|((c, id), s)| Document {
                collection: c.clone(),
                id: id.clone(),
                revision: s.revision,
                body: s.body.clone(),
            })
            .collect();

        // Deterministic order for tests and replays.
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), DocumentStoreError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut docs = self
            .docs
            .write()
            .map_err(|_| DocumentStoreError::Io("lock poisoned".to_string()))?;

        // Check every precondition before touching anything (all-or-nothing).
        for write in &writes {
            let (collection, id, expected) = match write {
                DocumentWrite::Put {
                    collection,
                    id,
                    expected,
                    ..
                } => (collection, id, expected),
                DocumentWrite::Delete {
                    collection,
                    id,
                    expected,
                } => (collection, id, expected),
            };
            let current = docs
                .get(&(collection.clone(), id.clone()))
                .map(|s| s.revision);
            if !expected.matches(current) {
                return Err(DocumentStoreError::Conflict(format!(
                    "{collection}/{id}: expected {expected:?}, found {current:?}"
                )));
            }
        }

        for write in writes {
            match write {
                DocumentWrite::Put {
                    collection,
                    id,
                    body,
                    ..
                } => {
                    let key = (collection, id);
                    let revision = docs.get(&key).map(|s| s.revision + 1).unwrap_or(1);
                    docs.insert(key, Stored { revision, body });
                }
                DocumentWrite::Delete { collection, id, .. } => {
                    docs.remove(&(collection, id));
                }
            }
        }

        Ok(())
    }
}
