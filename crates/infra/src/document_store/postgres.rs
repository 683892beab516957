//! Postgres-backed document store implementation.
//!
//! Persists every collection in one `documents` table (JSONB body plus a
//! revision column) and enforces the revision preconditions inside a single
//! transaction, which gives `commit` its all-or-nothing semantics.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `DocumentStoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | DocumentStoreError | Scenario |
//! |------------|----------------------|--------------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Concurrent insert of the same document |
//! | Database (serialization failure) | `40001` | `Conflict` | Concurrent transaction won |
//! | Database (other) | Any other | `Io` | Other database errors |
//! | PoolClosed / Io / Tls | N/A | `Io` | Connection-level failures |
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS documents (
//!     collection  TEXT        NOT NULL,
//!     id          TEXT        NOT NULL,
//!     revision    BIGINT      NOT NULL,
//!     body        JSONB       NOT NULL,
//!     updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     PRIMARY KEY (collection, id)
//! );
//! ```
//!
//! ## Thread Safety
//!
//! `PostgresDocumentStore` is `Send + Sync`; all operations go through the
//! SQLx pool, which manages connections across threads.

use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::instrument;

use super::{Document, DocumentStore, DocumentStoreError, DocumentWrite, Expected};

/// Postgres-backed revision-checked document store.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn get_async(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, DocumentStoreError> {
        let row = sqlx::query(
            r#"
            SELECT revision, body
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        Ok(row.map(|row| Document {
            collection: collection.to_string(),
            id: id.to_string(),
            revision: row.get::<i64, _>("revision") as u64,
            body: row.get("body"),
        }))
    }

    #[instrument(skip(self), err)]
    pub async fn list_async(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, revision, body
            FROM documents
            WHERE collection = $1
            ORDER BY id ASC
            "#,
        )
        .bind(collection)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        Ok(rows
            .into_iter()
            .map(|row| Document {
                collection: collection.to_string(),
                id: row.get("id"),
                revision: row.get::<i64, _>("revision") as u64,
                body: row.get("body"),
            })
            .collect())
    }

    /// Apply the writes atomically.
    ///
    /// Every precondition is checked under `FOR UPDATE` row locks before the
    /// first mutation; any failed check rolls the transaction back with a
    /// `Conflict` so the caller can re-read and retry the whole operation.
    #[instrument(skip(self, writes), fields(write_count = writes.len()), err)]
    pub async fn commit_async(
        &self,
        writes: Vec<DocumentWrite>,
    ) -> Result<(), DocumentStoreError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        for write in &writes {
            let (collection, id, expected) = match write {
                DocumentWrite::Put {
                    collection,
                    id,
                    expected,
                    ..
                } => (collection, id, *expected),
                DocumentWrite::Delete {
                    collection,
                    id,
                    expected,
                } => (collection, id, *expected),
            };

            let current: Option<i64> = sqlx::query_scalar(
                r#"
                SELECT revision FROM documents
                WHERE collection = $1 AND id = $2
                FOR UPDATE
                "#,
            )
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("check_revision", e))?;

            if !expected.matches(current.map(|r| r as u64)) {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
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
                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, revision, body, updated_at)
                        VALUES ($1, $2, 1, $3, now())
                        ON CONFLICT (collection, id)
                        DO UPDATE SET
                            revision = documents.revision + 1,
                            body = EXCLUDED.body,
                            updated_at = now()
                        "#,
                    )
                    .bind(&collection)
                    .bind(&id)
                    .bind(&body)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        if is_unique_violation(&e) {
                            DocumentStoreError::Conflict(format!(
                                "{collection}/{id}: concurrent insert"
                            ))
                        } else {
                            map_sqlx_error("put", e)
                        }
                    })?;
                }
                DocumentWrite::Delete { collection, id, .. } => {
                    sqlx::query(
                        r#"
                        DELETE FROM documents
                        WHERE collection = $1 AND id = $2
                        "#,
                    )
                    .bind(&collection)
                    .bind(&id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("delete", e))?;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(())
    }
}

impl DocumentStore for PostgresDocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError> {
        runtime_handle()?.block_on(self.get_async(collection, id))
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError> {
        runtime_handle()?.block_on(self.list_async(collection))
    }

    fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), DocumentStoreError> {
        runtime_handle()?.block_on(self.commit_async(writes))
    }
}

fn runtime_handle() -> Result<tokio::runtime::Handle, DocumentStoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        DocumentStoreError::Io(
            "PostgresDocumentStore requires a tokio runtime context".to_string(),
        )
    })
}

fn map_sqlx_error(operation: &str, e: sqlx::Error) -> DocumentStoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("40001") => {
            DocumentStoreError::Conflict(format!("{operation}: serialization failure"))
        }
        _ => DocumentStoreError::Io(format!("{operation}: {e}")),
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
