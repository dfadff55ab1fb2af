//! Sqlite-backed record store
//!
//! Persists records as JSON bodies keyed by `(collection, key)`. No query
//! language, no migrations; one table covers every record type. Connection
//! access goes through `spawn_blocking` so storage I/O never blocks the
//! async workers.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use courier_core::ports::{Record, RecordStore};
use courier_domain::{DataError, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tokio::task;
use tracing::debug;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    key        TEXT NOT NULL,
    body       TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, key)
)";

/// Record store over a single sqlite database file.
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open (or create) the database at the given path.
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] when the file cannot be opened or the
    /// schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(map_sqlite_error)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (tests, throwaway caches).
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] when the schema cannot be applied.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(map_sqlite_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(map_sqlite_error)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for SqliteRecordStore {
    async fn insert(&self, record: R) -> Result<R> {
        let conn = Arc::clone(&self.conn);
        let collection = R::collection();
        let key = record.key();
        let body = encode_body(&record)?;

        task::spawn_blocking(move || -> Result<()> {
            let conn = conn.lock();
            conn.execute(
                "INSERT INTO records (collection, key, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![collection, key, body, Utc::now().to_rfc3339()],
            )
            .map_err(map_sqlite_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)??;

        debug!(collection, "record inserted");
        Ok(record)
    }

    async fn update(&self, record: R) -> Result<R> {
        let conn = Arc::clone(&self.conn);
        let collection = R::collection();
        let key = record.key();
        let body = encode_body(&record)?;

        task::spawn_blocking(move || -> Result<()> {
            let conn = conn.lock();
            let affected = conn
                .execute(
                    "UPDATE records SET body = ?3, updated_at = ?4
                     WHERE collection = ?1 AND key = ?2",
                    params![collection, key, body, Utc::now().to_rfc3339()],
                )
                .map_err(map_sqlite_error)?;
            if affected == 0 {
                return Err(not_found(collection, &key));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)??;

        Ok(record)
    }

    async fn delete(&self, record: R) -> Result<R> {
        let conn = Arc::clone(&self.conn);
        let collection = R::collection();
        let key = record.key();

        task::spawn_blocking(move || -> Result<()> {
            let conn = conn.lock();
            let affected = conn
                .execute(
                    "DELETE FROM records WHERE collection = ?1 AND key = ?2",
                    params![collection, key],
                )
                .map_err(map_sqlite_error)?;
            if affected == 0 {
                return Err(not_found(collection, &key));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)??;

        Ok(record)
    }

    async fn fetch(&self, record: R) -> Result<R> {
        let conn = Arc::clone(&self.conn);
        let collection = R::collection();
        let key = record.key();

        let body = task::spawn_blocking(move || -> Result<String> {
            let conn = conn.lock();
            conn.query_row(
                "SELECT body FROM records WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => not_found(collection, &key),
                other => map_sqlite_error(other),
            })
        })
        .await
        .map_err(map_join_error)??;

        serde_json::from_str(&body)
            .map_err(|err| DataError::Storage(format!("stored record is corrupt: {err}")))
    }
}

fn encode_body<R: Record>(record: &R) -> Result<String> {
    serde_json::to_string(record)
        .map_err(|err| DataError::Storage(format!("record is not serializable: {err}")))
}

fn not_found(collection: &str, key: &str) -> DataError {
    DataError::Storage(format!("no record `{key}` in collection `{collection}`"))
}

fn map_sqlite_error(err: rusqlite::Error) -> DataError {
    DataError::Storage(err.to_string())
}

fn map_join_error(err: task::JoinError) -> DataError {
    DataError::Storage(format!("storage task failed: {err}"))
}
