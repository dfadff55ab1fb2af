//! Storage operation builder
//!
//! Turns a CRUD operation kind into a typed [`Operation`] over the
//! [`RecordStore`] port. The default output parser is identity; further
//! parsers chain with [`Operation::pipe`] like any other operation.

use std::sync::Arc;

use super::Operation;
use crate::ports::{Record, RecordStore};

/// CRUD operation delegated to the storage collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperationKind {
    /// Insert a new record.
    Insert,
    /// Update an existing record.
    Update,
    /// Delete a record.
    Delete,
    /// Fetch the stored record with the input's collection and key.
    Fetch,
}

/// Builder for storage operations.
pub struct StorageOperationBuilder<R: Record> {
    kind: StorageOperationKind,
    store: Arc<dyn RecordStore<R>>,
}

impl<R: Record> StorageOperationBuilder<R> {
    /// Start a builder for the given operation kind and store.
    #[must_use]
    pub fn new(kind: StorageOperationKind, store: Arc<dyn RecordStore<R>>) -> Self {
        Self { kind, store }
    }

    /// Build the operation.
    #[must_use]
    pub fn build(self) -> Operation<R, R> {
        let Self { kind, store } = self;
        Operation::new(move |record: R| {
            let store = Arc::clone(&store);
            async move {
                match kind {
                    StorageOperationKind::Insert => store.insert(record).await,
                    StorageOperationKind::Update => store.update(record).await,
                    StorageOperationKind::Delete => store.delete(record).await,
                    StorageOperationKind::Fetch => store.fetch(record).await,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use courier_domain::{DataError, Result};
    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Note {
        id: String,
        text: String,
    }

    impl Record for Note {
        fn collection() -> &'static str {
            "notes"
        }

        fn key(&self) -> String {
            self.id.clone()
        }
    }

    #[derive(Default)]
    struct InMemoryNotes {
        rows: Mutex<HashMap<String, Note>>,
    }

    #[async_trait]
    impl RecordStore<Note> for InMemoryNotes {
        async fn insert(&self, record: Note) -> Result<Note> {
            let mut rows = self.rows.lock();
            if rows.contains_key(&record.key()) {
                return Err(DataError::Storage("duplicate key".to_string()));
            }
            rows.insert(record.key(), record.clone());
            Ok(record)
        }

        async fn update(&self, record: Note) -> Result<Note> {
            let mut rows = self.rows.lock();
            if !rows.contains_key(&record.key()) {
                return Err(DataError::Storage("record not found".to_string()));
            }
            rows.insert(record.key(), record.clone());
            Ok(record)
        }

        async fn delete(&self, record: Note) -> Result<Note> {
            self.rows
                .lock()
                .remove(&record.key())
                .ok_or_else(|| DataError::Storage("record not found".to_string()))?;
            Ok(record)
        }

        async fn fetch(&self, record: Note) -> Result<Note> {
            self.rows
                .lock()
                .get(&record.key())
                .cloned()
                .ok_or_else(|| DataError::Storage("record not found".to_string()))
        }
    }

    fn note(text: &str) -> Note {
        Note { id: "n1".to_string(), text: text.to_string() }
    }

    #[tokio::test]
    async fn insert_then_fetch_round_trips() {
        let store = Arc::new(InMemoryNotes::default());
        let insert = StorageOperationBuilder::new(
            StorageOperationKind::Insert,
            Arc::clone(&store) as Arc<dyn RecordStore<Note>>,
        )
        .build();
        let fetch = StorageOperationBuilder::new(
            StorageOperationKind::Fetch,
            Arc::clone(&store) as Arc<dyn RecordStore<Note>>,
        )
        .build();

        insert.call(note("hello")).await.unwrap();
        let fetched = fetch.call(note("ignored")).await.unwrap();
        assert_eq!(fetched.text, "hello");
    }

    #[tokio::test]
    async fn update_of_a_missing_record_is_a_storage_error() {
        let store = Arc::new(InMemoryNotes::default());
        let update = StorageOperationBuilder::new(
            StorageOperationKind::Update,
            store as Arc<dyn RecordStore<Note>>,
        )
        .build();

        let err = update.call(note("nope")).await.unwrap_err();
        assert!(matches!(err, DataError::Storage(_)));
    }

    #[tokio::test]
    async fn parsers_chain_on_storage_operations() {
        let store = Arc::new(InMemoryNotes::default());
        let insert = StorageOperationBuilder::new(
            StorageOperationKind::Insert,
            store as Arc<dyn RecordStore<Note>>,
        )
        .build()
        .pipe(|record| Ok(record.text.len()));

        assert_eq!(insert.call(note("four")).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn delete_returns_the_deleted_record() {
        let store = Arc::new(InMemoryNotes::default());
        let insert = StorageOperationBuilder::new(
            StorageOperationKind::Insert,
            Arc::clone(&store) as Arc<dyn RecordStore<Note>>,
        )
        .build();
        let delete = StorageOperationBuilder::new(
            StorageOperationKind::Delete,
            Arc::clone(&store) as Arc<dyn RecordStore<Note>>,
        )
        .build();

        insert.call(note("bye")).await.unwrap();
        let deleted = delete.call(note("bye")).await.unwrap();
        assert_eq!(deleted.id, "n1");
        assert!(store.rows.lock().is_empty());
    }
}
