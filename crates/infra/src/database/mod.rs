//! Local storage adapter

mod record_store;

pub use record_store::SqliteRecordStore;
