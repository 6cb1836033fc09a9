//! Persistent key-value storage for every Workshop store.
//!
//! Values are JSON strings under flat keys (`workshop.projects`, `workshop.profiles`, ...).
//! The JSON helpers never fail: a missing key, a backend error or a malformed value all
//! read as `None`, and a failed write is logged and reported as `false`.

pub mod local_project_store;
pub mod memory;
pub mod sled_store;

pub use local_project_store::{LocalProjectStore, MAX_STORED_PROJECTS};
pub use memory::MemoryStorage;
pub use sled_store::SledStorage;

use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// String-keyed, string-valued store (the shape of browser local storage).
pub trait KvStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Raw string at `key`; backend errors are logged and read as missing.
pub fn read_raw(storage: &dyn KvStorage, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(target: "workshop::storage", key, error = %e, "read failed");
            None
        }
    }
}

/// Parsed JSON value at `key`, or `None` when missing or malformed.
pub fn read_value(storage: &dyn KvStorage, key: &str) -> Option<serde_json::Value> {
    let raw = read_raw(storage, key)?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(target: "workshop::storage", key, error = %e, "ignoring malformed value");
            None
        }
    }
}

/// Typed JSON at `key`, or `None` when missing or not of shape `T`.
pub fn read_json<T: DeserializeOwned>(storage: &dyn KvStorage, key: &str) -> Option<T> {
    let value = read_value(storage, key)?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(target: "workshop::storage", key, error = %e, "ignoring value of unexpected shape");
            None
        }
    }
}

pub fn write_raw(storage: &dyn KvStorage, key: &str, value: &str) -> bool {
    match storage.set(key, value) {
        Ok(()) => {
            tracing::debug!(target: "workshop::storage", key, bytes = value.len(), "stored");
            true
        }
        Err(e) => {
            tracing::warn!(target: "workshop::storage", key, error = %e, "write failed");
            false
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(storage: &dyn KvStorage, key: &str, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(raw) => write_raw(storage, key, &raw),
        Err(e) => {
            tracing::warn!(target: "workshop::storage", key, error = %e, "serialization failed");
            false
        }
    }
}

pub fn remove_key(storage: &dyn KvStorage, key: &str) -> bool {
    match storage.remove(key) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(target: "workshop::storage", key, error = %e, "remove failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn malformed_json_reads_as_missing() {
        let storage = MemoryStorage::new();
        storage.set("k", "{not json").unwrap();
        assert!(read_value(&storage, "k").is_none());
        let typed: Option<BTreeMap<String, u32>> = read_json(&storage, "k");
        assert!(typed.is_none());
    }

    #[test]
    fn json_round_trips_through_helpers() {
        let storage = MemoryStorage::new();
        let mut m = BTreeMap::new();
        m.insert("a".to_string(), 1u32);
        assert!(write_json(&storage, "k", &m));
        let back: BTreeMap<String, u32> = read_json(&storage, "k").unwrap();
        assert_eq!(back, m);
        assert!(remove_key(&storage, "k"));
        assert!(read_raw(&storage, "k").is_none());
    }
}
