//! Sled-backed storage: one tree (`workshop`) holding every key.

use super::KvStorage;
use crate::error::StorageError;
use sled::{Db, Tree};
use std::path::Path;

const TREE_NAME: &str = "workshop";

#[derive(Debug, Clone)]
pub struct SledStorage {
    db: Db,
    tree: Tree,
}

impl SledStorage {
    /// Opens or creates the database at `path`.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A database that is deleted when dropped.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(TREE_NAME)?;
        tracing::info!(target: "workshop::storage", tree = TREE_NAME, "sled storage opened");
        Ok(Self { db, tree })
    }

    /// Blocks until all pending writes are on disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl KvStorage for SledStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.tree.get(key.as_bytes())? {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|_| StorageError::Encoding(key.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.tree.insert(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.tree.remove(key.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let s = SledStorage::open_path(dir.path()).unwrap();
            s.set("workshop.theme", "forge").unwrap();
            s.flush().unwrap();
        }
        let s = SledStorage::open_path(dir.path()).unwrap();
        assert_eq!(s.get("workshop.theme").unwrap().as_deref(), Some("forge"));
    }

    #[test]
    fn remove_deletes_key() {
        let s = SledStorage::temporary().unwrap();
        s.set("k", "v").unwrap();
        s.remove("k").unwrap();
        assert!(s.get("k").unwrap().is_none());
        assert!(s.is_empty());
    }
}
