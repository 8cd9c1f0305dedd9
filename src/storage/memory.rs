use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::Storage;
use crate::error::StorageError;

/// In-memory storage backend.
///
/// Clones share the same records, so two stores built from clones of one
/// `MemoryStorage` see each other's writes. That makes it a stand-in for
/// a process restart in tests.
///
/// # Example
///
/// ```
/// use counter_store::storage::{MemoryStorage, Storage};
///
/// let storage = MemoryStorage::new();
/// storage.set_item("countStore", r#"{"count":3}"#).unwrap();
/// assert_eq!(
///     storage.get_item("countStore").unwrap().as_deref(),
///     Some(r#"{"count":3}"#)
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    records: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.records.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.records
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.records.write().remove(key);
        Ok(())
    }
}
