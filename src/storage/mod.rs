//! Key-value storage backends for persisted state.
//!
//! A [`Storage`] is a synchronous medium mapping string keys to string
//! values, in the spirit of a browser's `localStorage`. Two backends ship
//! with the crate:
//!
//! - [`MemoryStorage`] - process-wide map, nothing touches disk
//! - [`FileStorage`] - one JSON file per key inside a directory

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;

/// Synchronous string key-value medium.
///
/// Implementations use interior mutability so a single medium can be
/// shared between a store and the code that inspects it.
pub trait Storage: Send + Sync {
    /// Retrieve a value. Returns `None` if the key does not exist.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store a value, overwriting any previous one.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Check that `key` can name a record in any backend, including as a
/// file name.
///
/// Keys must be non-empty, must not be `.`, and must not contain `..`, a
/// path separator, or NUL.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key == "."
        || key.contains("..")
        || key.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_rules() {
        for key in ["countStore", "clicks-v1", "a.b"] {
            assert!(validate_key(key).is_ok(), "key {key:?} should be accepted");
        }
        for key in ["", ".", "..", "../escape", "a/b", "a\\b", "a\0b"] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey { .. })),
                "key {key:?} should be rejected"
            );
        }
    }
}
