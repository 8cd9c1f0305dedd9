//! # counter-store
//!
//! A persisted counter built from small, reusable state-management pieces.
//!
//! ## Store
//!
//! - `Store<T>` - Thread-safe state container owning its state
//! - Whole-state subscriptions and selector-scoped subscriptions that only
//!   fire when the selected value changes
//!
//! ## Persistence
//!
//! - `Persisted<T>` - Wraps a store, restores a snapshot on construction and
//!   writes it back after every mutation
//! - `Storage` - Synchronous key-value medium (`MemoryStorage`, `FileStorage`)
//!
//! ## Counter
//!
//! - `CounterStore` - `increment`, `decrement`, derived `is_even`, persisted
//!   as `{"count": n}` under `"countStore"`
//!
//! Storage failures are logged through `tracing` and never interrupt the
//! counter; it keeps working on its in-memory state.

pub mod config;
pub mod counter;
pub mod error;
pub mod persist;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use config::{Config, StorageConfig};
pub use counter::{CounterSnapshot, CounterState, CounterStore, STORAGE_KEY};
pub use error::{ConfigError, PersistError, StorageError};
pub use persist::{Persist, PersistOptions, Persisted};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{Store, SubscriptionId};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let counter = CounterStore::in_memory();
        assert_eq!(counter.count(), 0);
        counter.increment();
        assert_eq!(counter.count(), 1);
    }
}
