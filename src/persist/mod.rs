//! Persistence for stores.
//!
//! [`Persisted`] wraps a [`Store`](crate::Store) whose state implements
//! [`Persist`]. At construction it restores the last snapshot from a
//! [`Storage`](crate::storage::Storage) medium; after every mutation it
//! writes the current snapshot back under the same name.

mod persisted;

pub use persisted::{PersistOptions, Persisted};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// State that can be projected to, and restored from, a durable snapshot.
///
/// The snapshot is usually a subset of the state: derived values and
/// transient fields are left out.
pub trait Persist {
    /// Serializable projection of the state.
    type Snapshot: Serialize + DeserializeOwned;

    /// Project the state onto its persisted subset.
    fn snapshot(&self) -> Self::Snapshot;

    /// Merge a loaded snapshot into the state.
    fn restore(&mut self, snapshot: Self::Snapshot);
}
