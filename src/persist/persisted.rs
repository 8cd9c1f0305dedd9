use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::Persist;
use crate::error::PersistError;
use crate::storage::Storage;
use crate::store::{Store, SubscriptionId};

/// Options controlling how a [`Persisted`] store reads and writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistOptions {
    /// Storage key of the persisted record.
    pub name: String,
    /// Skip reading the record at construction. Call
    /// [`Persisted::rehydrate`] later to load it.
    pub skip_hydration: bool,
}

impl PersistOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skip_hydration: false,
        }
    }

    pub fn skip_hydration(mut self, skip: bool) -> Self {
        self.skip_hydration = skip;
        self
    }
}

/// A store whose state survives restarts.
///
/// Storage failures never reach the caller of a mutation: they are logged
/// with `tracing` and the store keeps running on its in-memory state.
/// [`flush`](Persisted::flush), [`rehydrate`](Persisted::rehydrate) and
/// [`clear_storage`](Persisted::clear_storage) return errors for callers
/// that want to handle them.
pub struct Persisted<T> {
    store: Store<T>,
    storage: Arc<dyn Storage>,
    options: PersistOptions,
    hydrated: Arc<AtomicBool>,
    writer: SubscriptionId,
}

impl<T> Persisted<T>
where
    T: Persist + Clone + Send + Sync + 'static,
{
    /// Wrap `initial` in a store, restore it from `storage`, and start
    /// writing it back on every change.
    pub fn new(mut initial: T, storage: Arc<dyn Storage>, options: PersistOptions) -> Self {
        let hydrated = Arc::new(AtomicBool::new(false));
        if !options.skip_hydration {
            match load::<T>(storage.as_ref(), &options.name) {
                Ok(Some(snapshot)) => {
                    initial.restore(snapshot);
                    tracing::debug!(name = %options.name, "restored persisted state");
                }
                Ok(None) => {
                    tracing::debug!(name = %options.name, "no persisted state, using defaults");
                }
                Err(e) => {
                    tracing::warn!(name = %options.name, error = %e, "ignoring persisted state");
                }
            }
            hydrated.store(true, Ordering::SeqCst);
        }

        let store = Store::new(initial);
        let writer = store.subscribe({
            let storage = Arc::clone(&storage);
            let name = options.name.clone();
            move |state: &T| {
                if let Err(e) = write(storage.as_ref(), &name, state) {
                    tracing::warn!(name = %name, error = %e, "failed to persist state");
                }
            }
        });

        Self {
            store,
            storage,
            options,
            hydrated,
            writer,
        }
    }

    /// The wrapped store.
    pub fn store(&self) -> &Store<T> {
        &self.store
    }

    /// The storage medium.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Storage key of the persisted record.
    pub fn name(&self) -> &str {
        &self.options.name
    }

    /// Options this store was built with.
    pub fn options(&self) -> &PersistOptions {
        &self.options
    }

    /// Whether a hydration attempt has completed.
    pub fn has_hydrated(&self) -> bool {
        self.hydrated.load(Ordering::SeqCst)
    }

    /// Mutate the state; the new snapshot is written afterwards.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        self.store.update(f);
    }

    /// Replace the state; the new snapshot is written afterwards.
    pub fn set(&self, state: T) {
        self.store.set(state);
    }

    /// Reload the persisted record into the store.
    ///
    /// Returns `Ok(true)` if a snapshot was restored and `Ok(false)` if the
    /// record is absent. Subscribers are notified of the restored state but
    /// it is not written back.
    pub fn rehydrate(&self) -> Result<bool, PersistError> {
        let loaded = load::<T>(self.storage.as_ref(), &self.options.name);
        self.hydrated.store(true, Ordering::SeqCst);
        let Some(snapshot) = loaded? else {
            return Ok(false);
        };

        self.store
            .update_skipping(self.writer, |state| state.restore(snapshot));
        tracing::debug!(name = %self.options.name, "rehydrated persisted state");
        Ok(true)
    }

    /// Write the current snapshot immediately.
    pub fn flush(&self) -> Result<(), PersistError> {
        self.store
            .read_settled(|state| write(self.storage.as_ref(), &self.options.name, state))
    }

    /// Delete the persisted record. In-memory state is left unchanged.
    pub fn clear_storage(&self) -> Result<(), PersistError> {
        self.storage.remove_item(&self.options.name)?;
        Ok(())
    }
}

impl<T> Drop for Persisted<T> {
    fn drop(&mut self) {
        self.store.unsubscribe(self.writer);
    }
}

impl<T: fmt::Debug> fmt::Debug for Persisted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persisted")
            .field("store", &self.store)
            .field("options", &self.options)
            .field("hydrated", &self.hydrated.load(Ordering::SeqCst))
            .finish()
    }
}

fn load<T: Persist>(
    storage: &dyn Storage,
    name: &str,
) -> Result<Option<T::Snapshot>, PersistError> {
    let Some(raw) = storage.get_item(name)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| PersistError::Malformed {
            name: name.to_string(),
            source,
        })
}

fn write<T: Persist>(storage: &dyn Storage, name: &str, state: &T) -> Result<(), PersistError> {
    let json = serde_json::to_string(&state.snapshot()).map_err(PersistError::Serialize)?;
    storage.set_item(name, &json)?;
    tracing::debug!(name = %name, "persisted state");
    Ok(())
}
