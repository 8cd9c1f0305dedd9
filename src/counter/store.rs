use std::sync::Arc;

use super::state::{selectors, CounterState};
use crate::config::Config;
use crate::error::PersistError;
use crate::persist::{PersistOptions, Persisted};
use crate::storage::{MemoryStorage, Storage};
use crate::store::SubscriptionId;

/// Storage key the counter is persisted under.
pub const STORAGE_KEY: &str = "countStore";

/// A counter that survives restarts.
///
/// `increment`, `decrement` and `reset` are the only ways to change the
/// count; the persistence layer stays private.
///
/// ```compile_fail
/// use counter_store::CounterStore;
///
/// let counter = CounterStore::in_memory();
/// counter.persisted().set(Default::default());
/// ```
///
/// # Examples
///
/// ```
/// use counter_store::CounterStore;
///
/// let counter = CounterStore::in_memory();
/// counter.increment();
/// counter.increment();
/// counter.decrement();
/// assert_eq!(counter.count(), 1);
/// assert!(!counter.is_even());
/// ```
#[derive(Debug)]
pub struct CounterStore {
    inner: Persisted<CounterState>,
}

impl CounterStore {
    /// Open the counter on `storage` under [`STORAGE_KEY`].
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_options(storage, PersistOptions::new(STORAGE_KEY))
    }

    pub fn with_options(storage: Arc<dyn Storage>, options: PersistOptions) -> Self {
        Self {
            inner: Persisted::new(CounterState::default(), storage, options),
        }
    }

    /// A counter on a fresh, private in-memory medium.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Open the counter on the medium and record name from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::with_options(config.open_storage(), PersistOptions::new(config.name.as_str()))
    }

    pub fn increment(&self) {
        self.inner.update(CounterState::increment);
        tracing::trace!(count = self.count(), "incremented");
    }

    pub fn decrement(&self) {
        self.inner.update(CounterState::decrement);
        tracing::trace!(count = self.count(), "decremented");
    }

    pub fn reset(&self) {
        self.inner.update(CounterState::reset);
        tracing::trace!("reset");
    }

    pub fn count(&self) -> i64 {
        self.inner.store().select(selectors::count)
    }

    /// Whether the current count is even. Derived on every call.
    pub fn is_even(&self) -> bool {
        self.inner.store().select(selectors::is_even)
    }

    pub fn state(&self) -> CounterState {
        self.inner.store().get()
    }

    /// Called with the new state after every action.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&CounterState) + Send + Sync + 'static,
    {
        self.inner.store().subscribe(listener)
    }

    /// Called with `(new, previous)` whenever the count changes.
    pub fn subscribe_count<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(i64, i64) + Send + Sync + 'static,
    {
        self.inner
            .store()
            .subscribe_with_selector(selectors::count, move |new, old| listener(*new, *old))
    }

    /// Called with `(new, previous)` whenever the parity flips.
    pub fn subscribe_is_even<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(bool, bool) + Send + Sync + 'static,
    {
        self.inner
            .store()
            .subscribe_with_selector(selectors::is_even, move |new, old| listener(*new, *old))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.store().unsubscribe(id)
    }

    /// Storage key the count is persisted under.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Whether the persisted count has been loaded.
    pub fn has_hydrated(&self) -> bool {
        self.inner.has_hydrated()
    }

    /// Reload the count from storage, picking up external writes.
    /// Returns `Ok(false)` when nothing is stored.
    pub fn rehydrate(&self) -> Result<bool, PersistError> {
        self.inner.rehydrate()
    }

    /// Write the current count to storage now.
    pub fn flush(&self) -> Result<(), PersistError> {
        self.inner.flush()
    }

    /// Delete the stored record. The in-memory count is kept.
    pub fn clear_storage(&self) -> Result<(), PersistError> {
        self.inner.clear_storage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn starts_at_zero() {
        let counter = CounterStore::in_memory();
        assert_eq!(counter.count(), 0);
        assert!(counter.is_even());
        assert!(counter.has_hydrated());
        assert_eq!(counter.name(), STORAGE_KEY);
    }

    #[test]
    fn persists_after_each_action() {
        let storage = MemoryStorage::new();
        let counter = CounterStore::new(Arc::new(storage.clone()));

        counter.increment();
        assert_eq!(
            storage.get_item(STORAGE_KEY).unwrap().as_deref(),
            Some(r#"{"count":1}"#)
        );
        counter.decrement();
        counter.decrement();
        assert_eq!(
            storage.get_item(STORAGE_KEY).unwrap().as_deref(),
            Some(r#"{"count":-1}"#)
        );
    }

    #[test]
    fn reset_returns_to_zero() {
        let counter = CounterStore::in_memory();
        counter.increment();
        counter.increment();
        counter.increment();
        counter.reset();
        assert_eq!(counter.state(), CounterState::new(0));
    }

    #[test]
    fn parity_subscription_fires_on_flip_only() {
        let counter = CounterStore::in_memory();
        let flips = Arc::new(Mutex::new(Vec::new()));
        let flips_clone = flips.clone();
        counter.subscribe_is_even(move |new, old| flips_clone.lock().push((old, new)));

        counter.increment();
        counter.increment();
        counter.reset();

        assert_eq!(*flips.lock(), vec![(true, false), (false, true)]);
    }

    #[test]
    fn reset_at_zero_does_not_fire_count_listener() {
        let counter = CounterStore::in_memory();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let id = counter.subscribe_count(move |new, old| seen_clone.lock().push((old, new)));

        counter.reset();
        counter.decrement();
        assert!(counter.unsubscribe(id));
        counter.decrement();

        assert_eq!(*seen.lock(), vec![(0, -1)]);
    }

    #[test]
    fn custom_record_name() {
        let storage = MemoryStorage::new();
        let counter = CounterStore::with_options(
            Arc::new(storage.clone()),
            PersistOptions::new("clicks"),
        );
        counter.increment();
        assert!(storage.get_item(STORAGE_KEY).unwrap().is_none());
        assert!(storage.get_item("clicks").unwrap().is_some());
    }
}
