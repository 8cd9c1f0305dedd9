use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Store::subscribe`], used to unsubscribe later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

struct Inner<T> {
    state: RwLock<T>,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber<T>)>>,
    next_id: AtomicU64,
    // Held across mutate + notify so notifications arrive in mutation
    // order. Reentrant: a subscriber may mutate the store it observes.
    dispatch: ReentrantMutex<()>,
    // Bumped on every mutation.
    version: AtomicU64,
}

/// A thread-safe store for managing application state.
///
/// The store is the sole owner of its state. Consumers read clones or
/// borrow through closures, and mutate through [`update`](Store::update)
/// or [`set`](Store::set). Clones of a `Store` share the same state and
/// subscribers.
///
/// Mutations are serialized together with their notifications: when two
/// threads update the store, every subscriber sees the first change
/// before the second one starts.
///
/// # Examples
///
/// ```
/// use counter_store::Store;
///
/// let store = Store::new(0i64);
/// store.update(|n| *n += 1);
/// assert_eq!(store.get(), 1);
/// ```
pub struct Store<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// Create a new store with the given initial state.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(initial),
                subscribers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
                dispatch: ReentrantMutex::new(()),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Get a clone of the current state.
    pub fn get(&self) -> T {
        self.inner.state.read().clone()
    }

    /// Read state through a closure without cloning it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let state = self.inner.state.read();
        f(&state)
    }

    /// Read a single sub-value of the state.
    pub fn select<U, S>(&self, selector: S) -> U
    where
        S: Fn(&T) -> U,
    {
        self.read(selector)
    }

    /// Update the state using a function, then notify subscribers.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        self.dispatch(None, f);
    }

    /// Replace the state, then notify subscribers.
    pub fn set(&self, new_state: T) {
        self.dispatch(None, move |state| *state = new_state);
    }

    /// Update the state and notify every subscriber except `skip`.
    ///
    /// Only this one notification skips it; mutations made by other
    /// subscribers while it runs are delivered to `skip` as usual.
    pub fn update_skipping<F>(&self, skip: SubscriptionId, f: F)
    where
        F: FnOnce(&mut T),
    {
        self.dispatch(Some(skip), f);
    }

    /// Subscribe to state changes.
    ///
    /// The callback is called with the new state after every mutation.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        self.inner
            .subscribers
            .write()
            .push((id, Arc::new(callback)));
        id
    }

    /// Subscribe to changes of a single selected value.
    ///
    /// The listener receives `(new, previous)` and only runs when the
    /// selected value actually changes. Mutations that leave it equal are
    /// skipped.
    pub fn subscribe_with_selector<U, S, L>(&self, selector: S, listener: L) -> SubscriptionId
    where
        U: Clone + PartialEq + Send + 'static,
        S: Fn(&T) -> U + Send + Sync + 'static,
        L: Fn(&U, &U) + Send + Sync + 'static,
    {
        let _dispatch = self.inner.dispatch.lock();
        let last = Mutex::new(self.read(&selector));
        self.subscribe(move |state| {
            let next = selector(state);
            let previous = {
                let mut last = last.lock();
                if *last == next {
                    return;
                }
                std::mem::replace(&mut *last, next.clone())
            };
            listener(&next, &previous);
        })
    }

    /// Read state while no mutation or notification is in flight.
    ///
    /// Side effects performed in `f` are ordered with respect to the
    /// store's notifications.
    pub(crate) fn read_settled<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let _dispatch = self.inner.dispatch.lock();
        self.read(f)
    }

    fn dispatch<F>(&self, skip: Option<SubscriptionId>, f: F)
    where
        F: FnOnce(&mut T),
    {
        let _dispatch = self.inner.dispatch.lock();
        let (mut snapshot, mut seen) = {
            let mut state = self.inner.state.write();
            f(&mut state);
            let version = self.inner.version.fetch_add(1, Ordering::SeqCst) + 1;
            (state.clone(), version)
        };
        self.notify(skip, &mut snapshot, &mut seen);
    }

    /// Notify subscribers of a state change.
    ///
    /// Only the dispatch lock is held while callbacks run, so a subscriber
    /// may read the store, mutate it, or (un)subscribe. If a subscriber
    /// mutates, the remaining subscribers get the newer state.
    fn notify(&self, skip: Option<SubscriptionId>, snapshot: &mut T, seen: &mut u64) {
        let subscribers: Vec<Subscriber<T>> = self
            .inner
            .subscribers
            .read()
            .iter()
            .filter(|(id, _)| Some(*id) != skip)
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        for subscriber in subscribers {
            let current = self.inner.version.load(Ordering::SeqCst);
            if current != *seen {
                *snapshot = self.get();
                *seen = current;
            }
            subscriber(snapshot);
        }
    }
}

impl<T> Store<T> {
    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.inner.state.read())
            .field("subscribers", &self.inner.subscribers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq)]
    struct AppState {
        count: i64,
        name: String,
    }

    fn app_state() -> AppState {
        AppState {
            count: 0,
            name: "test".to_string(),
        }
    }

    #[test]
    fn store_get_set() {
        let store = Store::new(app_state());

        assert_eq!(store.get().count, 0);

        store.set(AppState {
            count: 42,
            name: "updated".to_string(),
        });

        assert_eq!(store.get().count, 42);
        assert_eq!(store.get().name, "updated");
    }

    #[test]
    fn store_update() {
        let store = Store::new(app_state());

        store.update(|state| {
            state.count += 10;
        });

        assert_eq!(store.get().count, 10);
        assert_eq!(store.select(|s| s.name.clone()), "test");
    }

    #[test]
    fn store_subscribe() {
        let store = Store::new(app_state());

        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        store.subscribe(move |_state| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        store.update(|state| state.count += 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        store.update(|state| state.count += 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Store::new(app_state());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let id = store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        store.update(|s| s.count += 1);
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.update(|s| s.count += 1);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn selector_skips_unrelated_changes() {
        let store = Store::new(app_state());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        store.subscribe_with_selector(
            |s: &AppState| s.name.clone(),
            move |new, old| seen_clone.lock().push((old.clone(), new.clone())),
        );

        store.update(|s| s.count += 1);
        store.update(|s| s.name = "renamed".to_string());
        store.update(|s| s.count += 1);

        assert_eq!(
            *seen.lock(),
            vec![("test".to_string(), "renamed".to_string())]
        );
    }

    #[test]
    fn subscriber_can_read_store() {
        let store = Store::new(app_state());
        let observed = Arc::new(AtomicUsize::new(0));
        let observed_clone = observed.clone();
        let reader = store.clone();

        store.subscribe(move |_| {
            let count = reader.read(|s| s.count) as usize;
            observed_clone.store(count, Ordering::SeqCst);
        });

        store.update(|s| s.count = 7);
        assert_eq!(observed.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn concurrent_updates_notify_in_mutation_order() {
        let store = Store::new(0i64);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        store.subscribe(move |n: &i64| {
            std::thread::yield_now();
            seen_clone.lock().push(*n);
        });

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store.update(|n| *n += 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*seen.lock(), (1..=200).collect::<Vec<i64>>());
    }

    #[test]
    fn subscriber_can_mutate_store() {
        let store = Store::new(0i64);
        let clamp = store.clone();
        store.subscribe(move |n: &i64| {
            if *n > 3 {
                clamp.set(3);
            }
        });
        let last = Arc::new(Mutex::new(Vec::new()));
        let last_clone = last.clone();
        store.subscribe(move |n: &i64| last_clone.lock().push(*n));

        store.set(10);

        assert_eq!(store.get(), 3);
        assert_eq!(*last.lock().last().unwrap(), 3);
        assert!(!last.lock().contains(&10));
    }

    #[test]
    fn update_skipping_skips_one_subscriber_once() {
        let store = Store::new(app_state());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let id = store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        store.update_skipping(id, |s| s.count = 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        store.update(|s| s.count = 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clones_share_state() {
        let store = Store::new(app_state());
        let other = store.clone();
        other.update(|s| s.count = 3);
        assert_eq!(store.get().count, 3);
    }
}
