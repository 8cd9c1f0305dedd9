use serde::{Deserialize, Serialize};

use crate::persist::Persist;

/// State owned by the counter store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CounterState {
    pub count: i64,
}

impl CounterState {
    pub fn new(count: i64) -> Self {
        Self { count }
    }

    /// Add one. Wraps at `i64::MAX`.
    pub fn increment(&mut self) {
        self.count = self.count.wrapping_add(1);
    }

    /// Subtract one. Wraps at `i64::MIN`.
    pub fn decrement(&mut self) {
        self.count = self.count.wrapping_sub(1);
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// The persisted projection of [`CounterState`]: `{"count": <integer>}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub count: i64,
}

impl Persist for CounterState {
    type Snapshot = CounterSnapshot;

    fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot { count: self.count }
    }

    fn restore(&mut self, snapshot: CounterSnapshot) {
        self.count = snapshot.count;
    }
}

/// Selectors over [`CounterState`].
///
/// Plain functions, so they work with [`Store::select`](crate::Store::select)
/// and [`Store::subscribe_with_selector`](crate::Store::subscribe_with_selector).
pub mod selectors {
    use super::CounterState;

    pub fn count(state: &CounterState) -> i64 {
        state.count
    }

    /// Parity of the count, recomputed from state on every call.
    pub fn is_even(state: &CounterState) -> bool {
        state.count % 2 == 0
    }
}
