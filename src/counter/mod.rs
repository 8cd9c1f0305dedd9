//! The persisted counter.
//!
//! A [`CounterStore`] owns a single signed count, exposes `increment` and
//! `decrement` actions, derives `is_even` from the count on every read, and
//! persists `{"count": n}` under [`STORAGE_KEY`].

mod state;
mod store;

pub use state::{selectors, CounterSnapshot, CounterState};
pub use store::{CounterStore, STORAGE_KEY};
