//! High-level state management with stores.
//!
//! Stores own a piece of state, expose controlled mutation, and notify
//! subscribers either on every change or only when a selected sub-value
//! changes.

mod store;

pub use store::{Store, SubscriptionId};
