//! Reactive Primitives
//!
//! This module implements the reactive core: keyed stores, effects, and
//! computed values.
//!
//! # Concepts
//!
//! ## Stores
//!
//! A [`Store`] wraps a plain key-value mapping. Reads can be tracked, writes
//! are batched per store instance and delivered in a single flush, and an
//! ordered plugin chain can observe or transform every operation.
//!
//! ## Effects
//!
//! An [`Effect`] is a side-effecting computation that re-runs when any store
//! key it read during its last run changes. Dependencies are discovered
//! automatically (or declared up front in explicit-deps mode).
//!
//! ## Computed values
//!
//! A [`Computed`] is a cached derivation built on an effect. It recomputes
//! when a dependency changes and fans out to its own subscribers only when
//! the new value actually differs from the cached one.
//!
//! # Implementation Notes
//!
//! Auto-tracking uses a thread-local stack of tracking frames. When a store
//! key is read while a frame is active, the read is recorded and the owning
//! effect is subscribed to exactly the keys it touched.
//!
//! Batching is strictly per store instance. All writes to one store within
//! one synchronous turn coalesce into a single flush; two stores written in
//! the same turn each flush independently, so an effect reading both may run
//! once per flush. That tradeoff is deliberate and covered by tests.

mod computed;
mod context;
mod effect;
mod plugin;
mod scheduler;
mod store;

pub use computed::Computed;
pub use effect::Effect;
pub use plugin::{Plugin, PluginError, PluginResult};
pub use scheduler::{FlushScheduler, FlushTask, ManualScheduler, TaskQueue};
pub use store::{Store, StoreBuilder, Subscription, SubscriptionId};
