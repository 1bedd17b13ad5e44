//! Weft Core
//!
//! This crate provides the core runtime for the Weft reactive state
//! framework. It implements:
//!
//! - A reactive key-value store with per-instance write batching and an
//!   ordered plugin chain
//! - Auto-tracking effects and explicit-dependency effects
//! - Cached computed values with equality-suppressed fan-out
//! - A keyed list reconciler that syncs an array to externally owned
//!   render targets
//!
//! There is no virtual DOM and no global scheduler: each store batches its
//! own writes and delivers them in one flush per checkpoint. Host bindings
//! (DOM attributes, terminal widgets, anything with an ordered child list)
//! sit on top of `subscribe`/`get`/`set` and the reconciler's container
//! traits.
//!
//! # Architecture
//!
//! - `value`: the dynamic [`Value`] model and its equality semantics
//! - `reactive`: stores, effects, computed values, plugins, flush
//!   scheduling
//! - `list`: keyed reconciliation against abstract target containers
//! - `error`: fail-fast construction and access errors
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use weft_core::{Effect, Store, TaskQueue, Value};
//!
//! let queue = Arc::new(TaskQueue::new());
//! let store = Store::builder()
//!     .scheduler(queue.clone())
//!     .build(Value::map([("count", 0)]))?;
//!
//! let s = store.clone();
//! let effect = Effect::new(move || {
//!     println!("count is {}", s.get("count"));
//! });
//!
//! store.set("count", 1);
//! store.set("count", 2);
//! queue.drain(); // one flush: the effect re-runs once and prints 2
//! ```

pub mod error;
pub mod list;
pub mod reactive;
pub mod value;

pub use error::Error;
pub use list::{
    bind_computed_list, bind_list, FnViewState, KeyedList, ListKey, ListRenderer, NoViewState,
    TargetContainer, ViewStateHook,
};
pub use reactive::{
    Computed, Effect, FlushScheduler, FlushTask, ManualScheduler, Plugin, PluginError,
    PluginResult, Store, StoreBuilder, Subscription, SubscriptionId, TaskQueue,
};
pub use value::{is_reactive, Value};
