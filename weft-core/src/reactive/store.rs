//! Reactive Store
//!
//! A [`Store`] wraps a plain key-value mapping so that reads can be tracked
//! and writes can be batched and delivered to subscribers.
//!
//! # How Stores Work
//!
//! 1. `set` runs the plugin chain, then applies a strict-equality change
//!    check against the stored value. Unchanged writes are no-ops.
//!
//! 2. A real change is committed immediately but delivered later: the key
//!    joins the pending-notification map (last write wins).
//!
//! 3. The first pending change schedules a flush with the store's
//!    scheduler. [`Store::flush`] delivers the whole batch: plugin
//!    `on_notify` hooks, then subscriber callbacks, then one run per effect
//!    subscribed to a changed key. Effects are resolved when the flush
//!    runs, not when the write happens, so an effect that re-tracks (or is
//!    created) between the write and the flush is handled correctly.
//!
//! Batching state is strictly per instance. There is no global registry and
//! no cross-store ordering guarantee.
//!
//! # Thread Safety
//!
//! A `Store` is a cheap-clone handle over shared state; clones observe the
//! same data. Internals are lock-protected, and every list iterated during
//! a flush is snapshotted first, so callbacks may freely subscribe,
//! unsubscribe or write back into the store mid-flush.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::error::Error;
use crate::value::Value;

use super::context;
use super::effect::EffectInner;
use super::plugin::Plugin;
use super::scheduler::{FlushScheduler, ManualScheduler};

static STORE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_store_id() -> u64 {
    STORE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Unique identifier for a registered subscriber callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

type SubscriberFn = Arc<dyn Fn(&Value) + Send + Sync>;

struct SubscriberEntry {
    id: SubscriptionId,
    callback: SubscriberFn,
}

/// A weakly held effect registration. Dead entries are pruned lazily.
struct EffectEntry {
    effect_id: u64,
    effect: Weak<EffectInner>,
}

#[derive(Default)]
struct Pending {
    /// Latest value per changed key, in first-change order.
    notifications: IndexMap<String, Value>,
}

struct StoreCore {
    id: u64,
    values: RwLock<IndexMap<String, Value>>,
    subscribers: RwLock<IndexMap<String, Vec<SubscriberEntry>>>,
    effect_subs: RwLock<IndexMap<String, Vec<EffectEntry>>>,
    pending: Mutex<Pending>,
    flush_scheduled: AtomicBool,
    plugins: Vec<Arc<dyn Plugin>>,
    scheduler: Arc<dyn FlushScheduler>,
}

/// Handle to a registered subscriber. Unsubscribing is explicit and
/// idempotent; dropping the handle leaves the subscription active.
pub struct Subscription {
    active: AtomicBool,
    cancel: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            active: AtomicBool::new(true),
            cancel: Box::new(cancel),
        }
    }

    /// Remove the callback from its subscriber list. Safe to call more than
    /// once, and safe to call from inside a callback that is currently
    /// being notified.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            (self.cancel)();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Configures plugins and scheduling before building a store.
pub struct StoreBuilder {
    plugins: Vec<Arc<dyn Plugin>>,
    scheduler: Arc<dyn FlushScheduler>,
}

impl StoreBuilder {
    /// Append a plugin to the ordered chain.
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Replace the default [`ManualScheduler`].
    pub fn scheduler(mut self, scheduler: Arc<dyn FlushScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Build the store. `initial` must be a plain mapping; every plugin's
    /// `on_init` runs synchronously before this returns.
    pub fn build(self, initial: Value) -> Result<Store, Error> {
        let map = match initial {
            Value::Map(map) => map,
            other => {
                return Err(Error::InvalidInitial { kind: other.kind() });
            }
        };

        let store = Store {
            core: Arc::new(StoreCore {
                id: next_store_id(),
                values: RwLock::new(map.as_ref().clone()),
                subscribers: RwLock::new(IndexMap::new()),
                effect_subs: RwLock::new(IndexMap::new()),
                pending: Mutex::new(Pending::default()),
                flush_scheduled: AtomicBool::new(false),
                plugins: self.plugins,
                scheduler: self.scheduler,
            }),
        };

        for plugin in &store.core.plugins {
            if let Err(err) = plugin.on_init(&store) {
                warn!(plugin = plugin.name(), error = %err, "on_init hook failed");
            }
        }

        Ok(store)
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            scheduler: Arc::new(ManualScheduler),
        }
    }
}

/// A reactive wrapper around a key-value mapping.
///
/// # Example
///
/// ```rust,ignore
/// let store = Store::new(Value::map([("count", 0)]))?;
///
/// let sub = store.subscribe("count", |value| {
///     println!("count is now {value}");
/// });
///
/// store.set("count", 1);
/// store.set("count", 2);
/// store.flush(); // one notification, with 2
/// ```
pub struct Store {
    core: Arc<StoreCore>,
}

impl Store {
    /// Wrap `initial` (which must be a plain mapping) with no plugins and
    /// manual flushing.
    pub fn new(initial: Value) -> Result<Store, Error> {
        Store::builder().build(initial)
    }

    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    /// The store's unique id.
    pub fn id(&self) -> u64 {
        self.core.id
    }

    /// Whether two handles refer to the same store.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    /// Read a key, chaining every plugin's `on_get`.
    ///
    /// A missing key reads as `Undefined`. If an effect is currently
    /// running on this thread, the read is recorded as one of its
    /// dependencies (idempotent per run).
    pub fn get(&self, key: &str) -> Value {
        let mut value = self
            .core
            .values
            .read()
            .get(key)
            .cloned()
            .unwrap_or_default();

        for plugin in &self.core.plugins {
            match plugin.on_get(key, &value) {
                Ok(Some(replacement)) => value = replacement,
                Ok(None) => {}
                Err(err) => {
                    warn!(plugin = plugin.name(), key, error = %err, "on_get hook failed");
                }
            }
        }

        if context::is_tracking() {
            context::record_read(self, key);
        }

        value
    }

    /// Read the stored value without plugin transforms or dependency
    /// tracking.
    pub fn get_untracked(&self, key: &str) -> Value {
        self.core
            .values
            .read()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Write a key.
    ///
    /// The value is threaded through every plugin's `on_set`; if the final
    /// result is strictly equal to the stored value the write is a no-op.
    /// Otherwise the change is committed immediately and delivery is
    /// batched: subscribers and dependent effects see it at the next flush,
    /// and only the last value written per key within one flush window is
    /// delivered.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let previous = self.get_untracked(key);

        let mut next = value.into();
        for plugin in &self.core.plugins {
            match plugin.on_set(key, &next, &previous) {
                Ok(Some(replacement)) => next = replacement,
                Ok(None) => {}
                Err(err) => {
                    warn!(plugin = plugin.name(), key, error = %err, "on_set hook failed");
                }
            }
        }

        if next.strict_eq(&previous) {
            return;
        }

        self.core
            .values
            .write()
            .insert(key.to_string(), next.clone());

        self.core
            .pending
            .lock()
            .notifications
            .insert(key.to_string(), next);

        self.schedule_flush();
    }

    /// Register a callback for a key.
    ///
    /// The callback is invoked synchronously exactly once with the current
    /// value before this returns, so a subscriber never observes a blank
    /// initial state. Afterwards it runs once per flush in which the key
    /// changed, with the final batched value.
    pub fn subscribe(
        &self,
        key: &str,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        for plugin in &self.core.plugins {
            if let Err(err) = plugin.on_subscribe(key) {
                warn!(plugin = plugin.name(), key, error = %err, "on_subscribe hook failed");
            }
        }

        let id = SubscriptionId::new();
        let callback: SubscriberFn = Arc::new(callback);
        self.core
            .subscribers
            .write()
            .entry(key.to_string())
            .or_default()
            .push(SubscriberEntry {
                id,
                callback: callback.clone(),
            });

        let current = self.get_untracked(key);
        callback(&current);

        let core = Arc::downgrade(&self.core);
        let key = key.to_string();
        Subscription::new(move || {
            if let Some(core) = core.upgrade() {
                if let Some(entries) = core.subscribers.write().get_mut(&key) {
                    entries.retain(|entry| entry.id != id);
                }
            }
        })
    }

    /// Deliver the pending batch, if any.
    ///
    /// Order per batch: plugin `on_notify` hooks, then subscriber callbacks
    /// (snapshot per key, so mid-iteration unsubscribes are safe), then one
    /// run per effect subscribed to a changed key, deduplicated. Writes
    /// performed by callbacks or effects land in a new batch and schedule a
    /// new flush.
    pub fn flush(&self) {
        self.core.flush_scheduled.store(false, Ordering::SeqCst);

        let notifications = std::mem::take(&mut self.core.pending.lock().notifications);
        if notifications.is_empty() {
            return;
        }

        for (key, value) in &notifications {
            for plugin in &self.core.plugins {
                if let Err(err) = plugin.on_notify(key, value) {
                    warn!(plugin = plugin.name(), key = %key, error = %err, "on_notify hook failed");
                }
            }
        }

        for (key, value) in &notifications {
            let snapshot: Vec<SubscriberFn> = self
                .core
                .subscribers
                .read()
                .get(key)
                .map(|entries| entries.iter().map(|entry| entry.callback.clone()).collect())
                .unwrap_or_default();
            for callback in snapshot {
                callback(value);
            }
        }

        // Resolve dependent effects now rather than at write time: a write
        // made inside an effect's own run happens while that effect is
        // between unsubscribe and re-subscribe.
        let mut queued: Vec<EffectEntry> = Vec::new();
        {
            let effect_subs = self.core.effect_subs.read();
            for key in notifications.keys() {
                let Some(entries) = effect_subs.get(key) else {
                    continue;
                };
                for entry in entries {
                    if entry.effect.strong_count() == 0 {
                        continue;
                    }
                    if queued.iter().all(|q| q.effect_id != entry.effect_id) {
                        queued.push(EffectEntry {
                            effect_id: entry.effect_id,
                            effect: entry.effect.clone(),
                        });
                    }
                }
            }
        }
        for entry in queued {
            if let Some(effect) = entry.effect.upgrade() {
                EffectInner::execute(&effect);
            }
        }
    }

    /// Whether a flush is currently scheduled.
    pub fn flush_pending(&self) -> bool {
        self.core.flush_scheduled.load(Ordering::SeqCst)
    }

    /// Current keys, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.core.values.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.core.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.values.read().is_empty()
    }

    /// A deep-cloned snapshot of the backing mapping.
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.core.values.read().clone()
    }

    fn schedule_flush(&self) {
        let newly_scheduled = self
            .core
            .flush_scheduled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if newly_scheduled {
            let store = self.clone();
            self.core.scheduler.schedule(Box::new(move || store.flush()));
        }
    }

    /// Register `effect` to be queued whenever `key` changes. Unlike
    /// [`subscribe`](Store::subscribe) there is no immediate invocation.
    pub(crate) fn track_effect(&self, key: &str, effect: &Arc<EffectInner>) {
        let mut effect_subs = self.core.effect_subs.write();
        let entries = effect_subs.entry(key.to_string()).or_default();
        entries.retain(|entry| entry.effect.strong_count() > 0);
        if entries.iter().all(|entry| entry.effect_id != effect.id()) {
            entries.push(EffectEntry {
                effect_id: effect.id(),
                effect: Arc::downgrade(effect),
            });
        }
    }

    pub(crate) fn untrack_effect(&self, key: &str, effect_id: u64) {
        if let Some(entries) = self.core.effect_subs.write().get_mut(key) {
            entries.retain(|entry| {
                entry.effect_id != effect_id && entry.effect.strong_count() > 0
            });
        }
    }
}

impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.core.id)
            .field("len", &self.len())
            .finish()
    }
}
