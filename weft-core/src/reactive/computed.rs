//! Computed Values
//!
//! A Computed is a cached, read-only derivation built on an [`Effect`]. The
//! underlying effect re-evaluates the derivation whenever a dependency
//! changes; the cache updates, and subscribers are notified, only when the
//! new value actually differs from the cached one (`Object.is`-style
//! comparison, so a derivation that keeps yielding `NaN` stays quiet).
//!
//! A panic inside the derivation is contained: it is logged and represented
//! as a cached `Undefined`, so readers see "no value" instead of needing to
//! guard every read site.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::error;

use crate::error::Error;
use crate::value::Value;

use super::effect::Effect;
use super::store::{Subscription, SubscriptionId};

type SubscriberFn = Arc<dyn Fn(&Value) + Send + Sync>;

struct SubscriberEntry {
    id: SubscriptionId,
    callback: SubscriberFn,
}

struct ComputedState {
    /// `None` until the first evaluation completes.
    cached: RwLock<Option<Value>>,
    subscribers: RwLock<Vec<SubscriberEntry>>,
}

/// A cached derived value.
///
/// # Example
///
/// ```rust,ignore
/// let store = Store::new(Value::map([("n", 5)]))?;
///
/// let s = store.clone();
/// let sign = Computed::new(move || {
///     Value::Num(s.get("n").as_num().unwrap_or(f64::NAN).signum())
/// });
/// assert_eq!(sign.value()?, Value::Num(1.0));
/// // Setting n from 5 to 7 re-runs the derivation but notifies nobody:
/// // the sign did not change.
/// ```
pub struct Computed {
    state: Arc<ComputedState>,
    effect: Effect,
}

impl Computed {
    /// Wrap a derivation in an auto-tracking effect. The derivation runs
    /// synchronously before this returns, so the value is available
    /// immediately.
    pub fn new(derive: impl Fn() -> Value + Send + Sync + 'static) -> Computed {
        let state = Arc::new(ComputedState {
            cached: RwLock::new(None),
            subscribers: RwLock::new(Vec::new()),
        });

        let body_state = Arc::clone(&state);
        let effect = Effect::new(move || {
            let next = match catch_unwind(AssertUnwindSafe(|| derive())) {
                Ok(value) => value,
                Err(_) => {
                    error!("computed derivation panicked; caching undefined");
                    Value::Undefined
                }
            };

            let changed = match body_state.cached.read().as_ref() {
                Some(previous) => !previous.same(&next),
                None => true,
            };
            if !changed {
                return;
            }

            *body_state.cached.write() = Some(next.clone());

            let snapshot: Vec<SubscriberFn> = body_state
                .subscribers
                .read()
                .iter()
                .map(|entry| entry.callback.clone())
                .collect();
            for callback in snapshot {
                callback(&next);
            }
        });

        Computed { state, effect }
    }

    /// The cached value.
    ///
    /// Errors only if the first evaluation has not completed, which cannot
    /// happen through normal construction. A derivation that panicked reads
    /// as `Ok(Undefined)`, not as an error.
    pub fn value(&self) -> Result<Value, Error> {
        self.state
            .cached
            .read()
            .clone()
            .ok_or(Error::UninitializedComputed)
    }

    /// Register a callback for value changes. Mirrors store-subscribe
    /// semantics: if a value is cached, the callback is invoked
    /// synchronously once before this returns.
    pub fn subscribe(&self, callback: impl Fn(&Value) + Send + Sync + 'static) -> Subscription {
        let id = SubscriptionId::new();
        let callback: SubscriberFn = Arc::new(callback);
        self.state.subscribers.write().push(SubscriberEntry {
            id,
            callback: callback.clone(),
        });

        if let Some(current) = self.state.cached.read().clone() {
            callback(&current);
        }

        let state: Weak<ComputedState> = Arc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = state.upgrade() {
                state.subscribers.write().retain(|entry| entry.id != id);
            }
        })
    }

    /// Stop the underlying effect and drop all subscribers. Subsequent
    /// store changes no longer affect this computed; the last cached value
    /// remains readable.
    pub fn dispose(&self) {
        self.effect.dispose();
        self.state.subscribers.write().clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.effect.is_disposed()
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("initialized", &self.state.cached.read().is_some())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
