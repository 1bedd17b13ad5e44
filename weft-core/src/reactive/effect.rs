//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs when store keys it
//! depends on change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately inside a tracking
//!    frame to discover its initial dependencies.
//!
//! 2. The deduplicated set of (store, key) reads is subscribed to as effect
//!    subscriptions: a change queues the effect into that store's pending
//!    batch, and the store's flush re-runs it at most once per batch.
//!
//! 3. Every re-run tears down the old subscriptions first and re-tracks
//!    from scratch, so the dependency set may change across runs.
//!
//! # Errors
//!
//! A panic inside the body is logged and then resumed: effects drive
//! visible side effects, and swallowing their failures would hide real
//! bugs. The tracking frame and the re-entrancy guard are both released by
//! drop guards, so a panicking body leaves no stale state behind.
//!
//! # Explicit-deps mode
//!
//! [`Effect::with_deps`] skips tracking entirely and subscribes to exactly
//! the named keys. The body still runs once up front, but incidental reads
//! inside it never become reactive triggers.

use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use super::context::TrackingFrame;
use super::{context, store::Store};

static EFFECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_effect_id() -> u64 {
    EFFECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// One live (store, key) registration held by an effect.
struct TrackedKey {
    store: Store,
    key: String,
}

pub(crate) struct EffectInner {
    id: u64,
    body: Box<dyn Fn() + Send + Sync>,
    /// Auto-tracking effects re-discover dependencies on every run;
    /// explicit-deps effects keep their fixed subscriptions.
    auto_track: bool,
    running: AtomicBool,
    disposed: AtomicBool,
    tracked: Mutex<Vec<TrackedKey>>,
}

/// Clears the running flag even if the body panics.
struct RunningGuard<'a>(&'a EffectInner);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::SeqCst);
    }
}

impl EffectInner {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    fn clear_tracked(&self) {
        let tracked = std::mem::take(&mut *self.tracked.lock());
        for TrackedKey { store, key } in tracked {
            store.untrack_effect(&key, self.id);
        }
    }

    /// Run the body once. A request that arrives while the body is already
    /// executing is ignored; batching has deferred it to the next flush
    /// anyway.
    pub(crate) fn execute(this: &Arc<EffectInner>) {
        if this.disposed.load(Ordering::SeqCst) {
            return;
        }
        if this.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let _guard = RunningGuard(this);

        if !this.auto_track {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (this.body)())) {
                error!(effect = this.id, "effect body panicked during execution");
                resume_unwind(payload);
            }
            return;
        }

        this.clear_tracked();

        let frame = TrackingFrame::enter(this.id);
        let result = catch_unwind(AssertUnwindSafe(|| (this.body)()));
        let reads = context::collected();
        drop(frame);

        // Reads made before a panic stay subscribed: the subscription is
        // established by the read itself, and dropping it would leave the
        // effect permanently inert without being disposed.
        let mut tracked = Vec::with_capacity(reads.len());
        for (store, key) in reads {
            store.track_effect(&key, this);
            tracked.push(TrackedKey { store, key });
        }
        *this.tracked.lock() = tracked;

        if let Err(payload) = result {
            error!(effect = this.id, "effect body panicked during execution");
            resume_unwind(payload);
        }
    }
}

/// A reactive side effect.
///
/// # Example
///
/// ```rust,ignore
/// let store = Store::new(Value::map([("name", "ada")]))?;
///
/// let s = store.clone();
/// let effect = Effect::new(move || {
///     println!("hello, {}", s.get("name"));
/// });
/// // Printed "hello, ada" already; re-runs on every flushed change to "name".
/// ```
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create an auto-tracking effect. The body runs synchronously before
    /// this returns, establishing its initial dependency set.
    pub fn new(body: impl Fn() + Send + Sync + 'static) -> Effect {
        let inner = Arc::new(EffectInner {
            id: next_effect_id(),
            body: Box::new(body),
            auto_track: true,
            running: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            tracked: Mutex::new(Vec::new()),
        });
        EffectInner::execute(&inner);
        Effect { inner }
    }

    /// Create an effect with a declared dependency list instead of
    /// auto-tracking.
    ///
    /// The body runs exactly once up front (the immediate-call semantics of
    /// a plain subscribe are suppressed) and re-runs only when one of the
    /// named keys changes. Reads inside the body are never tracked.
    pub fn with_deps(body: impl Fn() + Send + Sync + 'static, deps: &[(Store, &[&str])]) -> Effect {
        let inner = Arc::new(EffectInner {
            id: next_effect_id(),
            body: Box::new(body),
            auto_track: false,
            running: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            tracked: Mutex::new(Vec::new()),
        });

        let mut tracked = Vec::new();
        for (store, keys) in deps {
            for key in *keys {
                store.track_effect(key, &inner);
                tracked.push(TrackedKey {
                    store: store.clone(),
                    key: (*key).to_string(),
                });
            }
        }
        *inner.tracked.lock() = tracked;

        EffectInner::execute(&inner);
        Effect { inner }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Tear down all subscriptions and stop the effect. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.clear_tracked();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of (store, key) pairs currently subscribed.
    pub fn dependency_count(&self) -> usize {
        self.inner.tracked.lock().len()
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
