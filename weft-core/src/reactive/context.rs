//! Tracking Context
//!
//! The tracking context records which store keys the currently running
//! effect reads, enabling automatic dependency discovery.
//!
//! # Implementation
//!
//! A thread-local stack of frames tracks the computation currently running.
//! Entering a frame pushes onto the stack; the guard pops it on drop, so a
//! panicking effect body cannot leave a stale frame behind. Nested frames
//! (a computed evaluated inside an effect) each collect their own reads.

use std::cell::RefCell;

use smallvec::SmallVec;

use super::store::Store;

/// Reads collected during one tracked run.
pub(crate) type Reads = SmallVec<[(Store, String); 4]>;

thread_local! {
    static TRACK_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

struct Frame {
    /// Id of the effect this frame tracks for, used to catch mismatched pops.
    effect_id: u64,
    reads: Reads,
}

/// Guard that pops its frame when dropped.
pub(crate) struct TrackingFrame {
    effect_id: u64,
}

impl TrackingFrame {
    /// Push a fresh frame for the given effect.
    pub(crate) fn enter(effect_id: u64) -> Self {
        TRACK_STACK.with(|stack| {
            stack.borrow_mut().push(Frame {
                effect_id,
                reads: Reads::new(),
            });
        });
        Self { effect_id }
    }
}

impl Drop for TrackingFrame {
    fn drop(&mut self) {
        TRACK_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            if let Some(frame) = popped {
                debug_assert_eq!(
                    frame.effect_id, self.effect_id,
                    "tracking frame mismatch: expected {}, got {}",
                    self.effect_id, frame.effect_id
                );
            }
        });
    }
}

/// Whether any tracking frame is active on this thread.
pub(crate) fn is_tracking() -> bool {
    TRACK_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Record a store read into the innermost frame, if one is active.
/// Recording the same (store, key) pair twice in one run is a no-op.
pub(crate) fn record_read(store: &Store, key: &str) {
    TRACK_STACK.with(|stack| {
        if let Some(frame) = stack.borrow_mut().last_mut() {
            let seen = frame
                .reads
                .iter()
                .any(|(s, k)| s.ptr_eq(store) && k == key);
            if !seen {
                frame.reads.push((store.clone(), key.to_string()));
            }
        }
    });
}

/// The reads collected so far by the innermost frame.
pub(crate) fn collected() -> Reads {
    TRACK_STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .map(|frame| frame.reads.clone())
            .unwrap_or_default()
    })
}
