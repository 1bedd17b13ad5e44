//! Flush Scheduling
//!
//! Rust has no ambient microtask queue, so the platform microtask of the
//! original design is replaced by an explicit scheduler seam. A store asks
//! its scheduler to run its flush "at the next checkpoint"; the
//! flush-scheduled flag inside the store guarantees at most one pending
//! request per store per window regardless of the scheduler used.
//!
//! Two implementations ship with the crate:
//!
//! - [`ManualScheduler`] (the default) drops the request; the host calls
//!   [`Store::flush`](super::Store::flush) at its own checkpoints.
//! - [`TaskQueue`] accumulates requests; [`TaskQueue::drain`] runs them
//!   until the queue is idle, including requests scheduled by the tasks
//!   themselves. This mirrors microtask-chain semantics and is what the
//!   tests use as a checkpoint.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// A deferred flush for one store.
pub type FlushTask = Box<dyn FnOnce() + Send>;

/// Decides when a store's pending batch is delivered.
pub trait FlushScheduler: Send + Sync {
    fn schedule(&self, task: FlushTask);
}

/// Discards scheduling requests; the host drives `Store::flush` itself.
#[derive(Debug, Default)]
pub struct ManualScheduler;

impl FlushScheduler for ManualScheduler {
    fn schedule(&self, _task: FlushTask) {}
}

/// An accumulating task queue usable as a tick driver.
#[derive(Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<FlushTask>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Run queued tasks until the queue is idle. Tasks scheduled while
    /// draining run in the same drain. Returns the number of tasks run.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.tasks.lock().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }
}

impl FlushScheduler for TaskQueue {
    fn schedule(&self, task: FlushTask) {
        self.tasks.lock().push_back(task);
    }
}
