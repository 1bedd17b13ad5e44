//! Error types.
//!
//! Only fail-fast conditions are represented here. Plugin failures, computed
//! panics and reconciliation anomalies are diagnostics (`tracing`), not
//! errors: they degrade observability, never reactivity.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A store was constructed from something other than a plain mapping.
    #[error("store initial value must be a plain mapping, got {kind}")]
    InvalidInitial { kind: &'static str },

    /// A computed value was read before its first evaluation completed.
    /// Normally unreachable: the underlying effect runs at construction.
    #[error("computed value accessed before its first evaluation completed")]
    UninitializedComputed,
}
