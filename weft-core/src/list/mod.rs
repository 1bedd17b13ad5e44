//! Keyed List Reconciliation
//!
//! Syncs an array value to an externally owned, ordered collection of
//! render targets (DOM nodes, widgets, rows) without a virtual DOM. Each
//! logical item is identified by a stable key; targets are created once per
//! key, updated when the item reference changes, moved instead of recreated
//! on reorders, and removed when their key disappears.
//!
//! The algorithm never touches a real DOM: it works against the
//! [`TargetContainer`] trait (insert-before / remove / first-child /
//! next-sibling) and a caller-supplied [`ListRenderer`] policy, so any
//! host with an ordered child list can drive it.
//!
//! [`bind_list`] wires a [`KeyedList`] to a store key so reconciliation
//! re-runs whenever the array reference changes. In-place mutation of an
//! array is invisible by design; replace the list (and changed items) to
//! signal change.

mod bind;
mod reconcile;
mod view_state;

pub use bind::{bind_computed_list, bind_list};
pub use reconcile::{KeyedList, ListKey, ListRenderer, TargetContainer};
pub use view_state::{FnViewState, NoViewState, ViewStateHook};
