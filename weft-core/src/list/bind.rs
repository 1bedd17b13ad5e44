//! Binding a [`KeyedList`] to reactive sources.
//!
//! The binding subscribes to an array-valued store key (or a computed) and
//! reconciles on every delivered change. Because subscriptions only fire
//! when the value reference changes, in-place mutation of a list never
//! triggers a pass; callers replace the list to signal change.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::reactive::{Computed, Store, Subscription};
use crate::value::Value;

use super::reconcile::{KeyedList, ListRenderer, TargetContainer};

/// Subscribe `list` to the array stored under `key`.
///
/// The immediate subscribe call performs the first render. Returns the
/// subscription; unsubscribing stops further passes and leaves the
/// container as-is.
pub fn bind_list<C, R>(store: &Store, key: &str, list: KeyedList<C, R>) -> Subscription
where
    C: TargetContainer + Send + 'static,
    C::Target: Send + 'static,
    R: ListRenderer<C> + Send + 'static,
{
    let list = Arc::new(Mutex::new(list));
    store.subscribe(key, move |value| render_pass(&list, value))
}

/// Subscribe `list` to a computed that derives the array.
pub fn bind_computed_list<C, R>(computed: &Computed, list: KeyedList<C, R>) -> Subscription
where
    C: TargetContainer + Send + 'static,
    C::Target: Send + 'static,
    R: ListRenderer<C> + Send + 'static,
{
    let list = Arc::new(Mutex::new(list));
    computed.subscribe(move |value| render_pass(&list, value))
}

fn render_pass<C, R>(list: &Arc<Mutex<KeyedList<C, R>>>, value: &Value)
where
    C: TargetContainer,
    R: ListRenderer<C>,
{
    match value {
        Value::List(items) => list.lock().reconcile(items.as_slice()),
        Value::Undefined | Value::Null => {
            warn!("list binding has no source value; skipping reconciliation");
        }
        other => {
            warn!(
                kind = other.kind(),
                "list binding expects an array value; skipping reconciliation"
            );
        }
    }
}
