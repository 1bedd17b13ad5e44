//! Store Plugins
//!
//! A plugin is an ordered, best-effort observer/transformer attached to a
//! store's lifecycle events. Plugins are advisory by contract: a failing
//! hook is logged with the plugin's name and skipped; it never prevents the
//! remaining hooks or the store operation from completing.
//!
//! Transforming hooks (`on_get`, `on_set`) return `Ok(None)` for "no
//! opinion" and `Ok(Some(value))` to replace the value. The explicit
//! `Option` makes "replace with `Undefined`" unambiguous.

use crate::value::Value;

use super::store::Store;

/// Arbitrary error produced by a plugin hook.
pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

pub type PluginResult<T> = Result<T, PluginError>;

/// An observer/transformer attached to a store at construction.
///
/// Hooks run in registration order. Transform chains are threaded: each
/// `on_set`/`on_get` sees the previous plugin's output.
pub trait Plugin: Send + Sync {
    /// Identifier used in diagnostics when a hook fails.
    fn name(&self) -> &str;

    /// Runs once, synchronously, when the store is constructed.
    fn on_init(&self, _store: &Store) -> PluginResult<()> {
        Ok(())
    }

    /// Observes/transforms every read. `value` is the previous plugin's
    /// output (or the stored value for the first plugin in the chain).
    fn on_get(&self, _key: &str, _value: &Value) -> PluginResult<Option<Value>> {
        Ok(None)
    }

    /// Observes/transforms every write, before the change check. The final
    /// chained result is compared against `previous` with strict equality.
    fn on_set(
        &self,
        _key: &str,
        _incoming: &Value,
        _previous: &Value,
    ) -> PluginResult<Option<Value>> {
        Ok(None)
    }

    /// Runs when a subscriber registers for `key`.
    fn on_subscribe(&self, _key: &str) -> PluginResult<()> {
        Ok(())
    }

    /// Runs during flush, once per pending (key, value) pair, before
    /// subscribers are invoked.
    fn on_notify(&self, _key: &str, _value: &Value) -> PluginResult<()> {
        Ok(())
    }
}
