//! Dynamic Value Model
//!
//! The store wraps an arbitrary key-value mapping, so values need a dynamic
//! representation. `Value` plays the role `serde_json::Value` plays for JSON
//! documents, with two additions: compound values (`List`, `Map`) are
//! `Arc`-backed so they carry reference identity, and a value may hold a
//! nested reactive [`Store`].
//!
//! # Equality
//!
//! Three notions of equality coexist and must not be confused:
//!
//! - [`Value::strict_eq`]: change detection on writes. Numbers compare by
//!   IEEE equality (`NaN != NaN`, `-0 == 0`), strings by content, compound
//!   values by reference identity.
//! - [`Value::same`]: change detection for computed values. Like
//!   `strict_eq`, except `NaN == NaN` and `-0 != 0`.
//! - `PartialEq`: deep structural comparison. Provided for assertions and
//!   host code; the reactive core never uses it for change detection.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::reactive::Store;

/// A dynamically typed value held by a reactive store.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// No value. Reading a missing key yields `Undefined`.
    #[default]
    Undefined,
    /// An explicit null.
    Null,
    Bool(bool),
    Num(f64),
    Str(Arc<str>),
    /// An ordered list. Shared by reference; replace the `Arc` to signal change.
    List(Arc<Vec<Value>>),
    /// A plain mapping. Shared by reference; not reactive unless wrapped in a store.
    Map(Arc<IndexMap<String, Value>>),
    /// A nested reactive store. Nesting is always explicit, never automatic.
    Store(Store),
}

impl Value {
    /// Build a list value from anything iterable.
    pub fn list<I>(items: I) -> Value
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Value::List(Arc::new(items.into_iter().map(Into::into).collect()))
    }

    /// Build a map value from key-value pairs, preserving insertion order.
    pub fn map<K, V, I>(entries: I) -> Value
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// Short name of the variant, used in diagnostics and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Store(_) => "store",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// JavaScript-style truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Store(_) => true,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_store(&self) -> Option<&Store> {
        match self {
            Value::Store(store) => Some(store),
            _ => None,
        }
    }

    /// Strict equality, the write-path change check.
    ///
    /// `NaN != NaN` and `-0 == 0`; strings compare by content; `List`, `Map`
    /// and `Store` compare by reference identity. A store write whose value
    /// is `strict_eq` to the previous one is a no-op.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            (Value::Store(a), Value::Store(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Identity comparison for computed caches.
    ///
    /// Like [`strict_eq`](Value::strict_eq) except `NaN == NaN` and
    /// `-0 != 0`, so a computed that keeps yielding `NaN` stays quiet.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Num(a), Value::Num(b)) => {
                (a == b && a.is_sign_positive() == b.is_sign_positive())
                    || (a.is_nan() && b.is_nan())
            }
            _ => self.strict_eq(other),
        }
    }
}

/// True only for values produced by [`Store::new`].
///
/// Reactive identity lives in the `Store` variant itself; the wrapped
/// mapping carries no marker and enumerating it reveals nothing.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Store(_))
}

impl PartialEq for Value {
    /// Deep structural equality. Stores still compare by identity; there is
    /// no meaningful structural comparison between two live stores.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Store(a), Value::Store(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => write!(f, "[list of {}]", items.len()),
            Value::Map(map) => write!(f, "[map of {}]", map.len()),
            Value::Store(store) => write!(f, "[store {}]", store.id()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Num(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Num(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Num(v as f64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Num(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Arc::from(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(Arc::new(v))
    }
}

impl From<Store> for Value {
    fn from(v: Store) -> Self {
        Value::Store(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Num(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(Arc::from(s)),
            serde_json::Value::Array(items) => {
                Value::List(Arc::new(items.into_iter().map(Into::into).collect()))
            }
            serde_json::Value::Object(map) => Value::Map(Arc::new(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            )),
        }
    }
}

impl Serialize for Value {
    /// `Undefined` and `Null` both serialize as null, as JSON has no
    /// undefined. Serializing a nested store is an error; snapshot it first.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Num(n) => {
                let n = *n;
                // Integral values serialize as integers, matching
                // JSON.stringify output for whole numbers.
                if n.is_finite() && n.fract() == 0.0 {
                    if n >= i64::MIN as f64 && n <= i64::MAX as f64 {
                        serializer.serialize_i64(n as i64)
                    } else if n >= 0.0 && n <= u64::MAX as f64 {
                        serializer.serialize_u64(n as u64)
                    } else {
                        serializer.serialize_f64(n)
                    }
                } else {
                    serializer.serialize_f64(n)
                }
            }
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map.iter() {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Value::Store(_) => Err(S::Error::custom("reactive stores cannot be serialized")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_eq_follows_ieee_number_rules() {
        assert!(Value::Num(1.0).strict_eq(&Value::Num(1.0)));
        assert!(!Value::Num(f64::NAN).strict_eq(&Value::Num(f64::NAN)));
        assert!(Value::Num(-0.0).strict_eq(&Value::Num(0.0)));
    }

    #[test]
    fn same_follows_object_is_rules() {
        assert!(Value::Num(f64::NAN).same(&Value::Num(f64::NAN)));
        assert!(!Value::Num(-0.0).same(&Value::Num(0.0)));
        assert!(Value::Num(2.0).same(&Value::Num(2.0)));
    }

    #[test]
    fn compound_values_compare_by_reference() {
        let list = Value::list([1, 2, 3]);
        let clone = list.clone();
        let rebuilt = Value::list([1, 2, 3]);

        assert!(list.strict_eq(&clone));
        assert!(!list.strict_eq(&rebuilt));
        // Deep equality still sees them as equal.
        assert_eq!(list, rebuilt);
    }

    #[test]
    fn strings_compare_by_content() {
        assert!(Value::from("abc").strict_eq(&Value::from("abc")));
        assert!(!Value::from("abc").strict_eq(&Value::from("abd")));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Undefined.truthy());
        assert!(!Value::Null.truthy());
        assert!(!Value::Num(0.0).truthy());
        assert!(!Value::Num(f64::NAN).truthy());
        assert!(!Value::from("").truthy());
        assert!(Value::from("x").truthy());
        assert!(Value::Num(3.0).truthy());
        assert!(Value::list([0]).truthy());
    }

    #[test]
    fn json_round_trip_for_plain_data() {
        let json: serde_json::Value = serde_json::from_str(r#"{"a": 1, "b": [true, "x"]}"#).unwrap();
        let value = Value::from(json.clone());
        assert_eq!(value.as_map().unwrap()["a"], Value::Num(1.0));

        let back = serde_json::to_value(&value).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn integral_numbers_serialize_without_a_fraction() {
        assert_eq!(serde_json::to_string(&Value::Num(1.0)).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Value::Num(-2.0)).unwrap(), "-2");
        assert_eq!(serde_json::to_string(&Value::Num(1.5)).unwrap(), "1.5");
    }

    #[test]
    fn store_values_do_not_serialize() {
        let store = Store::new(Value::map([("k", 1)])).unwrap();
        let value = Value::map([("inner", Value::Store(store))]);
        assert!(serde_json::to_string(&value).is_err());
    }

    #[test]
    fn is_reactive_only_for_stores() {
        let store = Store::new(Value::map([("k", 1)])).unwrap();
        assert!(is_reactive(&Value::Store(store)));
        assert!(!is_reactive(&Value::map([("k", 1)])));
        assert!(!is_reactive(&Value::Null));
        assert!(!is_reactive(&Value::Num(1.0)));
    }
}
