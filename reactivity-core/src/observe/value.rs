//! The dynamic value model observed containers hold.
//!
//! Refs are an explicit variant rather than a runtime shape check, so the
//! observation layer can unwrap them as a plain `match` arm.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde::{Serialize, Serializer};
use serde_json::Value as Json;

use super::proxy::Observed;
use super::target::{Target, TargetData};
use crate::reactive::{HashKey, Ref, TargetId};

/// A value stored in or read from an observed container.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    /// A raw (unwrapped) container.
    Target(Target),
    /// A wrapped view of a container.
    Observed(Observed),
    /// A boxed reference.
    Ref(Ref),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Containers, raw or wrapped.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Target(_) | Value::Observed(_))
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Value::Ref(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_target(&self) -> Option<&Target> {
        match self {
            Value::Target(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_observed(&self) -> Option<&Observed> {
        match self {
            Value::Observed(o) => Some(o),
            _ => None,
        }
    }

    pub fn into_observed(self) -> Option<Observed> {
        match self {
            Value::Observed(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_ref_handle(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Strip a wrapper, yielding the raw container. Other values are cloned.
    pub fn to_raw(&self) -> Value {
        match self {
            Value::Observed(o) => Value::Target(o.to_raw()),
            other => other.clone(),
        }
    }

    /// The id of the container behind this value, wrapped or not.
    pub fn target_id(&self) -> Option<TargetId> {
        match self {
            Value::Target(t) => Some(t.id()),
            Value::Observed(o) => Some(o.id()),
            Value::Ref(r) => Some(r.id()),
            _ => None,
        }
    }

    /// `Object.is` equality: NaN equals NaN, `+0` differs from `-0`,
    /// containers compare by identity.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b && a.is_sign_negative() == b.is_sign_negative()
                }
            }
            _ => self.identical(other),
        }
    }

    /// Equality used by `includes`: like `same_value` but `+0` equals `-0`.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            _ => self.identical(other),
        }
    }

    /// Equality used by `index_of`: NaN equals nothing.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self.identical(other),
        }
    }

    fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Target(a), Value::Target(b)) => a.ptr_eq(b),
            (Value::Observed(a), Value::Observed(b)) => a.ptr_eq(b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Key under which this value is stored in a map or set.
    ///
    /// Wrapped containers hash as their raw target.
    pub fn hash_key(&self) -> HashKey {
        match self {
            Value::Undefined => HashKey::Undefined,
            Value::Null => HashKey::Null,
            Value::Bool(b) => HashKey::Bool(*b),
            Value::Number(n) => HashKey::number(*n),
            Value::String(s) => HashKey::String(s.clone()),
            Value::Target(t) => HashKey::Object(t.id()),
            Value::Observed(o) => HashKey::Object(o.id()),
            Value::Ref(r) => HashKey::Object(r.id()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Target(_) | Value::Observed(_) => "object",
            Value::Ref(_) => "ref",
        }
    }

    /// Build raw containers from JSON.
    pub fn from_json(json: Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(Rc::from(s)),
            Json::Array(items) => {
                Value::Target(Target::from_values(items.into_iter().map(Value::from_json)))
            }
            Json::Object(entries) => Value::Target(Target::from_entries(
                entries.into_iter().map(|(k, v)| (k, Value::from_json(v))),
            )),
        }
    }

    /// Snapshot the raw data behind this value as JSON. Reads are untracked.
    ///
    /// Refs serialize as their contents, maps as objects keyed by the
    /// display form of their keys, sets as arrays. A container reached again
    /// while it is being serialized (a cycle) becomes `null`.
    pub fn to_json(&self) -> Json {
        self.to_json_inner(&mut HashSet::new())
    }

    fn to_json_inner(&self, visiting: &mut HashSet<TargetId>) -> Json {
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => Json::String(s.to_string()),
            Value::Observed(o) => Value::Target(o.to_raw()).to_json_inner(visiting),
            Value::Ref(r) => r.get_untracked().to_json_inner(visiting),
            Value::Target(t) => {
                if !visiting.insert(t.id()) {
                    return Json::Null;
                }
                let json = t.with(|data| match data {
                    TargetData::Object(props) => Json::Object(
                        props
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.to_json_inner(visiting)))
                            .collect(),
                    ),
                    TargetData::Array(items) => {
                        Json::Array(items.iter().map(|v| v.to_json_inner(visiting)).collect())
                    }
                    TargetData::Map(entries) => Json::Object(
                        entries
                            .values()
                            .map(|(k, v)| (k.to_string(), v.to_json_inner(visiting)))
                            .collect(),
                    ),
                    TargetData::Set(members) => {
                        Json::Array(members.values().map(|v| v.to_json_inner(visiting)).collect())
                    }
                });
                visiting.remove(&t.id());
                json
            }
        }
    }
}

/// Integral numbers within the exactly representable range become JSON
/// integers. Non-finite numbers have no JSON form.
fn number_to_json(n: f64) -> Json {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE && !(n == 0.0 && n.is_sign_negative()) {
        return Json::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
}

/// Whether a write of `value` over `old` is an observable change.
pub fn has_changed(value: &Value, old: &Value) -> bool {
    !value.same_value(old)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Target(t) => write!(f, "Target({:?}, {})", t.kind(), t.id()),
            Value::Observed(o) => write!(f, "Observed({:?}, {})", o.flavor(), o.id()),
            Value::Ref(r) => write!(f, "Ref({})", r.id()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::String(s) => f.write_str(s),
            Value::Target(_) | Value::Observed(_) => f.write_str("[object]"),
            Value::Ref(_) => f.write_str("[ref]"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Target> for Value {
    fn from(t: Target) -> Self {
        Value::Target(t)
    }
}

impl From<Observed> for Value {
    fn from(o: Observed) -> Self {
        Value::Observed(o)
    }
}

impl From<Ref> for Value {
    fn from(r: Ref) -> Self {
        Value::Ref(r)
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::from_json(json)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
