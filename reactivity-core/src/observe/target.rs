//! Raw containers.
//!
//! A [`Target`] is the unobserved data behind every wrapped view. Its
//! operations are the reflect-level primitives the handlers build on: they
//! neither track nor trigger.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::value::Value;
use crate::reactive::{HashKey, Key, Runtime, TargetId, TargetKind, MAX_ARRAY_LENGTH};

/// Storage for each container shape.
pub enum TargetData {
    Object(IndexMap<Rc<str>, Value>),
    Array(Vec<Value>),
    /// Entries keyed by the hash of their raw key; the original key is kept
    /// alongside the value for iteration.
    Map(IndexMap<HashKey, (Value, Value)>),
    Set(IndexMap<HashKey, Value>),
}

impl TargetData {
    pub fn kind(&self) -> TargetKind {
        match self {
            TargetData::Object(_) => TargetKind::Object,
            TargetData::Array(_) => TargetKind::Array,
            TargetData::Map(_) => TargetKind::Map,
            TargetData::Set(_) => TargetKind::Set,
        }
    }
}

pub(crate) struct TargetCell {
    id: TargetId,
    kind: TargetKind,
    data: RefCell<TargetData>,
    skip: Cell<bool>,
}

impl Drop for TargetCell {
    fn drop(&mut self) {
        Runtime::forget_target(self.id);
    }
}

/// A shared handle to a raw container.
#[derive(Clone)]
pub struct Target(Rc<TargetCell>);

impl Target {
    pub fn from_data(data: TargetData) -> Self {
        Self(Rc::new(TargetCell {
            id: TargetId::new(),
            kind: data.kind(),
            data: RefCell::new(data),
            skip: Cell::new(false),
        }))
    }

    pub fn object() -> Self {
        Self::from_data(TargetData::Object(IndexMap::new()))
    }

    pub fn array() -> Self {
        Self::from_data(TargetData::Array(Vec::new()))
    }

    pub fn map() -> Self {
        Self::from_data(TargetData::Map(IndexMap::new()))
    }

    /// An empty set collection.
    pub fn new_set() -> Self {
        Self::from_data(TargetData::Set(IndexMap::new()))
    }

    /// An object with the given properties, in order.
    pub fn from_entries<K, V, I>(entries: I) -> Self
    where
        K: Into<Rc<str>>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::from_data(TargetData::Object(
            entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ))
    }

    /// An array holding `values`.
    pub fn from_values<V, I>(values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self::from_data(TargetData::Array(values.into_iter().map(Into::into).collect()))
    }

    pub fn id(&self) -> TargetId {
        self.0.id
    }

    pub fn kind(&self) -> TargetKind {
        self.0.kind
    }

    pub fn is_array(&self) -> bool {
        self.0.kind == TargetKind::Array
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.0.kind, TargetKind::Map | TargetKind::Set)
    }

    pub fn ptr_eq(&self, other: &Target) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Exclude this container from ever being wrapped.
    pub fn mark_raw(&self) {
        self.0.skip.set(true);
    }

    pub fn is_skipped(&self) -> bool {
        self.0.skip.get()
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&TargetData) -> R) -> R {
        f(&self.0.data.borrow())
    }

    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(&mut TargetData) -> R) -> R {
        f(&mut self.0.data.borrow_mut())
    }

    /// Property count, array length, or collection size.
    pub fn len(&self) -> usize {
        self.with(|data| match data {
            TargetData::Object(props) => props.len(),
            TargetData::Array(items) => items.len(),
            TargetData::Map(entries) => entries.len(),
            TargetData::Set(members) => members.len(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a slot. Missing slots read as `Undefined`.
    pub fn get(&self, key: &Key) -> Value {
        self.with(|data| match (data, key) {
            (TargetData::Object(props), Key::Name(name)) => props.get(name).cloned(),
            (TargetData::Array(items), Key::Index(i)) => items.get(*i).cloned(),
            (TargetData::Array(items), Key::Length) => Some(Value::from(items.len())),
            (TargetData::Map(entries), Key::Entry(h)) => entries.get(h).map(|(_, v)| v.clone()),
            (TargetData::Set(members), Key::Entry(h)) => members.get(h).cloned(),
            _ => None,
        })
        .unwrap_or_default()
    }

    /// Whether the slot exists on the container itself.
    pub fn has_own(&self, key: &Key) -> bool {
        self.with(|data| match (data, key) {
            (TargetData::Object(props), Key::Name(name)) => props.contains_key(name),
            (TargetData::Array(items), Key::Index(i)) => *i < items.len(),
            (TargetData::Array(_), Key::Length) => true,
            (TargetData::Map(entries), Key::Entry(h)) => entries.contains_key(h),
            (TargetData::Set(members), Key::Entry(h)) => members.contains_key(h),
            _ => false,
        })
    }

    /// Whether [`Target::set`] would store a value under `key`.
    pub fn accepts(&self, key: &Key) -> bool {
        match (self.kind(), key) {
            (TargetKind::Object, Key::Name(_)) => true,
            (TargetKind::Array, Key::Index(i)) => *i < MAX_ARRAY_LENGTH,
            (TargetKind::Array, Key::Length) => true,
            (TargetKind::Map, Key::Entry(_)) => self.has_own(key),
            _ => false,
        }
    }

    /// Write a slot, returning the value it displaced.
    ///
    /// Writing past the end of an array grows it with `Undefined`; writing
    /// `Length` truncates or grows it. Collections only accept updates to
    /// existing entries here; insertion goes through the collection methods.
    /// Writes the container has no slot for are ignored.
    pub fn set(&self, key: Key, value: Value) -> Value {
        self.with_mut(|data| match (data, key) {
            (TargetData::Object(props), Key::Name(name)) => props.insert(name, value),
            (TargetData::Array(items), Key::Index(i)) => {
                if i >= items.len() {
                    items.resize(i + 1, Value::Undefined);
                }
                Some(std::mem::replace(&mut items[i], value))
            }
            (TargetData::Array(items), Key::Length) => {
                let old = items.len();
                let len = value
                    .as_number()
                    .filter(|n| *n >= 0.0 && *n <= MAX_ARRAY_LENGTH as f64)
                    .map_or(old, |n| n as usize);
                items.resize(len, Value::Undefined);
                Some(Value::from(old))
            }
            (TargetData::Map(entries), Key::Entry(h)) => entries
                .get_mut(&h)
                .map(|(_, slot)| std::mem::replace(slot, value)),
            _ => None,
        })
        .unwrap_or_default()
    }

    /// Remove a slot. Array elements become `Undefined` without shifting.
    /// Returns whether the slot existed.
    pub fn delete(&self, key: &Key) -> bool {
        let removed = self.with_mut(|data| match (data, key) {
            (TargetData::Object(props), Key::Name(name)) => props.shift_remove(name),
            (TargetData::Array(items), Key::Index(i)) => {
                items.get_mut(*i).map(|slot| std::mem::take(slot))
            }
            (TargetData::Map(entries), Key::Entry(h)) => entries.shift_remove(h).map(|(_, v)| v),
            (TargetData::Set(members), Key::Entry(h)) => members.shift_remove(h),
            _ => None,
        });
        removed.is_some()
    }

    /// Own keys in insertion order. Arrays report their indices.
    pub fn own_keys(&self) -> Vec<Key> {
        self.with(|data| match data {
            TargetData::Object(props) => props.keys().map(|k| Key::Name(k.clone())).collect(),
            TargetData::Array(items) => (0..items.len()).map(Key::Index).collect(),
            TargetData::Map(entries) => entries.keys().cloned().map(Key::Entry).collect(),
            TargetData::Set(members) => members.keys().cloned().map(Key::Entry).collect(),
        })
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_writes_grow_and_truncate() {
        let arr = Target::from_values([1, 2, 3]);
        arr.set(Key::Index(5), Value::from(6));
        assert_eq!(arr.len(), 6);
        assert!(arr.get(&Key::Index(4)).is_undefined());

        let old = arr.set(Key::Length, Value::from(2));
        assert_eq!(old, Value::from(6));
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.get(&Key::Length), Value::from(2));
    }

    #[test]
    fn object_keys_keep_insertion_order() {
        let obj = Target::from_entries([("b", 1), ("a", 2)]);
        obj.set(Key::from("c"), Value::from(3));
        obj.set(Key::from("b"), Value::from(4));

        let keys: Vec<String> = obj.own_keys().iter().map(ToString::to_string).collect();
        assert_eq!(keys, ["b", "a", "c"]);

        assert!(obj.delete(&Key::from("a")));
        assert!(!obj.delete(&Key::from("a")));
        assert!(!obj.has_own(&Key::from("a")));
    }

    #[test]
    fn array_delete_leaves_a_hole() {
        let arr = Target::from_values(["x", "y"]);
        assert!(arr.delete(&Key::Index(0)));
        assert_eq!(arr.len(), 2);
        assert!(arr.get(&Key::Index(0)).is_undefined());
    }
}
