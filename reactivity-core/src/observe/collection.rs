//! Map and set methods on observed views.
//!
//! Entries are keyed by the raw form of their key, so a wrapped key and its
//! raw original address the same entry. Keys-only iteration of a map tracks
//! a separate marker, letting value-only writes skip key observers.

use super::handlers::refuse;
use super::proxy::{to_reactive, to_readonly, Observed};
use super::target::TargetData;
use super::value::{has_changed, Value};
use crate::reactive::{track, trigger, HashKey, Key, TargetKind, TrackOp, TriggerOp};

impl Observed {
    fn wrap_entry(&self, value: Value) -> Value {
        if self.is_shallow() {
            value
        } else if self.is_readonly() {
            to_readonly(value)
        } else {
            to_reactive(value)
        }
    }

    fn track_entry(&self, op: TrackOp, key: &HashKey) {
        if !self.is_readonly() {
            track(self.id(), op, Key::Entry(key.clone()));
        }
    }

    fn track_shape(&self, key: Key) {
        if !self.is_readonly() {
            track(self.id(), TrackOp::Iterate, key);
        }
    }

    /// Read a map entry.
    pub fn map_get(&self, key: &Value) -> Value {
        let hash = key.to_raw().hash_key();
        self.track_entry(TrackOp::Get, &hash);
        let value = self.target().with(|data| match data {
            TargetData::Map(entries) => entries.get(&hash).map(|(_, v)| v.clone()),
            _ => None,
        });
        value.map_or(Value::Undefined, |v| self.wrap_entry(v))
    }

    /// Whether a map has the key or a set has the member.
    pub fn has_entry(&self, key: &Value) -> bool {
        let hash = key.to_raw().hash_key();
        self.track_entry(TrackOp::Has, &hash);
        self.target().with(|data| match data {
            TargetData::Map(entries) => entries.contains_key(&hash),
            TargetData::Set(members) => members.contains_key(&hash),
            _ => false,
        })
    }

    /// Entry count of a map or set.
    pub fn size(&self) -> usize {
        if !self.target().is_collection() {
            return 0;
        }
        self.track_shape(Key::Iterate);
        self.target().len()
    }

    /// Insert or update a map entry.
    pub fn map_set(&self, key: impl Into<Value>, value: impl Into<Value>) {
        let key = key.into();
        if self.is_readonly() {
            refuse("Set", &Key::Entry(key.hash_key()));
            return;
        }
        let key = key.to_raw();
        let value = value.into().to_raw();
        let hash = key.hash_key();

        let previous = self.target().with_mut(|data| match data {
            TargetData::Map(entries) => Some(entries.insert(hash.clone(), (key, value.clone()))),
            _ => None,
        });
        let Some(previous) = previous else {
            return;
        };
        match previous {
            None => self.trigger_entry(TriggerOp::Add, hash, Some(&value), None),
            Some((_, old)) if has_changed(&value, &old) => {
                self.trigger_entry(TriggerOp::Set, hash, Some(&value), Some(&old))
            }
            Some(_) => {}
        }
    }

    /// Add a set member.
    pub fn add(&self, value: impl Into<Value>) {
        let value = value.into();
        if self.is_readonly() {
            refuse("Add", &Key::Entry(value.hash_key()));
            return;
        }
        let value = value.to_raw();
        let hash = value.hash_key();

        let added = self.target().with_mut(|data| match data {
            TargetData::Set(members) if !members.contains_key(&hash) => {
                members.insert(hash.clone(), value.clone());
                true
            }
            _ => false,
        });
        if added {
            self.trigger_entry(TriggerOp::Add, hash, Some(&value), None);
        }
    }

    /// Remove a map entry or set member. Returns whether it existed.
    pub fn remove_entry(&self, key: &Value) -> bool {
        let hash = key.to_raw().hash_key();
        if self.is_readonly() {
            refuse("Delete", &Key::Entry(hash));
            return false;
        }
        let old = self.target().with_mut(|data| match data {
            TargetData::Map(entries) => entries.shift_remove(&hash).map(|(_, v)| v),
            TargetData::Set(members) => members.shift_remove(&hash),
            _ => None,
        });
        match old {
            Some(old) => {
                self.trigger_entry(TriggerOp::Delete, hash, None, Some(&old));
                true
            }
            None => false,
        }
    }

    /// Remove every entry. Triggers only if the collection was non-empty.
    pub fn clear(&self) {
        if self.is_readonly() {
            refuse("Clear", &Key::Iterate);
            return;
        }
        let target = self.target();
        let had_items = target.is_collection() && !target.is_empty();
        let old = target.with_mut(|data| match data {
            TargetData::Map(entries) => TargetData::Map(std::mem::take(entries)),
            TargetData::Set(members) => TargetData::Set(std::mem::take(members)),
            TargetData::Object(_) => TargetData::Object(Default::default()),
            TargetData::Array(_) => TargetData::Array(Vec::new()),
        });
        if had_items {
            trigger(self.id(), target.kind(), TriggerOp::Clear, None, None, None);
        }
        drop(old);
    }

    /// Map keys or set members, in insertion order.
    pub fn keys(&self) -> Vec<Value> {
        let kind = self.target().kind();
        match kind {
            TargetKind::Map => self.track_shape(Key::MapKeyIterate),
            TargetKind::Set => self.track_shape(Key::Iterate),
            _ => return Vec::new(),
        }
        let keys = self.target().with(|data| match data {
            TargetData::Map(entries) => entries.values().map(|(k, _)| k.clone()).collect(),
            TargetData::Set(members) => members.values().cloned().collect(),
            _ => Vec::new(),
        });
        keys.into_iter().map(|k| self.wrap_entry(k)).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        if !self.target().is_collection() {
            return Vec::new();
        }
        self.track_shape(Key::Iterate);
        let values = self.target().with(|data| match data {
            TargetData::Map(entries) => entries.values().map(|(_, v)| v.clone()).collect(),
            TargetData::Set(members) => members.values().cloned().collect(),
            _ => Vec::new(),
        });
        values.into_iter().map(|v| self.wrap_entry(v)).collect()
    }

    /// Key/value pairs. Set members pair with themselves.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        if !self.target().is_collection() {
            return Vec::new();
        }
        self.track_shape(Key::Iterate);
        let entries: Vec<(Value, Value)> = self.target().with(|data| match data {
            TargetData::Map(entries) => entries.values().cloned().collect(),
            TargetData::Set(members) => members.values().map(|v| (v.clone(), v.clone())).collect(),
            _ => Vec::new(),
        });
        entries
            .into_iter()
            .map(|(k, v)| (self.wrap_entry(k), self.wrap_entry(v)))
            .collect()
    }

    fn trigger_entry(&self, op: TriggerOp, hash: HashKey, new: Option<&Value>, old: Option<&Value>) {
        trigger(self.id(), self.target().kind(), op, Some(&Key::Entry(hash)), new, old);
    }
}
