//! Interception behavior per wrapper flavor.
//!
//! Every operation on an [`Observed`](super::Observed) view is routed to the
//! [`ProxyHandler`] of its flavor. Mutable handlers track reads and trigger
//! writes; readonly handlers never track and refuse writes with a warning.

use super::proxy::{readonly, reactive};
use super::target::Target;
use super::value::{has_changed, Value};
use crate::error::{self, Warning};
use crate::reactive::{
    track, trigger, Key, ReactiveFlag, TargetKind, TrackOp, TriggerOp, MAX_ARRAY_LENGTH,
};

/// The intercepted operations of a wrapped container.
///
/// Keys are normalized for the target's kind before the handler sees them.
pub trait ProxyHandler {
    fn get(&self, target: &Target, key: Key) -> Value;

    /// Returns whether the write is considered successful.
    fn set(&self, target: &Target, key: Key, value: Value) -> bool;

    fn has(&self, target: &Target, key: Key) -> bool;

    fn delete_property(&self, target: &Target, key: Key) -> bool;

    fn own_keys(&self, target: &Target) -> Vec<Key>;
}

/// Handlers behind [`reactive`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MutableHandlers;

/// Handlers behind [`readonly`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadonlyHandlers;

/// Handlers behind `shallow_reactive`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShallowReactiveHandlers;

/// Handlers behind `shallow_readonly`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShallowReadonlyHandlers;

impl ProxyHandler for MutableHandlers {
    fn get(&self, target: &Target, key: Key) -> Value {
        create_getter(target, key, false, false)
    }

    fn set(&self, target: &Target, key: Key, value: Value) -> bool {
        create_setter(target, key, value, false)
    }

    fn has(&self, target: &Target, key: Key) -> bool {
        has(target, key)
    }

    fn delete_property(&self, target: &Target, key: Key) -> bool {
        delete_property(target, key)
    }

    fn own_keys(&self, target: &Target) -> Vec<Key> {
        own_keys(target)
    }
}

impl ProxyHandler for ShallowReactiveHandlers {
    fn get(&self, target: &Target, key: Key) -> Value {
        create_getter(target, key, false, true)
    }

    fn set(&self, target: &Target, key: Key, value: Value) -> bool {
        create_setter(target, key, value, true)
    }

    fn has(&self, target: &Target, key: Key) -> bool {
        has(target, key)
    }

    fn delete_property(&self, target: &Target, key: Key) -> bool {
        delete_property(target, key)
    }

    fn own_keys(&self, target: &Target) -> Vec<Key> {
        own_keys(target)
    }
}

impl ProxyHandler for ReadonlyHandlers {
    fn get(&self, target: &Target, key: Key) -> Value {
        create_getter(target, key, true, false)
    }

    fn set(&self, _target: &Target, key: Key, _value: Value) -> bool {
        refuse("Set", &key)
    }

    fn has(&self, target: &Target, key: Key) -> bool {
        target.has_own(&key)
    }

    fn delete_property(&self, _target: &Target, key: Key) -> bool {
        refuse("Delete", &key)
    }

    fn own_keys(&self, target: &Target) -> Vec<Key> {
        target.own_keys()
    }
}

impl ProxyHandler for ShallowReadonlyHandlers {
    fn get(&self, target: &Target, key: Key) -> Value {
        create_getter(target, key, true, true)
    }

    fn set(&self, _target: &Target, key: Key, _value: Value) -> bool {
        refuse("Set", &key)
    }

    fn has(&self, target: &Target, key: Key) -> bool {
        target.has_own(&key)
    }

    fn delete_property(&self, _target: &Target, key: Key) -> bool {
        refuse("Delete", &key)
    }

    fn own_keys(&self, target: &Target) -> Vec<Key> {
        target.own_keys()
    }
}

/// Warn about a write through a readonly view. The write is dropped but
/// reported as successful.
pub(crate) fn refuse(op: &'static str, key: &Key) -> bool {
    error::warn(Warning::ReadonlyMutation {
        op,
        key: key.to_string(),
    });
    true
}

fn create_getter(target: &Target, key: Key, is_readonly: bool, shallow: bool) -> Value {
    if let Key::Flag(flag) = key {
        return match flag {
            ReactiveFlag::IsReactive => Value::Bool(!is_readonly),
            ReactiveFlag::IsReadonly => Value::Bool(is_readonly),
            ReactiveFlag::IsShallow => Value::Bool(shallow),
            ReactiveFlag::Raw => Value::Target(target.clone()),
            ReactiveFlag::Skip => Value::Bool(target.is_skipped()),
        };
    }

    let res = target.get(&key);
    if !key.is_trackable() {
        return res;
    }
    if !is_readonly {
        track(target.id(), TrackOp::Get, key.clone());
    }
    if shallow {
        return res;
    }

    match res {
        // Index reads on arrays hand out the ref itself
        Value::Ref(r) if !(target.is_array() && key.is_index()) => r.get(),
        Value::Target(nested) => {
            if is_readonly {
                readonly(Value::Target(nested))
            } else {
                reactive(Value::Target(nested))
            }
        }
        other => other,
    }
}

fn create_setter(target: &Target, key: Key, value: Value, shallow: bool) -> bool {
    if !target.accepts(&key) {
        return false;
    }
    let mut old = target.get(&key);
    let mut value = value;
    if !shallow {
        value = value.to_raw();
        old = old.to_raw();
        if !target.is_array() {
            if let Value::Ref(slot) = &old {
                if !value.is_ref() {
                    slot.set(value);
                    return true;
                }
            }
        }
    }
    if key == Key::Length && !is_valid_length(&value) {
        return false;
    }

    let had_key = target.has_own(&key);
    let displaced = target.set(key.clone(), value.clone());
    drop(displaced);

    if !had_key {
        trigger(target.id(), target.kind(), TriggerOp::Add, Some(&key), Some(&value), None);
    } else if has_changed(&value, &old) {
        trigger(
            target.id(),
            target.kind(),
            TriggerOp::Set,
            Some(&key),
            Some(&value),
            Some(&old),
        );
    }
    true
}

/// A non-negative integer below the array size limit.
fn is_valid_length(value: &Value) -> bool {
    value
        .as_number()
        .is_some_and(|n| n >= 0.0 && n.fract() == 0.0 && n < MAX_ARRAY_LENGTH as f64)
}

fn has(target: &Target, key: Key) -> bool {
    let result = target.has_own(&key);
    if key.is_trackable() {
        track(target.id(), TrackOp::Has, key);
    }
    result
}

fn delete_property(target: &Target, key: Key) -> bool {
    let had_key = target.has_own(&key);
    let old = target.get(&key);
    let result = target.delete(&key);
    if result && had_key {
        trigger(target.id(), target.kind(), TriggerOp::Delete, Some(&key), None, Some(&old));
    }
    // Deleting a missing property still succeeds
    result || !had_key
}

fn own_keys(target: &Target) -> Vec<Key> {
    let key = if target.kind() == TargetKind::Array {
        Key::Length
    } else {
        Key::Iterate
    };
    track(target.id(), TrackOp::Iterate, key);
    target.own_keys()
}
