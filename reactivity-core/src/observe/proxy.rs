//! Observed views and their constructors.
//!
//! Wrapping is idempotent per flavor: the same raw target always yields the
//! same view while that view is alive. Four identity maps, one per flavor,
//! hold weak handles keyed by [`TargetId`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::handlers::{
    MutableHandlers, ProxyHandler, ReadonlyHandlers, ShallowReactiveHandlers,
    ShallowReadonlyHandlers,
};
use super::target::Target;
use super::value::Value;
use crate::error::{self, Warning};
use crate::reactive::{Key, ReactiveFlag, TargetId};

/// The interception behavior of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    Reactive,
    Readonly,
    ShallowReactive,
    ShallowReadonly,
}

impl Flavor {
    pub fn is_readonly(self) -> bool {
        matches!(self, Flavor::Readonly | Flavor::ShallowReadonly)
    }

    pub fn is_shallow(self) -> bool {
        matches!(self, Flavor::ShallowReactive | Flavor::ShallowReadonly)
    }

    pub fn handler(self) -> &'static dyn ProxyHandler {
        match self {
            Flavor::Reactive => &MutableHandlers,
            Flavor::Readonly => &ReadonlyHandlers,
            Flavor::ShallowReactive => &ShallowReactiveHandlers,
            Flavor::ShallowReadonly => &ShallowReadonlyHandlers,
        }
    }
}

pub(crate) struct ProxyInner {
    target: Target,
    flavor: Flavor,
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        let id = self.target.id();
        let flavor = self.flavor;
        let _ = PROXY_MAPS.try_with(|maps| {
            if let Ok(mut maps) = maps.try_borrow_mut() {
                let map = maps.for_flavor(flavor);
                // A newer view may already occupy the slot
                if map.get(&id).is_some_and(|w| w.strong_count() == 0) {
                    map.remove(&id);
                }
            }
        });
    }
}

/// A wrapped view of a raw container.
///
/// Reads and writes go through the flavor's [`ProxyHandler`]. Two views
/// are the same view iff [`Observed::ptr_eq`] holds.
#[derive(Clone)]
pub struct Observed(Rc<ProxyInner>);

#[derive(Default)]
struct ProxyMaps {
    reactive: HashMap<TargetId, Weak<ProxyInner>>,
    readonly: HashMap<TargetId, Weak<ProxyInner>>,
    shallow_reactive: HashMap<TargetId, Weak<ProxyInner>>,
    shallow_readonly: HashMap<TargetId, Weak<ProxyInner>>,
}

impl ProxyMaps {
    fn for_flavor(&mut self, flavor: Flavor) -> &mut HashMap<TargetId, Weak<ProxyInner>> {
        match flavor {
            Flavor::Reactive => &mut self.reactive,
            Flavor::Readonly => &mut self.readonly,
            Flavor::ShallowReactive => &mut self.shallow_reactive,
            Flavor::ShallowReadonly => &mut self.shallow_readonly,
        }
    }
}

thread_local! {
    static PROXY_MAPS: RefCell<ProxyMaps> = RefCell::new(ProxyMaps::default());
}

impl Observed {
    /// The raw container behind this view.
    pub fn target(&self) -> &Target {
        &self.0.target
    }

    pub fn to_raw(&self) -> Target {
        self.0.target.clone()
    }

    pub fn id(&self) -> TargetId {
        self.0.target.id()
    }

    pub fn flavor(&self) -> Flavor {
        self.0.flavor
    }

    pub fn is_reactive(&self) -> bool {
        self.flag(ReactiveFlag::IsReactive)
    }

    pub fn is_readonly(&self) -> bool {
        self.flag(ReactiveFlag::IsReadonly)
    }

    pub fn is_shallow(&self) -> bool {
        self.flag(ReactiveFlag::IsShallow)
    }

    fn flag(&self, flag: ReactiveFlag) -> bool {
        self.get(flag).as_bool().unwrap_or(false)
    }

    fn handler(&self) -> &'static dyn ProxyHandler {
        self.0.flavor.handler()
    }

    fn key(&self, key: impl Into<Key>) -> Key {
        key.into().normalize(self.0.target.kind())
    }

    /// Read a property.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        self.handler().get(&self.0.target, self.key(key))
    }

    /// Write a property. Returns whether the write succeeded.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        self.handler().set(&self.0.target, self.key(key), value.into())
    }

    pub fn has(&self, key: impl Into<Key>) -> bool {
        self.handler().has(&self.0.target, self.key(key))
    }

    pub fn delete(&self, key: impl Into<Key>) -> bool {
        self.handler().delete_property(&self.0.target, self.key(key))
    }

    /// Own keys, tracking the container's shape.
    pub fn own_keys(&self) -> Vec<Key> {
        self.handler().own_keys(&self.0.target)
    }

    pub fn ptr_eq(&self, other: &Observed) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed")
            .field("flavor", &self.0.flavor)
            .field("target", &self.0.target)
            .finish()
    }
}

fn create_reactive_object(value: Value, flavor: Flavor) -> Value {
    let target = match value {
        Value::Target(target) => target,
        Value::Observed(view) => {
            // Only a readonly view over a mutable one is ever rewrapped
            if !flavor.is_readonly() || view.is_readonly() {
                return Value::Observed(view);
            }
            view.to_raw()
        }
        other => {
            error::warn(Warning::NotObservable {
                value: format!("{other:?}"),
            });
            return other;
        }
    };
    if target.is_skipped() {
        return Value::Target(target);
    }

    let id = target.id();
    let existing = PROXY_MAPS.with(|maps| {
        maps.borrow_mut()
            .for_flavor(flavor)
            .get(&id)
            .and_then(Weak::upgrade)
    });
    if let Some(inner) = existing {
        return Value::Observed(Observed(inner));
    }

    let inner = Rc::new(ProxyInner { target, flavor });
    PROXY_MAPS.with(|maps| {
        maps.borrow_mut()
            .for_flavor(flavor)
            .insert(id, Rc::downgrade(&inner));
    });
    tracing::trace!(target: "reactivity_core", target_id = %id, ?flavor, "created view");
    Value::Observed(Observed(inner))
}

/// Deep mutable view. Reads track, writes trigger, nested containers are
/// wrapped on access.
pub fn reactive(value: impl Into<Value>) -> Value {
    create_reactive_object(value.into(), Flavor::Reactive)
}

/// Deep readonly view. Nothing is tracked and writes warn.
pub fn readonly(value: impl Into<Value>) -> Value {
    create_reactive_object(value.into(), Flavor::Readonly)
}

/// Only top-level properties are reactive; stored values are returned as is.
pub fn shallow_reactive(value: impl Into<Value>) -> Value {
    create_reactive_object(value.into(), Flavor::ShallowReactive)
}

pub fn shallow_readonly(value: impl Into<Value>) -> Value {
    create_reactive_object(value.into(), Flavor::ShallowReadonly)
}

pub fn to_raw(value: &Value) -> Value {
    value.to_raw()
}

/// Flag a container so it is never wrapped.
pub fn mark_raw(value: Value) -> Value {
    match &value {
        Value::Target(target) => target.mark_raw(),
        Value::Observed(view) => view.target().mark_raw(),
        _ => {}
    }
    value
}

pub fn is_reactive(value: &Value) -> bool {
    value.as_observed().is_some_and(Observed::is_reactive)
}

pub fn is_readonly(value: &Value) -> bool {
    value.as_observed().is_some_and(Observed::is_readonly)
}

pub fn is_shallow(value: &Value) -> bool {
    match value {
        Value::Observed(view) => view.is_shallow(),
        Value::Ref(r) => r.is_shallow(),
        _ => false,
    }
}

pub fn is_proxy(value: &Value) -> bool {
    is_reactive(value) || is_readonly(value)
}

/// Wrap containers reactively; other values pass through silently.
pub fn to_reactive(value: Value) -> Value {
    if value.is_object() {
        reactive(value)
    } else {
        value
    }
}

pub fn to_readonly(value: Value) -> Value {
    if value.is_object() {
        readonly(value)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use serde_json::json;

    #[test]
    fn wrapping_is_idempotent_per_flavor() {
        let raw = Value::from_json(json!({ "a": 1 }));
        let first = reactive(raw.clone());
        let second = reactive(raw.clone());
        assert_eq!(first, second);
        assert_eq!(reactive(first.clone()), first);

        let ro = readonly(raw.clone());
        assert_ne!(ro, first);
        assert_eq!(readonly(raw), ro);
    }

    #[test]
    fn readonly_of_reactive_shares_the_raw_target() {
        let state = reactive(Value::from_json(json!({ "a": 1 })));
        let ro = readonly(state.clone());

        assert!(is_readonly(&ro));
        assert_eq!(to_raw(&ro), to_raw(&state));
        // reactive() of a readonly view returns the view
        assert_eq!(reactive(ro.clone()), ro);
    }

    #[test]
    fn primitives_are_returned_with_a_warning() {
        let warnings = Rc::new(RefCell::new(Vec::new()));
        let sink = warnings.clone();
        config::configure(|cfg| {
            cfg.warn_handler = Some(Rc::new(move |w: &Warning| sink.borrow_mut().push(w.clone())));
        });

        assert_eq!(reactive(5), Value::from(5));
        assert!(matches!(warnings.borrow()[0], Warning::NotObservable { .. }));
    }

    #[test]
    fn marked_targets_stay_raw() {
        let raw = mark_raw(Value::from_json(json!({})));
        assert!(matches!(reactive(raw), Value::Target(_)));
    }

    #[test]
    fn dropped_views_leave_the_identity_map() {
        let raw = Value::from_json(json!({}));
        let id = raw.target_id().unwrap();
        drop(reactive(raw.clone()));
        let live = PROXY_MAPS.with(|maps| maps.borrow_mut().for_flavor(Flavor::Reactive).contains_key(&id));
        assert!(!live);
    }

    #[test]
    fn nested_reads_wrap_with_the_parent_mutability() {
        let state = readonly(Value::from_json(json!({ "inner": { "x": 1 } })));
        let inner = state.as_observed().unwrap().get("inner");
        assert!(is_readonly(&inner));

        let state = reactive(Value::from_json(json!({ "inner": { "x": 1 } })));
        let inner = state.as_observed().unwrap().get("inner");
        assert!(is_reactive(&inner));

        let state = shallow_reactive(Value::from_json(json!({ "inner": { "x": 1 } })));
        let inner = state.as_observed().unwrap().get("inner");
        assert!(matches!(inner, Value::Target(_)));
    }
}
