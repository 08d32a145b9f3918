//! Ref Implementation
//!
//! A [`Ref`] boxes a single [`Value`] and is itself a one-slot target: reads
//! track its `"value"` key and writes trigger it. It is built entirely on
//! the public [`track`] / [`trigger`] operations.
//!
//! # How Refs Work
//!
//! 1. The stored value is kept raw. Reading wraps containers reactively
//!    (unless the ref is shallow), so a ref of an object behaves like a
//!    reactive object.
//!
//! 2. Writing compares the raw new value with the stored one using
//!    `Object.is` semantics and triggers only on change.
//!
//! 3. [`trigger_ref`] forces a notification, for shallow refs whose contents
//!    were mutated in place.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::operations::{Key, TargetKind, TrackOp, TriggerOp};
use super::runtime::{track, trigger, Runtime};
use super::subscriber::TargetId;
use crate::observe::{has_changed, to_reactive, Value};

struct RefInner {
    id: TargetId,
    value: RefCell<Value>,
    shallow: bool,
}

impl Drop for RefInner {
    fn drop(&mut self) {
        Runtime::forget_target(self.id);
    }
}

/// A reactive box around one value.
///
/// # Example
///
/// ```rust
/// use reactivity_core::reactive::{effect, Ref};
///
/// let count = Ref::new(0);
/// let c = count.clone();
/// let _e = effect(move || {
///     let _ = c.get();
/// });
///
/// count.set(5);
/// ```
#[derive(Clone)]
pub struct Ref(Rc<RefInner>);

impl Ref {
    pub fn new(value: impl Into<Value>) -> Self {
        Self::create(value.into().to_raw(), false)
    }

    /// A ref that stores and returns its value as is.
    pub fn shallow(value: impl Into<Value>) -> Self {
        Self::create(value.into(), true)
    }

    fn create(value: Value, shallow: bool) -> Self {
        Self(Rc::new(RefInner {
            id: TargetId::new(),
            value: RefCell::new(value),
            shallow,
        }))
    }

    pub fn id(&self) -> TargetId {
        self.0.id
    }

    pub fn is_shallow(&self) -> bool {
        self.0.shallow
    }

    /// Read the value, tracking the read.
    pub fn get(&self) -> Value {
        track(self.0.id, TrackOp::Get, Key::value());
        self.get_untracked()
    }

    /// Read the value without creating a dependency.
    pub fn get_untracked(&self) -> Value {
        let value = self.0.value.borrow().clone();
        if self.0.shallow {
            value
        } else {
            to_reactive(value)
        }
    }

    /// Write the value, notifying dependents if it changed.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();
        let new = if self.0.shallow { value } else { value.to_raw() };
        let old = self.0.value.borrow().clone();
        if !has_changed(&new, &old) {
            return;
        }
        let displaced = self.0.value.replace(new.clone());
        drop(displaced);
        trigger(
            self.0.id,
            TargetKind::Cell,
            TriggerOp::Set,
            Some(&Key::value()),
            Some(&new),
            Some(&old),
        );
    }

    /// Replace the value with `f` applied to the current one.
    pub fn update(&self, f: impl FnOnce(&Value) -> Value) {
        let next = f(&self.get_untracked());
        self.set(next);
    }

    /// Notify dependents without changing the value.
    pub fn trigger(&self) {
        let value = self.0.value.borrow().clone();
        trigger(
            self.0.id,
            TargetKind::Cell,
            TriggerOp::Set,
            Some(&Key::value()),
            Some(&value),
            None,
        );
    }

    /// Number of effects reading this ref.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.0.id, &Key::value())
    }

    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.0.id)
            .field("value", &self.0.value.borrow())
            .field("shallow", &self.0.shallow)
            .finish()
    }
}

/// Create a ref.
pub fn create_ref(value: impl Into<Value>) -> Ref {
    Ref::new(value)
}

pub fn shallow_ref(value: impl Into<Value>) -> Ref {
    Ref::shallow(value)
}

pub fn is_ref(value: &Value) -> bool {
    value.is_ref()
}

/// Read through a ref, or return the value itself.
pub fn unref(value: &Value) -> Value {
    match value {
        Value::Ref(r) => r.get(),
        other => other.clone(),
    }
}

/// Force dependents of a ref to run.
pub fn trigger_ref(r: &Ref) {
    r.trigger();
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{is_reactive, reactive, Target};
    use crate::reactive::effect::effect;
    use std::cell::Cell;

    #[test]
    fn ref_get_and_set() {
        let r = Ref::new(0);
        assert_eq!(r.get(), Value::from(0));

        r.set(5);
        assert_eq!(r.get(), Value::from(5));
    }

    #[test]
    fn ref_notifies_on_change_only() {
        let r = Ref::new(f64::NAN);
        let runs = Rc::new(Cell::new(0));
        let (reader, counter) = (r.clone(), runs.clone());

        let _e = effect(move || {
            reader.get();
            counter.set(counter.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        r.set(f64::NAN);
        assert_eq!(runs.get(), 1);

        r.set(1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn containers_read_back_reactive() {
        let r = Ref::new(Target::object());
        assert!(is_reactive(&r.get()));

        // Writing a view stores the raw target, so writing it back is no change
        let view = r.get();
        r.set(view);
        assert!(matches!(&*r.0.value.borrow(), Value::Target(_)));

        let shallow = Ref::shallow(Target::object());
        assert!(matches!(shallow.get(), Value::Target(_)));
    }

    #[test]
    fn trigger_ref_forces_notification() {
        let r = shallow_ref(reactive(Target::object()));
        let runs = Rc::new(Cell::new(0));
        let (reader, counter) = (r.clone(), runs.clone());
        let _e = effect(move || {
            reader.get();
            counter.set(counter.get() + 1);
        });

        trigger_ref(&r);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn unref_reads_through() {
        let r = Ref::new("x");
        assert_eq!(unref(&Value::Ref(r)), Value::from("x"));
        assert_eq!(unref(&Value::from(3)), Value::from(3));
    }

    #[test]
    fn dropping_a_ref_forgets_its_dependents() {
        let r = Ref::new(1);
        let id = r.id();
        let reader = r.clone();
        let _e = effect(move || {
            reader.get();
        });
        assert_eq!(r.subscriber_count(), 1);

        Runtime::forget_target(id);
        assert_eq!(r.subscriber_count(), 0);

        let other = Ref::new(2);
        let other_id = other.id();
        drop(other);
        assert_eq!(Runtime::subscriber_count(other_id, &Key::value()), 0);
    }
}
