//! Computed Implementation
//!
//! A [`Computed`] is a cached derived value that re-evaluates only when it
//! is read after one of its dependencies changed.
//!
//! # How Computeds Work
//!
//! 1. The getter runs inside a lazy [`ReactiveEffect`], so it tracks what it
//!    reads. Nothing runs until the first [`Computed::get`].
//!
//! 2. The effect's scheduler does not recompute. It marks the computed dirty
//!    and triggers the computed's own `"value"` slot, so readers of the
//!    computed re-run and pull the new value.
//!
//! 3. A dirty computed recomputes on its next read; a clean one returns the
//!    cached value.
//!
//! # Why This Matters
//!
//! - A ref changes
//! - 10 computeds depend on it
//! - Only the computeds actually read will recompute

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use super::effect::{EffectOptions, ReactiveEffect};
use super::operations::{Key, TargetKind, TrackOp, TriggerOp};
use super::runtime::{track, trigger, Runtime};
use super::subscriber::TargetId;

struct ComputedInner<T> {
    id: TargetId,
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    effect: ReactiveEffect,
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.effect.stop();
        Runtime::forget_target(self.id);
    }
}

/// A lazily evaluated, cached derivation.
///
/// # Example
///
/// ```rust
/// use reactivity_core::observe::Value;
/// use reactivity_core::reactive::{Computed, Ref};
///
/// let count = Ref::new(2);
/// let c = count.clone();
/// let doubled = Computed::new(move || c.get().as_number().unwrap_or(0.0) * 2.0);
///
/// assert_eq!(doubled.get(), 4.0);
/// count.set(5);
/// assert_eq!(doubled.get(), 10.0);
/// ```
pub struct Computed<T: Clone + 'static> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: Clone + 'static> Computed<T> {
    pub fn new<F>(mut getter: F) -> Self
    where
        F: FnMut() -> T + 'static,
    {
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let on_run = weak.clone();
            let on_change = weak.clone();

            let options = EffectOptions::default().lazy().scheduler(move || {
                let Some(inner) = on_change.upgrade() else {
                    return;
                };
                if !inner.dirty.get() {
                    inner.dirty.set(true);
                    trigger(inner.id, TargetKind::Cell, TriggerOp::Set, Some(&Key::value()), None, None);
                }
            });
            let effect = ReactiveEffect::new(
                move || {
                    if let Some(inner) = on_run.upgrade() {
                        let value = getter();
                        *inner.value.borrow_mut() = Some(value);
                    }
                },
                options,
            );

            ComputedInner {
                id: TargetId::new(),
                value: RefCell::new(None),
                dirty: Cell::new(true),
                effect,
            }
        });
        Self { inner }
    }

    /// Read the value, recomputing it first if a dependency changed.
    pub fn get(&self) -> T {
        let inner = &self.inner;
        track(inner.id, TrackOp::Get, Key::value());
        if inner.dirty.get() {
            inner.dirty.set(false);
            inner.effect.run();
        }
        inner
            .value
            .borrow()
            .clone()
            .expect("computed read its own value while evaluating")
    }

    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// The effect that evaluates the getter.
    pub fn effect(&self) -> &ReactiveEffect {
        &self.inner.effect
    }

    /// Number of effects reading this computed.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.inner.id, &Key::value())
    }
}

impl<T: Clone + 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Debug + 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("dirty", &self.inner.dirty.get())
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

/// Create a computed. See [`Computed::new`].
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: FnMut() -> T + 'static,
{
    Computed::new(getter)
}

// ---- Tests ----
