//! Effect Scopes
//!
//! An [`EffectScope`] groups effects, cleanup callbacks and child scopes so
//! that they can be disposed of together. Scopes form a tree: a scope created
//! while another is active becomes its child unless it is detached.
//!
//! Running code inside a scope makes it the ambient scope; every effect
//! created meanwhile is recorded in it. Stopping a scope stops its effects,
//! runs its cleanups, stops its children and detaches it from its parent in
//! O(1) by swapping the last sibling into its slot.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::effect::ReactiveEffect;
use crate::error::{self, ErrorCode, Warning};

thread_local! {
    static SCOPE_STACK: RefCell<Vec<EffectScope>> = const { RefCell::new(Vec::new()) };
}

struct ScopeInner {
    active: Cell<bool>,
    effects: RefCell<Vec<ReactiveEffect>>,
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
    parent: Option<Weak<ScopeInner>>,
    scopes: RefCell<Vec<EffectScope>>,
    /// Position in the parent's `scopes`, for swap-removal.
    index: Cell<usize>,
}

/// A lifetime container for effects and cleanup callbacks.
#[derive(Clone)]
pub struct EffectScope(Rc<ScopeInner>);

impl EffectScope {
    /// Create a scope. Unless `detached`, it becomes a child of the active
    /// scope.
    pub fn new(detached: bool) -> Self {
        let parent = if detached { None } else { get_current_scope() };

        let scope = Self(Rc::new(ScopeInner {
            active: Cell::new(true),
            effects: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            parent: parent.as_ref().map(|p| Rc::downgrade(&p.0)),
            scopes: RefCell::new(Vec::new()),
            index: Cell::new(0),
        }));

        if let Some(parent) = parent {
            let mut siblings = parent.0.scopes.borrow_mut();
            scope.0.index.set(siblings.len());
            siblings.push(scope.clone());
        }
        scope
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    /// Run `f` with this scope as the ambient scope.
    ///
    /// Returns `None` (with a warning) if the scope was already stopped.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        if !self.is_active() {
            error::warn(Warning::InactiveScope);
            return None;
        }
        let _guard = ScopeGuard::enter(self);
        Some(f())
    }

    /// Stop every effect, cleanup and child scope owned by this scope.
    pub fn stop(&self) {
        self.stop_inner(false);
    }

    fn stop_inner(&self, from_parent: bool) {
        if !self.is_active() {
            return;
        }
        self.0.active.set(false);

        let effects = std::mem::take(&mut *self.0.effects.borrow_mut());
        for effect in &effects {
            effect.stop();
        }

        let cleanups = std::mem::take(&mut *self.0.cleanups.borrow_mut());
        for cleanup in cleanups {
            error::call_with_error_handling(ErrorCode::ScopeCleanup, cleanup);
        }

        let children = std::mem::take(&mut *self.0.scopes.borrow_mut());
        for child in &children {
            child.stop_inner(true);
        }

        if !from_parent {
            self.detach();
        }
        tracing::debug!(
            target: "reactivity_core",
            effects = effects.len(),
            children = children.len(),
            "effect scope stopped"
        );
    }

    fn detach(&self) {
        let Some(parent) = self.0.parent.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        let mut siblings = parent.scopes.borrow_mut();
        let index = self.0.index.get();
        if siblings.get(index).is_some_and(|s| s.ptr_eq(self)) {
            let removed = siblings.swap_remove(index);
            if let Some(moved) = siblings.get(index) {
                moved.0.index.set(index);
            }
            drop(siblings);
            drop(removed);
        }
    }

    /// Register a cleanup to run when the scope stops.
    pub fn on_dispose(&self, f: impl FnOnce() + 'static) {
        self.0.cleanups.borrow_mut().push(Box::new(f));
    }

    pub fn effect_count(&self) -> usize {
        self.0.effects.borrow().len()
    }

    pub fn child_count(&self) -> usize {
        self.0.scopes.borrow().len()
    }

    pub fn ptr_eq(&self, other: &EffectScope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EffectScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectScope")
            .field("active", &self.is_active())
            .field("effects", &self.effect_count())
            .field("children", &self.child_count())
            .finish()
    }
}

/// Pushes a scope onto the scope stack; pops on drop.
struct ScopeGuard;

impl ScopeGuard {
    fn enter(scope: &EffectScope) -> Self {
        SCOPE_STACK.with(|stack| stack.borrow_mut().push(scope.clone()));
        ScopeGuard
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let popped = SCOPE_STACK.with(|stack| stack.borrow_mut().pop());
        drop(popped);
    }
}

/// Create a new scope. See [`EffectScope::new`].
pub fn effect_scope(detached: bool) -> EffectScope {
    EffectScope::new(detached)
}

/// The ambient scope, if any code is running inside one.
pub fn get_current_scope() -> Option<EffectScope> {
    SCOPE_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Register a cleanup on the ambient scope.
pub fn on_scope_dispose(f: impl FnOnce() + 'static) {
    match get_current_scope() {
        Some(scope) => scope.on_dispose(f),
        None => error::warn(Warning::NoActiveScope),
    }
}

/// Record an effect in `scope`, or in the ambient scope.
pub(crate) fn record_effect_scope(effect: &ReactiveEffect, scope: Option<&EffectScope>) {
    let scope = scope.cloned().or_else(get_current_scope);
    if let Some(scope) = scope.filter(EffectScope::is_active) {
        scope.0.effects.borrow_mut().push(effect.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::reactive::effect::effect;

    #[test]
    fn run_sets_the_ambient_scope() {
        let scope = effect_scope(false);
        assert!(get_current_scope().is_none());

        let inner = scope.run(|| get_current_scope().map(|s| s.ptr_eq(&scope)));
        assert_eq!(inner, Some(Some(true)));
        assert!(get_current_scope().is_none());
    }

    #[test]
    fn effects_are_collected_and_stopped() {
        let scope = effect_scope(false);
        let e = scope.run(|| effect(|| {})).unwrap();

        assert_eq!(scope.effect_count(), 1);
        scope.stop();
        assert!(!e.is_active());
        assert!(!scope.is_active());
    }

    #[test]
    fn nested_scopes_attach_unless_detached() {
        let parent = effect_scope(false);
        parent.run(|| {
            let _child = effect_scope(false);
            let _detached = effect_scope(true);
        });
        assert_eq!(parent.child_count(), 1);
    }

    #[test]
    fn child_stop_swap_removes_from_parent() {
        let parent = effect_scope(false);
        let (a, b, c) = parent
            .run(|| (effect_scope(false), effect_scope(false), effect_scope(false)))
            .unwrap();

        a.stop();
        assert_eq!(parent.child_count(), 2);
        // c moved into a's slot and must still be removable
        c.stop();
        assert_eq!(parent.child_count(), 1);
        b.stop();
        assert_eq!(parent.child_count(), 0);
    }

    #[test]
    fn running_a_stopped_scope_warns() {
        let warnings = Rc::new(RefCell::new(Vec::new()));
        let sink = warnings.clone();
        config::configure(|cfg| {
            cfg.warn_handler = Some(Rc::new(move |w: &Warning| sink.borrow_mut().push(w.clone())));
        });

        let scope = effect_scope(false);
        scope.stop();
        assert_eq!(scope.run(|| 1), None);
        assert_eq!(warnings.borrow().as_slice(), [Warning::InactiveScope]);
    }

    #[test]
    fn on_scope_dispose_outside_scope_warns() {
        let warnings = Rc::new(RefCell::new(Vec::new()));
        let sink = warnings.clone();
        config::configure(|cfg| {
            cfg.warn_handler = Some(Rc::new(move |w: &Warning| sink.borrow_mut().push(w.clone())));
        });

        on_scope_dispose(|| {});
        assert_eq!(warnings.borrow().as_slice(), [Warning::NoActiveScope]);
    }

    #[test]
    fn cleanups_run_once() {
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let scope = effect_scope(false);
        scope.run(|| on_scope_dispose(move || counter.set(counter.get() + 1)));

        scope.stop();
        scope.stop();
        assert_eq!(runs.get(), 1);
    }
}
