//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever the
//! reactive state it read changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately (unless lazy) to
//!    establish initial dependencies.
//!
//! 2. When any dependency changes, the effect is run again inline, or handed
//!    to its scheduler callback if it has one. Schedulers are how effects get
//!    batched into the job queue.
//!
//! 3. Before re-running, the effect leaves every dep it joined and tracks new
//!    ones during execution, so branches it stopped reading no longer
//!    notify it.
//!
//! # Recursion
//!
//! An effect already on the effect stack is not re-entered. A trigger fired
//! from inside an effect's own body skips that effect unless it was created
//! with `allow_recurse`.
//!
//! # Lifetime
//!
//! The runtime only refers to effects weakly. An effect stays alive while a
//! [`ReactiveEffect`] handle or the [`EffectScope`] it was created in holds
//! it, and it runs until stopped. Dropping the last reference unsubscribes
//! it from everything it read.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::dep::DepKey;
use super::operations::{Key, TrackOp, TriggerOp};
use super::runtime::Runtime;
use super::scope::{record_effect_scope, EffectScope};
use super::subscriber::{EffectId, TargetId};
use crate::observe::Value;

pub type DebuggerHook = Rc<dyn Fn(&DebuggerEvent)>;

/// What a debugger hook is being told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerOp {
    Track(TrackOp),
    Trigger(TriggerOp),
}

/// Passed to `on_track` / `on_trigger` hooks.
#[derive(Debug, Clone)]
pub struct DebuggerEvent {
    pub effect: EffectId,
    pub target: TargetId,
    pub op: DebuggerOp,
    pub key: Option<Key>,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
}

/// Options accepted by [`effect_with`] and [`ReactiveEffect::new`].
#[derive(Default)]
pub struct EffectOptions {
    /// Do not run on creation.
    pub lazy: bool,
    /// Called instead of running the effect when a dependency changes.
    pub scheduler: Option<Rc<dyn Fn()>>,
    /// Scope to record the effect in. Defaults to the active scope.
    pub scope: Option<EffectScope>,
    /// Let the effect re-trigger itself from inside its own body.
    pub allow_recurse: bool,
    pub on_stop: Option<Box<dyn FnOnce()>>,
    pub on_track: Option<DebuggerHook>,
    pub on_trigger: Option<DebuggerHook>,
}

impl EffectOptions {
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn scheduler(mut self, scheduler: impl Fn() + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    pub fn scope(mut self, scope: &EffectScope) -> Self {
        self.scope = Some(scope.clone());
        self
    }

    pub fn allow_recurse(mut self, allow: bool) -> Self {
        self.allow_recurse = allow;
        self
    }

    pub fn on_stop(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_stop = Some(Box::new(f));
        self
    }

    pub fn on_track(mut self, f: impl Fn(&DebuggerEvent) + 'static) -> Self {
        self.on_track = Some(Rc::new(f));
        self
    }

    pub fn on_trigger(mut self, f: impl Fn(&DebuggerEvent) + 'static) -> Self {
        self.on_trigger = Some(Rc::new(f));
        self
    }
}

pub(crate) struct EffectInner {
    pub(crate) id: EffectId,
    f: RefCell<Box<dyn FnMut()>>,
    pub(crate) active: Cell<bool>,
    /// Slots this effect is currently subscribed to.
    pub(crate) deps: RefCell<SmallVec<[DepKey; 4]>>,
    pub(crate) scheduler: Option<Rc<dyn Fn()>>,
    pub(crate) allow_recurse: Cell<bool>,
    on_stop: RefCell<Option<Box<dyn FnOnce()>>>,
    pub(crate) on_track: Option<DebuggerHook>,
    pub(crate) on_trigger: Option<DebuggerHook>,
    run_count: Cell<usize>,
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        Runtime::cleanup_effect(self);
        Runtime::unregister(self.id);
    }
}

/// A re-runnable computation that tracks what it reads.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(json!({ "count": 0 })).into_observed().unwrap();
///
/// let s = state.clone();
/// let _effect = effect(move || {
///     println!("Count is: {}", s.get("count"));
/// });
///
/// state.set("count", 5);  // Prints: "Count is: 5"
/// ```
#[derive(Clone)]
pub struct ReactiveEffect(pub(crate) Rc<EffectInner>);

impl ReactiveEffect {
    /// Create an effect without running it.
    pub fn new<F>(f: F, options: EffectOptions) -> Self
    where
        F: FnMut() + 'static,
    {
        let inner = Rc::new(EffectInner {
            id: EffectId::new(),
            f: RefCell::new(Box::new(f)),
            active: Cell::new(true),
            deps: RefCell::new(SmallVec::new()),
            scheduler: options.scheduler,
            allow_recurse: Cell::new(options.allow_recurse),
            on_stop: RefCell::new(options.on_stop),
            on_track: options.on_track,
            on_trigger: options.on_trigger,
            run_count: Cell::new(0),
        });
        Runtime::register(&inner);

        let effect = Self(inner);
        record_effect_scope(&effect, options.scope.as_ref());
        effect
    }

    pub fn id(&self) -> EffectId {
        self.0.id
    }

    /// Run the computation, re-collecting its dependencies.
    ///
    /// A stopped effect still runs its function, without tracking.
    pub fn run(&self) {
        let inner = &self.0;
        if !inner.active.get() {
            if let Ok(mut f) = inner.f.try_borrow_mut() {
                (*f)();
            }
            return;
        }
        if ReactiveContext::is_running(inner.id) {
            return;
        }

        let _ctx = ReactiveContext::enter(inner.id);
        Runtime::cleanup_effect(inner);
        inner.run_count.set(inner.run_count.get() + 1);

        let mut f = inner.f.borrow_mut();
        (*f)();
    }

    /// Stop the effect permanently.
    ///
    /// It leaves every dep, runs its `on_stop` callback, and is skipped by all
    /// later triggers. Stopping twice is a no-op.
    pub fn stop(&self) {
        let inner = &self.0;
        if !inner.active.get() {
            return;
        }
        Runtime::cleanup_effect(inner);
        inner.active.set(false);

        let on_stop = inner.on_stop.borrow_mut().take();
        if let Some(on_stop) = on_stop {
            on_stop();
        }

        Runtime::unregister(inner.id);
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    pub fn allow_recurse(&self) -> bool {
        self.0.allow_recurse.get()
    }

    pub fn set_allow_recurse(&self, allow: bool) {
        self.0.allow_recurse.set(allow);
    }

    /// Number of tracked runs so far.
    pub fn run_count(&self) -> usize {
        self.0.run_count.get()
    }

    /// Number of slots the effect is subscribed to.
    pub fn dependency_count(&self) -> usize {
        self.0.deps.borrow().len()
    }

    pub fn ptr_eq(&self, other: &ReactiveEffect) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ReactiveEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.0.id)
            .field("active", &self.is_active())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

/// Create an effect and run it immediately.
pub fn effect<F>(f: F) -> ReactiveEffect
where
    F: FnMut() + 'static,
{
    effect_with(f, EffectOptions::default())
}

/// Create an effect with options; runs immediately unless `lazy`.
pub fn effect_with<F>(f: F, options: EffectOptions) -> ReactiveEffect
where
    F: FnMut() + 'static,
{
    let lazy = options.lazy;
    let effect = ReactiveEffect::new(f, options);
    if !lazy {
        effect.run();
    }
    effect
}

/// Stop an effect. See [`ReactiveEffect::stop`].
pub fn stop(effect: &ReactiveEffect) {
    effect.stop();
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
