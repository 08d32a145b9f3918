//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects reactive slots and
//! effects. It owns the dependency records and resolves which effects a
//! mutation affects.
//!
//! # How It Works
//!
//! 1. When an effect is created, it registers with the runtime.
//!
//! 2. When a running effect reads a slot, [`track`] records the dependency in
//!    both directions: the slot's [`Dep`] gains the effect, and the effect
//!    remembers the slot's [`DepKey`].
//!
//! 3. When a slot is written, [`trigger`]:
//!    a. Resolves every dep the mutation touches (the key itself plus the
//!       structural markers that depend on its kind)
//!    b. Merges their subscribers into one ordered run-set
//!    c. Runs each effect inline, or hands it to its scheduler
//!
//! # Ownership
//!
//! Dependency records are keyed by [`TargetId`] and dropped together with
//! their target. The runtime only holds effects weakly: an effect lives as
//! long as a handle, its scope, or its owner (a computed or a watcher) keeps
//! it. Stopping or dropping an effect removes it from every dep it joined.
//! The runtime never holds its borrow while user code runs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use super::context::ReactiveContext;
use super::dep::Dep;
use super::effect::{DebuggerEvent, DebuggerOp, EffectInner, ReactiveEffect};
use super::operations::{Key, TargetKind, TrackOp, TriggerOp};
use super::subscriber::{EffectId, TargetId};
use crate::observe::Value;

#[derive(Default)]
struct RuntimeState {
    targets: HashMap<TargetId, IndexMap<Key, Dep>>,
    effects: HashMap<EffectId, Weak<EffectInner>>,
}

thread_local! {
    static RUNTIME: RefCell<RuntimeState> = RefCell::new(RuntimeState::default());
}

/// The per-thread reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Register an effect so triggers can reach it.
    pub(crate) fn register(effect: &Rc<EffectInner>) {
        RUNTIME.with(|rt| {
            rt.borrow_mut().effects.insert(effect.id, Rc::downgrade(effect));
        });
    }

    /// Unregister an effect. Safe to call while the thread is shutting down.
    pub(crate) fn unregister(id: EffectId) {
        let _ = RUNTIME.try_with(|rt| {
            if let Ok(mut rt) = rt.try_borrow_mut() {
                rt.effects.remove(&id);
            }
        });
    }

    /// Remove an effect from every dep it joined.
    ///
    /// Called before re-running a computation so that branches it no longer
    /// reads stop notifying it.
    pub(crate) fn cleanup_effect(effect: &EffectInner) {
        let deps = std::mem::take(&mut *effect.deps.borrow_mut());
        if deps.is_empty() {
            return;
        }
        let _ = RUNTIME.try_with(|rt| {
            let Ok(mut rt) = rt.try_borrow_mut() else {
                return;
            };
            for (target, key) in deps {
                let Some(deps_map) = rt.targets.get_mut(&target) else {
                    continue;
                };
                if let Some(dep) = deps_map.get_mut(&key) {
                    dep.remove(effect.id);
                    if dep.is_empty() {
                        deps_map.swap_remove(&key);
                    }
                }
                if deps_map.is_empty() {
                    rt.targets.remove(&target);
                }
            }
        });
    }

    /// Drop every dependency record owned by a target.
    pub fn forget_target(target: TargetId) {
        let _ = RUNTIME.try_with(|rt| {
            if let Ok(mut rt) = rt.try_borrow_mut() {
                rt.targets.remove(&target);
            }
        });
    }

    /// Number of effects subscribed to one slot.
    pub fn subscriber_count(target: TargetId, key: &Key) -> usize {
        RUNTIME.with(|rt| {
            rt.borrow()
                .targets
                .get(&target)
                .and_then(|deps| deps.get(key))
                .map_or(0, Dep::len)
        })
    }

    /// Number of live effects: neither stopped nor dropped.
    pub fn effect_count() -> usize {
        RUNTIME.with(|rt| rt.borrow().effects.len())
    }

    /// Get the effect currently being tracked, if any.
    pub fn current_effect() -> Option<EffectId> {
        ReactiveContext::current_effect()
    }

    /// Check if a read right now would be tracked.
    pub fn is_tracking() -> bool {
        ReactiveContext::should_track()
    }
}

/// Record that the running effect depends on `(target, key)`.
pub fn track(target: TargetId, op: TrackOp, key: Key) {
    if !ReactiveContext::should_track() {
        return;
    }
    let Some(effect_id) = ReactiveContext::current_effect() else {
        return;
    };

    let hook = RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        let RuntimeState { targets, effects } = &mut *rt;
        let effect = effects.get(&effect_id)?.upgrade()?;
        let inserted = targets
            .entry(target)
            .or_default()
            .entry(key.clone())
            .or_default()
            .insert(effect_id);
        if !inserted {
            return None;
        }
        effect.deps.borrow_mut().push((target, key.clone()));
        tracing::trace!(target: "reactivity_core", %effect_id, target_id = %target, %key, ?op, "track");
        effect.on_track.clone()
    });

    if let Some(hook) = hook {
        hook(&DebuggerEvent {
            effect: effect_id,
            target,
            op: DebuggerOp::Track(op),
            key: Some(key),
            new_value: None,
            old_value: None,
        });
    }
}

/// Notify every effect affected by a mutation of `target`.
///
/// `new_value` is required for array length writes: entries at indices at or
/// beyond the new length are affected too.
pub fn trigger(
    target: TargetId,
    kind: TargetKind,
    op: TriggerOp,
    key: Option<&Key>,
    new_value: Option<&Value>,
    old_value: Option<&Value>,
) {
    let effects: Vec<Rc<EffectInner>> = RUNTIME.with(|rt| {
        let rt = rt.borrow();
        let Some(deps_map) = rt.targets.get(&target) else {
            return Vec::new();
        };

        let mut run_set: IndexSet<EffectId> = IndexSet::new();
        let mut add = |dep: Option<&Dep>| {
            if let Some(dep) = dep {
                run_set.extend(dep.iter());
            }
        };

        if op == TriggerOp::Clear {
            deps_map.values().for_each(|dep| add(Some(dep)));
        } else if kind == TargetKind::Array && key == Some(&Key::Length) {
            let new_len = new_value.and_then(Value::as_number).unwrap_or(0.0);
            for (slot, dep) in deps_map {
                match slot {
                    Key::Length => add(Some(dep)),
                    Key::Index(i) if *i as f64 >= new_len => add(Some(dep)),
                    _ => {}
                }
            }
        } else {
            if let Some(key) = key {
                add(deps_map.get(key));
            }
            match op {
                TriggerOp::Add => {
                    if kind != TargetKind::Array {
                        add(deps_map.get(&Key::Iterate));
                        if kind == TargetKind::Map {
                            add(deps_map.get(&Key::MapKeyIterate));
                        }
                    } else if key.is_some_and(Key::is_index) {
                        add(deps_map.get(&Key::Length));
                    }
                }
                TriggerOp::Delete => {
                    if kind != TargetKind::Array {
                        add(deps_map.get(&Key::Iterate));
                        if kind == TargetKind::Map {
                            add(deps_map.get(&Key::MapKeyIterate));
                        }
                    }
                }
                TriggerOp::Set => {
                    if kind == TargetKind::Map {
                        add(deps_map.get(&Key::Iterate));
                    }
                }
                TriggerOp::Clear => {}
            }
        }

        run_set
            .into_iter()
            .filter_map(|id| rt.effects.get(&id).and_then(Weak::upgrade))
            .collect()
    });

    if effects.is_empty() {
        return;
    }
    tracing::trace!(
        target: "reactivity_core",
        target_id = %target,
        key = ?key,
        ?op,
        effects = effects.len(),
        "trigger"
    );

    let current = ReactiveContext::current_effect();
    for effect in effects {
        if !effect.active.get() {
            continue;
        }
        // An effect may not re-trigger itself mid-run unless it opted in.
        if current == Some(effect.id) && !effect.allow_recurse.get() {
            continue;
        }
        if let Some(hook) = &effect.on_trigger {
            hook(&DebuggerEvent {
                effect: effect.id,
                target,
                op: DebuggerOp::Trigger(op),
                key: key.cloned(),
                new_value: new_value.cloned(),
                old_value: old_value.cloned(),
            });
        }
        match effect.scheduler.clone() {
            Some(scheduler) => scheduler(),
            None => ReactiveEffect(effect).run(),
        }
    }
}
