//! Integration Tests for the Reactive System
//!
//! These tests verify that observed state, effects, scopes and the scheduler
//! work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures_util::FutureExt;
use reactivity_core::observe::{
    is_reactive, is_readonly, is_shallow, reactive, readonly, shallow_reactive, shallow_readonly,
    to_raw, Observed, Target, Value,
};
use reactivity_core::reactive::{
    computed, effect, effect_scope, effect_with, on_scope_dispose, DebuggerOp, EffectOptions, Ref, TrackOp,
};
use reactivity_core::scheduler::{
    next_tick, queue_job, run_microtasks, watch_effect, Flush, Job, WatchOptions,
};
use reactivity_core::{config, Warning};
use serde_json::json;

fn observed(json: serde_json::Value) -> Observed {
    reactive(Value::from_json(json)).into_observed().unwrap()
}

/// Install a warn handler that collects every warning.
fn collect_warnings() -> Rc<RefCell<Vec<Warning>>> {
    let warnings = Rc::new(RefCell::new(Vec::new()));
    let sink = warnings.clone();
    config::configure(|cfg| {
        cfg.warn_handler = Some(Rc::new(move |w: &Warning| sink.borrow_mut().push(w.clone())));
    });
    warnings
}

/// Wrapping the same target twice yields the same view, and wrapping a view
/// yields the view itself.
#[test]
fn wrapping_is_idempotent() {
    let raw = Value::from_json(json!({ "a": 1 }));
    let view = reactive(raw.clone());

    assert_eq!(reactive(raw.clone()), view);
    assert_eq!(reactive(view.clone()), view);
    assert_eq!(to_raw(&view), raw);
    assert!(is_reactive(&view));
}

/// The shallow flavors keep one view per target too, separate from the
/// deep ones, and leave nested containers raw.
#[test]
fn shallow_wrapping_is_idempotent() {
    let raw = Value::from_json(json!({ "nested": { "n": 1 } }));

    let shallow = shallow_reactive(raw.clone());
    assert_eq!(shallow_reactive(raw.clone()), shallow);
    assert_eq!(shallow_reactive(shallow.clone()), shallow);
    assert!(is_shallow(&shallow) && is_reactive(&shallow));
    assert_ne!(reactive(raw.clone()), shallow);

    let frozen = shallow_readonly(raw.clone());
    assert_eq!(shallow_readonly(raw.clone()), frozen);
    assert_eq!(shallow_readonly(frozen.clone()), frozen);
    assert!(is_shallow(&frozen) && is_readonly(&frozen));
    assert_ne!(frozen, shallow);

    let view = frozen.as_observed().unwrap();
    assert!(matches!(view.get("nested"), Value::Target(_)));
}

/// Writes through a view are visible through the raw target and vice versa.
#[test]
fn reads_see_writes() {
    let state = observed(json!({ "count": 0 }));
    state.set("count", 7);
    assert_eq!(state.get("count"), Value::from(7));
    assert_eq!(state.target().get(&"count".into()), Value::from(7));

    state.set("fresh", "new");
    assert!(state.has("fresh"));
    assert!(state.delete("fresh"));
    assert!(!state.has("fresh"));
}

/// Writing a plain value over a property holding a ref writes into the ref.
#[test]
fn ref_slots_are_written_through() {
    let inner = Ref::new(1);
    let state = observed(json!({}));
    state.set("r", inner.clone());

    assert_eq!(state.get("r"), Value::from(1));
    state.set("r", 5);
    assert_eq!(inner.get(), Value::from(5));
    assert!(state.target().get(&"r".into()).is_ref());

    // Array index reads return the ref itself
    let list = observed(json!([]));
    list.push([Value::Ref(inner.clone())]);
    assert!(list.get(0).is_ref());
}

/// A dependent effect fires once per write, and not at all for writes
/// that do not change the value.
#[test]
fn effects_fire_on_change_only() {
    let state = observed(json!({ "n": 1 }));
    let runs = Rc::new(Cell::new(0));
    let (s, counter) = (state.clone(), runs.clone());
    let _e = effect(move || {
        s.get("n");
        counter.set(counter.get() + 1);
    });
    assert_eq!(runs.get(), 1);

    state.set("n", 2);
    assert_eq!(runs.get(), 2);
    state.set("n", 2);
    assert_eq!(runs.get(), 2);

    state.set("n", f64::NAN);
    assert_eq!(runs.get(), 3);
    state.set("n", f64::NAN);
    assert_eq!(runs.get(), 3);
}

/// Scheduled effects coalesce every write of a flush into one run.
#[test]
fn scheduled_effects_fire_once_per_flush() {
    let state = observed(json!({ "a": 0, "b": 0 }));
    let runs = Rc::new(Cell::new(0));
    let (s, counter) = (state.clone(), runs.clone());
    let _w = watch_effect(
        move || {
            s.get("a");
            s.get("b");
            counter.set(counter.get() + 1);
        },
        WatchOptions::default(),
    );

    state.set("a", 1);
    state.set("b", 1);
    state.set("a", 2);
    run_microtasks();
    assert_eq!(runs.get(), 2);
}

/// Branches an effect no longer reads stop triggering it.
#[test]
fn dependencies_follow_the_last_run() {
    let state = observed(json!({ "flag": true, "a": 1, "b": 1 }));
    let runs = Rc::new(Cell::new(0));
    let (s, counter) = (state.clone(), runs.clone());
    let _e = effect(move || {
        if s.get("flag") == Value::Bool(true) {
            s.get("a");
        } else {
            s.get("b");
        }
        counter.set(counter.get() + 1);
    });

    state.set("flag", false);
    assert_eq!(runs.get(), 2);
    state.set("a", 2);
    assert_eq!(runs.get(), 2);
    state.set("b", 2);
    assert_eq!(runs.get(), 3);
}

/// Nested containers are wrapped on access and are reactive themselves.
#[test]
fn nested_state_is_deeply_reactive() {
    let state = observed(json!({ "user": { "name": "ada" } }));
    let seen = Rc::new(RefCell::new(Value::Undefined));
    let (s, sink) = (state.clone(), seen.clone());
    let _e = effect(move || {
        let user = s.get("user").into_observed().unwrap();
        *sink.borrow_mut() = user.get("name");
    });

    let user = state.get("user").into_observed().unwrap();
    user.set("name", "grace");
    assert_eq!(*seen.borrow(), Value::from("grace"));
}

/// `includes` finds an element by its wrapped form.
#[test]
fn includes_accepts_wrapped_elements() {
    let raw_item = Target::from_entries([("id", 1)]);
    let list = observed(json!([]));
    list.push([Value::Target(raw_item.clone())]);

    let wrapped = reactive(raw_item.clone());
    assert!(list.includes(&wrapped));
    assert!(list.includes(&Value::Target(raw_item)));
    assert_eq!(list.index_of(&wrapped), Some(0));
}

/// Adding a key re-runs effects that iterate the object.
#[test]
fn iteration_tracks_shape() {
    let state = observed(json!({ "a": 1 }));
    let keys = Rc::new(Cell::new(0));
    let (s, sink) = (state.clone(), keys.clone());
    let _e = effect(move || sink.set(s.own_keys().len()));

    state.set("b", 2);
    assert_eq!(keys.get(), 2);
    state.delete("a");
    assert_eq!(keys.get(), 1);
}

/// Computeds chain and only recompute when read.
#[test]
fn computeds_chain_lazily() {
    let count = Ref::new(1);
    let evaluations = Rc::new(Cell::new(0));

    let (c, e) = (count.clone(), evaluations.clone());
    let doubled = computed(move || {
        e.set(e.get() + 1);
        c.get().as_number().unwrap_or(0.0) * 2.0
    });
    let d = doubled.clone();
    let quadrupled = computed(move || d.get() * 2.0);

    assert_eq!(quadrupled.get(), 4.0);
    count.set(3);
    count.set(4);
    assert_eq!(evaluations.get(), 1);
    assert_eq!(quadrupled.get(), 16.0);
    assert_eq!(evaluations.get(), 2);
}

/// A job that keeps re-queueing itself is cut off after the recursion limit.
#[test]
fn runaway_effects_hit_the_recursion_ceiling() {
    let warnings = collect_warnings();
    let counter = Ref::new(0);
    let runs = Rc::new(Cell::new(0));

    let (c, r) = (counter.clone(), runs.clone());
    let _w = watch_effect(
        move || {
            r.set(r.get() + 1);
            let n = c.get().as_number().unwrap_or(0.0);
            c.set(n + 1.0);
        },
        WatchOptions::default().flush(Flush::Job).allow_recurse(true),
    );
    assert_eq!(runs.get(), 1);

    run_microtasks();
    // The initial run plus 101 runs inside the flush
    assert_eq!(runs.get(), 102);
    let warnings = warnings.borrow();
    assert_eq!(warnings.len(), 1);
    assert!(matches!(warnings[0], Warning::RecursionLimit { limit: 100, .. }));
}

/// Jobs run in id order, including jobs queued while the flush is running.
#[test]
fn scheduler_orders_jobs_by_id() {
    let log = Rc::new(RefCell::new(Vec::new()));

    let l = log.clone();
    let b = Job::with_id(2, move || l.borrow_mut().push("B"));
    let l = log.clone();
    let c = Job::with_id(3, move || l.borrow_mut().push("C"));
    let l = log.clone();
    let a = Job::with_id(1, move || {
        l.borrow_mut().push("A");
        queue_job(&b);
    });

    queue_job(&c);
    queue_job(&a);
    run_microtasks();
    assert_eq!(*log.borrow(), ["A", "B", "C"]);
}

/// Queued effects run in creation order no matter which order their
/// dependencies changed in. B is created inside A's scope, C on its own.
#[test]
fn queued_effects_run_in_creation_order() {
    let state = observed(json!({ "a": 0, "b": 0, "c": 0 }));
    let log = Rc::new(RefCell::new(Vec::new()));
    let watch = |key: &'static str| {
        let (s, l) = (state.clone(), log.clone());
        watch_effect(
            move || {
                s.get(key);
                l.borrow_mut().push(key);
            },
            WatchOptions::default().flush(Flush::Job),
        )
    };

    let parent = effect_scope(false);
    let (a, b) = parent
        .run(|| {
            let a = watch("a");
            let b = effect_scope(false).run(|| watch("b")).unwrap();
            (a, b)
        })
        .unwrap();
    let c = watch("c");
    log.borrow_mut().clear();

    state.set("c", 1);
    state.set("b", 1);
    state.set("a", 1);
    run_microtasks();
    assert_eq!(*log.borrow(), ["a", "b", "c"]);

    parent.stop();
    assert!(!a.is_active() && !b.is_active() && c.is_active());
}

/// Stopping a scope tears down nested scopes, their effects and cleanups.
#[test]
fn scope_teardown_is_recursive() {
    let cleanups = Rc::new(Cell::new(0));
    let state = observed(json!({ "n": 0 }));
    let runs = Rc::new(Cell::new(0));

    let effect_on = |s: &Observed| {
        let (s, counter) = (s.clone(), runs.clone());
        effect(move || {
            s.get("n");
            counter.set(counter.get() + 1);
        })
    };
    let cleanup = || {
        let c = cleanups.clone();
        on_scope_dispose(move || c.set(c.get() + 1));
    };

    let outer = effect_scope(false);
    outer.run(|| {
        effect_on(&state);
        cleanup();
        effect_scope(false).run(|| {
            effect_on(&state);
            cleanup();
            effect_scope(false).run(|| {
                effect_on(&state);
                cleanup();
            });
        });
    });
    assert_eq!(runs.get(), 3);

    outer.stop();
    outer.stop();
    assert_eq!(cleanups.get(), 3);

    state.set("n", 1);
    assert_eq!(runs.get(), 3);
}

/// Writes through a readonly view are refused with a warning, never a panic.
#[test]
fn readonly_writes_warn_and_do_nothing() {
    let warnings = collect_warnings();
    let state = observed(json!({ "a": 1 }));
    let view = readonly(state.clone()).into_observed().unwrap();

    assert!(is_readonly(&Value::Observed(view.clone())));
    assert!(view.set("a", 2));
    assert!(view.delete("a"));
    assert_eq!(view.get("a"), Value::from(1));

    let warnings = warnings.borrow();
    assert_eq!(warnings.len(), 2);
    assert!(matches!(&warnings[0], Warning::ReadonlyMutation { op: "Set", key } if key == "a"));
    assert!(matches!(&warnings[1], Warning::ReadonlyMutation { op: "Delete", .. }));

    // The readonly view still reflects writes through the reactive one
    state.set("a", 3);
    assert_eq!(view.get("a"), Value::from(3));
}

/// Debugger hooks see tracks and triggers.
#[test]
fn debugger_hooks_observe_the_graph() {
    let state = observed(json!({ "a": 1 }));
    let events = Rc::new(RefCell::new(Vec::new()));
    let (on_track, on_trigger) = (events.clone(), events.clone());

    let s = state.clone();
    let _e = effect_with(
        move || {
            s.get("a");
        },
        EffectOptions::default()
            .on_track(move |e| on_track.borrow_mut().push(e.op))
            .on_trigger(move |e| on_trigger.borrow_mut().push(e.op)),
    );
    state.set("a", 2);

    let events = events.borrow();
    assert_eq!(events[0], DebuggerOp::Track(TrackOp::Get));
    assert!(events.iter().any(|op| matches!(op, DebuggerOp::Trigger(_))));
}

/// `next_tick` resolves once the pending flush has run.
#[tokio::test]
async fn next_tick_waits_for_the_flush() {
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    queue_job(&Job::new(move || flag.set(true)));

    let tick = next_tick();
    run_microtasks();
    tick.await;
    assert!(ran.get());

    // Nothing pending: resolves immediately
    assert!(next_tick().now_or_never().is_some());
}
