//! Reactive Primitives
//!
//! This module implements the dependency-tracking core: effects, refs,
//! computeds and effect scopes, plus the [`track`] / [`trigger`] protocol
//! that the observation layer builds on.
//!
//! # Concepts
//!
//! ## Effects
//!
//! A [`ReactiveEffect`] is a computation that records every reactive slot it
//! reads while running. When one of those slots is written, the effect runs
//! again (or its scheduler is called instead). Each run starts by leaving
//! every dep it joined last time, so conditional branches it stops reading
//! stop notifying it.
//!
//! ## Refs
//!
//! A [`Ref`] is a single reactive slot holding a [`Value`](crate::observe::Value).
//!
//! ## Computeds
//!
//! A [`Computed`] is a derived value that caches its result. It re-evaluates
//! only when read after one of its dependencies changed.
//!
//! ## Scopes
//!
//! An [`EffectScope`] collects effects and cleanups created while it runs so
//! they can be stopped together.
//!
//! # Implementation Notes
//!
//! Tracking uses a thread-local effect stack. A read checks whether an
//! effect is running and tracking is enabled, and if so records the
//! dependency in the per-thread [`Runtime`].

mod context;
mod dep;
mod effect;
mod memo;
mod operations;
mod runtime;
mod scope;
mod signal;
mod subscriber;

pub use context::{
    enable_tracking, pause_tracking, reset_tracking, untracked, PauseTracking, ReactiveContext,
};
pub use dep::{Dep, DepKey};
pub use effect::{
    effect, effect_with, stop, DebuggerEvent, DebuggerHook, DebuggerOp, EffectOptions,
    ReactiveEffect,
};
pub use memo::{computed, Computed};
pub use operations::{
    HashKey, Key, ReactiveFlag, TargetKind, TrackOp, TriggerOp, MAX_ARRAY_LENGTH,
};
pub use runtime::{track, trigger, Runtime};
pub use scope::{effect_scope, get_current_scope, on_scope_dispose, EffectScope};
pub use signal::{create_ref, is_ref, shallow_ref, trigger_ref, unref, Ref};
pub use subscriber::{EffectId, TargetId};

