//! Reactivity Core
//!
//! This crate provides a fine-grained reactive runtime: effects that re-run
//! when the state they read changes, and a scheduler that batches those
//! re-runs into flushes with pre and post phases.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: dependency tracking (`track` / `trigger`), effects, refs,
//!   computeds and effect scopes
//! - `observe`: transparent observation of objects, arrays, maps and sets
//!   through wrapped views
//! - `scheduler`: the job queue, microtask checkpoint and `next_tick`
//! - `config` / `error`: per-thread configuration and the warning and error
//!   reporting hooks
//!
//! Everything is single-threaded: state lives in thread-locals and handles
//! are `Rc`-based.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use reactivity_core::{computed, effect, reactive, Value};
//! use serde_json::json;
//!
//! let state = reactive(Value::from_json(json!({ "count": 1 })))
//!     .into_observed()
//!     .unwrap();
//!
//! let s = state.clone();
//! let doubled = computed(move || s.get("count").as_number().unwrap_or(0.0) * 2.0);
//!
//! let seen = Rc::new(Cell::new(0.0));
//! let sink = seen.clone();
//! let _e = effect(move || sink.set(doubled.get()));
//!
//! state.set("count", 5);
//! assert_eq!(seen.get(), 10.0);
//! ```

pub mod config;
pub mod error;
pub mod observe;
pub mod reactive;
pub mod scheduler;

pub use config::{configure, Config};
pub use error::{ErrorCode, ReactivityError, Warning};
pub use observe::{
    is_proxy, is_reactive, is_readonly, is_shallow, mark_raw, reactive, readonly,
    shallow_reactive, shallow_readonly, to_raw, to_reactive, to_readonly, Observed, Target, Value,
};
pub use reactive::{
    computed, create_ref, effect, effect_scope, effect_with, enable_tracking, get_current_scope,
    is_ref, on_scope_dispose, pause_tracking, reset_tracking, shallow_ref, stop, track, trigger,
    trigger_ref, unref, untracked, Computed, EffectOptions, EffectScope, Key, ReactiveEffect, Ref,
    TargetKind, TrackOp, TriggerOp,
};
pub use scheduler::{
    flush_post_flush_cbs, flush_pre_flush_cbs, invalidate_job, next_tick, next_tick_then,
    queue_job, queue_post_flush_cb, queue_post_flush_cbs, queue_pre_flush_cb, run_microtasks,
    watch_effect, Flush, Job, WatchOptions,
};
