//! Scheduler
//!
//! Batches effect re-runs into flushes. Mutations queue [`Job`]s; the first
//! queued job arms a flush as a microtask, and the flush runs when the host
//! reaches a microtask checkpoint ([`run_microtasks`]).
//!
//! # Example
//!
//! ```rust
//! use reactivity_core::reactive::Ref;
//! use reactivity_core::scheduler::{run_microtasks, watch_effect, WatchOptions};
//!
//! let count = Ref::new(0);
//! let c = count.clone();
//! let _watcher = watch_effect(move || { let _ = c.get(); }, WatchOptions::default());
//!
//! count.set(1);
//! count.set(2);
//! // One re-run for both writes
//! run_microtasks();
//! ```

mod job;
mod microtask;
mod queue;
mod watch;

pub use job::Job;
pub use microtask::{has_pending_microtasks, queue_microtask, run_microtasks};
pub use queue::{
    flush_post_flush_cbs, flush_pre_flush_cbs, invalidate_job, is_flush_pending, is_flushing,
    next_tick, next_tick_then, queue_job, queue_post_flush_cb, queue_post_flush_cbs,
    queue_pre_flush_cb, queued_job_count, NextTick,
};
pub use watch::{watch_effect, Flush, WatchHandle, WatchOptions};
