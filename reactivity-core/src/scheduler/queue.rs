//! Job Queue
//!
//! Three queues are flushed together in one microtask:
//!
//! 1. Pre-flush callbacks, drained until no more are pending.
//! 2. The main job queue, sorted by job id so lower ids (parents, created
//!    first) run before higher ones. Inactive jobs are skipped.
//! 3. Post-flush callbacks, de-duplicated and sorted by id.
//!
//! If any queue gained work during the cycle the cycle restarts, sharing one
//! recursion counter so a job that keeps re-queueing itself is cut off
//! after the configured limit with a warning.
//!
//! Jobs can be queued while a flush is running. A job is not queued twice
//! within the part of the queue that has not run yet; a job that allows
//! recursion may re-queue itself while running.
//!
//! No scheduler borrow is ever held while a job runs.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::FutureExt;
use tokio::sync::oneshot;

use super::job::Job;
use super::microtask::queue_microtask;
use crate::config;
use crate::error::{self, ErrorCode, Warning};

/// Per-cycle run counts, keyed by job serial.
type CountMap = HashMap<u64, usize>;

#[derive(Default)]
struct SchedulerState {
    is_flushing: bool,
    is_flush_pending: bool,

    queue: Vec<Job>,
    flush_index: usize,

    pending_pre: Vec<Job>,
    active_pre: Option<Vec<Job>>,
    pre_index: usize,

    pending_post: Vec<Job>,
    active_post: Option<Vec<Job>>,
    post_index: usize,

    /// The job whose pre-flush callbacks are being drained. It may not be
    /// queued again by them.
    pre_flush_parent: Option<Job>,

    tick_waiters: Vec<oneshot::Sender<()>>,
    tick_callbacks: Vec<Box<dyn FnOnce()>>,
}

thread_local! {
    static SCHEDULER: RefCell<SchedulerState> = RefCell::new(SchedulerState::default());
}

fn with_state<R>(f: impl FnOnce(&mut SchedulerState) -> R) -> R {
    SCHEDULER.with(|state| f(&mut state.borrow_mut()))
}

#[derive(Clone, Copy)]
enum Phase {
    Pre,
    Post,
}

/// Queue a job in the main queue, at its position by id.
pub fn queue_job(job: &Job) {
    let queued = with_state(|s| {
        let start = if s.is_flushing && job.allow_recurse() {
            s.flush_index + 1
        } else {
            s.flush_index
        };
        let already_queued = s.queue.iter().skip(start).any(|j| j.ptr_eq(job));
        let is_parent = s.pre_flush_parent.as_ref().is_some_and(|p| p.ptr_eq(job));
        if already_queued || is_parent {
            return false;
        }
        match job.id() {
            None => s.queue.push(job.clone()),
            Some(id) => {
                let index = find_insertion_index(s, id);
                s.queue.insert(index, job.clone());
            }
        }
        true
    });
    if queued {
        queue_flush();
    }
}

/// Binary search over the not-yet-run part of the queue for the first job
/// whose id is not lower than `id`.
fn find_insertion_index(s: &SchedulerState, id: u64) -> usize {
    let mut start = if s.is_flushing { s.flush_index + 1 } else { 0 };
    start = start.min(s.queue.len());
    let mut end = s.queue.len();
    while start < end {
        let middle = (start + end) / 2;
        if s.queue[middle].sort_key() < (false, id) {
            start = middle + 1;
        } else {
            end = middle;
        }
    }
    start
}

/// Remove a job that has not run yet in this flush.
pub fn invalidate_job(job: &Job) {
    let removed = with_state(|s| {
        let floor = if s.is_flushing { s.flush_index + 1 } else { 0 };
        let position = s.queue.iter().skip(floor).position(|j| j.ptr_eq(job))?;
        Some(s.queue.remove(floor + position))
    });
    drop(removed);
}

fn queue_cb(cb: &Job, phase: Phase) {
    with_state(|s| {
        let (active, pending, index) = match phase {
            Phase::Pre => (&s.active_pre, &mut s.pending_pre, s.pre_index),
            Phase::Post => (&s.active_post, &mut s.pending_post, s.post_index),
        };
        let start = if cb.allow_recurse() { index + 1 } else { index };
        let duplicate = active
            .as_ref()
            .is_some_and(|jobs| jobs.iter().skip(start).any(|j| j.ptr_eq(cb)));
        if !duplicate {
            pending.push(cb.clone());
        }
    });
    queue_flush();
}

/// Queue a callback to run before the main queue.
pub fn queue_pre_flush_cb(cb: &Job) {
    queue_cb(cb, Phase::Pre);
}

/// Queue a callback to run after the main queue.
pub fn queue_post_flush_cb(cb: &Job) {
    queue_cb(cb, Phase::Post);
}

/// Queue several post-flush callbacks at once, without de-duplication.
/// They are de-duplicated when the post queue flushes.
pub fn queue_post_flush_cbs(cbs: &[Job]) {
    with_state(|s| s.pending_post.extend(cbs.iter().cloned()));
    queue_flush();
}

fn queue_flush() {
    let arm = with_state(|s| {
        if s.is_flushing || s.is_flush_pending {
            return false;
        }
        s.is_flush_pending = true;
        true
    });
    if arm {
        queue_microtask(flush_jobs);
    }
}

/// Run pending pre-flush callbacks until none remain. `parent` may not be
/// queued by them meanwhile.
pub fn flush_pre_flush_cbs(parent: Option<&Job>) {
    flush_pre(&mut CountMap::new(), parent);
}

fn flush_pre(seen: &mut CountMap, parent: Option<&Job>) {
    // A nested drain runs its own batch, then hands the outer one back
    let outer = with_state(|s| {
        s.active_pre
            .take()
            .map(|batch| (batch, s.pre_index, s.pre_flush_parent.take()))
    });

    loop {
        let started = with_state(|s| {
            if s.pending_pre.is_empty() {
                return false;
            }
            s.pre_flush_parent = parent.cloned();
            s.active_pre = Some(dedupe(std::mem::take(&mut s.pending_pre)));
            s.pre_index = 0;
            true
        });
        if !started {
            break;
        }

        while let Some(cb) = with_state(|s| s.active_pre.as_ref()?.get(s.pre_index).cloned()) {
            if cb.is_active() && !check_recursive_updates(seen, &cb) {
                error::call_with_error_handling(ErrorCode::PreFlushCallback, || cb.run());
            }
            with_state(|s| s.pre_index += 1);
        }

        let finished = with_state(|s| {
            s.pre_index = 0;
            s.pre_flush_parent.take();
            s.active_pre.take()
        });
        drop(finished);
    }

    if let Some((batch, index, outer_parent)) = outer {
        with_state(|s| {
            s.active_pre = Some(batch);
            s.pre_index = index;
            s.pre_flush_parent = outer_parent;
        });
    }
}

/// Run pending post-flush callbacks in id order. Called while post
/// callbacks are already running, it appends to the running batch instead.
pub fn flush_post_flush_cbs() {
    flush_post(&mut CountMap::new());
}

fn flush_post(seen: &mut CountMap) {
    let started = with_state(|s| {
        if s.pending_post.is_empty() {
            return false;
        }
        let deduped = dedupe(std::mem::take(&mut s.pending_post));
        if let Some(active) = s.active_post.as_mut() {
            active.extend(deduped);
            return false;
        }
        let mut batch = deduped;
        batch.sort_by_key(Job::sort_key);
        s.active_post = Some(batch);
        s.post_index = 0;
        true
    });
    if !started {
        return;
    }

    while let Some(cb) = with_state(|s| s.active_post.as_ref()?.get(s.post_index).cloned()) {
        if cb.is_active() && !check_recursive_updates(seen, &cb) {
            error::call_with_error_handling(ErrorCode::PostFlushCallback, || cb.run());
        }
        with_state(|s| s.post_index += 1);
    }

    let finished = with_state(|s| {
        s.post_index = 0;
        s.active_post.take()
    });
    drop(finished);
}

fn flush_jobs() {
    let mut seen = CountMap::new();
    let mut cycles = 0usize;
    loop {
        cycles += 1;
        with_state(|s| {
            s.is_flush_pending = false;
            s.is_flushing = true;
        });

        flush_pre(&mut seen, None);

        let queued = with_state(|s| {
            // Stable: jobs with equal ids keep their queueing order
            s.queue.sort_by_key(Job::sort_key);
            s.queue.len()
        });
        tracing::debug!(target: "reactivity_core", queued, cycle = cycles, "flushing jobs");

        while let Some(job) = with_state(|s| s.queue.get(s.flush_index).cloned()) {
            if job.is_active() && !check_recursive_updates(&mut seen, &job) {
                error::call_with_error_handling(ErrorCode::SchedulerJob, || job.run());
            }
            with_state(|s| s.flush_index += 1);
        }

        let finished = with_state(|s| {
            s.flush_index = 0;
            std::mem::take(&mut s.queue)
        });
        drop(finished);

        flush_post(&mut seen);

        let again = with_state(|s| {
            s.is_flushing = false;
            !s.queue.is_empty() || !s.pending_pre.is_empty() || !s.pending_post.is_empty()
        });
        if !again {
            break;
        }
    }
    if cycles > 1 {
        tracing::debug!(target: "reactivity_core", cycles, "flush restarted");
    }

    let (waiters, callbacks) = with_state(|s| {
        (
            std::mem::take(&mut s.tick_waiters),
            std::mem::take(&mut s.tick_callbacks),
        )
    });
    for waiter in waiters {
        let _ = waiter.send(());
    }
    for callback in callbacks {
        error::call_with_error_handling(ErrorCode::NextTick, callback);
    }
}

/// Keep the first occurrence of each job.
fn dedupe(jobs: Vec<Job>) -> Vec<Job> {
    let mut seen = HashSet::with_capacity(jobs.len());
    jobs.into_iter().filter(|job| seen.insert(job.serial())).collect()
}

/// Count a run of `job` in this cycle. Returns `true` (and warns) once the
/// job has run more than the configured limit.
fn check_recursive_updates(seen: &mut CountMap, job: &Job) -> bool {
    let limit = config::config(|cfg| cfg.recursion_limit);
    let count = seen.entry(job.serial()).or_insert(0);
    if *count > limit {
        error::warn(Warning::RecursionLimit {
            job: job.owner(),
            limit,
        });
        return true;
    }
    *count += 1;
    false
}

/// Whether a flush is running right now.
pub fn is_flushing() -> bool {
    with_state(|s| s.is_flushing)
}

/// Whether a flush has been queued as a microtask but has not started.
pub fn is_flush_pending() -> bool {
    with_state(|s| s.is_flush_pending)
}

/// Number of jobs in the main queue, including ones already run this flush.
pub fn queued_job_count() -> usize {
    with_state(|s| s.queue.len())
}

/// Resolves once the current or pending flush has completed.
///
/// Resolves immediately when no flush is pending.
pub fn next_tick() -> NextTick {
    with_state(|s| {
        if s.is_flushing || s.is_flush_pending {
            let (tx, rx) = oneshot::channel();
            s.tick_waiters.push(tx);
            NextTick(Some(rx))
        } else {
            NextTick(None)
        }
    })
}

/// Run `f` after the current or pending flush, or at the next microtask
/// checkpoint when none is pending.
pub fn next_tick_then(f: impl FnOnce() + 'static) {
    let immediate = with_state(|s| {
        if s.is_flushing || s.is_flush_pending {
            s.tick_callbacks.push(Box::new(f));
            None
        } else {
            Some(f)
        }
    });
    if let Some(f) = immediate {
        queue_microtask(move || {
            error::call_with_error_handling(ErrorCode::NextTick, f);
        });
    }
}

/// Future returned by [`next_tick`].
#[must_use = "futures do nothing unless awaited"]
pub struct NextTick(Option<oneshot::Receiver<()>>);

impl Future for NextTick {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.get_mut().0.as_mut() {
            None => Poll::Ready(()),
            // A dropped sender also means the flush is over
            Some(rx) => rx.poll_unpin(cx).map(|_| ()),
        }
    }
}

// ---- Tests ----
