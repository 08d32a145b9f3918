//! Microtask checkpoint.
//!
//! The scheduler defers its flush to a microtask: work queued here runs only
//! when the host drains the queue with [`run_microtasks`], typically once
//! per event-loop turn after the synchronous code that mutated state.

use std::cell::RefCell;
use std::collections::VecDeque;

thread_local! {
    static MICROTASKS: RefCell<VecDeque<Box<dyn FnOnce()>>> = RefCell::new(VecDeque::new());
}

/// Queue `f` to run at the next checkpoint.
pub fn queue_microtask(f: impl FnOnce() + 'static) {
    MICROTASKS.with(|queue| queue.borrow_mut().push_back(Box::new(f)));
}

/// Run queued microtasks until none remain, including ones queued while
/// draining. Returns how many ran.
pub fn run_microtasks() -> usize {
    let mut ran = 0;
    loop {
        let task = MICROTASKS.with(|queue| queue.borrow_mut().pop_front());
        let Some(task) = task else {
            break;
        };
        task();
        ran += 1;
    }
    if ran > 0 {
        tracing::trace!(target: "reactivity_core", ran, "microtask checkpoint");
    }
    ran
}

pub fn has_pending_microtasks() -> bool {
    MICROTASKS.with(|queue| !queue.borrow().is_empty())
}
