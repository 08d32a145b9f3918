//! Scheduler jobs.
//!
//! A [`Job`] is a shared handle to a deferred callback. Jobs compare by
//! identity; the optional `id` only orders them in the main queue (lower
//! ids first, jobs without an id last).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static JOB_SERIAL: AtomicU64 = AtomicU64::new(0);

struct JobInner {
    /// Identity key for per-flush bookkeeping. Unique per job.
    serial: u64,
    id: Option<u64>,
    active: Cell<bool>,
    allow_recurse: Cell<bool>,
    owner: RefCell<Option<String>>,
    callback: RefCell<Box<dyn FnMut()>>,
}

/// A queueable unit of deferred work.
#[derive(Clone)]
pub struct Job(Rc<JobInner>);

impl Job {
    /// A job without an id. Sorted after every job that has one.
    pub fn new(f: impl FnMut() + 'static) -> Self {
        Self::create(None, f)
    }

    /// A job ordered by `id` in the main queue.
    pub fn with_id(id: u64, f: impl FnMut() + 'static) -> Self {
        Self::create(Some(id), f)
    }

    fn create(id: Option<u64>, f: impl FnMut() + 'static) -> Self {
        Self(Rc::new(JobInner {
            serial: JOB_SERIAL.fetch_add(1, Ordering::Relaxed),
            id,
            active: Cell::new(true),
            allow_recurse: Cell::new(false),
            owner: RefCell::new(None),
            callback: RefCell::new(Box::new(f)),
        }))
    }

    pub fn id(&self) -> Option<u64> {
        self.0.id
    }

    pub(crate) fn serial(&self) -> u64 {
        self.0.serial
    }

    /// Main-queue ordering key.
    pub(crate) fn sort_key(&self) -> (bool, u64) {
        (self.0.id.is_none(), self.0.id.unwrap_or(0))
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    /// Inactive jobs stay queued but are skipped when the queue flushes.
    pub fn set_active(&self, active: bool) {
        self.0.active.set(active);
    }

    pub fn allow_recurse(&self) -> bool {
        self.0.allow_recurse.get()
    }

    /// Let the job queue itself again while it is running.
    pub fn set_allow_recurse(&self, allow: bool) {
        self.0.allow_recurse.set(allow);
    }

    /// Name the job's owner in recursion diagnostics.
    pub fn set_owner(&self, owner: impl Into<String>) {
        *self.0.owner.borrow_mut() = Some(owner.into());
    }

    pub fn owner(&self) -> Option<String> {
        self.0.owner.borrow().clone()
    }

    /// Invoke the callback. A job that is already running is not re-entered.
    pub fn run(&self) {
        if let Ok(mut callback) = self.0.callback.try_borrow_mut() {
            (*callback)();
        }
    }

    pub fn ptr_eq(&self, other: &Job) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.0.id)
            .field("active", &self.is_active())
            .field("allow_recurse", &self.allow_recurse())
            .field("owner", &self.0.owner.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_without_id_sort_last() {
        let a = Job::with_id(5, || {});
        let b = Job::new(|| {});
        let c = Job::with_id(1, || {});
        let mut jobs = vec![a.clone(), b.clone(), c.clone()];
        jobs.sort_by_key(Job::sort_key);
        assert!(jobs[0].ptr_eq(&c));
        assert!(jobs[1].ptr_eq(&a));
        assert!(jobs[2].ptr_eq(&b));
    }

    #[test]
    fn run_is_not_reentrant() {
        let slot: Rc<RefCell<Option<Job>>> = Rc::new(RefCell::new(None));
        let runs = Rc::new(Cell::new(0));
        let (inner, counter) = (slot.clone(), runs.clone());
        let job = Job::new(move || {
            counter.set(counter.get() + 1);
            if let Some(me) = inner.borrow().as_ref() {
                me.run();
            }
        });
        *slot.borrow_mut() = Some(job.clone());

        job.run();
        assert_eq!(runs.get(), 1);
        slot.borrow_mut().take();
    }
}
