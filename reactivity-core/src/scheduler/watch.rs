//! Scheduled effects.
//!
//! [`watch_effect`] is the standard consumer of the queues: an effect whose
//! re-runs are deferred to a flush phase instead of happening inline.

use std::cell::OnceCell;
use std::rc::Rc;

use super::job::Job;
use super::queue::{queue_job, queue_post_flush_cb, queue_pre_flush_cb};
use crate::error::{self, ErrorCode};
use crate::reactive::{EffectOptions, ReactiveEffect};

/// When a scheduled effect re-runs after a dependency changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flush {
    /// Before the main queue of the next flush.
    #[default]
    Pre,
    /// In the main queue, ordered by effect creation.
    Job,
    /// After the main queue.
    Post,
    /// Inline, as soon as the dependency changes.
    Sync,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    pub flush: Flush,
    /// Let the effect re-queue itself from inside its own run.
    pub allow_recurse: bool,
}

impl WatchOptions {
    pub fn flush(mut self, flush: Flush) -> Self {
        self.flush = flush;
        self
    }

    pub fn allow_recurse(mut self, allow: bool) -> Self {
        self.allow_recurse = allow;
        self
    }
}

/// Handle to a scheduled effect.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    effect: ReactiveEffect,
    job: Job,
}

impl WatchHandle {
    /// Stop the effect. A queued run is skipped.
    pub fn stop(&self) {
        self.effect.stop();
        self.job.set_active(false);
    }

    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    pub fn effect(&self) -> &ReactiveEffect {
        &self.effect
    }

    pub fn job(&self) -> &Job {
        &self.job
    }
}

/// Run `f` now and re-run it through the scheduler whenever what it read
/// changes.
///
/// With [`Flush::Post`] the first run is deferred to the next post flush
/// too. The effect is recorded in the active scope, so stopping the scope
/// stops it.
pub fn watch_effect(f: impl FnMut() + 'static, options: WatchOptions) -> WatchHandle {
    let slot: Rc<OnceCell<Job>> = Rc::new(OnceCell::new());
    let flush = options.flush;

    let scheduled = slot.clone();
    let effect = ReactiveEffect::new(
        f,
        EffectOptions::default()
            .allow_recurse(options.allow_recurse)
            .scheduler(move || {
                let Some(job) = scheduled.get() else {
                    return;
                };
                match flush {
                    Flush::Pre => queue_pre_flush_cb(job),
                    Flush::Job => queue_job(job),
                    Flush::Post => queue_post_flush_cb(job),
                    Flush::Sync => {
                        error::call_with_error_handling(ErrorCode::WatchCallback, || job.run());
                    }
                }
            }),
    );

    // The job holds the effect weakly; the effect's scheduler owns the job
    let weak = Rc::downgrade(&effect.0);
    let job = Job::with_id(effect.id().raw(), move || {
        if let Some(inner) = weak.upgrade() {
            let effect = ReactiveEffect(inner);
            if effect.is_active() {
                effect.run();
            }
        }
    });
    job.set_allow_recurse(options.allow_recurse);
    job.set_owner(format!("watch {}", effect.id()));
    let _ = slot.set(job.clone());

    match flush {
        Flush::Post => queue_post_flush_cb(&job),
        _ => effect.run(),
    }
    WatchHandle { effect, job }
}
