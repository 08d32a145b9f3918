//! Diagnostics and Error Reporting
//!
//! The reactive core distinguishes two kinds of trouble:
//!
//! - **Warnings** are misuse or runaway conditions (mutating a readonly view,
//!   running a stopped scope, exceeding the recursion ceiling). The offending
//!   operation becomes a no-op and execution continues.
//!
//! - **Errors** are failures inside user computations. A panic inside a
//!   scheduler job or flush callback is caught at the invocation boundary and
//!   routed to the configured error handler, so one failing job never leaves
//!   a flush cycle half-finished.
//!
//! Both channels also go through `tracing` under the `reactivity_core` target.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use crate::config;

/// The invocation boundary at which a user computation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    SchedulerJob,
    PreFlushCallback,
    PostFlushCallback,
    NextTick,
    ScopeCleanup,
    WatchCallback,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCode::SchedulerJob => "scheduler flush",
            ErrorCode::PreFlushCallback => "pre-flush callback",
            ErrorCode::PostFlushCallback => "post-flush callback",
            ErrorCode::NextTick => "next_tick callback",
            ErrorCode::ScopeCleanup => "scope cleanup",
            ErrorCode::WatchCallback => "watcher callback",
        };
        f.write_str(label)
    }
}

/// Errors reported through the centralized error hook.
#[derive(Debug, Clone, Error)]
pub enum ReactivityError {
    /// A user computation panicked.
    #[error("unhandled panic during {code}: {message}")]
    Panicked { code: ErrorCode, message: String },
}

impl ReactivityError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ReactivityError::Panicked { code, .. } => *code,
        }
    }
}

/// Non-fatal diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    #[error("cannot run an inactive effect scope")]
    InactiveScope,

    #[error(
        "on_scope_dispose() is called when there is no active effect scope \
         to be associated with"
    )]
    NoActiveScope,

    #[error("{op} operation on key \"{key}\" failed: target is readonly")]
    ReadonlyMutation { op: &'static str, key: String },

    #[error("value cannot be made reactive: {value}")]
    NotObservable { value: String },

    #[error(
        "maximum recursive updates exceeded{} (limit {limit}); a reactive effect \
         is mutating its own dependencies and thus recursively triggering itself",
        .job.as_ref().map(|j| format!(" in {j}")).unwrap_or_default()
    )]
    RecursionLimit { job: Option<String>, limit: usize },
}

/// Report a warning through `tracing` and the configured warn handler.
pub fn warn(warning: Warning) {
    tracing::warn!(target: "reactivity_core", "{warning}");
    if let Some(handler) = config::config(|cfg| cfg.warn_handler.clone()) {
        handler(&warning);
    }
}

/// Report an error through the configured error handler, or log it.
pub fn handle_error(error: ReactivityError) {
    match config::config(|cfg| cfg.error_handler.clone()) {
        Some(handler) => handler(&error),
        None => tracing::error!(target: "reactivity_core", "{error}"),
    }
}

/// Run a user callable, catching a panic and reporting it as an error.
///
/// Returns `None` if the callable panicked.
pub fn call_with_error_handling<R>(code: ErrorCode, f: impl FnOnce() -> R) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            handle_error(ReactivityError::Panicked {
                code,
                message: panic_message(payload.as_ref()),
            });
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn panics_are_caught_and_reported() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        config::configure(|cfg| {
            cfg.error_handler = Some(Rc::new(move |err: &ReactivityError| {
                sink.borrow_mut().push(err.to_string());
            }));
        });

        let result = call_with_error_handling(ErrorCode::SchedulerJob, || -> u32 {
            panic!("boom")
        });

        assert!(result.is_none());
        assert_eq!(
            seen.borrow().as_slice(),
            ["unhandled panic during scheduler flush: boom"]
        );
    }

    #[test]
    fn successful_calls_pass_the_value_through() {
        assert_eq!(call_with_error_handling(ErrorCode::NextTick, || 7), Some(7));
    }

    #[test]
    fn warnings_reach_the_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        config::configure(|cfg| {
            cfg.warn_handler = Some(Rc::new(move |w: &Warning| sink.borrow_mut().push(w.clone())));
        });

        warn(Warning::InactiveScope);

        assert_eq!(seen.borrow().as_slice(), [Warning::InactiveScope]);
    }

    #[test]
    fn recursion_warning_names_the_job() {
        let warning = Warning::RecursionLimit {
            job: Some("job #3".into()),
            limit: 100,
        };
        assert!(warning.to_string().starts_with("maximum recursive updates exceeded in job #3"));
    }
}
