//! Runtime Configuration
//!
//! Configuration is kept per thread, matching the single-threaded execution
//! model of the reactive core. It controls the scheduler's recursion ceiling
//! and where warnings and errors are delivered.
//!
//! ```rust,ignore
//! use reactivity_core::config::Config;
//!
//! Config::default()
//!     .with_recursion_limit(50)
//!     .with_warn_handler(|w| eprintln!("[reactivity] {w}"))
//!     .install();
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{ReactivityError, Warning};

/// Maximum number of times one job may run within a single flush cycle.
pub const DEFAULT_RECURSION_LIMIT: usize = 100;

pub type WarnHandler = Rc<dyn Fn(&Warning)>;
pub type ErrorHandler = Rc<dyn Fn(&ReactivityError)>;

/// Reactive runtime configuration.
#[derive(Clone)]
pub struct Config {
    /// Per-cycle invocation bound for a single job before it is skipped.
    pub recursion_limit: usize,
    /// Receives every warning. Warnings are always logged as well.
    pub warn_handler: Option<WarnHandler>,
    /// Receives every error. When unset, errors are logged.
    pub error_handler: Option<ErrorHandler>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            warn_handler: None,
            error_handler: None,
        }
    }
}

impl Config {
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_warn_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Warning) + 'static,
    {
        self.warn_handler = Some(Rc::new(handler));
        self
    }

    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ReactivityError) + 'static,
    {
        self.error_handler = Some(Rc::new(handler));
        self
    }

    /// Make this the configuration of the current thread.
    pub fn install(self) {
        CONFIG.with(|cfg| *cfg.borrow_mut() = self);
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("recursion_limit", &self.recursion_limit)
            .field("warn_handler", &self.warn_handler.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Read the current thread's configuration.
pub fn config<R>(f: impl FnOnce(&Config) -> R) -> R {
    CONFIG.with(|cfg| f(&cfg.borrow()))
}

/// Modify the current thread's configuration in place.
pub fn configure(f: impl FnOnce(&mut Config)) {
    CONFIG.with(|cfg| f(&mut cfg.borrow_mut()));
}

/// Restore the default configuration.
pub fn reset() {
    Config::default().install();
}
