//! Observation Layer
//!
//! Transparent interception of reads and writes on containers. A raw
//! [`Target`] holds the data; an [`Observed`] view routes every operation
//! through the [`ProxyHandler`] of its [`Flavor`], which tracks reads and
//! triggers writes through the reactive runtime.
//!
//! # Flavors
//!
//! - `reactive`: reads track, writes trigger, nested containers are wrapped
//!   lazily on access.
//! - `readonly`: reads never track; writes are refused with a warning.
//! - `shallow_reactive` / `shallow_readonly`: as above for top-level
//!   properties only. Stored values are returned unwrapped.
//!
//! # Example
//!
//! ```rust
//! use reactivity_core::observe::{reactive, Value};
//! use reactivity_core::reactive::effect;
//! use serde_json::json;
//!
//! let state = reactive(Value::from_json(json!({ "count": 0 })))
//!     .into_observed()
//!     .unwrap();
//!
//! let view = state.clone();
//! let _e = effect(move || {
//!     let _ = view.get("count");
//! });
//!
//! state.set("count", 1);
//! ```

mod array;
mod collection;
mod handlers;
mod proxy;
mod target;
mod value;

pub use handlers::{
    MutableHandlers, ProxyHandler, ReadonlyHandlers, ShallowReactiveHandlers,
    ShallowReadonlyHandlers,
};
pub use proxy::{
    is_proxy, is_reactive, is_readonly, is_shallow, mark_raw, reactive, readonly,
    shallow_reactive, shallow_readonly, to_raw, to_reactive, to_readonly, Flavor, Observed,
};
pub use target::{Target, TargetData};
pub use value::{has_changed, Value};
