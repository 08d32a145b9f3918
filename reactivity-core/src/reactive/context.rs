//! Reactive Context
//!
//! The reactive context tracks which effect is currently running and whether
//! dependency collection is enabled. When a reactive slot is read, the
//! runtime asks the context for the current effect and, if tracking is on,
//! records the dependency.
//!
//! # Implementation
//!
//! We use thread-local stacks. Running an effect pushes it onto the effect
//! stack and pushes "tracking enabled" onto the tracking stack; the returned
//! guard pops both when dropped. Pausing tracking pushes "disabled" so that
//! work done on behalf of a mutation (for example the index reads inside
//! `push`) does not subscribe the surrounding effect.
//!
//! Guards restore the stacks on drop, so the context stays balanced even if
//! the computation panics.

use std::cell::RefCell;

use super::EffectId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<EffectId>> = const { RefCell::new(Vec::new()) };
    static TRACKING: RefCell<TrackingState> = const {
        RefCell::new(TrackingState { should_track: true, saved: Vec::new() })
    };
}

struct TrackingState {
    should_track: bool,
    saved: Vec<bool>,
}

/// Guard that pops the running effect when dropped.
pub struct ReactiveContext {
    effect_id: EffectId,
}

impl ReactiveContext {
    /// Enter the context of a running effect.
    ///
    /// While the guard lives, reads register `effect_id` as a dependent.
    /// Tracking is force-enabled for the duration, even if the caller had
    /// paused it.
    pub fn enter(effect_id: EffectId) -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(effect_id));
        enable_tracking();
        Self { effect_id }
    }

    /// Check if an effect is running.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The innermost running effect, if any.
    pub fn current_effect() -> Option<EffectId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().copied())
    }

    /// Whether `effect_id` is anywhere on the effect stack.
    pub fn is_running(effect_id: EffectId) -> bool {
        CONTEXT_STACK.with(|stack| stack.borrow().contains(&effect_id))
    }

    /// Whether a read right now should record a dependency.
    pub fn should_track() -> bool {
        TRACKING.with(|t| t.borrow().should_track) && Self::is_active()
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        reset_tracking();
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert_eq!(
                popped,
                Some(self.effect_id),
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.effect_id,
                popped
            );
        });
    }
}

/// Suspend dependency collection until the matching [`reset_tracking`].
pub fn pause_tracking() {
    TRACKING.with(|t| {
        let mut t = t.borrow_mut();
        let prev = t.should_track;
        t.saved.push(prev);
        t.should_track = false;
    });
}

/// Force dependency collection on until the matching [`reset_tracking`].
pub fn enable_tracking() {
    TRACKING.with(|t| {
        let mut t = t.borrow_mut();
        let prev = t.should_track;
        t.saved.push(prev);
        t.should_track = true;
    });
}

/// Restore the tracking state saved by the last pause/enable.
pub fn reset_tracking() {
    TRACKING.with(|t| {
        let mut t = t.borrow_mut();
        t.should_track = t.saved.pop().unwrap_or(true);
    });
}

/// Scoped form of [`pause_tracking`]; resets on drop.
pub struct PauseTracking(());

impl PauseTracking {
    pub fn new() -> Self {
        pause_tracking();
        Self(())
    }
}

impl Default for PauseTracking {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PauseTracking {
    fn drop(&mut self) {
        reset_tracking();
    }
}

/// Run `f` without collecting dependencies.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _pause = PauseTracking::new();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_effect() {
        let id = EffectId::new();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_effect().is_none());

        {
            let _ctx = ReactiveContext::enter(id);

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_effect(), Some(id));
            assert!(ReactiveContext::should_track());
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert!(!ReactiveContext::should_track());
    }

    #[test]
    fn nested_contexts() {
        let id1 = EffectId::new();
        let id2 = EffectId::new();

        {
            let _ctx1 = ReactiveContext::enter(id1);
            assert_eq!(ReactiveContext::current_effect(), Some(id1));

            {
                let _ctx2 = ReactiveContext::enter(id2);
                assert_eq!(ReactiveContext::current_effect(), Some(id2));
                assert!(ReactiveContext::is_running(id1));
            }

            // After inner context drops, outer should be current
            assert_eq!(ReactiveContext::current_effect(), Some(id1));
            assert!(!ReactiveContext::is_running(id2));
        }

        assert!(ReactiveContext::current_effect().is_none());
    }

    #[test]
    fn pause_and_reset_nest() {
        let _ctx = ReactiveContext::enter(EffectId::new());

        pause_tracking();
        assert!(!ReactiveContext::should_track());
        {
            let _inner = ReactiveContext::enter(EffectId::new());
            assert!(ReactiveContext::should_track());
        }
        assert!(!ReactiveContext::should_track());
        reset_tracking();

        assert!(ReactiveContext::should_track());
    }

    #[test]
    fn untracked_restores_state() {
        let _ctx = ReactiveContext::enter(EffectId::new());
        let inside = untracked(ReactiveContext::should_track);
        assert!(!inside);
        assert!(ReactiveContext::should_track());
    }
}
