//! Dependency sets.
//!
//! A [`Dep`] holds the effects subscribed to one slot. Membership is
//! two-way: every effect also remembers the [`DepKey`]s it joined, so that
//! re-running or stopping it can leave exactly those sets.

use indexmap::IndexSet;

use super::operations::Key;
use super::subscriber::{EffectId, TargetId};

/// Address of a dependency slot: the owning target and the key within it.
pub type DepKey = (TargetId, Key);

/// The subscriber set of one trackable slot.
#[derive(Debug, Default, Clone)]
pub struct Dep {
    subscribers: IndexSet<EffectId>,
}

impl Dep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe an effect. Returns `false` if it was already subscribed.
    pub fn insert(&mut self, effect: EffectId) -> bool {
        self.subscribers.insert(effect)
    }

    pub fn remove(&mut self, effect: EffectId) -> bool {
        self.subscribers.shift_remove(&effect)
    }

    pub fn contains(&self, effect: EffectId) -> bool {
        self.subscribers.contains(&effect)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EffectId> + '_ {
        self.subscribers.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_unique() {
        let mut dep = Dep::new();
        let id = EffectId::new();

        assert!(dep.insert(id));
        assert!(!dep.insert(id));
        assert_eq!(dep.len(), 1);

        assert!(dep.remove(id));
        assert!(dep.is_empty());
        assert!(!dep.remove(id));
    }
}
