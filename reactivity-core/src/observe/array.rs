//! Array methods on observed views.
//!
//! Identity searches track every index and retry with the raw argument, so
//! looking up a wrapped element in a wrapped array finds its raw original.
//! Length-changing mutators pause tracking: they read `length` internally and
//! would otherwise subscribe the running effect to the array they are
//! writing, re-triggering it forever.

use super::proxy::Observed;
use super::target::TargetData;
use super::value::Value;
use crate::reactive::{track, Key, PauseTracking, TrackOp};

#[derive(Clone, Copy)]
enum Search {
    Includes,
    IndexOf,
    LastIndexOf,
}

impl Observed {
    /// The tracked length. Zero for non-arrays.
    pub fn len(&self) -> usize {
        if !self.target().is_array() {
            return 0;
        }
        self.get(Key::Length).as_number().map_or(0, |n| n as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_len(&self, len: usize) -> bool {
        self.set(Key::Length, len)
    }

    /// Read every element through the view.
    pub fn to_vec(&self) -> Vec<Value> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    pub fn includes(&self, needle: &Value) -> bool {
        self.search(needle, Search::Includes).is_some()
    }

    pub fn index_of(&self, needle: &Value) -> Option<usize> {
        self.search(needle, Search::IndexOf)
    }

    pub fn last_index_of(&self, needle: &Value) -> Option<usize> {
        self.search(needle, Search::LastIndexOf)
    }

    fn search(&self, needle: &Value, mode: Search) -> Option<usize> {
        let raw = self.target();
        if !raw.is_array() {
            return None;
        }
        if !self.is_readonly() {
            for i in 0..raw.len() {
                track(raw.id(), TrackOp::Get, Key::Index(i));
            }
        }

        let find = |needle: &Value| {
            raw.with(|data| {
                let TargetData::Array(items) = data else {
                    return None;
                };
                match mode {
                    Search::Includes => items.iter().position(|v| v.same_value_zero(needle)),
                    Search::IndexOf => items.iter().position(|v| v.strict_equals(needle)),
                    Search::LastIndexOf => items.iter().rposition(|v| v.strict_equals(needle)),
                }
            })
        };
        find(needle).or_else(|| match needle {
            Value::Observed(view) => find(&Value::Target(view.to_raw())),
            _ => None,
        })
    }

    /// Append values. Returns the new length.
    pub fn push(&self, values: impl IntoIterator<Item = Value>) -> usize {
        let _pause = PauseTracking::new();
        for value in values {
            let len = self.len();
            self.set(len, value);
        }
        self.len()
    }

    pub fn pop(&self) -> Option<Value> {
        let len = {
            let _pause = PauseTracking::new();
            self.len()
        };
        if len == 0 {
            return None;
        }
        self.splice(len - 1, 1, []).pop()
    }

    pub fn shift(&self) -> Option<Value> {
        self.splice(0, 1, []).into_iter().next()
    }

    /// Prepend values. Returns the new length.
    pub fn unshift(&self, values: impl IntoIterator<Item = Value>) -> usize {
        self.splice(0, 0, values);
        let _pause = PauseTracking::new();
        self.len()
    }

    /// Remove `delete_count` elements at `start`, insert `items` in their
    /// place, and return the removed elements.
    ///
    /// Elements are moved one slot at a time through the view, so every
    /// index whose content changes triggers individually.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = Value>,
    ) -> Vec<Value> {
        let _pause = PauseTracking::new();
        let items: Vec<Value> = items.into_iter().collect();
        let len = self.len();
        let start = start.min(len);
        let delete_count = delete_count.min(len - start);
        let item_count = items.len();

        let removed: Vec<Value> = (start..start + delete_count).map(|k| self.get(k)).collect();

        if item_count < delete_count {
            for k in start..len - delete_count {
                let moved = self.get(k + delete_count);
                self.set(k + item_count, moved);
            }
            for k in (len - delete_count + item_count..len).rev() {
                self.delete(k);
            }
        } else if item_count > delete_count {
            for k in (start..len - delete_count).rev() {
                let moved = self.get(k + delete_count);
                self.set(k + item_count, moved);
            }
        }
        for (offset, item) in items.into_iter().enumerate() {
            self.set(start + offset, item);
        }
        self.set_len(len - delete_count + item_count);
        removed
    }
}
