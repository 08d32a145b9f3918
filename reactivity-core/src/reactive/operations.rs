//! Tracking vocabulary: operation kinds and dependency slot keys.

use std::fmt;
use std::rc::Rc;

use super::subscriber::TargetId;

/// How a slot was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackOp {
    Get,
    Has,
    Iterate,
}

/// How a slot was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerOp {
    Set,
    Add,
    Delete,
    Clear,
}

/// The shape of a trackable target. Trigger resolution depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Object,
    Array,
    Map,
    Set,
    /// Refs, computeds and other single-slot primitives.
    Cell,
}

/// Introspection keys answered by the observation layer before any tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactiveFlag {
    IsReactive,
    IsReadonly,
    IsShallow,
    Raw,
    Skip,
}

/// Hashable identity of a map key or set member.
///
/// Primitives compare by SameValueZero (every NaN is one key, `-0` is `+0`);
/// containers and refs compare by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Undefined,
    Null,
    Bool(bool),
    Number(u64),
    String(Rc<str>),
    Object(TargetId),
}

impl HashKey {
    pub fn number(n: f64) -> Self {
        let n = if n.is_nan() {
            f64::NAN
        } else if n == 0.0 {
            0.0
        } else {
            n
        };
        HashKey::Number(n.to_bits())
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashKey::Undefined => f.write_str("undefined"),
            HashKey::Null => f.write_str("null"),
            HashKey::Bool(b) => write!(f, "{b}"),
            HashKey::Number(bits) => write!(f, "{}", f64::from_bits(*bits)),
            HashKey::String(s) => f.write_str(s),
            HashKey::Object(id) => write!(f, "{id}"),
        }
    }
}

/// A dependency slot within a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named property.
    Name(Rc<str>),
    /// An array index.
    Index(usize),
    /// An array's length.
    Length,
    /// A map entry or set member.
    Entry(HashKey),
    /// Structural marker for whole-object iteration.
    Iterate,
    /// Structural marker for iterating only the keys of a map.
    MapKeyIterate,
    /// Introspection flag. Never tracked.
    Flag(ReactiveFlag),
}

/// Arrays hold fewer than this many elements; larger indices are plain
/// property names and larger lengths are invalid.
pub const MAX_ARRAY_LENGTH: usize = u32::MAX as usize;

/// Property names that never create dependencies.
const NON_TRACKABLE: [&str; 3] = ["__proto__", "__v_isRef", "__isVue"];

impl Key {
    pub fn name(name: &str) -> Self {
        Key::Name(Rc::from(name))
    }

    /// The slot a ref-like cell tracks its contents under.
    pub fn value() -> Self {
        Key::name("value")
    }

    /// Rewrite the key into the canonical form for a container kind.
    ///
    /// Arrays address elements by index, so `"3"` becomes `Index(3)` and
    /// `"length"` becomes `Length`; objects only have named properties.
    pub fn normalize(self, kind: TargetKind) -> Self {
        match (kind, self) {
            (TargetKind::Array, Key::Name(name)) => {
                if &*name == "length" {
                    Key::Length
                } else if let Some(index) = parse_index(&name) {
                    Key::Index(index)
                } else {
                    Key::Name(name)
                }
            }
            (TargetKind::Object, Key::Index(i)) => Key::Name(Rc::from(i.to_string())),
            (TargetKind::Object, Key::Length) => Key::name("length"),
            (TargetKind::Map | TargetKind::Set, Key::Name(name)) => Key::Entry(HashKey::String(name)),
            (TargetKind::Map | TargetKind::Set, Key::Index(i)) => Key::Entry(HashKey::number(i as f64)),
            (_, key) => key,
        }
    }

    pub fn is_trackable(&self) -> bool {
        match self {
            Key::Flag(_) => false,
            Key::Name(name) => !NON_TRACKABLE.contains(&&**name),
            _ => true,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Key::Index(_))
    }
}

fn parse_index(name: &str) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name.starts_with('0')) {
        return None;
    }
    name.parse().ok().filter(|&i| i < MAX_ARRAY_LENGTH)
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Index(i) => write!(f, "{i}"),
            Key::Length => f.write_str("length"),
            Key::Entry(key) => write!(f, "{key}"),
            Key::Iterate => f.write_str("<iterate>"),
            Key::MapKeyIterate => f.write_str("<map key iterate>"),
            Key::Flag(flag) => write!(f, "<{flag:?}>"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::name(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(Rc::from(name))
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<ReactiveFlag> for Key {
    fn from(flag: ReactiveFlag) -> Self {
        Key::Flag(flag)
    }
}
