//! Primitive value kinds carried along wires.
//!
//! Connectors declare which [`ValueKind`]s they accept as a [`KindSet`]. Wiring
//! two connectors together narrows both sets to their intersection, and the
//! values written during a tick are tagged [`Value`]s whose kind must lie in
//! the writer's available set.

use std::fmt;

use glam::Vec3;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// The closed set of primitive kinds a connector may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Boolean signal.
    Bool,
    /// Scalar number.
    Number,
    /// Three-component vector.
    Vector3,
    /// UTF-8 text.
    Text,
}

impl ValueKind {
    /// Every kind in canonical order.
    pub const ALL: [Self; 4] = [Self::Bool, Self::Number, Self::Vector3, Self::Text];

    const fn bit(self) -> u8 {
        match self {
            Self::Bool => 1,
            Self::Number => 1 << 1,
            Self::Vector3 => 1 << 2,
            Self::Text => 1 << 3,
        }
    }

    /// Zero value read by inputs that have not yet received anything.
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Number => Value::Number(OrderedFloat(0.0)),
            Self::Vector3 => Value::Vector3(Vec3::ZERO),
            Self::Text => Value::Text(String::new()),
        }
    }

    /// Lowercase name used in logs and snapshots.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Vector3 => "vector3",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compact set of [`ValueKind`]s.
///
/// Iteration always follows [`ValueKind::ALL`], so two equal sets print and
/// serialise identically regardless of how they were built.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ValueKind>", into = "Vec<ValueKind>")]
pub struct KindSet(u8);

impl KindSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Set containing every kind.
    #[must_use]
    pub const fn all() -> Self {
        Self(0b1111)
    }

    /// Set containing a single kind.
    #[must_use]
    pub const fn only(kind: ValueKind) -> Self {
        Self(kind.bit())
    }

    /// Builds a set from the listed kinds.
    #[must_use]
    pub fn of(kinds: &[ValueKind]) -> Self {
        kinds.iter().copied().collect()
    }

    /// Returns the kinds present in both sets.
    #[must_use]
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Whether `kind` is in the set.
    #[must_use]
    pub const fn contains(self, kind: ValueKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Whether no kind is left.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` when every kind in `self` is also in `other`.
    #[must_use]
    pub const fn is_subset(self, other: Self) -> bool {
        self.0 & !other.0 == 0
    }

    /// Number of kinds in the set.
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// First kind in canonical order, if any.
    #[must_use]
    pub fn first(self) -> Option<ValueKind> {
        self.iter().next()
    }

    /// Iterates the kinds in canonical order.
    pub fn iter(self) -> impl Iterator<Item = ValueKind> {
        ValueKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<ValueKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = ValueKind>>(iter: I) -> Self {
        Self(iter.into_iter().fold(0, |bits, kind| bits | kind.bit()))
    }
}

impl From<Vec<ValueKind>> for KindSet {
    fn from(kinds: Vec<ValueKind>) -> Self {
        kinds.into_iter().collect()
    }
}

impl From<KindSet> for Vec<ValueKind> {
    fn from(set: KindSet) -> Self {
        set.iter().collect()
    }
}

impl From<ValueKind> for KindSet {
    fn from(kind: ValueKind) -> Self {
        Self::only(kind)
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, kind) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(kind.name())?;
        }
        f.write_str("}")
    }
}

/// A tagged value travelling along a wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Boolean payload.
    Bool(bool),
    /// Numeric payload.
    Number(OrderedFloat<f64>),
    /// Vector payload.
    Vector3(Vec3),
    /// Text payload.
    Text(String),
}

impl Value {
    /// The kind tag of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Number(_) => ValueKind::Number,
            Self::Vector3(_) => ValueKind::Vector3,
            Self::Text(_) => ValueKind::Text,
        }
    }

    /// The payload if this is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The payload if this is a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.0),
            _ => None,
        }
    }

    /// The payload if this is a vector.
    #[must_use]
    pub const fn as_vector3(&self) -> Option<Vec3> {
        match self {
            Self::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    /// The payload if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(OrderedFloat(value))
    }
}

impl From<Vec3> for Value {
    fn from(value: Vec3) -> Self {
        Self::Vector3(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}
