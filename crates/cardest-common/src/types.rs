//! Core type definitions for cardest.
//!
//! Identifier newtypes keep vertex ids and the two label spaces from
//! being mixed up in adjacency code, where everything is ultimately a
//! `u32`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dense vertex identifier in `[0, n)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct VertexId(pub u32);

impl VertexId {
    /// Creates a new vertex id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A vertex label.
///
/// Data graphs only carry concrete labels; query graphs may use
/// [`VLabel::ANY`] as a wildcard that matches every concrete label.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct VLabel(pub u32);

impl VLabel {
    /// Query-side wildcard; never valid in a data graph.
    pub const ANY: Self = Self(u32::MAX);

    /// Creates a new vertex label.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns true if this label is the query wildcard.
    #[must_use]
    pub const fn is_any(self) -> bool {
        self.0 == u32::MAX
    }

    /// Returns true if this label matches `concrete`, treating the
    /// wildcard as matching everything.
    #[must_use]
    pub fn matches(self, concrete: VLabel) -> bool {
        self.is_any() || self == concrete
    }
}

impl fmt::Display for VLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            write!(f, "*")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// An edge label.
///
/// Like [`VLabel`], query graphs may use [`ELabel::ANY`] as a wildcard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ELabel(pub u32);

impl ELabel {
    /// Query-side wildcard; never valid in a data graph.
    pub const ANY: Self = Self(u32::MAX);

    /// Creates a new edge label.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns true if this label is the query wildcard.
    #[must_use]
    pub const fn is_any(self) -> bool {
        self.0 == u32::MAX
    }

    /// Returns true if this label matches `concrete`, treating the
    /// wildcard as matching everything.
    #[must_use]
    pub fn matches(self, concrete: ELabel) -> bool {
        self.is_any() || self == concrete
    }
}

impl fmt::Display for ELabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            write!(f, "*")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_id_index() {
        assert_eq!(VertexId::new(7).index(), 7);
    }

    #[test]
    fn test_wildcard_matches() {
        assert!(VLabel::ANY.matches(VLabel::new(3)));
        assert!(VLabel::new(3).matches(VLabel::new(3)));
        assert!(!VLabel::new(2).matches(VLabel::new(3)));

        assert!(ELabel::ANY.matches(ELabel::new(0)));
        assert!(!ELabel::new(1).matches(ELabel::new(0)));
    }

    #[test]
    fn test_display() {
        assert_eq!(VertexId::new(4).to_string(), "v4");
        assert_eq!(VLabel::ANY.to_string(), "*");
        assert_eq!(ELabel::new(9).to_string(), "9");
    }
}
