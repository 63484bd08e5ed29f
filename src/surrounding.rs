//! Exposure requirements of socket regions and the compatibility rule between them.
//!
//! A [`SurroundingSpec`] describes how a rectangular region is exposed: which of its
//! sides are open ([`Edges`]) or whether it is a fully enclosed tube along one axis
//! ([`Alignment`]), together with a `level` that orders how permissive it is.
//! [`can_accept`] decides whether a receiving head region admits a tail.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// A set of sides of a rectangular region.
///
/// Serialized as its raw bits; bits outside the four sides are dropped on load.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Edges(u8);

impl Edges {
    pub const NONE: Self = Self(0);
    pub const LEFT: Self = Self(1 << 0);
    pub const RIGHT: Self = Self(1 << 1);
    pub const TOP: Self = Self(1 << 2);
    pub const BOTTOM: Self = Self(1 << 3);
    pub const HORIZONTAL: Self = Self(Self::LEFT.0 | Self::RIGHT.0);
    pub const VERTICAL: Self = Self(Self::TOP.0 | Self::BOTTOM.0);
    pub const ALL: Self = Self(Self::HORIZONTAL.0 | Self::VERTICAL.0);

    /// Sides paired with their authoring letter, in canonical `L R T B` order.
    pub const LETTERS: [(Self, char); 4] = [
        (Self::LEFT, 'L'),
        (Self::RIGHT, 'R'),
        (Self::TOP, 'T'),
        (Self::BOTTOM, 'B'),
    ];

    /// Builds a set from raw bits, dropping anything outside the four sides.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` when every side in `self` is also in `other`.
    pub const fn is_subset_of(self, other: Self) -> bool {
        other.contains(self)
    }

    /// Iterates the individual sides present, in canonical order.
    pub fn iter(self) -> impl Iterator<Item = Self> {
        Self::LETTERS
            .into_iter()
            .map(|(side, _)| side)
            .filter(move |side| self.contains(*side))
    }

    /// The canonical letter form (`"LR"`, `"TB"`, ...). Empty for no sides.
    pub fn letters(self) -> String {
        Self::LETTERS
            .iter()
            .filter(|(side, _)| self.contains(*side))
            .map(|(_, letter)| *letter)
            .collect()
    }
}

impl From<u8> for Edges {
    fn from(bits: u8) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl From<Edges> for u8 {
    fn from(edges: Edges) -> Self {
        edges.bits()
    }
}

impl BitOr for Edges {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Edges {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Edges {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for Edges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Edges(-)")
        } else {
            write!(f, "Edges({})", self.letters())
        }
    }
}

/// Full-enclosure mode of a region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alignment {
    /// Not enclosed; exposure is described by [`Edges`].
    #[default]
    None,
    /// Enclosed tube running left-right.
    Horizontal,
    /// Enclosed tube running top-bottom.
    Vertical,
}

impl Alignment {
    pub const fn is_full(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Level and exposure of a region.
///
/// Edges and alignment are two encodings of the same concept, so a spec carries
/// at most one of them: a full alignment always comes with an empty edge set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SurroundingSpec {
    level: u32,
    edges: Edges,
    alignment: Alignment,
}

impl SurroundingSpec {
    /// A spec exposed through `edges` (possibly none).
    pub const fn with_edges(level: u32, edges: Edges) -> Self {
        Self {
            level,
            edges,
            alignment: Alignment::None,
        }
    }

    /// A fully enclosed spec. `Alignment::None` yields an edge-less spec.
    pub const fn full(level: u32, alignment: Alignment) -> Self {
        Self {
            level,
            edges: Edges::NONE,
            alignment,
        }
    }

    pub const fn level(&self) -> u32 {
        self.level
    }

    pub const fn edges(&self) -> Edges {
        self.edges
    }

    pub const fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Same exposure at a different level.
    pub const fn at_level(self, level: u32) -> Self {
        Self { level, ..self }
    }
}

/// Decides whether a receiving `head` region admits a `tail` part.
///
/// 1. A head below the tail's level never accepts.
/// 2. A full-aligned tail needs a head of the identical alignment.
/// 3. A tail without edge requirements fits any head.
/// 4. Otherwise the tail's edges must be open on the head: a subset of the head's
///    edges, or of the sides a full-aligned head leaves open along its axis.
pub fn can_accept(head: &SurroundingSpec, tail: &SurroundingSpec) -> bool {
    if head.level < tail.level {
        return false;
    }
    if tail.alignment.is_full() {
        return head.alignment == tail.alignment;
    }
    if tail.edges.is_empty() {
        return true;
    }
    let open = match head.alignment {
        Alignment::None => head.edges,
        Alignment::Horizontal => Edges::HORIZONTAL,
        Alignment::Vertical => Edges::VERTICAL,
    };
    tail.edges.is_subset_of(open)
}
