//! Quarter-turn rotation of descriptors.
//!
//! Rotations are clockwise as seen in grid space, where `+x` runs toward the right
//! edge and `+y` toward the bottom edge. One clockwise step moves each side
//! `L -> T -> R -> B -> L`; every rotation is that step applied `0..4` times, so
//! rotations compose exactly.

use crate::descriptor::GridDescriptor;
use crate::surrounding::{Alignment, Edges, SurroundingSpec, can_accept};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::f32::consts::FRAC_PI_2;

/// A clockwise quarter-turn rotation.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// All rotations in ascending order.
    pub const ALL: [Self; 4] = [Self::R0, Self::R90, Self::R180, Self::R270];

    /// Number of clockwise quarter turns.
    pub const fn steps(self) -> u8 {
        self as u8
    }

    /// Rotation by `steps` quarter turns, modulo a full turn.
    pub const fn from_steps(steps: u8) -> Self {
        Self::ALL[(steps % 4) as usize]
    }

    pub const fn degrees(self) -> u32 {
        self.steps() as u32 * 90
    }

    /// Accepts any multiple of 90, including negative (counter-clockwise) angles.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        (degrees % 90 == 0).then(|| Self::from_steps(degrees.div_euclid(90).rem_euclid(4) as u8))
    }

    /// Angle about the grid normal, positive from `+x` toward `+y`.
    pub fn radians(self) -> f32 {
        f32::from(self.steps()) * FRAC_PI_2
    }

    /// `self` followed by `other`.
    pub const fn then(self, other: Self) -> Self {
        Self::from_steps(self.steps() + other.steps())
    }

    pub const fn inverse(self) -> Self {
        Self::from_steps(4 - self.steps())
    }

    /// `true` for 90° and 270°, which exchange width and height.
    pub const fn swaps_axes(self) -> bool {
        self.steps() % 2 == 1
    }
}

/// One clockwise step, as a permutation of sides.
const CLOCKWISE_STEP: [(Edges, Edges); 4] = [
    (Edges::LEFT, Edges::TOP),
    (Edges::TOP, Edges::RIGHT),
    (Edges::RIGHT, Edges::BOTTOM),
    (Edges::BOTTOM, Edges::LEFT),
];

fn step_edges(edges: Edges) -> Edges {
    CLOCKWISE_STEP
        .iter()
        .filter(|(from, _)| edges.contains(*from))
        .fold(Edges::NONE, |acc, (_, to)| acc | *to)
}

pub fn rotate_edges(edges: Edges, rotation: Rotation) -> Edges {
    (0..rotation.steps()).fold(edges, |acc, _| step_edges(acc))
}

pub fn rotate_alignment(alignment: Alignment, rotation: Rotation) -> Alignment {
    match alignment {
        Alignment::Horizontal if rotation.swaps_axes() => Alignment::Vertical,
        Alignment::Vertical if rotation.swaps_axes() => Alignment::Horizontal,
        other => other,
    }
}

pub fn rotate_size(size_x: u32, size_y: u32, rotation: Rotation) -> (u32, u32) {
    if rotation.swaps_axes() {
        (size_y, size_x)
    } else {
        (size_x, size_y)
    }
}

pub fn rotate_surrounding(spec: SurroundingSpec, rotation: Rotation) -> SurroundingSpec {
    match spec.alignment() {
        Alignment::None => {
            SurroundingSpec::with_edges(spec.level(), rotate_edges(spec.edges(), rotation))
        }
        alignment => SurroundingSpec::full(spec.level(), rotate_alignment(alignment, rotation)),
    }
}

/// A rotated copy of `descriptor`. Role, tier, level and name are kept.
pub fn rotate_descriptor(descriptor: &GridDescriptor, rotation: Rotation) -> GridDescriptor {
    let (size_x, size_y) = rotate_size(descriptor.size_x(), descriptor.size_y(), rotation);
    descriptor.reshaped(
        size_x,
        size_y,
        rotate_surrounding(descriptor.surrounding(), rotation),
    )
}

/// Maps a point given in the unrotated `size_x` by `size_y` box of a part to the
/// same physical point in the rotated box.
pub fn rotate_point(point: Vec2, size_x: u32, size_y: u32, rotation: Rotation) -> Vec2 {
    let mut p = point;
    let mut height = size_y as f32;
    let mut width = size_x as f32;
    for _ in 0..rotation.steps() {
        p = Vec2::new(height - p.y, p.x);
        std::mem::swap(&mut width, &mut height);
    }
    p
}

/// The rotations under which `head` accepts `tail`, one per distinct rotated shape.
///
/// Rotations whose rotated `(size_x, size_y, edges, alignment)` coincide are
/// equivalent; only the lowest of each class is kept. Geometric fit is not
/// checked here.
pub fn valid_rotations(tail: &GridDescriptor, head: &GridDescriptor) -> BTreeSet<Rotation> {
    let mut seen = HashSet::new();
    let mut valid = BTreeSet::new();
    for rotation in Rotation::ALL {
        let (size_x, size_y) = rotate_size(tail.size_x(), tail.size_y(), rotation);
        let surrounding = rotate_surrounding(tail.surrounding(), rotation);
        let shape = (
            size_x,
            size_y,
            surrounding.edges(),
            surrounding.alignment(),
        );
        if !seen.insert(shape) {
            continue;
        }
        if can_accept(&head.surrounding(), &surrounding) {
            valid.insert(rotation);
        }
    }
    valid
}
