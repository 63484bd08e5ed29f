//! Occupancy tracking for a single socket region.
//!
//! An [`OccupancyGrid`] realises one head descriptor as a table of cells. Parts are
//! placed by their rotated footprint; a placement either commits in full or leaves
//! the table untouched.

use crate::config::CellSizeLookup;
use crate::descriptor::GridDescriptor;
use crate::rotation::{Rotation, rotate_descriptor, rotate_size, rotate_surrounding};
use crate::surrounding::can_accept;
use bevy_math::{URect, UVec2};
use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OCCUPANT: AtomicU64 = AtomicU64::new(1);

/// Largest number of cells a single grid may hold.
pub const MAX_GRID_CELLS: u64 = 1 << 20;

/// Identifies one placed part. Ids are process-wide and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OccupantId(pub u64);

impl OccupantId {
    /// Draws the next id from the process-wide counter.
    pub fn next() -> Self {
        Self(NEXT_OCCUPANT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OccupantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies a grid registered in a [`GridHierarchy`](crate::hierarchy::GridHierarchy).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridId(pub u32);

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid {}", self.0)
    }
}

/// World placement of a grid's top-left corner.
///
/// Used only to map cells to world positions, never for compatibility.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridTransform {
    pub origin: Vec3,
    pub orientation: Quat,
}

impl Default for GridTransform {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl GridTransform {
    pub fn new(origin: Vec3, orientation: Quat) -> Self {
        Self {
            origin,
            orientation,
        }
    }
}

/// Why a grid could not be created.
#[derive(Clone, Debug, PartialEq)]
pub enum GridError {
    /// The descriptor is a tail, not a socket.
    NotAHead { name: String },
    /// The descriptor covers no cells.
    EmptyGrid { name: String },
    /// The cell-size table has no entry for the tier.
    UnknownTier { tier: u8 },
    /// The descriptor covers more than [`MAX_GRID_CELLS`] cells.
    TooLarge { name: String, cells: u64 },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAHead { name } => write!(f, "descriptor {name:?} is not a head"),
            Self::EmptyGrid { name } => write!(f, "descriptor {name:?} has no cells"),
            Self::UnknownTier { tier } => write!(f, "no cell size configured for tier {tier}"),
            Self::TooLarge { name, cells } => {
                write!(f, "descriptor {name:?} has {cells} cells, over {MAX_GRID_CELLS}")
            }
        }
    }
}

impl std::error::Error for GridError {}

/// Why a placement was refused. Refusals are expected and never change state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refusal {
    /// Only tail descriptors can be placed.
    NotATail,
    TierMismatch { grid: u8, part: u8 },
    /// The footprint starts before the grid or runs past its far edge.
    OutOfBounds,
    /// A covered cell already belongs to another part.
    Overlap { occupant: OccupantId },
    /// The grid's surrounding does not accept the rotated part.
    Incompatible,
    /// The occupant id is already placed on this grid.
    DuplicateOccupant,
}

/// One cell of the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    pub occupant: Option<OccupantId>,
}

impl Cell {
    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }
}

/// A committed placement.
#[derive(Clone, Debug)]
pub struct PlacedPart {
    pub occupant: OccupantId,
    pub rotation: Rotation,
    /// The descriptor as rotated for this placement.
    pub descriptor: GridDescriptor,
    /// Covered cells; `min` is the top-left origin cell, `max` is exclusive.
    pub footprint: URect,
    /// Grids this part exposes, in the hierarchy that placed it.
    pub hosted: Vec<GridId>,
}

impl PlacedPart {
    pub fn origin(&self) -> UVec2 {
        self.footprint.min
    }
}

/// The cell table of one socket instance.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    descriptor: Arc<GridDescriptor>,
    transform: GridTransform,
    cell_size: f32,
    cells: Vec<Cell>,
    parts: BTreeMap<OccupantId, PlacedPart>,
}

impl OccupancyGrid {
    /// Creates an empty grid realising `descriptor`, sized by `sizes`.
    pub fn new<S>(
        descriptor: Arc<GridDescriptor>,
        transform: GridTransform,
        sizes: &S,
    ) -> Result<Self, GridError>
    where
        S: CellSizeLookup + ?Sized,
    {
        let area = check_head(&descriptor)?;
        let cell_size = sizes
            .cell_size(descriptor.tier())
            .ok_or(GridError::UnknownTier {
                tier: descriptor.tier(),
            })?;
        let cells = vec![Cell::default(); area];
        Ok(Self {
            descriptor,
            transform,
            cell_size,
            cells,
            parts: BTreeMap::new(),
        })
    }

    pub fn descriptor(&self) -> &Arc<GridDescriptor> {
        &self.descriptor
    }

    pub fn tier(&self) -> u8 {
        self.descriptor.tier()
    }

    /// Width and height in cells.
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.descriptor.size_x(), self.descriptor.size_y())
    }

    pub fn transform(&self) -> &GridTransform {
        &self.transform
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// The raw table, row-major from the top-left cell.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn occupant_at(&self, x: u32, y: u32) -> Option<OccupantId> {
        self.cell(x, y).and_then(|c| c.occupant)
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_occupied()).count()
    }

    /// `true` when no part is placed.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn placement(&self, occupant: OccupantId) -> Option<&PlacedPart> {
        self.parts.get(&occupant)
    }

    /// Placed parts in ascending occupant order.
    pub fn placements(&self) -> impl Iterator<Item = &PlacedPart> {
        self.parts.values()
    }

    pub fn occupants(&self) -> Vec<OccupantId> {
        self.parts.keys().copied().collect()
    }

    /// Checks a placement without changing anything.
    pub fn can_place(&self, tail: &GridDescriptor, rotation: Rotation, x: i32, y: i32) -> bool {
        self.check_placement(tail, rotation, x, y).is_ok()
    }

    /// Like [`can_place`](Self::can_place), but reports the first failed check and
    /// otherwise the footprint the part would cover.
    pub fn check_placement(
        &self,
        tail: &GridDescriptor,
        rotation: Rotation,
        x: i32,
        y: i32,
    ) -> Result<URect, Refusal> {
        if !tail.is_tail() {
            return Err(Refusal::NotATail);
        }
        if tail.tier() != self.tier() {
            return Err(Refusal::TierMismatch {
                grid: self.tier(),
                part: tail.tier(),
            });
        }
        let footprint = self
            .footprint(tail, rotation, x, y)
            .ok_or(Refusal::OutOfBounds)?;
        if let Some(occupant) = self.covered(footprint).find_map(|i| self.cells[i].occupant) {
            return Err(Refusal::Overlap { occupant });
        }
        let rotated = rotate_surrounding(tail.surrounding(), rotation);
        if !can_accept(&self.descriptor.surrounding(), &rotated) {
            return Err(Refusal::Incompatible);
        }
        Ok(footprint)
    }

    /// Places `tail` with its rotated top-left corner at `(x, y)`.
    ///
    /// Returns `false` and leaves the grid untouched if the placement is refused.
    pub fn place(
        &mut self,
        tail: &GridDescriptor,
        rotation: Rotation,
        x: i32,
        y: i32,
        occupant: OccupantId,
    ) -> bool {
        let checked = if self.parts.contains_key(&occupant) {
            Err(Refusal::DuplicateOccupant)
        } else {
            self.check_placement(tail, rotation, x, y)
        };
        let footprint = match checked {
            Ok(footprint) => footprint,
            Err(refusal) => {
                log::trace!(
                    "refused {} on {:?} at ({x}, {y}) {rotation:?}: {refusal:?}",
                    tail.name(),
                    self.descriptor.name()
                );
                return false;
            }
        };

        for i in self.covered(footprint) {
            self.cells[i].occupant = Some(occupant);
        }
        self.parts.insert(
            occupant,
            PlacedPart {
                occupant,
                rotation,
                descriptor: rotate_descriptor(tail, rotation),
                footprint,
                hosted: Vec::new(),
            },
        );
        log::debug!(
            "placed {} {occupant} on {:?} at ({x}, {y}) {rotation:?}",
            tail.name(),
            self.descriptor.name()
        );
        true
    }

    /// Frees every cell owned by `occupant`. Unknown occupants are a no-op.
    pub fn remove(&mut self, occupant: OccupantId) -> Option<PlacedPart> {
        let part = self.parts.remove(&occupant)?;
        for i in self.covered(part.footprint) {
            debug_assert_eq!(self.cells[i].occupant, Some(occupant));
            self.cells[i].occupant = None;
        }
        log::debug!("removed {occupant} from {:?}", self.descriptor.name());
        Some(part)
    }

    /// Every origin at which `tail` fits under `rotation`, row by row.
    pub fn free_positions(&self, tail: &GridDescriptor, rotation: Rotation) -> Vec<UVec2> {
        let size = self.size();
        let mut out = Vec::new();
        for y in 0..size.y {
            for x in 0..size.x {
                if self.can_place(tail, rotation, x as i32, y as i32) {
                    out.push(UVec2::new(x, y));
                }
            }
        }
        out
    }

    /// World position of a point in cell coordinates; `(0, 0)` is the grid's
    /// top-left corner and `(0.5, 0.5)` the centre of the first cell.
    pub fn cell_to_world(&self, cell: Vec2) -> Vec3 {
        self.transform.origin + self.transform.orientation * (cell.extend(0.0) * self.cell_size)
    }

    /// World orientation of a part placed here under `rotation`.
    pub fn rotation_to_world(&self, rotation: Rotation) -> Quat {
        self.transform.orientation * Quat::from_rotation_z(rotation.radians())
    }

    pub(crate) fn attach_hosted(&mut self, occupant: OccupantId, hosted: Vec<GridId>) {
        if let Some(part) = self.parts.get_mut(&occupant) {
            part.hosted = hosted;
        }
    }

    pub(crate) fn detach_hosted(&mut self, occupant: OccupantId, grid: GridId) {
        if let Some(part) = self.parts.get_mut(&occupant) {
            part.hosted.retain(|g| *g != grid);
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        let size = self.size();
        (x < size.x && y < size.y).then(|| y as usize * size.x as usize + x as usize)
    }

    /// The rotated footprint at `(x, y)`, if it lies within the grid.
    fn footprint(&self, tail: &GridDescriptor, rotation: Rotation, x: i32, y: i32) -> Option<URect> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        let (width, height) = rotate_size(tail.size_x(), tail.size_y(), rotation);
        let max = UVec2::new(x.checked_add(width)?, y.checked_add(height)?);
        let size = self.size();
        if width == 0 || height == 0 || max.x > size.x || max.y > size.y {
            return None;
        }
        Some(URect {
            min: UVec2::new(x, y),
            max,
        })
    }

    fn covered(&self, footprint: URect) -> impl Iterator<Item = usize> + use<> {
        let stride = self.descriptor.size_x() as usize;
        (footprint.min.y..footprint.max.y).flat_map(move |y| {
            (footprint.min.x..footprint.max.x).map(move |x| y as usize * stride + x as usize)
        })
    }
}

/// Checks that `descriptor` can back a grid and returns its cell count.
pub(crate) fn check_head(descriptor: &GridDescriptor) -> Result<usize, GridError> {
    let name = || descriptor.name().to_string();
    if !descriptor.is_head() {
        return Err(GridError::NotAHead { name: name() });
    }
    let cells = descriptor.area();
    if cells == 0 {
        return Err(GridError::EmptyGrid { name: name() });
    }
    usize::try_from(cells)
        .ok()
        .filter(|_| cells <= MAX_GRID_CELLS)
        .ok_or_else(|| GridError::TooLarge {
            name: name(),
            cells,
        })
}
