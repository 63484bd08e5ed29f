//! The registry of live socket grids.
//!
//! Placing a part that hosts sockets instantiates one child [`OccupancyGrid`] per
//! socket, anchored where the part declares it and turned with the part. Removing
//! that part tears every descendant grid down first, children before parents, and
//! only then frees the part's own cells.

use crate::config::{CellSizeLookup, TierTable};
use crate::descriptor::GridDescriptor;
use crate::grid::{GridError, GridId, GridTransform, OccupancyGrid, OccupantId, check_head};
use crate::part::{PartDefinition, SocketMount};
use crate::rotation::{Rotation, rotate_point, valid_rotations};
use bevy_math::{URect, UVec2};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// A position where a part fits right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub grid: GridId,
    pub rotation: Rotation,
    pub origin: UVec2,
}

struct GridNode {
    grid: OccupancyGrid,
    /// The placed part that exposes this grid; `None` for root sockets.
    host: Option<OccupantId>,
}

/// All grids parts can currently be placed on, including nested ones.
pub struct GridHierarchy<S = TierTable> {
    sizes: S,
    grids: BTreeMap<GridId, GridNode>,
    located: HashMap<OccupantId, GridId>,
    next_grid: u32,
}

impl Default for GridHierarchy {
    fn default() -> Self {
        Self::new(TierTable::default())
    }
}

impl<S: CellSizeLookup> GridHierarchy<S> {
    /// Creates an empty hierarchy sizing its grids with `sizes`.
    pub fn new(sizes: S) -> Self {
        Self {
            sizes,
            grids: BTreeMap::new(),
            located: HashMap::new(),
            next_grid: 0,
        }
    }

    pub fn sizes(&self) -> &S {
        &self.sizes
    }

    /// Registers a root socket, e.g. when a structural part becomes available.
    pub fn add_grid(
        &mut self,
        head: Arc<GridDescriptor>,
        transform: GridTransform,
    ) -> Result<GridId, GridError> {
        let grid = OccupancyGrid::new(head, transform, &self.sizes)?;
        Ok(self.insert(grid, None))
    }

    pub fn grid(&self, id: GridId) -> Option<&OccupancyGrid> {
        self.grids.get(&id).map(|node| &node.grid)
    }

    /// Live grids in creation order.
    pub fn grids(&self) -> impl Iterator<Item = (GridId, &OccupancyGrid)> {
        self.grids.iter().map(|(id, node)| (*id, &node.grid))
    }

    pub fn grid_ids(&self) -> Vec<GridId> {
        self.grids.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    pub fn contains(&self, id: GridId) -> bool {
        self.grids.contains_key(&id)
    }

    /// The grid a placed part sits on.
    pub fn grid_of(&self, occupant: OccupantId) -> Option<GridId> {
        self.located.get(&occupant).copied()
    }

    /// The placed part exposing `grid`, or `None` for a root socket or unknown grid.
    pub fn parent_of(&self, grid: GridId) -> Option<OccupantId> {
        self.grids.get(&grid).and_then(|node| node.host)
    }

    /// Grids exposed by a placed part. Empty for unknown occupants.
    pub fn hosted_grids(&self, occupant: OccupantId) -> &[GridId] {
        self.grid_of(occupant)
            .and_then(|grid| self.grid(grid))
            .and_then(|grid| grid.placement(occupant))
            .map(|part| part.hosted.as_slice())
            .unwrap_or_default()
    }

    /// Whether `part` fits on `grid` right now. Unknown grids never fit.
    pub fn can_place(
        &self,
        grid: GridId,
        part: &PartDefinition,
        rotation: Rotation,
        x: i32,
        y: i32,
    ) -> bool {
        self.grid(grid)
            .is_some_and(|g| g.can_place(&part.tail, rotation, x, y))
            && self.check_sockets(part).is_ok()
    }

    /// Distinct rotations under which `grid` accepts `part`. Empty for unknown grids.
    pub fn valid_rotations(&self, grid: GridId, part: &PartDefinition) -> BTreeSet<Rotation> {
        self.grid(grid)
            .map(|g| valid_rotations(&part.tail, g.descriptor()))
            .unwrap_or_default()
    }

    /// Every `(grid, rotation, origin)` at which `part` fits, one rotation per
    /// distinct rotated shape.
    pub fn candidates(&self, part: &PartDefinition) -> Vec<Candidate> {
        if self.check_sockets(part).is_err() {
            return Vec::new();
        }
        let mut out = Vec::new();
        for (id, node) in &self.grids {
            if node.grid.tier() != part.tail.tier() {
                continue;
            }
            for rotation in valid_rotations(&part.tail, node.grid.descriptor()) {
                out.extend(
                    node.grid
                        .free_positions(&part.tail, rotation)
                        .into_iter()
                        .map(|origin| Candidate {
                            grid: *id,
                            rotation,
                            origin,
                        }),
                );
            }
        }
        out
    }

    /// Places `part` on `grid`, exposing its sockets as new grids.
    ///
    /// Returns the new occupant id, or `None` with nothing changed if the part does
    /// not fit or one of its sockets cannot be built.
    ///
    /// # Panics
    ///
    /// If `grid` is not a live grid.
    pub fn place(
        &mut self,
        grid: GridId,
        part: &PartDefinition,
        rotation: Rotation,
        x: i32,
        y: i32,
    ) -> Option<OccupantId> {
        let Some(node) = self.grids.get_mut(&grid) else {
            panic!("placement on dangling {grid}");
        };
        let footprint = match node.grid.check_placement(&part.tail, rotation, x, y) {
            Ok(footprint) => footprint,
            Err(refusal) => {
                log::trace!("refused {} on {grid}: {refusal:?}", part.tail.name());
                return None;
            }
        };
        let children = match build_sockets(&node.grid, &self.sizes, part, rotation, footprint) {
            Ok(children) => children,
            Err(err) => {
                log::warn!("cannot expose sockets of {}: {err}", part.tail.name());
                return None;
            }
        };

        let occupant = OccupantId::next();
        if !node.grid.place(&part.tail, rotation, x, y, occupant) {
            return None;
        }
        self.located.insert(occupant, grid);

        let hosted: Vec<GridId> = children
            .into_iter()
            .map(|child| self.insert(child, Some(occupant)))
            .collect();
        if !hosted.is_empty() {
            log::debug!("{occupant} exposes {} socket grid(s)", hosted.len());
            if let Some(node) = self.grids.get_mut(&grid) {
                node.grid.attach_hosted(occupant, hosted);
            }
        }
        Some(occupant)
    }

    /// Removes a placed part and everything nested under it. Unknown occupants are a
    /// no-op.
    pub fn remove(&mut self, occupant: OccupantId) {
        let Some(grid) = self.grid_of(occupant) else {
            return;
        };
        let hosted = self.hosted_grids(occupant).to_vec();
        for child in hosted {
            self.discard(child);
        }
        let Some(node) = self.grids.get_mut(&grid) else {
            panic!("{occupant} is located on dangling {grid}");
        };
        node.grid.remove(occupant);
        self.located.remove(&occupant);
    }

    /// Removes every part on `grid`, recursively, then discards the grid itself.
    ///
    /// # Panics
    ///
    /// If `grid` is not a live grid.
    pub fn dispose_grid(&mut self, grid: GridId) {
        let Some(node) = self.grids.get(&grid) else {
            panic!("disposal of dangling {grid}");
        };
        if let Some(host) = node.host
            && let Some(host_grid) = self.grid_of(host)
            && let Some(parent) = self.grids.get_mut(&host_grid)
        {
            parent.grid.detach_hosted(host, grid);
        }
        self.discard(grid);
    }

    fn insert(&mut self, grid: OccupancyGrid, host: Option<OccupantId>) -> GridId {
        let id = GridId(self.next_grid);
        self.next_grid += 1;
        log::debug!("registered {id} for {:?}", grid.descriptor().name());
        self.grids.insert(id, GridNode { grid, host });
        id
    }

    fn discard(&mut self, grid: GridId) {
        let occupants = match self.grids.get(&grid) {
            Some(node) => node.grid.occupants(),
            None => panic!("teardown of dangling {grid}"),
        };
        for occupant in occupants {
            self.remove(occupant);
        }
        self.grids.remove(&grid);
        log::debug!("discarded {grid}");
    }

    fn check_sockets(&self, part: &PartDefinition) -> Result<(), GridError> {
        part.sockets
            .iter()
            .try_for_each(|mount| check_socket(mount, &self.sizes))
    }
}

fn check_socket<S>(mount: &SocketMount, sizes: &S) -> Result<(), GridError>
where
    S: CellSizeLookup + ?Sized,
{
    let head = &mount.head;
    check_head(head)?;
    sizes
        .cell_size(head.tier())
        .map(|_| ())
        .ok_or(GridError::UnknownTier { tier: head.tier() })
}

/// Builds the grids a part would expose if placed with `footprint` on `host`.
fn build_sockets<S>(
    host: &OccupancyGrid,
    sizes: &S,
    part: &PartDefinition,
    rotation: Rotation,
    footprint: URect,
) -> Result<Vec<OccupancyGrid>, GridError>
where
    S: CellSizeLookup + ?Sized,
{
    let part_orientation = host.rotation_to_world(rotation);
    part.sockets
        .iter()
        .map(|mount| {
            let anchor = rotate_point(mount.anchor, part.tail.size_x(), part.tail.size_y(), rotation);
            let origin = host.cell_to_world(footprint.min.as_vec2() + anchor);
            let transform = GridTransform::new(origin, part_orientation * mount.local_rotation);
            OccupancyGrid::new(Arc::clone(&mount.head), transform, sizes)
        })
        .collect()
}
