//! The global cell store and the region graph grown on top of it.
//!
//! `WorldMap` is the only thing that outlives a single solve: it owns every
//! committed cell, keyed by cube coordinate, and the lifecycle of each
//! region (`Placeholder` until clicked, `Populated` once solved and
//! committed). Solving itself is delegated to [`crate::region::RegionCoordinator`];
//! the map's own job is bookkeeping - creating/pruning placeholders,
//! answering "what's already here" queries, and applying committed writes.

use std::collections::BTreeMap;

use crate::cube::{CubeCoord, RegionGridCoord};
use crate::error::RegionError;
use crate::region::{PopulateOutcome, RegionCoordinator};
use crate::rules::AdjacencyRuleIndex;
use crate::tile::{TileLibrary, TileState};

pub type RegionId = u32;

/// The inclusive cube-distance bound (from the origin) a region's center
/// must fall within to be a valid expansion target.
pub const MAX_WORLD_CUBE_DISTANCE: i32 = 2;

/// A committed cell: its collapsed state and the region that placed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedCell {
    pub state: TileState,
    pub region_id: RegionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    Placeholder,
    Populated,
}

/// A fixed-radius hex disk of cells solved as one unit.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: RegionId,
    pub grid_coord: RegionGridCoord,
    pub center: CubeCoord,
    pub radius: i32,
    pub state: RegionState,
}

impl Region {
    pub fn solve_cells(&self) -> Vec<CubeCoord> {
        self.center.disk(self.radius)
    }
}

/// Owns the global collapsed-cell store and every region ever created.
pub struct WorldMap {
    library: TileLibrary,
    index: AdjacencyRuleIndex,
    region_radius: i32,
    cells: BTreeMap<CubeCoord, PlacedCell>,
    regions: BTreeMap<RegionId, Region>,
    by_grid_coord: BTreeMap<RegionGridCoord, RegionId>,
    next_region_id: RegionId,
    populated_count: usize,
}

impl WorldMap {
    pub fn new(library: TileLibrary, region_radius: i32) -> Self {
        let index = AdjacencyRuleIndex::build(&library);
        Self {
            library,
            index,
            region_radius,
            cells: BTreeMap::new(),
            regions: BTreeMap::new(),
            by_grid_coord: BTreeMap::new(),
            next_region_id: 0,
            populated_count: 0,
        }
    }

    pub fn library(&self) -> &TileLibrary {
        &self.library
    }

    pub fn rule_index(&self) -> &AdjacencyRuleIndex {
        &self.index
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn get_state(&self, coord: CubeCoord) -> Option<TileState> {
        self.cells.get(&coord).map(|c| c.state)
    }

    pub fn get_cell(&self, coord: CubeCoord) -> Option<PlacedCell> {
        self.cells.get(&coord).copied()
    }

    /// Scan each solve cell's six cube neighbors, collecting those already
    /// present in the global map (deduplicated).
    pub fn fixed_neighbors_of(&self, solve_cells: &[CubeCoord]) -> BTreeMap<CubeCoord, TileState> {
        let mut out = BTreeMap::new();
        for &pos in solve_cells {
            for (_, n) in pos.neighbors() {
                if let Some(cell) = self.cells.get(&n) {
                    out.insert(n, cell.state);
                }
            }
        }
        out
    }

    /// Swap a committed cell's state in place, keeping its owning region id.
    /// Used only by the fixed-cell replacement procedure.
    pub fn replace_cell(&mut self, coord: CubeCoord, new_state: TileState) {
        if let Some(cell) = self.cells.get_mut(&coord) {
            cell.state = new_state;
        }
    }

    fn commit(&mut self, region_id: RegionId, states: &BTreeMap<CubeCoord, TileState>) {
        for (&coord, &state) in states {
            self.cells.insert(coord, PlacedCell { state, region_id });
        }
    }

    /// Create a Placeholder region at `(grid_x, grid_z)`. Returns `None` if
    /// the position is outside the world bounds or already has a region.
    pub fn create_region(&mut self, grid_x: i32, grid_z: i32) -> Option<RegionId> {
        let grid_coord = RegionGridCoord::new(grid_x, grid_z);
        if self.by_grid_coord.contains_key(&grid_coord) {
            return None;
        }
        let center = grid_coord.to_cube_center(self.region_radius);
        if center.distance(CubeCoord::ORIGIN) > MAX_WORLD_CUBE_DISTANCE * (2 * self.region_radius + 1) {
            return None;
        }

        let id = self.next_region_id;
        self.next_region_id += 1;
        self.regions.insert(
            id,
            Region { id, grid_coord, center, radius: self.region_radius, state: RegionState::Placeholder },
        );
        self.by_grid_coord.insert(grid_coord, id);
        Some(id)
    }

    /// The entry point driven by a placeholder's `click()` event: solves and
    /// commits the region, or leaves it untouched on failure.
    pub fn populate_region(
        &mut self,
        region_id: RegionId,
        seed: u64,
    ) -> Result<PopulateOutcome, RegionError> {
        let region = self.region(region_id).cloned_for_solve();
        let solve_cells = region.solve_cells();
        let fixed_cells = self.fixed_neighbors_of(&solve_cells);

        // Cloned so the coordinator's borrows don't overlap with the `&mut
        // self` it needs for reading/writing committed neighbors below.
        let library = self.library.clone();
        let index = self.index.clone();
        let coordinator = RegionCoordinator::new(&library, &index);
        let outcome = coordinator.populate(self, region.center, &solve_cells, fixed_cells, seed)?;

        self.commit(region_id, &outcome.result.states);
        if let Some(r) = self.regions.get_mut(&region_id) {
            r.state = RegionState::Populated;
        }
        self.populated_count += 1;
        self.on_region_populated(region_id);

        Ok(outcome)
    }

    /// After a commit, advertise expansion opportunities: create a
    /// Placeholder in every flat-top neighbor direction that is in bounds
    /// and, once more than one region is populated, has at least two
    /// populated neighbors. Prunes stale placeholders that no longer
    /// satisfy either condition.
    pub fn on_region_populated(&mut self, region_id: RegionId) {
        let Some(region) = self.regions.get(&region_id) else { return };
        let grid_coord = region.grid_coord;

        for neighbor_grid in grid_coord.neighbors() {
            if !self.by_grid_coord.contains_key(&neighbor_grid) {
                self.create_region(neighbor_grid.grid_x, neighbor_grid.grid_z);
            }
        }

        let candidates: Vec<RegionId> = self
            .regions
            .values()
            .filter(|r| r.state == RegionState::Placeholder)
            .map(|r| r.id)
            .collect();
        for candidate_id in candidates {
            if !self.placeholder_is_valid(candidate_id) {
                self.prune_placeholder(candidate_id);
            }
        }
    }

    fn placeholder_is_valid(&self, region_id: RegionId) -> bool {
        let Some(region) = self.regions.get(&region_id) else { return false };
        let max_offset = MAX_WORLD_CUBE_DISTANCE * (2 * self.region_radius + 1);
        if region.center.distance(CubeCoord::ORIGIN) > max_offset {
            return false;
        }
        if self.populated_count <= 1 {
            return true;
        }
        let populated_neighbors = region
            .grid_coord
            .neighbors()
            .iter()
            .filter(|g| {
                self.by_grid_coord
                    .get(g)
                    .and_then(|id| self.regions.get(id))
                    .map(|r| r.state == RegionState::Populated)
                    .unwrap_or(false)
            })
            .count();
        populated_neighbors >= 2
    }

    fn prune_placeholder(&mut self, region_id: RegionId) {
        if let Some(region) = self.regions.remove(&region_id) {
            self.by_grid_coord.remove(&region.grid_coord);
        }
    }
}

/// Small helper so `populate_region` can borrow `self` mutably for the
/// solve while still holding a snapshot of the region it is solving.
trait ClonedForSolve {
    fn cloned_for_solve(self) -> Region;
}

impl ClonedForSolve for Option<&Region> {
    fn cloned_for_solve(self) -> Region {
        self.expect("populate_region called with an unknown region id").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{EdgeLabel, TileDef};

    fn grass_world(radius: i32) -> WorldMap {
        let lib = TileLibrary::new(vec![TileDef::flat("GRASS", [EdgeLabel::Grass; 6], 300.0)]);
        WorldMap::new(lib, radius)
    }

    #[test]
    fn create_region_at_origin_then_populate() {
        let mut world = grass_world(2);
        let id = world.create_region(0, 0).unwrap();
        assert_eq!(world.region(id).unwrap().state, RegionState::Placeholder);

        let outcome = world.populate_region(id, 1).unwrap();
        assert_eq!(outcome.result.states.len(), world.region(id).unwrap().solve_cells().len());
        assert_eq!(world.region(id).unwrap().state, RegionState::Populated);
    }

    #[test]
    fn populating_origin_advertises_six_neighbors() {
        let mut world = grass_world(2);
        let id = world.create_region(0, 0).unwrap();
        world.populate_region(id, 1).unwrap();
        let placeholders = world.regions().filter(|r| r.state == RegionState::Placeholder).count();
        assert_eq!(placeholders, 6);
    }

    #[test]
    fn duplicate_create_region_returns_none() {
        let mut world = grass_world(2);
        world.create_region(0, 0).unwrap();
        assert!(world.create_region(0, 0).is_none());
    }

    #[test]
    fn two_region_stitching_keeps_edges_consistent() {
        let mut world = grass_world(3);
        let origin = world.create_region(0, 0).unwrap();
        world.populate_region(origin, 1).unwrap();

        let neighbor_grid = world.region(origin).unwrap().grid_coord.neighbors()[0];
        let neighbor_id = *world
            .regions()
            .find(|r| r.grid_coord == neighbor_grid)
            .map(|r| &r.id)
            .unwrap();
        world.populate_region(neighbor_id, 2).unwrap();

        for (&coord, cell) in &world.cells {
            for (_, n) in coord.neighbors() {
                if let Some(other) = world.cells.get(&n) {
                    let dir = HexDirectionTowards(coord, n);
                    let label_a = world.library.edge_label(cell.state, dir);
                    let label_b = world.library.edge_label(other.state, dir.opposite());
                    assert_eq!(label_a, label_b);
                }
            }
        }
    }

    #[allow(non_snake_case)]
    fn HexDirectionTowards(a: CubeCoord, b: CubeCoord) -> crate::direction::HexDirection {
        a.neighbors().into_iter().find(|(_, n)| *n == b).map(|(d, _)| d).unwrap()
    }
}
