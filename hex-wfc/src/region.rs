//! Per-region lifecycle: derive fixed neighbors from the global map, run
//! pre-validation, drive the Phase 0/1/2 solve retry loop, and commit.
//!
//! [`RegionCoordinator`] never owns the global cell store - it borrows a
//! [`crate::world::WorldMap`] mutably only to read already-committed
//! neighbors and to apply fixed-cell replacements in place, exactly as they
//! happen: a replacement is visible in the world even if the region it was
//! made for ultimately fails to solve.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::cube::CubeCoord;
use crate::direction::{DirectionTable, HexDirection};
use crate::error::RegionError;
use crate::gen::collapse::{SolveOptions, SolveResult, Solver};
use crate::rules::AdjacencyRuleIndex;
use crate::tile::{EdgeLabel, TileLibrary, TileState};
use crate::world::WorldMap;

/// Bounded number of pre-validation rounds before giving up on reaching a
/// conflict-free fixed set and just letting the solver try anyway.
const MAX_VALIDATION_ROUNDS: u32 = 50;

/// A successfully solved and committed region: the collapsed cells plus a
/// record of which fixed neighbors were disturbed to get there.
#[derive(Debug, Clone)]
pub struct PopulateOutcome {
    pub result: SolveResult,
    pub replaced: BTreeSet<CubeCoord>,
    pub dropped: BTreeSet<CubeCoord>,
}

/// Drives exactly one region through setup, pre-validation, the Phase 0/1/2
/// retry loop, and (on success) produces the result for the caller to
/// commit. Holds no state of its own between calls.
pub struct RegionCoordinator<'a> {
    library: &'a TileLibrary,
    index: &'a AdjacencyRuleIndex,
    max_restarts: u32,
}

impl<'a> RegionCoordinator<'a> {
    pub fn new(library: &'a TileLibrary, index: &'a AdjacencyRuleIndex) -> Self {
        Self { library, index, max_restarts: 10 }
    }

    pub fn populate(
        &self,
        world: &mut WorldMap,
        region_center: CubeCoord,
        solve_cells: &[CubeCoord],
        fixed_cells: BTreeMap<CubeCoord, TileState>,
        seed: u64,
    ) -> Result<PopulateOutcome, RegionError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5EED_5EED_u64);
        let mut active_fixed = fixed_cells;
        let mut replaced = BTreeSet::new();
        let mut dropped = BTreeSet::new();

        let initial_collapses = if active_fixed.is_empty() {
            self.seed_initial_collapses(region_center, solve_cells, &mut rng)
        } else {
            BTreeMap::new()
        };

        self.validate_pairwise(world, &mut active_fixed, &mut replaced, &mut dropped, &mut rng);
        self.validate_multi_fixed(world, solve_cells, &mut active_fixed, &mut replaced, &mut dropped, &mut rng);

        let mut result = self.solve_once(solve_cells, &active_fixed, &initial_collapses, seed);

        if let Err(err) = result {
            let failed_cell = err.record().failed_cell;
            let adjacent: Vec<CubeCoord> = failed_cell
                .neighbors()
                .into_iter()
                .map(|(_, n)| n)
                .filter(|n| active_fixed.contains_key(n))
                .collect();

            result = self.retry_with_replacements(
                world,
                solve_cells,
                &mut active_fixed,
                &initial_collapses,
                &adjacent,
                &mut replaced,
                &mut dropped,
                &mut rng,
                seed,
            );

            if result.is_err() {
                let mut remaining: Vec<CubeCoord> = active_fixed.keys().copied().collect();
                remaining.shuffle(&mut rng);
                result = self.retry_with_replacements(
                    world,
                    solve_cells,
                    &mut active_fixed,
                    &initial_collapses,
                    &remaining,
                    &mut replaced,
                    &mut dropped,
                    &mut rng,
                    seed,
                );
            }

            if result.is_err() {
                let mut remaining: Vec<CubeCoord> = active_fixed.keys().copied().collect();
                remaining.shuffle(&mut rng);
                for coord in remaining {
                    active_fixed.remove(&coord);
                    dropped.insert(coord);
                    result = self.solve_once(solve_cells, &active_fixed, &initial_collapses, seed);
                    if result.is_ok() {
                        break;
                    }
                }
            }
        }

        match result {
            Ok(result) => Ok(PopulateOutcome { result, replaced, dropped }),
            Err(err) => Err(RegionError::new(err, replaced.len() as u32, dropped.len() as u32)),
        }
    }

    fn solve_once(
        &self,
        solve_cells: &[CubeCoord],
        fixed_cells: &BTreeMap<CubeCoord, TileState>,
        initial_collapses: &BTreeMap<CubeCoord, TileState>,
        seed: u64,
    ) -> Result<SolveResult, crate::error::CollapseError> {
        let mut solver = Solver::new(self.library, self.index);
        let options = SolveOptions {
            seed,
            max_restarts: self.max_restarts,
            initial_collapses: initial_collapses.clone(),
            ..Default::default()
        };
        solver.solve(solve_cells, fixed_cells, &options)
    }

    /// Phase 1's shared shape: try replacing each candidate in turn,
    /// re-validating and re-solving after every successful replacement,
    /// stopping at the first solve that succeeds.
    #[allow(clippy::too_many_arguments)]
    fn retry_with_replacements(
        &self,
        world: &mut WorldMap,
        solve_cells: &[CubeCoord],
        active_fixed: &mut BTreeMap<CubeCoord, TileState>,
        initial_collapses: &BTreeMap<CubeCoord, TileState>,
        candidates: &[CubeCoord],
        replaced: &mut BTreeSet<CubeCoord>,
        dropped: &mut BTreeSet<CubeCoord>,
        rng: &mut ChaCha8Rng,
        seed: u64,
    ) -> Result<SolveResult, crate::error::CollapseError> {
        let mut result = self.solve_once(solve_cells, active_fixed, initial_collapses, seed);
        for &coord in candidates {
            if result.is_ok() {
                break;
            }
            if let Some(new_state) = self.try_replace(world, coord, active_fixed, rng) {
                active_fixed.insert(coord, new_state);
                replaced.insert(coord);
                self.validate_multi_fixed(world, solve_cells, active_fixed, replaced, dropped, rng);
                result = self.solve_once(solve_cells, active_fixed, initial_collapses, seed);
            }
        }
        result
    }

    /// Step 1's special-case seeding when the region borders nothing yet:
    /// a flat grass center, and (with probability 0.5) one randomly chosen
    /// edge-angle sector flooded with water.
    fn seed_initial_collapses(
        &self,
        region_center: CubeCoord,
        solve_cells: &[CubeCoord],
        rng: &mut ChaCha8Rng,
    ) -> BTreeMap<CubeCoord, TileState> {
        let mut out = BTreeMap::new();
        if let Some(grass_type) = self.library.find_by_name("GRASS") {
            out.insert(region_center, TileState::new(grass_type, 0, 0));
        }
        if rng.gen_bool(0.5) {
            if let Some(water_type) = self.library.find_by_name("WATER") {
                let dir = *HexDirection::all().get(rng.gen_range(0..HexDirection::N)).expect("0..N in range");
                for coord in sector_cells(region_center, solve_cells, dir) {
                    out.insert(coord, TileState::new(water_type, 0, 0));
                }
            }
        }
        out
    }

    /// Step 2: walk `fixed_cells` in sorted order, replacing (or dropping)
    /// any cell whose edges conflict with a neighbor already placed earlier
    /// in the walk.
    fn validate_pairwise(
        &self,
        world: &mut WorldMap,
        fixed_cells: &mut BTreeMap<CubeCoord, TileState>,
        replaced: &mut BTreeSet<CubeCoord>,
        dropped: &mut BTreeSet<CubeCoord>,
        rng: &mut ChaCha8Rng,
    ) {
        let ordered: Vec<CubeCoord> = fixed_cells.keys().copied().collect();
        let mut placed: BTreeMap<CubeCoord, TileState> = BTreeMap::new();

        for coord in ordered {
            let Some(&state) = fixed_cells.get(&coord) else { continue };
            let conflict = coord.neighbors().into_iter().any(|(dir, n)| {
                placed.get(&n).map(|&other| !self.edges_compatible(state, dir, other)).unwrap_or(false)
            });

            if conflict {
                if let Some(new_state) = self.try_replace(world, coord, fixed_cells, rng) {
                    fixed_cells.insert(coord, new_state);
                    placed.insert(coord, new_state);
                    replaced.insert(coord);
                } else {
                    fixed_cells.remove(&coord);
                    dropped.insert(coord);
                }
            } else {
                placed.insert(coord, state);
            }
        }
    }

    /// Step 3: every solve cell touching two or more fixed cells must have
    /// at least one legal state compatible with all of them at once.
    fn validate_multi_fixed(
        &self,
        world: &mut WorldMap,
        solve_cells: &[CubeCoord],
        fixed_cells: &mut BTreeMap<CubeCoord, TileState>,
        replaced: &mut BTreeSet<CubeCoord>,
        dropped: &mut BTreeSet<CubeCoord>,
        rng: &mut ChaCha8Rng,
    ) {
        for _round in 0..MAX_VALIDATION_ROUNDS {
            let mut any_conflict = false;

            for &cell in solve_cells {
                let demands: Vec<(CubeCoord, HexDirection, EdgeLabel, u8)> = cell
                    .neighbors()
                    .into_iter()
                    .filter_map(|(dir, n)| {
                        fixed_cells.get(&n).map(|&state| {
                            let return_dir = dir.opposite();
                            // `state` is `n`; it exposes toward `cell` on
                            // `return_dir`. `cell` itself exposes toward `n`
                            // on `dir`, so the legal-state lookup below must
                            // use `dir`, not `return_dir`.
                            (n, dir, self.library.edge_label(state, return_dir), self.library.edge_level(state, return_dir))
                        })
                    })
                    .collect();
                if demands.len() < 2 {
                    continue;
                }

                let mut intersection: Option<BTreeSet<TileState>> = None;
                for &(_, dir, label, level) in &demands {
                    let set = if label.is_level_agnostic() {
                        self.index.candidates_for_any_level(label, dir)
                    } else {
                        self.index.candidates_for(label, dir, level)
                    };
                    intersection = Some(match intersection {
                        None => set,
                        Some(prev) => prev.intersection(&set).copied().collect(),
                    });
                }

                if intersection.map(|s| s.is_empty()).unwrap_or(false) {
                    any_conflict = true;
                    let offender = demands[0].0;
                    if let Some(new_state) = self.try_replace(world, offender, fixed_cells, rng) {
                        fixed_cells.insert(offender, new_state);
                        replaced.insert(offender);
                    } else {
                        fixed_cells.remove(&offender);
                        dropped.insert(offender);
                    }
                }
            }

            if !any_conflict {
                break;
            }
        }
    }

    fn edges_compatible(&self, state: TileState, dir: HexDirection, other: TileState) -> bool {
        let return_dir = dir.opposite();
        let label = self.library.edge_label(state, dir);
        let other_label = self.library.edge_label(other, return_dir);
        if label != other_label {
            return false;
        }
        label.is_level_agnostic() || self.library.edge_level(state, dir) == self.library.edge_level(other, return_dir)
    }

    /// The fixed-cell replacement procedure: locked edges from whatever is
    /// already committed around `coord`, candidates of a different tile
    /// type at the same level satisfying every locked edge, shuffled with
    /// `rng` and the first taken. Commits immediately on success.
    fn try_replace(
        &self,
        world: &mut WorldMap,
        coord: CubeCoord,
        region_set: &BTreeMap<CubeCoord, TileState>,
        rng: &mut ChaCha8Rng,
    ) -> Option<TileState> {
        let original = world.get_state(coord).or_else(|| region_set.get(&coord).copied())?;
        let locked = self.locked_edges(world, coord, region_set);
        let mut candidates = self.replacement_candidates(original, &locked);
        candidates.shuffle(rng);
        let chosen = candidates.into_iter().next();
        if let Some(state) = chosen {
            world.replace_cell(coord, state);
        }
        chosen
    }

    fn locked_edges(
        &self,
        world: &WorldMap,
        coord: CubeCoord,
        region_set: &BTreeMap<CubeCoord, TileState>,
    ) -> DirectionTable<Option<(EdgeLabel, u8)>> {
        let mut locked = DirectionTable::new([None, None, None, None, None, None]);
        for (dir, n) in coord.neighbors() {
            let neighbor_state = world.get_state(n).or_else(|| region_set.get(&n).copied());
            if let Some(state) = neighbor_state {
                let return_dir = dir.opposite();
                let label = self.library.edge_label(state, return_dir);
                let level = self.library.edge_level(state, return_dir);
                locked[dir] = Some((label, level));
            }
        }
        locked
    }

    fn replacement_candidates(
        &self,
        original: TileState,
        locked: &DirectionTable<Option<(EdgeLabel, u8)>>,
    ) -> Vec<TileState> {
        let mut out = Vec::new();
        for (tile_type, def) in self.library.iter() {
            if tile_type == original.tile_type {
                continue;
            }
            if def.max_base_level(self.library.levels_count()) < original.level {
                continue;
            }
            for rotation in 0..6u8 {
                let candidate = TileState::new(tile_type, rotation, original.level);
                let compatible = HexDirection::all().iter().all(|&dir| match locked[dir] {
                    None => true,
                    Some((label, level)) => {
                        let cand_label = self.library.edge_label(candidate, dir);
                        cand_label == label && (label.is_level_agnostic() || self.library.edge_level(candidate, dir) == level)
                    }
                });
                if compatible {
                    out.push(candidate);
                }
            }
        }
        out
    }
}

/// Assigns each non-center cell to the direction whose cube-step vector has
/// the largest dot product with the cell's offset from center - a cheap,
/// deterministic stand-in for a 60-degree angular wedge.
fn sector_cells(center: CubeCoord, solve_cells: &[CubeCoord], dir: HexDirection) -> Vec<CubeCoord> {
    solve_cells
        .iter()
        .copied()
        .filter(|&p| {
            if p == center {
                return false;
            }
            let diff = (p.q - center.q, p.r - center.r, p.s - center.s);
            let mut best_dir = HexDirection::NE;
            let mut best_dot = i32::MIN;
            for d in HexDirection::all() {
                let (sq, sr, ss) = d.cube_step();
                let dot = diff.0 * sq + diff.1 * sr + diff.2 * ss;
                if dot > best_dot {
                    best_dot = dot;
                    best_dir = *d;
                }
            }
            best_dir == dir
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::AdjacencyRuleIndex;
    use crate::tile::TileDef;

    fn grass_water_world(radius: i32) -> WorldMap {
        let lib = TileLibrary::new(vec![
            TileDef::flat("GRASS", [EdgeLabel::Grass; 6], 300.0),
            TileDef::flat("WATER", [EdgeLabel::Ocean; 6], 50.0),
        ]);
        WorldMap::new(lib, radius)
    }

    #[test]
    fn pairwise_conflict_is_replaced_or_dropped() {
        // Two OCEAN-labeled tile types at different levels: any two adjacent
        // instances conflict unless one gets replaced.
        let lib = TileLibrary::new(vec![
            TileDef::flat("GRASS", [EdgeLabel::Grass; 6], 300.0),
            TileDef::flat("WATER_A", [EdgeLabel::Ocean; 6], 50.0),
            TileDef::flat("WATER_B", [EdgeLabel::Ocean; 6], 50.0),
        ]);
        let mut world = WorldMap::new(lib, 2);
        let library = world.library().clone();
        let index = world.rule_index().clone();
        let coordinator = RegionCoordinator::new(&library, &index);

        let center = CubeCoord::ORIGIN;
        let (_, neighbor) = center.neighbors()[0];
        let mut fixed = BTreeMap::new();
        fixed.insert(center, TileState::new(1, 0, 0)); // WATER_A
        fixed.insert(neighbor, TileState::new(2, 0, 3)); // WATER_B at a different level

        let mut replaced = BTreeSet::new();
        let mut dropped = BTreeSet::new();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        coordinator.validate_pairwise(&mut world, &mut fixed, &mut replaced, &mut dropped, &mut rng);

        assert!(!replaced.is_empty() || !dropped.is_empty());
    }

    #[test]
    fn water_sector_seed_is_all_water_and_ocean_only() {
        // The p=0.5 coin doesn't land true for every seed, so scan a small
        // range and check the invariant on whichever ones do: the chosen
        // sector is non-empty and entirely WATER, and at least one seed in
        // the range exercises the path at all.
        let lib = TileLibrary::new(vec![
            TileDef::flat("GRASS", [EdgeLabel::Grass; 6], 300.0),
            TileDef::flat("WATER", [EdgeLabel::Ocean; 6], 50.0),
        ]);
        let region_center = CubeCoord::ORIGIN;
        let solve_cells = region_center.disk(4);
        let water_type = lib.find_by_name("WATER").unwrap();

        let mut saw_water_sector = false;
        for seed in 0..32u64 {
            let index = AdjacencyRuleIndex::build(&lib);
            let coordinator = RegionCoordinator::new(&lib, &index);
            let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5EED_5EED_u64);
            let collapses = coordinator.seed_initial_collapses(region_center, &solve_cells, &mut rng);

            let water_cells: Vec<CubeCoord> =
                collapses.iter().filter(|(_, s)| s.tile_type == water_type).map(|(&c, _)| c).collect();
            if water_cells.is_empty() {
                continue;
            }
            saw_water_sector = true;
            for &coord in &water_cells {
                assert_eq!(collapses[&coord].tile_type, water_type);
                for (_, n) in coord.neighbors() {
                    if let Some(state) = collapses.get(&n) {
                        assert!(
                            state.tile_type == water_type || state.tile_type == 0,
                            "only GRASS/WATER ever meet at a water-sector boundary"
                        );
                    }
                }
            }
        }
        assert!(saw_water_sector, "expected at least one seed in the scanned range to trigger water seeding");
    }

    #[test]
    fn populate_with_no_fixed_cells_seeds_grass_center() {
        let mut world = grass_water_world(3);
        let id = world.create_region(0, 0).unwrap();
        let outcome = world.populate_region(id, 1).unwrap();
        let center = world.region(id).unwrap().center;
        assert_eq!(outcome.result.states.get(&center).unwrap().tile_type, 0);
    }

    #[test]
    fn drop_fallback_leaves_original_cell_untouched() {
        // No tile can ever satisfy two mismatched-level OCEAN neighbors at
        // once (only GRASS and one OCEAN tile exist, so replacement has
        // nothing to swap to): the coordinator must drop one.
        let lib = TileLibrary::new(vec![
            TileDef::flat("GRASS", [EdgeLabel::Grass; 6], 300.0),
            TileDef::flat("WATER", [EdgeLabel::Ocean; 6], 50.0),
        ]);
        let mut world = WorldMap::new(lib, 2);
        let library = world.library().clone();
        let index = world.rule_index().clone();
        let coordinator = RegionCoordinator::new(&library, &index);

        let center = CubeCoord::ORIGIN;
        let (_, neighbor) = center.neighbors()[0];
        let mut fixed = BTreeMap::new();
        fixed.insert(center, TileState::new(1, 0, 0));
        fixed.insert(neighbor, TileState::new(1, 0, 5));

        let mut replaced = BTreeSet::new();
        let mut dropped = BTreeSet::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        coordinator.validate_pairwise(&mut world, &mut fixed, &mut replaced, &mut dropped, &mut rng);

        assert!(!dropped.is_empty());
        assert!(replaced.is_empty());
    }
}
