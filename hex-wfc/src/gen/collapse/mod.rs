//! # Collapse
//!
//! The solver collapses a set of cube-coordinate cells, each starting with
//! every legal tile state as a candidate. Collapsing one cell (picking a
//! state weighted by the tile's `weight`) propagates outward: neighboring
//! cells lose any candidate that can no longer expose a compatible edge.
//! Propagation runs to a fixed point after every collapse; if it empties a
//! cell's candidate set, that is a contradiction and the solve either
//! restarts (mid-solve) or fails outright (seeding).
//!
//! - [`cell`] - a single solve cell's remaining candidates.
//! - [`queue`] - the min-entropy priority queue that picks what to collapse next.
//! - [`propagator`] - the stack-based fixed-point propagation loop.
//! - [`solver`] - [`Solver`], [`SolveOptions`], [`SolveResult`]: ties the above together.
//! - [`subscriber`] - optional hook for observing each collapse as it happens.

mod cell;
mod propagator;
mod queue;
mod solver;
pub mod subscriber;

pub use cell::Cell;
pub use solver::{SolveOptions, SolveResult, Solver};
pub use subscriber::Subscriber;

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::cube::CubeCoord;
    use crate::rules::AdjacencyRuleIndex;
    use crate::tile::{EdgeLabel, TileDef, TileLibrary, TileState};

    use super::*;

    fn grass_only_library() -> TileLibrary {
        TileLibrary::new(vec![TileDef::flat("GRASS", [EdgeLabel::Grass; 6], 300.0)])
    }

    #[test]
    fn empty_solve_cells_returns_empty_result() {
        let lib = grass_only_library();
        let index = AdjacencyRuleIndex::build(&lib);
        let mut solver = Solver::new(&lib, &index);
        let result = solver.solve(&[], &BTreeMap::new(), &SolveOptions::default()).unwrap();
        assert!(result.states.is_empty());
        assert!(result.collapse_order.is_empty());
    }

    #[test]
    fn grass_only_region_fully_collapses_to_grass() {
        let lib = grass_only_library();
        let index = AdjacencyRuleIndex::build(&lib);
        let mut solver = Solver::new(&lib, &index);
        let cells = CubeCoord::ORIGIN.disk(8);
        let options = SolveOptions { seed: 1, ..Default::default() };
        let result = solver.solve(&cells, &BTreeMap::new(), &options).unwrap();

        assert_eq!(result.states.len(), cells.len());
        assert_eq!(result.collapse_order.len(), cells.len());
        for state in result.states.values() {
            assert_eq!(state.tile_type, 0);
            assert_eq!(state.level, 0);
        }
    }

    #[test]
    fn same_seed_reproduces_identical_collapse_order() {
        let lib = TileLibrary::new(vec![
            TileDef::flat("GRASS", [EdgeLabel::Grass; 6], 300.0),
            TileDef::flat("OCEAN", [EdgeLabel::Ocean; 6], 50.0),
        ]);
        let index = AdjacencyRuleIndex::build(&lib);
        let cells = CubeCoord::ORIGIN.disk(4);
        let options = SolveOptions { seed: 7, ..Default::default() };

        let mut a = Solver::new(&lib, &index);
        let result_a = a.solve(&cells, &BTreeMap::new(), &options).unwrap();
        let mut b = Solver::new(&lib, &index);
        let result_b = b.solve(&cells, &BTreeMap::new(), &options).unwrap();

        assert_eq!(result_a.collapse_order, result_b.collapse_order);
        assert_eq!(
            result_a.states.iter().collect::<Vec<_>>(),
            result_b.states.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn contradictory_fixed_cells_yield_seeding_error() {
        // Two tile types that can never touch: no amount of restarting helps.
        let lib = TileLibrary::new(vec![
            TileDef::flat("GRASS", [EdgeLabel::Grass; 6], 1.0),
            TileDef::flat("OCEAN", [EdgeLabel::Ocean; 6], 1.0),
        ]);
        let index = AdjacencyRuleIndex::build(&lib);
        let mut solver = Solver::new(&lib, &index);

        let center = CubeCoord::ORIGIN;
        let mut fixed = BTreeMap::new();
        for (_, n) in center.neighbors() {
            fixed.insert(n, TileState::new(1, 0, 0)); // OCEAN all around
        }
        // Restrict the universe to GRASS only, so the center cell can never
        // satisfy its OCEAN-exposing neighbors.
        let options = SolveOptions { allowed_tile_types: vec![0], ..Default::default() };

        let err = solver.solve(&[center], &fixed, &options).unwrap_err();
        assert!(err.is_seeding());
    }
}
