//! The constraint-propagation solver itself: given a set of cells to
//! collapse and a frozen snapshot of already-collapsed neighbors, produces
//! either a fully collapsed result or a contradiction.

use std::collections::{BTreeMap, BTreeSet};

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::cube::CubeCoord;
use crate::direction::HexDirection;
use crate::error::{CollapseError, ContradictionRecord};
use crate::rules::AdjacencyRuleIndex;
use crate::tile::{TileLibrary, TileState, TileTypeId};

use super::cell::{Cell, EntropyNoise};
use super::propagator::Propagator;
use super::queue::EntropyQueue;
use super::subscriber::Subscriber;

/// Weight multiplier applied to a candidate matching the position's prior
/// state, when a region is re-solved and wants to minimize visual churn.
const OVERLAP_BIAS_MULTIPLIER: f32 = 100.0;

/// Inputs accepted by one [`Solver::solve`] call.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    pub seed: u64,
    pub max_restarts: u32,
    /// Restrict the enumerated state universe to these tile types; empty
    /// means "every tile type in the library".
    pub allowed_tile_types: Vec<TileTypeId>,
    pub weight_overrides: BTreeMap<TileTypeId, f32>,
    /// Forced states inside `solve_cells`, applied before the first
    /// propagation pass.
    pub initial_collapses: BTreeMap<CubeCoord, TileState>,
    /// Prior states for this region's cells (set when re-solving a region
    /// after a fixed-cell replacement); biases collapse back toward the
    /// tile that used to sit there.
    pub overlap_bias: BTreeMap<CubeCoord, TileState>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            max_restarts: 10,
            allowed_tile_types: Vec::new(),
            weight_overrides: BTreeMap::new(),
            initial_collapses: BTreeMap::new(),
            overlap_bias: BTreeMap::new(),
        }
    }
}

/// A completed, contradiction-free solve.
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub states: BTreeMap<CubeCoord, TileState>,
    pub collapse_order: Vec<CubeCoord>,
}

/// Collapses a set of cube-coordinate cells under fixed-neighbor
/// constraints, using the rules precomputed by an [`AdjacencyRuleIndex`].
///
/// The solver only ever sees its own `solve_cells` and a read-only snapshot
/// of `fixed_cells`; it never touches the global world map.
pub struct Solver<'a> {
    library: &'a TileLibrary,
    index: &'a AdjacencyRuleIndex,
    subscriber: Option<&'a mut dyn Subscriber>,
}

impl<'a> Solver<'a> {
    pub fn new(library: &'a TileLibrary, index: &'a AdjacencyRuleIndex) -> Self {
        Self { library, index, subscriber: None }
    }

    pub fn with_subscriber(mut self, subscriber: &'a mut dyn Subscriber) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    pub fn solve(
        &mut self,
        solve_cells: &[CubeCoord],
        fixed_cells: &BTreeMap<CubeCoord, TileState>,
        options: &SolveOptions,
    ) -> Result<SolveResult, CollapseError> {
        if solve_cells.is_empty() {
            return Ok(SolveResult { states: BTreeMap::new(), collapse_order: Vec::new() });
        }

        if let Some(sub) = self.subscriber.as_deref_mut() {
            sub.on_generation_start();
        }

        let universe = self.state_universe(&options.allowed_tile_types);
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        let mut restarts = 0u32;
        let mut last_record: Option<ContradictionRecord> = None;

        loop {
            match self.attempt(solve_cells, fixed_cells, options, &universe, &mut rng) {
                Ok(result) => return Ok(result),
                Err((record, is_seeding)) => {
                    if is_seeding {
                        return Err(CollapseError::seeding(record));
                    }
                    last_record = Some(record);
                    restarts += 1;
                    if restarts > options.max_restarts {
                        return Err(CollapseError::exhausted(
                            last_record.expect("set immediately above"),
                            restarts - 1,
                        ));
                    }
                }
            }
        }
    }

    fn state_universe(&self, allowed: &[TileTypeId]) -> BTreeSet<TileState> {
        if allowed.is_empty() {
            self.index.all_states().collect()
        } else {
            self.index.all_states().filter(|s| allowed.contains(&s.tile_type)).collect()
        }
    }

    /// A single solve attempt: fresh cells, fresh propagation/queue state,
    /// reusing the caller-provided `rng` stream so repeated attempts under
    /// the same seed stay deterministic.
    fn attempt(
        &mut self,
        solve_cells: &[CubeCoord],
        fixed_cells: &BTreeMap<CubeCoord, TileState>,
        options: &SolveOptions,
        universe: &BTreeSet<TileState>,
        rng: &mut ChaCha8Rng,
    ) -> Result<SolveResult, (ContradictionRecord, bool)> {
        let library = self.library;
        let index = self.index;

        let solve_set: BTreeSet<CubeCoord> = solve_cells.iter().copied().collect();
        let noise = EntropyNoise::new();

        let mut cells: BTreeMap<CubeCoord, Cell> = BTreeMap::new();
        for &pos in solve_cells {
            cells.insert(pos, Cell::new(universe.clone(), noise.sample(rng)));
        }

        let mut neighbors: BTreeMap<CubeCoord, Vec<(HexDirection, CubeCoord)>> = BTreeMap::new();
        for &pos in solve_cells {
            let list = pos
                .neighbors()
                .into_iter()
                .filter(|(_, n)| solve_set.contains(n) || fixed_cells.contains_key(n))
                .collect();
            neighbors.insert(pos, list);
        }
        for &pos in fixed_cells.keys() {
            let list = pos.neighbors().into_iter().filter(|(_, n)| solve_set.contains(n)).collect();
            neighbors.insert(pos, list);
        }

        let mut queue = EntropyQueue::new();
        let mut propagator = Propagator::new();
        let mut collapse_order = Vec::new();

        for (&pos, &state) in &options.initial_collapses {
            if let Some(cell) = cells.get_mut(&pos) {
                cell.set_singleton(state);
                cell.collapse();
                collapse_order.push(pos);
                propagator.push(pos);
                if let Some(sub) = self.subscriber.as_deref_mut() {
                    sub.on_collapse(pos, state);
                }
            }
        }
        for &pos in fixed_cells.keys() {
            propagator.push(pos);
        }

        let possibilities_of = |key: CubeCoord, cells: &BTreeMap<CubeCoord, Cell>| -> Vec<TileState> {
            if let Some(&state) = fixed_cells.get(&key) {
                vec![state]
            } else {
                cells.get(&key).map(|c| c.candidates().iter().copied().collect()).unwrap_or_default()
            }
        };

        // Seeding pass: fixed cells (and any initial collapses) propagate into
        // the fresh solve cells before a single free collapse has happened.
        // A contradiction here is unrecoverable by restarting.
        let seeding_result = propagator.propagate(library, index, &mut cells, &neighbors, possibilities_of, |pos, cell| {
            queue.update(pos, cell.entropy());
        });
        if let Err(record) = seeding_result {
            return Err((record, true));
        }

        for (&pos, cell) in &cells {
            if !cell.is_collapsed() {
                queue.update(pos, cell.entropy());
            }
        }

        while !queue.is_empty() {
            let pos = queue.pop_min().expect("checked non-empty above");
            let cell = cells.get(&pos).expect("queue only ever holds live solve-cell keys");
            if cell.is_collapsed() {
                continue;
            }

            let state = self.choose_weighted(pos, cell, options, rng);
            let cell = cells.get_mut(&pos).expect("looked up above");
            cell.set_singleton(state);
            cell.collapse();
            collapse_order.push(pos);
            if let Some(sub) = self.subscriber.as_deref_mut() {
                sub.on_collapse(pos, state);
            }

            propagator.push(pos);
            let result = propagator.propagate(library, index, &mut cells, &neighbors, possibilities_of, |pos, cell| {
                queue.update(pos, cell.entropy());
            });
            if let Err(record) = result {
                return Err((record, false));
            }
        }

        let states = cells
            .into_iter()
            .map(|(pos, cell)| (pos, cell.single_state().expect("every cell collapsed before the queue drained")))
            .collect();

        Ok(SolveResult { states, collapse_order })
    }

    fn choose_weighted(&self, pos: CubeCoord, cell: &Cell, options: &SolveOptions, rng: &mut ChaCha8Rng) -> TileState {
        let candidates: Vec<TileState> = cell.candidates().iter().copied().collect();
        debug_assert!(!candidates.is_empty(), "caller must guard against empty candidate sets");
        let weights: Vec<f32> = candidates
            .iter()
            .map(|state| {
                let mut weight = options
                    .weight_overrides
                    .get(&state.tile_type)
                    .copied()
                    .unwrap_or_else(|| self.library.get(state.tile_type).weight);
                if options.overlap_bias.get(&pos) == Some(state) {
                    weight *= OVERLAP_BIAS_MULTIPLIER;
                }
                weight
            })
            .collect();
        let dist = WeightedIndex::new(&weights).expect("tile weights are positive");
        candidates[dist.sample(rng)]
    }
}
