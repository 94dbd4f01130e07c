//! Stack-based constraint propagation: positions whose candidate set
//! shrank are pushed here and popped LIFO, re-checking their neighbors
//! until the stack drains or a cell empties.

use std::collections::BTreeSet;

use crate::cube::CubeCoord;
use crate::direction::HexDirection;
use crate::error::ContradictionRecord;
use crate::rules::AdjacencyRuleIndex;
use crate::tile::{TileLibrary, TileState};

use super::cell::Cell;

/// LIFO work queue of positions whose neighbors need re-checking.
#[derive(Debug, Default)]
pub(crate) struct Propagator {
    stack: Vec<CubeCoord>,
}

impl Propagator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, pos: CubeCoord) {
        self.stack.push(pos);
    }

    /// Drains the stack, narrowing neighbor candidate sets until nothing
    /// changes or some cell empties out.
    ///
    /// `possibilities_of` returns the current possibility set for any key
    /// that might be popped (a fixed cell's singleton, or a solve cell's
    /// live candidate set). `neighbors_of` returns, for a given key, the
    /// `(direction, neighbor)` pairs that are themselves solve cells worth
    /// re-checking.
    pub(crate) fn propagate(
        &mut self,
        library: &TileLibrary,
        index: &AdjacencyRuleIndex,
        cells: &mut std::collections::BTreeMap<CubeCoord, Cell>,
        neighbors_of: &std::collections::BTreeMap<CubeCoord, Vec<(HexDirection, CubeCoord)>>,
        possibilities_of: impl Fn(CubeCoord, &std::collections::BTreeMap<CubeCoord, Cell>) -> Vec<TileState>,
        mut on_shrink: impl FnMut(CubeCoord, &Cell),
    ) -> Result<(), ContradictionRecord> {
        while let Some(key) = self.stack.pop() {
            let possibilities = possibilities_of(key, cells);
            let Some(neighbor_list) = neighbors_of.get(&key) else {
                continue;
            };
            for &(dir, nkey) in neighbor_list {
                let Some(cell) = cells.get(&nkey) else { continue };
                if cell.is_collapsed() {
                    continue;
                }

                let return_dir = dir.opposite();
                let mut allowed: BTreeSet<TileState> = BTreeSet::new();
                for &p in &possibilities {
                    let label = library.edge_label(p, dir);
                    let level = library.edge_level(p, dir);
                    if label.is_level_agnostic() {
                        allowed.extend(index.candidates_for_any_level(label, return_dir));
                    } else {
                        allowed.extend(index.candidates_for(label, return_dir, level));
                    }
                }

                let cell = cells.get_mut(&nkey).expect("checked present above");
                if cell.intersect(&allowed) {
                    if cell.candidates().is_empty() {
                        return Err(ContradictionRecord {
                            failed_cell: nkey,
                            source_cell: key,
                            direction: dir,
                        });
                    }
                    on_shrink(nkey, cell);
                    self.stack.push(nkey);
                }
            }
        }
        Ok(())
    }
}
