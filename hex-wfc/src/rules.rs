//! The adjacency rule index: built once from a [`TileLibrary`], it turns
//! "which states expose edge label L at level ℓ on direction D" into an O(1)
//! lookup, which is what keeps propagation fast.

use std::collections::{BTreeMap, BTreeSet};

use crate::direction::{DirectionTable, HexDirection};
use crate::tile::{EdgeLabel, TileLibrary, TileState};

/// Two tables built once from a [`TileLibrary`] and never mutated again:
///
/// - `state_edges`: every legal state's full edge/level table, for
///   propagation to read the possibilities it is allowed to demand from.
/// - `by_edge`: the inverse index, `label -> direction -> level -> states`,
///   used by [`AdjacencyRuleIndex::candidates_for`].
#[derive(Debug, Clone)]
pub struct AdjacencyRuleIndex {
    state_edges: BTreeMap<TileState, DirectionTable<(EdgeLabel, u8)>>,
    by_edge: BTreeMap<EdgeLabel, DirectionTable<BTreeMap<u8, BTreeSet<TileState>>>>,
}

impl AdjacencyRuleIndex {
    pub fn build(library: &TileLibrary) -> Self {
        let mut state_edges = BTreeMap::new();
        let mut by_edge: BTreeMap<EdgeLabel, DirectionTable<BTreeMap<u8, BTreeSet<TileState>>>> =
            BTreeMap::new();

        for label in EdgeLabel::ALL {
            by_edge.insert(
                label,
                DirectionTable::new([
                    BTreeMap::new(),
                    BTreeMap::new(),
                    BTreeMap::new(),
                    BTreeMap::new(),
                    BTreeMap::new(),
                    BTreeMap::new(),
                ]),
            );
        }

        for state in library.enumerate_states() {
            let mut edges = [(EdgeLabel::Grass, 0u8); 6];
            for dir in HexDirection::all() {
                let label = library.edge_label(state, *dir);
                let level = library.edge_level(state, *dir);
                edges[dir.as_idx()] = (label, level);

                by_edge
                    .get_mut(&label)
                    .expect("every EdgeLabel variant is pre-populated above")[*dir]
                    .entry(level)
                    .or_default()
                    .insert(state);
            }
            state_edges.insert(state, DirectionTable::new(edges));
        }

        Self { state_edges, by_edge }
    }

    pub fn edges_of(&self, state: TileState) -> DirectionTable<(EdgeLabel, u8)> {
        *self
            .state_edges
            .get(&state)
            .unwrap_or_else(|| panic!("state {state:?} is not a legal state in this rule index"))
    }

    /// All states exposing `(label, level)` on `return_dir`. This is exactly
    /// what a cell must match against when its neighbor in direction
    /// `opposite(return_dir)` exposes `(label, level)` toward it.
    pub fn candidates_for(&self, label: EdgeLabel, return_dir: HexDirection, level: u8) -> BTreeSet<TileState> {
        self.by_edge
            .get(&label)
            .map(|table| table[return_dir].get(&level).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Union of [`Self::candidates_for`] across every level for `label` -
    /// the operational encoding of "grass edges are level-agnostic".
    pub fn candidates_for_any_level(&self, label: EdgeLabel, return_dir: HexDirection) -> BTreeSet<TileState> {
        let mut out = BTreeSet::new();
        if let Some(table) = self.by_edge.get(&label) {
            for states in table[return_dir].values() {
                out.extend(states.iter().copied());
            }
        }
        out
    }

    pub fn all_states(&self) -> impl Iterator<Item = TileState> + '_ {
        self.state_edges.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileDef;

    fn two_tile_library() -> TileLibrary {
        TileLibrary::new(vec![
            TileDef::flat("GRASS", [EdgeLabel::Grass; 6], 300.0),
            TileDef::flat("OCEAN", [EdgeLabel::Ocean; 6], 50.0),
        ])
    }

    #[test]
    fn candidates_for_finds_matching_states() {
        let lib = two_tile_library();
        let index = AdjacencyRuleIndex::build(&lib);
        let grass_states = index.candidates_for(EdgeLabel::Grass, HexDirection::NE, 0);
        assert!(grass_states.iter().all(|s| s.tile_type == 0));
        assert!(!grass_states.is_empty());

        let ocean_states = index.candidates_for(EdgeLabel::Ocean, HexDirection::NE, 0);
        assert!(ocean_states.iter().all(|s| s.tile_type == 1));
    }

    #[test]
    fn unknown_level_returns_empty_not_panic() {
        let lib = two_tile_library();
        let index = AdjacencyRuleIndex::build(&lib);
        assert!(index.candidates_for(EdgeLabel::Grass, HexDirection::NE, 255).is_empty());
    }

    #[test]
    fn any_level_union_covers_every_level_bucket() {
        let lib = TileLibrary::new(vec![TileDef::flat("GRASS", [EdgeLabel::Grass; 6], 1.0)])
            .with_levels_count(4);
        let index = AdjacencyRuleIndex::build(&lib);
        let per_level: usize = (0..4)
            .map(|lvl| index.candidates_for(EdgeLabel::Grass, HexDirection::E, lvl).len())
            .sum();
        let any_level = index.candidates_for_any_level(EdgeLabel::Grass, HexDirection::E).len();
        assert_eq!(per_level, any_level);
    }
}
