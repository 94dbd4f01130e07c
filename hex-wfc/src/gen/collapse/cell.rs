//! A single solve cell: its remaining candidate states and whether it has
//! been pinned to one of them.

use std::collections::BTreeSet;

use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::tile::TileState;

/// Tiny positive tie-breaking noise added to entropy so that cells with
/// equal candidate counts still compare unequal under a given seed, instead
/// of falling back to whatever order a hash container happens to produce.
pub(crate) struct EntropyNoise {
    inner: Uniform<u8>,
}

impl EntropyNoise {
    const MULTIPLIER: u8 = 124;
    pub(crate) const EPSILON: f32 = 1e-6;

    pub(crate) fn new() -> Self {
        Self { inner: Uniform::new(0, Self::MULTIPLIER) }
    }

    pub(crate) fn sample(&self, rng: &mut impl Rng) -> f32 {
        self.inner.sample(rng) as f32 * Self::EPSILON
    }
}

/// A container with a set of candidate states and a `collapsed` flag. When
/// collapsed, the set is a singleton.
#[derive(Debug, Clone)]
pub struct Cell {
    candidates: BTreeSet<TileState>,
    collapsed: bool,
    noise: f32,
}

impl Cell {
    pub(crate) fn new(candidates: BTreeSet<TileState>, noise: f32) -> Self {
        Self { candidates, collapsed: false, noise }
    }

    pub fn candidates(&self) -> &BTreeSet<TileState> {
        &self.candidates
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn single_state(&self) -> Option<TileState> {
        if self.candidates.len() == 1 {
            self.candidates.iter().next().copied()
        } else {
            None
        }
    }

    /// `ln(|candidates|) + epsilon * noise`; `0.0` (plus noise) for an
    /// already-singleton cell, which keeps singletons at the front of the
    /// entropy queue so they get collapsed (trivially) before propagation
    /// moves on.
    pub fn entropy(&self) -> f32 {
        (self.candidates.len().max(1) as f32).ln() + self.noise
    }

    /// Intersects the candidate set with `allowed`, returning `true` if it
    /// shrank.
    pub(crate) fn intersect(&mut self, allowed: &BTreeSet<TileState>) -> bool {
        let before = self.candidates.len();
        self.candidates.retain(|c| allowed.contains(c));
        self.candidates.len() != before
    }

    pub(crate) fn set_singleton(&mut self, state: TileState) {
        self.candidates.clear();
        self.candidates.insert(state);
    }

    pub(crate) fn collapse(&mut self) {
        debug_assert_eq!(self.candidates.len(), 1, "collapse() requires a singleton candidate set");
        self.collapsed = true;
    }
}
