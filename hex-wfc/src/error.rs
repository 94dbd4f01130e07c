//! Error types shared by the solver and the region coordinator.
//!
//! Modeled after the source library's `CollapseError`: a small struct
//! carrying enough context (failed cell, culprit, iteration) to let a caller
//! decide whether retrying makes sense, rather than an opaque string.

use std::error::Error;
use std::fmt::{self, Display};

use crate::cube::CubeCoord;
use crate::direction::HexDirection;

/// A record of a contradiction encountered while solving: the cell whose
/// candidate set emptied, and the propagation step that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContradictionRecord {
    pub failed_cell: CubeCoord,
    pub source_cell: CubeCoord,
    pub direction: HexDirection,
}

/// Error produced by the [`crate::gen::collapse::Solver`].
///
/// [`CollapseError::is_seeding`] distinguishes contradictions that occurred
/// before the first free collapse (caused by the fixed cells themselves, or
/// by caller-supplied initial collapses) from contradictions encountered
/// mid-solve, which the solver will have already spent its restart budget
/// trying to route around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapseError {
    record: ContradictionRecord,
    kind: CollapseErrorKind,
    restarts_spent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollapseErrorKind {
    Seeding,
    Contradiction,
}

impl CollapseError {
    pub(crate) fn seeding(record: ContradictionRecord) -> Self {
        Self {
            record,
            kind: CollapseErrorKind::Seeding,
            restarts_spent: 0,
        }
    }

    pub(crate) fn exhausted(record: ContradictionRecord, restarts_spent: u32) -> Self {
        Self {
            record,
            kind: CollapseErrorKind::Contradiction,
            restarts_spent,
        }
    }

    pub fn record(&self) -> ContradictionRecord {
        self.record
    }

    /// `true` if no amount of restarting would have helped: the fixed cells
    /// (or caller-supplied initial collapses) were mutually incompatible
    /// before a single free collapse happened.
    pub fn is_seeding(&self) -> bool {
        matches!(self.kind, CollapseErrorKind::Seeding)
    }

    pub fn restarts_spent(&self) -> u32 {
        self.restarts_spent
    }
}

impl Display for CollapseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CollapseErrorKind::Seeding => write!(
                f,
                "cell {:?} has no options left while seeding from fixed cell {:?} in direction {:?}: \
                 the fixed constraints are mutually unsolvable",
                self.record.failed_cell, self.record.source_cell, self.record.direction
            ),
            CollapseErrorKind::Contradiction => write!(
                f,
                "cell {:?} has no options left after propagating from {:?} in direction {:?} \
                 (gave up after {} restart(s))",
                self.record.failed_cell, self.record.source_cell, self.record.direction, self.restarts_spent
            ),
        }
    }
}

impl Error for CollapseError {}

/// Error produced by the [`crate::region::RegionCoordinator`] when every
/// phase of the retry loop (plain solve, fixed-cell replacement, fixed-cell
/// drop) is exhausted without a result. The region is left in its prior
/// state; nothing has been written to the world map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionError {
    last: CollapseError,
    replaced: u32,
    dropped: u32,
}

impl RegionError {
    pub(crate) fn new(last: CollapseError, replaced: u32, dropped: u32) -> Self {
        Self { last, replaced, dropped }
    }

    pub fn last_collapse_error(&self) -> CollapseError {
        self.last
    }
}

impl Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region solve failed after replacing {} and dropping {} fixed cell(s); last error: {}",
            self.replaced, self.dropped, self.last
        )
    }
}

impl Error for RegionError {}
