//! Instrumentation hook for the solver: implement [`Subscriber`] to observe
//! (and, for debugging, print or log) each collapse as it happens.

use std::any::Any;

use crate::cube::CubeCoord;
use crate::tile::TileState;

/// Injected into a [`super::Solver`] to react to each tile being collapsed.
pub trait Subscriber: Any {
    /// Called once at the start of every solve attempt, including restarts.
    /// No-op by default; override to clear retained state.
    fn on_generation_start(&mut self) {}

    fn on_collapse(&mut self, position: CubeCoord, state: TileState);

    fn as_any(&self) -> &dyn Any;
}

/// Prints every collapse to stdout. Useful while developing a new tile
/// library.
#[derive(Debug, Default)]
pub struct DebugSubscriber;

impl Subscriber for DebugSubscriber {
    fn on_collapse(&mut self, position: CubeCoord, state: TileState) {
        println!("collapsed {state:?} at {position:?}");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Records the full collapse history of the most recent solve attempt, for
/// replay/animation.
#[derive(Debug, Clone, Default)]
pub struct CollapseHistorySubscriber {
    history: Vec<(CubeCoord, TileState)>,
}

impl CollapseHistorySubscriber {
    pub fn history(&self) -> &[(CubeCoord, TileState)] {
        &self.history
    }
}

impl Subscriber for CollapseHistorySubscriber {
    fn on_generation_start(&mut self) {
        self.history.clear();
    }

    fn on_collapse(&mut self, position: CubeCoord, state: TileState) {
        self.history.push((position, state));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
