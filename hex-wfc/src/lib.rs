//! # Hex Wave Function Collapse
//!
//! A procedural generation engine that grows an unbounded hexagonal landscape by
//! collapsing [`tile::TileState`]s onto cube-coordinate cells under edge-adjacency
//! constraints.
//!
//! Generation happens in fixed-radius [`region::Region`]s rather than over the whole
//! map at once: each region is solved by the [`gen::collapse::Solver`] against a
//! frozen snapshot of its already-collapsed neighbours, then stitched into the
//! [`world::WorldMap`] without visible seams by [`region::RegionCoordinator`].
//!
//! ## Modules
//!
//! - [`direction`] - the six hex directions and their opposite/rotation relations.
//! - [`cube`] - cube coordinates and offset-coordinate conversion.
//! - [`tile`] - tile definitions, edge labels and collapsible tile states.
//! - [`rules`] - the precomputed adjacency index used during propagation.
//! - [`gen::collapse`] - the constraint-propagation solver itself.
//! - [`region`] - per-region lifecycle: pre-validation, the solve retry loop, commit.
//! - [`world`] - the global cell store and region graph.

pub mod cube;
pub mod direction;
pub mod error;
pub mod gen;
pub mod region;
pub mod rules;
pub mod tile;
pub mod world;

pub use cube::CubeCoord;
pub use direction::HexDirection;
pub use error::{CollapseError, RegionError};
