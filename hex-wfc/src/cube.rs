//! Cube coordinates: the single coordinate system every region and the
//! [`crate::world::WorldMap`] address cells with, plus the offset-coordinate
//! conversions used at the region-grid and cell-grid boundaries.

use std::cmp::Ordering;

use crate::direction::HexDirection;

/// A hex cell address in cube coordinates, with the invariant `q + r + s == 0`
/// upheld by every constructor below.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CubeCoord {
    pub q: i32,
    pub r: i32,
    pub s: i32,
}

impl CubeCoord {
    pub const ORIGIN: CubeCoord = CubeCoord { q: 0, r: 0, s: 0 };

    #[inline]
    pub fn new(q: i32, r: i32, s: i32) -> Self {
        debug_assert_eq!(q + r + s, 0, "cube coordinate must satisfy q + r + s == 0");
        Self { q, r, s }
    }

    /// Construct from pointy-top odd-r offset coordinates.
    #[inline]
    pub fn from_offset(col: i32, row: i32) -> Self {
        let q = col - (row - (row & 1)) / 2;
        let r = row;
        Self::new(q, r, -q - r)
    }

    /// Convert back to pointy-top odd-r offset coordinates.
    #[inline]
    pub fn to_offset(self) -> (i32, i32) {
        let col = self.q + (self.r - (self.r & 1)) / 2;
        (col, self.r)
    }

    #[inline]
    pub fn neighbor(self, dir: HexDirection) -> CubeCoord {
        let (dq, dr, ds) = dir.cube_step();
        CubeCoord::new(self.q + dq, self.r + dr, self.s + ds)
    }

    /// All six neighbors in canonical direction order, paired with the
    /// direction used to reach them.
    pub fn neighbors(self) -> [(HexDirection, CubeCoord); 6] {
        let mut out = [(HexDirection::NE, self); 6];
        for (i, dir) in HexDirection::all().iter().enumerate() {
            out[i] = (*dir, self.neighbor(*dir));
        }
        out
    }

    #[inline]
    pub fn distance(self, other: CubeCoord) -> i32 {
        ((self.q - other.q).abs() + (self.r - other.r).abs() + (self.s - other.s).abs()) / 2
    }

    /// Every cube coordinate within hex radius `radius` of this cell
    /// (inclusive), in deterministic row-major `(q, r)` order. The size of
    /// the returned disk is `3*radius^2 + 3*radius + 1`.
    pub fn disk(self, radius: i32) -> Vec<CubeCoord> {
        let mut out = Vec::with_capacity((3 * radius * radius + 3 * radius + 1) as usize);
        for q in -radius..=radius {
            let r_min = (-radius).max(-q - radius);
            let r_max = radius.min(-q + radius);
            for r in r_min..=r_max {
                let s = -q - r;
                out.push(CubeCoord::new(self.q + q, self.r + r, self.s + s));
            }
        }
        out.sort();
        out
    }
}

impl Ord for CubeCoord {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.q, self.r).cmp(&(other.q, other.r))
    }
}

impl PartialOrd for CubeCoord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Flat-top odd-q offset coordinates addressing the grid of *regions* (as
/// opposed to the grid of cells within a region, which uses pointy-top
/// odd-r offsets via [`CubeCoord::from_offset`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionGridCoord {
    pub grid_x: i32,
    pub grid_z: i32,
}

impl RegionGridCoord {
    pub fn new(grid_x: i32, grid_z: i32) -> Self {
        Self { grid_x, grid_z }
    }

    /// The cube coordinate of this region's center, given the cell radius
    /// `region_radius` that separates adjacent region centers along a flat-top
    /// hex step.
    pub fn to_cube_center(self, region_radius: i32) -> CubeCoord {
        // Flat-top axial step per region: two region-radii plus one straddling
        // cell, matching the diameter of a region's hex disk.
        let step = 2 * region_radius + 1;
        let q = self.grid_x;
        let r = self.grid_z - (self.grid_x - (self.grid_x & 1)) / 2;
        CubeCoord::new(q * step, r * step, -(q * step) - (r * step))
    }

    /// The six flat-top neighbor offsets of a region grid coordinate. Column
    /// parity changes the `(dx, dz)` pairs, mirroring odd-q offset adjacency.
    pub fn region_neighbor_offsets(self) -> [(i32, i32); 6] {
        const EVEN_COL: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, -1), (-1, 0), (0, 1)];
        const ODD_COL: [(i32, i32); 6] = [(1, 1), (1, 0), (0, -1), (-1, 0), (-1, 1), (0, 1)];
        if self.grid_x & 1 == 0 {
            EVEN_COL
        } else {
            ODD_COL
        }
    }

    pub fn neighbors(self) -> [RegionGridCoord; 6] {
        let mut out = [self; 6];
        for (i, (dx, dz)) in self.region_neighbor_offsets().iter().enumerate() {
            out[i] = RegionGridCoord::new(self.grid_x + dx, self.grid_z + dz);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_roundtrip() {
        for row in -5..=5 {
            for col in -5..=5 {
                let cube = CubeCoord::from_offset(col, row);
                assert_eq!(cube.q + cube.r + cube.s, 0);
                assert_eq!(cube.to_offset(), (col, row));
            }
        }
    }

    #[test]
    fn disk_size_matches_formula() {
        for radius in 0..=8 {
            let disk = CubeCoord::ORIGIN.disk(radius);
            assert_eq!(disk.len() as i32, 3 * radius * radius + 3 * radius + 1);
        }
    }

    #[test]
    fn disk_radius_zero_is_origin_only() {
        assert_eq!(CubeCoord::ORIGIN.disk(0), vec![CubeCoord::ORIGIN]);
    }

    #[test]
    fn neighbor_is_distance_one() {
        for dir in HexDirection::all() {
            assert_eq!(CubeCoord::ORIGIN.distance(CubeCoord::ORIGIN.neighbor(*dir)), 1);
        }
    }
}
