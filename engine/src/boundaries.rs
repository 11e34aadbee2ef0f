//! Plate boundary classification.
//! Classifies grid edges between different plates as divergent, convergent, or transform
//! from the relative surface velocity of the two plates.

use crate::geo;
use crate::plates::Plate;
use crate::raster::segmentation::NO_LABEL;
use crate::raster::Uint16Raster;

/// Summary counts of boundary classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryStats {
    /// Divergent boundary edges count.
    pub divergent: u32,
    /// Convergent boundary edges count.
    pub convergent: u32,
    /// Transform boundary edges count.
    pub transform: u32,
}

/// Boundary class of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeClass {
    /// Plates pull apart
    Divergent,
    /// Plates push together
    Convergent,
    /// Plates slide past each other
    Transform,
}

/// Classified boundaries.
#[derive(Debug, Clone)]
pub struct Boundaries {
    /// Per-cell bitmask: bit0=div, bit1=conv, bit2=trans.
    pub b: Vec<u8>,
    /// Undirected edge list (u < v) with its class.
    pub edges: Vec<(u32, u32, EdgeClass)>,
    /// Summary statistics.
    pub stats: BoundaryStats,
}

impl Boundaries {
    /// Classify edges between vertices with different owners.
    ///
    /// `owner` holds the index into `plates` per vertex. `tau` is the opening/closing
    /// threshold on the normal relative velocity (rad/Myr of arc).
    pub fn classify(owner: &Uint16Raster, plates: &[Plate], tau: f32) -> Self {
        let grid = owner.grid();
        let tau = tau.max(0.0) as f64;

        let mut b = vec![0u8; grid.cells];
        let mut edges: Vec<(u32, u32, EdgeClass)> = Vec::new();
        let mut stats = BoundaryStats::default();

        for u in 0..grid.cells as u32 {
            for &v in &grid.n1[u as usize] {
                if v <= u {
                    continue;
                }
                let (ou, ov) = (owner[u as usize], owner[v as usize]);
                if ou == ov || ou == NO_LABEL || ov == NO_LABEL {
                    continue;
                }

                let ru = geo::to_f64(grid.pos_xyz[u as usize]);
                let rv = geo::to_f64(grid.pos_xyz[v as usize]);
                // Midpoint great-circle geometry
                let rm = geo::normalize([ru[0] + rv[0], ru[1] + rv[1], ru[2] + rv[2]]);
                let t_hat = geo::normalize(geo::cross(ru, rv)); // along-boundary
                let mut n_hat = geo::normalize(geo::cross(t_hat, rm)); // across-boundary, u → v
                if geo::dot(n_hat, [rv[0] - ru[0], rv[1] - ru[1], rv[2] - ru[2]]) < 0.0 {
                    n_hat = [-n_hat[0], -n_hat[1], -n_hat[2]];
                }

                let vu = geo::cross(geo::to_f64(plates[ou as usize].angular_velocity), rm);
                let vv = geo::cross(geo::to_f64(plates[ov as usize].angular_velocity), rm);
                // opening rate: v moves along +n, u along -n
                let dv = [vv[0] - vu[0], vv[1] - vu[1], vv[2] - vu[2]];
                let n = geo::dot(dv, n_hat);
                let t = geo::dot(dv, t_hat).abs();

                let class = if n > tau {
                    EdgeClass::Divergent
                } else if n < -tau {
                    EdgeClass::Convergent
                } else if t > n.abs() {
                    EdgeClass::Transform
                } else {
                    continue;
                };
                let bit = match class {
                    EdgeClass::Divergent => {
                        stats.divergent += 1;
                        1
                    }
                    EdgeClass::Convergent => {
                        stats.convergent += 1;
                        1 << 1
                    }
                    EdgeClass::Transform => {
                        stats.transform += 1;
                        1 << 2
                    }
                };
                b[u as usize] |= bit;
                b[v as usize] |= bit;
                edges.push((u, v, class));
            }
        }

        Self { b, edges, stats }
    }
}
