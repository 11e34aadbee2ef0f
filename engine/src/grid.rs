//! Geodesic icosphere grid, adjacency, and nearest-vertex lookup.

pub mod cache;

pub use cache::GridError;

use crate::geo;
use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap};
use std::f64::consts::PI;

/// Immutable spherical mesh shared by every raster and plate of a world.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Number of cells (one per mesh vertex)
    pub cells: usize,
    /// Cell center positions in XYZ (unit sphere)
    pub pos_xyz: Vec<[f32; 3]>,
    /// Spherical dual-cell area on the unit sphere
    pub area: Vec<f32>,
    /// 1-ring neighbor cell indices, sorted ascending (pentagon:5, hexagon:6)
    pub n1: Vec<SmallVec<[u32; 6]>>,
    /// Subdivision level (0 = base icosahedron); 0 for externally supplied meshes
    pub level: u32,
}

impl Grid {
    /// Build an icosphere with `level` rounds of midpoint subdivision.
    ///
    /// Vertex count is `10·4^level + 2`. Geometry and areas are computed in f64 and
    /// stored as f32.
    pub fn new(level: u32) -> Self {
        let (mut pos, mut faces) = icosahedron();

        for _ in 0..level {
            let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
            let mut next: Vec<[usize; 3]> = Vec::with_capacity(faces.len() * 4);
            let mut mid = |a: usize, b: usize, pos: &mut Vec<[f64; 3]>| -> usize {
                let key = if a < b { (a, b) } else { (b, a) };
                *midpoints.entry(key).or_insert_with(|| {
                    let (pa, pb) = (pos[a], pos[b]);
                    pos.push(geo::normalize([pa[0] + pb[0], pa[1] + pb[1], pa[2] + pb[2]]));
                    pos.len() - 1
                })
            };
            for &[a, b, c] in &faces {
                let ab = mid(a, b, &mut pos);
                let bc = mid(b, c, &mut pos);
                let ca = mid(c, a, &mut pos);
                next.push([a, ab, ca]);
                next.push([b, bc, ab]);
                next.push([c, ca, bc]);
                next.push([ab, bc, ca]);
            }
            faces = next;
        }

        let n = pos.len();
        let mut sets: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); n];
        let mut area_acc = vec![0.0f64; n];
        for &[a, b, c] in &faces {
            sets[a].extend([b as u32, c as u32]);
            sets[b].extend([a as u32, c as u32]);
            sets[c].extend([a as u32, b as u32]);
            // distribute each spherical triangle's area equally to its corners
            let share = spherical_triangle_area(pos[a], pos[b], pos[c]) / 3.0;
            area_acc[a] += share;
            area_acc[b] += share;
            area_acc[c] += share;
        }

        let sum_area: f64 = area_acc.iter().sum();
        let rel_err = (sum_area - 4.0 * PI).abs() / (4.0 * PI);
        assert!(rel_err < 1e-6, "area partition error: {rel_err}");

        Self {
            cells: n,
            pos_xyz: pos.iter().map(|&p| geo::to_f32(p)).collect(),
            area: area_acc.iter().map(|&a| a as f32).collect(),
            n1: sets.into_iter().map(|s| s.into_iter().collect()).collect(),
            level,
        }
    }

    /// Adopt an externally built mesh.
    ///
    /// Positions are normalized onto the unit sphere; adjacency must be symmetric and
    /// in range. Cell areas are approximated as `4π / cells`.
    pub fn from_parts(
        positions: Vec<[f32; 3]>,
        neighbors: Vec<Vec<u32>>,
    ) -> Result<Self, GridError> {
        if positions.is_empty() {
            return Err(GridError::Empty);
        }
        if positions.len() != neighbors.len() {
            return Err(GridError::LengthMismatch {
                positions: positions.len(),
                neighbors: neighbors.len(),
            });
        }
        let cells = positions.len();
        let mut n1: Vec<SmallVec<[u32; 6]>> = Vec::with_capacity(cells);
        for (i, list) in neighbors.iter().enumerate() {
            let mut sorted: Vec<u32> = list.clone();
            sorted.sort_unstable();
            sorted.dedup();
            for &j in &sorted {
                if j as usize >= cells || j as usize == i {
                    return Err(GridError::BadNeighbor { cell: i, neighbor: j });
                }
                if !neighbors[j as usize].contains(&(i as u32)) {
                    return Err(GridError::Asymmetric { cell: i, neighbor: j });
                }
            }
            n1.push(sorted.into_iter().collect());
        }
        let pos_xyz = positions.iter().map(|&p| geo::to_f32(geo::normalize(geo::to_f64(p)))).collect();
        let area = vec![(4.0 * PI / cells as f64) as f32; cells];
        Ok(Self { cells, pos_xyz, area, n1, level: 0 })
    }

    /// Nearest grid vertex to `point` (need not be unit length), found by greedy ascent
    /// of `dot(vertex, point)` over the 1-ring starting at `hint`.
    ///
    /// A point that coincides with a vertex position returns that vertex when used as
    /// its own hint.
    pub fn nearest(&self, point: [f32; 3], hint: usize) -> usize {
        let p = geo::to_f64(point);
        let mut idx = hint.min(self.cells.saturating_sub(1));
        let mut best = geo::dot(geo::to_f64(self.pos_xyz[idx]), p);
        loop {
            let mut improved = false;
            for &vn in &self.n1[idx] {
                let j = vn as usize;
                let d = geo::dot(geo::to_f64(self.pos_xyz[j]), p);
                if d > best {
                    best = d;
                    idx = j;
                    improved = true;
                }
            }
            if !improved {
                return idx;
            }
        }
    }

    /// Vertices within `hops` adjacency steps of `seed` (graph ball), including the seed.
    pub fn ball(&self, seed: usize, hops: u32) -> Vec<usize> {
        let mut seen = vec![false; self.cells];
        let mut frontier = vec![seed];
        seen[seed] = true;
        let mut out = vec![seed];
        for _ in 0..hops {
            let mut next = Vec::new();
            for &u in &frontier {
                for &v in &self.n1[u] {
                    let v = v as usize;
                    if !seen[v] {
                        seen[v] = true;
                        next.push(v);
                    }
                }
            }
            out.extend_from_slice(&next);
            frontier = next;
        }
        out
    }
}

/// Spherical triangle area on unit sphere using the robust vector formula.
fn spherical_triangle_area(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    let numerator = geo::dot(geo::cross(a, b), c).abs();
    let denom = 1.0 + geo::dot(a, b) + geo::dot(b, c) + geo::dot(c, a);
    2.0 * (numerator.atan2(denom))
}

/// Canonical icosahedron vertices (unit sphere) and faces (CCW)
fn icosahedron() -> (Vec<[f64; 3]>, Vec<[usize; 3]>) {
    let phi = (1.0 + 5.0_f64.sqrt()) * 0.5;
    let a = 1.0;
    let b = phi;
    let verts = vec![
        geo::normalize([-a, b, 0.0]),
        geo::normalize([a, b, 0.0]),
        geo::normalize([-a, -b, 0.0]),
        geo::normalize([a, -b, 0.0]),
        geo::normalize([0.0, -a, b]),
        geo::normalize([0.0, a, b]),
        geo::normalize([0.0, -a, -b]),
        geo::normalize([0.0, a, -b]),
        geo::normalize([b, 0.0, -a]),
        geo::normalize([b, 0.0, a]),
        geo::normalize([-b, 0.0, -a]),
        geo::normalize([-b, 0.0, a]),
    ];
    let faces = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];
    (verts, faces)
}
