//! Vector-field operations: arithmetic, cross products, divergence, averages.

use super::scalar::tangent_gradient;
use super::{Float32Raster, Uint8Raster, VectorRaster};
use crate::geo;

fn zip3(a: &VectorRaster, b: &VectorRaster, f: impl Fn([f32; 3], [f32; 3]) -> [f32; 3]) -> VectorRaster {
    a.assert_same_grid(b);
    let mut out = a.clone();
    for (o, &y) in out.as_mut_slice().iter_mut().zip(b.iter()) {
        *o = f(*o, y);
    }
    out
}

/// `a + b` per vertex.
pub fn add(a: &VectorRaster, b: &VectorRaster) -> VectorRaster {
    zip3(a, b, |x, y| [x[0] + y[0], x[1] + y[1], x[2] + y[2]])
}

/// `a − b` per vertex.
pub fn sub(a: &VectorRaster, b: &VectorRaster) -> VectorRaster {
    zip3(a, b, |x, y| [x[0] - y[0], x[1] - y[1], x[2] - y[2]])
}

/// `a × b` per vertex (cross-product field).
pub fn cross(a: &VectorRaster, b: &VectorRaster) -> VectorRaster {
    zip3(a, b, geo::cross32)
}

/// `a × v` for a constant vector `v`.
pub fn cross_vector(a: &VectorRaster, v: [f32; 3]) -> VectorRaster {
    a.map(|&x| geo::cross32(x, v))
}

/// `a · b` per vertex.
pub fn dot(a: &VectorRaster, b: &VectorRaster) -> Float32Raster {
    a.assert_same_grid(b);
    Float32Raster::from_fn(a.grid(), |i| geo::dot32(a[i], b[i]))
}

/// Vector field scaled per vertex by a scalar field.
pub fn scale_by(a: &VectorRaster, k: &Float32Raster) -> VectorRaster {
    a.assert_same_grid(k);
    VectorRaster::from_fn(a.grid(), |i| {
        let s = k[i];
        [a[i][0] * s, a[i][1] * s, a[i][2] * s]
    })
}

/// Scalar field times a constant vector.
pub fn from_scalar(k: &Float32Raster, v: [f32; 3]) -> VectorRaster {
    k.map(|&s| [v[0] * s, v[1] * s, v[2] * s])
}

/// Per-vertex vector length.
pub fn magnitude(a: &VectorRaster) -> Float32Raster {
    a.map(|&x| geo::norm32(x))
}

/// Index of the longest vector; ties go to the first occurrence.
///
/// Panics on an empty raster.
pub fn max_id(a: &VectorRaster) -> usize {
    super::scalar::max_id(&magnitude(a))
}

/// Surface divergence (per unit sphere radius): trace of the least-squares Jacobian.
pub fn divergence(a: &VectorRaster) -> Float32Raster {
    let grid = a.grid();
    Float32Raster::from_fn(grid, |i| {
        let mut div = 0.0f32;
        for c in 0..3 {
            let g = tangent_gradient(grid, i, |j| a[j][c] as f64);
            div += g[c];
        }
        div
    })
}

/// Average of the vectors where `weights` is non-zero, weighted by `weights`.
///
/// Returns zero when the total weight is zero.
pub fn weighted_average(a: &VectorRaster, weights: &Float32Raster) -> [f32; 3] {
    a.assert_same_grid(weights);
    let mut acc = [0.0f64; 3];
    let mut wsum = 0.0f64;
    for (v, &w) in a.iter().zip(weights.iter()) {
        let w = w as f64;
        acc[0] += v[0] as f64 * w;
        acc[1] += v[1] as f64 * w;
        acc[2] += v[2] as f64 * w;
        wsum += w;
    }
    if wsum == 0.0 {
        return [0.0; 3];
    }
    geo::to_f32([acc[0] / wsum, acc[1] / wsum, acc[2] / wsum])
}

/// Average over a 0/1 mask.
pub fn masked_average(a: &VectorRaster, mask: &Uint8Raster) -> [f32; 3] {
    weighted_average(a, &mask.to_float())
}

/// Rotate every vector about unit `axis` by `angle` radians.
pub fn rotate(a: &VectorRaster, axis: [f32; 3], angle: f32) -> VectorRaster {
    let k = geo::normalize(geo::to_f64(axis));
    let theta = angle as f64;
    a.map(|&v| geo::to_f32(geo::rotate_about_axis(geo::to_f64(v), k, theta)))
}

/// Grid positions as a vector raster.
pub fn positions(grid: &std::sync::Arc<crate::grid::Grid>) -> VectorRaster {
    VectorRaster::from_vec(grid, grid.pos_xyz.clone())
}
