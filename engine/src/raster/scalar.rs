//! Scalar-field operations: elementwise arithmetic, extrema, gradient, smoothing.

use super::{Float32Raster, Numeric, Raster, Uint8Raster, VectorRaster};
use crate::geo;

fn zip_into<T: Numeric>(a: &Raster<T>, b: &Raster<T>, out: &mut Raster<T>, f: impl Fn(T, T) -> T) {
    a.assert_same_grid(b);
    a.assert_same_grid(out);
    for ((o, &x), &y) in out.as_mut_slice().iter_mut().zip(a.iter()).zip(b.iter()) {
        *o = f(x, y);
    }
}

/// `a + b` elementwise.
pub fn add<T: Numeric>(a: &Raster<T>, b: &Raster<T>) -> Raster<T> {
    let mut out = a.clone();
    add_into(a, b, &mut out);
    out
}

/// `a + b` into `out`.
pub fn add_into<T: Numeric>(a: &Raster<T>, b: &Raster<T>, out: &mut Raster<T>) {
    zip_into(a, b, out, T::add);
}

/// `a − b` elementwise.
pub fn sub<T: Numeric>(a: &Raster<T>, b: &Raster<T>) -> Raster<T> {
    let mut out = a.clone();
    sub_into(a, b, &mut out);
    out
}

/// `a − b` into `out`.
pub fn sub_into<T: Numeric>(a: &Raster<T>, b: &Raster<T>, out: &mut Raster<T>) {
    zip_into(a, b, out, T::sub);
}

/// `a · b` elementwise.
pub fn mult<T: Numeric>(a: &Raster<T>, b: &Raster<T>) -> Raster<T> {
    let mut out = a.clone();
    mult_into(a, b, &mut out);
    out
}

/// `a · b` into `out`.
pub fn mult_into<T: Numeric>(a: &Raster<T>, b: &Raster<T>, out: &mut Raster<T>) {
    zip_into(a, b, out, T::mul);
}

/// `a / b` elementwise.
pub fn div<T: Numeric>(a: &Raster<T>, b: &Raster<T>) -> Raster<T> {
    let mut out = a.clone();
    zip_into(a, b, &mut out, T::div);
    out
}

/// `a + k` elementwise.
pub fn add_scalar<T: Numeric>(a: &Raster<T>, k: T) -> Raster<T> {
    a.map(|&x| x.add(k))
}

/// `a − k` elementwise.
pub fn sub_scalar<T: Numeric>(a: &Raster<T>, k: T) -> Raster<T> {
    a.map(|&x| x.sub(k))
}

/// `a · k` elementwise.
pub fn mult_scalar<T: Numeric>(a: &Raster<T>, k: T) -> Raster<T> {
    a.map(|&x| x.mul(k))
}

/// Sum of all elements, accumulated in f64.
pub fn sum<T: Numeric>(a: &Raster<T>) -> f64 {
    a.iter().map(|&x| x.to_f32() as f64).sum()
}

/// Mean of all elements.
pub fn mean<T: Numeric>(a: &Raster<T>) -> f64 {
    if a.is_empty() {
        0.0
    } else {
        sum(a) / a.len() as f64
    }
}

/// Index of the smallest element; ties go to the first occurrence.
///
/// Panics on an empty raster.
pub fn min_id<T: Numeric>(a: &Raster<T>) -> usize {
    assert!(!a.is_empty(), "min_id of an empty raster");
    let mut best = 0usize;
    for (i, &v) in a.iter().enumerate().skip(1) {
        if v < a[best] {
            best = i;
        }
    }
    best
}

/// Index of the largest element; ties go to the first occurrence.
///
/// Panics on an empty raster.
pub fn max_id<T: Numeric>(a: &Raster<T>) -> usize {
    assert!(!a.is_empty(), "max_id of an empty raster");
    let mut best = 0usize;
    for (i, &v) in a.iter().enumerate().skip(1) {
        if v > a[best] {
            best = i;
        }
    }
    best
}

/// [`min_id`] over elements where `mask != 0`; `None` when the mask is empty.
pub fn min_id_where<T: Numeric>(a: &Raster<T>, mask: &Uint8Raster) -> Option<usize> {
    a.assert_same_grid(mask);
    let mut best: Option<usize> = None;
    for (i, &v) in a.iter().enumerate() {
        if mask[i] != 0 && best.map_or(true, |b| v < a[b]) {
            best = Some(i);
        }
    }
    best
}

/// [`max_id`] over elements where `mask != 0`; `None` when the mask is empty.
pub fn max_id_where<T: Numeric>(a: &Raster<T>, mask: &Uint8Raster) -> Option<usize> {
    a.assert_same_grid(mask);
    let mut best: Option<usize> = None;
    for (i, &v) in a.iter().enumerate() {
        if mask[i] != 0 && best.map_or(true, |b| v > a[b]) {
            best = Some(i);
        }
    }
    best
}

/// Surface gradient of a scalar field (per unit sphere radius).
///
/// Each vertex fits a plane `Δf ≈ g·Δx` by least squares over its 1-ring in the local
/// east/north tangent frame; the result is expressed back in world XYZ.
pub fn gradient(field: &Float32Raster) -> VectorRaster {
    let mut out = VectorRaster::new(field.grid(), [0.0; 3]);
    gradient_into(field, &mut out);
    out
}

/// [`gradient`] into `out`.
pub fn gradient_into(field: &Float32Raster, out: &mut VectorRaster) {
    field.assert_same_grid(out);
    let grid = field.grid();
    for i in 0..grid.cells {
        out[i] = tangent_gradient(grid, i, |j| field[j] as f64);
    }
}

/// Least-squares tangent-plane gradient at vertex `i` of the values produced by `value`.
pub(crate) fn tangent_gradient(
    grid: &crate::grid::Grid,
    i: usize,
    value: impl Fn(usize) -> f64,
) -> [f32; 3] {
    let p = geo::to_f64(grid.pos_xyz[i]);
    let (east, north) = geo::local_basis(p);
    let zi = value(i);
    let mut s_xx = 0.0;
    let mut s_xy = 0.0;
    let mut s_yy = 0.0;
    let mut s_xz = 0.0;
    let mut s_yz = 0.0;
    for &nj in &grid.n1[i] {
        let j = nj as usize;
        let q = geo::to_f64(grid.pos_xyz[j]);
        let d = [q[0] - p[0], q[1] - p[1], q[2] - p[2]];
        let dx = geo::dot(d, east);
        let dy = geo::dot(d, north);
        let dz = value(j) - zi;
        s_xx += dx * dx;
        s_xy += dx * dy;
        s_yy += dy * dy;
        s_xz += dx * dz;
        s_yz += dy * dz;
    }
    let det = s_xx * s_yy - s_xy * s_xy;
    if grid.n1[i].len() < 2 || det.abs() <= 1e-18 {
        return [0.0; 3];
    }
    let gx = (s_yy * s_xz - s_xy * s_yz) / det;
    let gy = (s_xx * s_yz - s_xy * s_xz) / det;
    geo::to_f32([
        gx * east[0] + gy * north[0],
        gx * east[1] + gy * north[1],
        gx * east[2] + gy * north[2],
    ])
}

/// Explicit graph diffusion: `iterations` rounds of `f ← f + rate·(mean(N(f)) − f)`.
///
/// `rate` is clamped to `[0, 1]`, which keeps every round within the range of the input.
pub fn laplacian_smooth(field: &Float32Raster, rate: f32, iterations: u32, scratch: &mut Float32Raster) -> Float32Raster {
    field.assert_same_grid(scratch);
    let grid = field.grid();
    let rate = rate.clamp(0.0, 1.0);
    let mut cur = field.clone();
    for _ in 0..iterations {
        for i in 0..grid.cells {
            let nbrs = &grid.n1[i];
            if nbrs.is_empty() {
                scratch[i] = cur[i];
                continue;
            }
            let m: f32 = nbrs.iter().map(|&j| cur[j as usize]).sum::<f32>() / nbrs.len() as f32;
            scratch[i] = cur[i] + rate * (m - cur[i]);
        }
        cur.copy_from(scratch);
    }
    cur
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use std::sync::Arc;

    #[test]
    fn extrema_ties_take_first() {
        let g = Arc::new(Grid::new(0));
        let mut r = Raster::new(&g, 1u16);
        r[4] = 9;
        r[7] = 9;
        r[2] = 0;
        r[10] = 0;
        assert_eq!(max_id(&r), 4);
        assert_eq!(min_id(&r), 2);
    }

    #[test]
    fn gradient_of_linear_field_points_along_axis() {
        let g = Arc::new(Grid::new(3));
        let f = Raster::from_fn(&g, |i| g.pos_xyz[i][2]);
        let grad = gradient(&f);
        // at the equator, the gradient of z is ~ +z
        let i = (0..g.cells).min_by(|&a, &b| g.pos_xyz[a][2].abs().total_cmp(&g.pos_xyz[b][2].abs())).unwrap_or(0);
        assert!(grad[i][2] > 0.9, "grad={:?}", grad[i]);
    }

    #[test]
    fn smoothing_stays_in_range() {
        let g = Arc::new(Grid::new(2));
        let f = Raster::from_fn(&g, |i| if i % 3 == 0 { 1.0 } else { 0.0 });
        let mut scratch = Raster::new(&g, 0.0f32);
        let s = laplacian_smooth(&f, 0.5, 10, &mut scratch);
        assert!(s.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
