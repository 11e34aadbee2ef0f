//! Binary morphology over 0/1 rasters, using grid adjacency as the structuring element.
//!
//! `radius` counts adjacency hops: dilation by `r` covers exactly the graph ball of
//! radius `r` around every set cell. Erosion is its adjoint, so opening and closing
//! are idempotent.

use super::{Float32Raster, Numeric, Raster, Uint8Raster};

/// 1 where `a > threshold`, else 0.
pub fn to_binary<T: Numeric>(a: &Raster<T>, threshold: T) -> Uint8Raster {
    a.map(|&v| u8::from(v > threshold))
}

/// Mask as 0.0/1.0 floats.
pub fn to_float(a: &Uint8Raster) -> Float32Raster {
    a.map(|&v| if v != 0 { 1.0 } else { 0.0 })
}

fn combine(a: &Uint8Raster, b: &Uint8Raster, f: impl Fn(bool, bool) -> bool) -> Uint8Raster {
    a.assert_same_grid(b);
    Uint8Raster::from_fn(a.grid(), |i| u8::from(f(a[i] != 0, b[i] != 0)))
}

/// `a ∪ b`.
pub fn union(a: &Uint8Raster, b: &Uint8Raster) -> Uint8Raster {
    combine(a, b, |x, y| x || y)
}

/// `a ∩ b`.
pub fn intersection(a: &Uint8Raster, b: &Uint8Raster) -> Uint8Raster {
    combine(a, b, |x, y| x && y)
}

/// `a \ b`.
pub fn difference(a: &Uint8Raster, b: &Uint8Raster) -> Uint8Raster {
    combine(a, b, |x, y| x && !y)
}

/// Complement.
pub fn negation(a: &Uint8Raster) -> Uint8Raster {
    a.map(|&v| u8::from(v == 0))
}

/// Number of set cells.
pub fn count(a: &Uint8Raster) -> usize {
    a.iter().filter(|&&v| v != 0).count()
}

/// Grow the set by `radius` hops.
pub fn dilation(a: &Uint8Raster, radius: u32) -> Uint8Raster {
    let grid = a.grid();
    let mut cur = a.map(|&v| u8::from(v != 0));
    let mut next = cur.clone();
    for _ in 0..radius {
        for i in 0..grid.cells {
            next[i] = u8::from(cur[i] != 0 || grid.n1[i].iter().any(|&j| cur[j as usize] != 0));
        }
        std::mem::swap(&mut cur, &mut next);
    }
    cur
}

/// Shrink the set by `radius` hops: a cell survives only if its whole ball is set.
pub fn erosion(a: &Uint8Raster, radius: u32) -> Uint8Raster {
    let grid = a.grid();
    let mut cur = a.map(|&v| u8::from(v != 0));
    let mut next = cur.clone();
    for _ in 0..radius {
        for i in 0..grid.cells {
            next[i] = u8::from(cur[i] != 0 && grid.n1[i].iter().all(|&j| cur[j as usize] != 0));
        }
        std::mem::swap(&mut cur, &mut next);
    }
    cur
}

/// Erosion then dilation: removes features thinner than the structuring ball.
pub fn opening(a: &Uint8Raster, radius: u32) -> Uint8Raster {
    dilation(&erosion(a, radius), radius)
}

/// Dilation then erosion: fills gaps thinner than the structuring ball.
pub fn closing(a: &Uint8Raster, radius: u32) -> Uint8Raster {
    erosion(&dilation(a, radius), radius)
}

/// `a − opening(a)`.
pub fn white_top_hat(a: &Uint8Raster, radius: u32) -> Uint8Raster {
    difference(a, &opening(a, radius))
}

/// `closing(a) − a`.
pub fn black_top_hat(a: &Uint8Raster, radius: u32) -> Uint8Raster {
    difference(&closing(a, radius), a)
}

/// Cells of `a` within `radius` hops of a cell outside `a`.
pub fn margin(a: &Uint8Raster, radius: u32) -> Uint8Raster {
    difference(a, &erosion(a, radius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use std::sync::Arc;

    #[test]
    fn top_hats_are_disjoint_from_their_complements() {
        let g = Arc::new(Grid::new(2));
        let a = Uint8Raster::from_fn(&g, |i| u8::from(g.pos_xyz[i][0] > 0.2 || i % 17 == 0));
        let w = white_top_hat(&a, 1);
        let b = black_top_hat(&a, 1);
        assert_eq!(count(&intersection(&w, &negation(&a))), 0);
        assert_eq!(count(&intersection(&b, &a)), 0);
        // isolated specks sit in the white top hat
        let speck = (0..g.cells).find(|&i| i % 17 == 0 && g.pos_xyz[i][0] < -0.5);
        if let Some(s) = speck {
            assert_eq!(w[s], 1);
        }
    }

    #[test]
    fn margin_touches_outside() {
        let g = Arc::new(Grid::new(2));
        let a = Uint8Raster::from_fn(&g, |i| u8::from(g.pos_xyz[i][2] > 0.0));
        let m = margin(&a, 1);
        for i in 0..g.cells {
            let touches = g.n1[i].iter().any(|&j| a[j as usize] == 0);
            assert_eq!(m[i] != 0, a[i] != 0 && touches, "cell {i}");
        }
    }
}
