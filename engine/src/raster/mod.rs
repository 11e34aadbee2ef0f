//! Grid-bound rasters and the algebra over them.
//!
//! A [`Raster`] is a plain array with one element per grid vertex, tagged with the
//! `Arc<Grid>` it was built against. Operations are free functions grouped by
//! paradigm: [`scalar`] and [`vector`] calculus, binary [`morphology`], and region
//! [`segmentation`]. Mixing rasters from different grids, or building a raster
//! whose length differs from the grid's vertex count, is a programmer error and
//! panics immediately.

pub mod morphology;
pub mod scalar;
pub mod scratch;
pub mod segmentation;
pub mod vector;

pub use scratch::ScratchArena;

use crate::grid::Grid;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

/// Fixed-length array indexed 1:1 with the vertices of its owning grid.
#[derive(Clone)]
pub struct Raster<T> {
    grid: Arc<Grid>,
    data: Vec<T>,
}

/// 0/1 masks and small labels.
pub type Uint8Raster = Raster<u8>;
/// Plate labels and vertex ids.
pub type Uint16Raster = Raster<u16>;
/// Signed integer field.
pub type Int32Raster = Raster<i32>;
/// Scalar field.
pub type Float32Raster = Raster<f32>;
/// Vector field (one xyz vector per vertex).
pub type VectorRaster = Raster<[f32; 3]>;

impl<T: Copy> Raster<T> {
    /// New raster filled with `fill`.
    pub fn new(grid: &Arc<Grid>, fill: T) -> Self {
        Self { grid: Arc::clone(grid), data: vec![fill; grid.cells] }
    }

    /// Wrap existing data. Panics if `data.len() != grid.cells`.
    pub fn from_vec(grid: &Arc<Grid>, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            grid.cells,
            "raster length {} does not match grid vertex count {}",
            data.len(),
            grid.cells
        );
        Self { grid: Arc::clone(grid), data }
    }

    /// Build element-by-element from the vertex index.
    pub fn from_fn(grid: &Arc<Grid>, f: impl FnMut(usize) -> T) -> Self {
        Self { grid: Arc::clone(grid), data: (0..grid.cells).map(f).collect() }
    }

    /// Owning grid.
    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    /// Number of elements (always the grid's vertex count).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True only for a raster on an empty grid.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable element slice (length is fixed).
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterate elements in vertex order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Overwrite every element with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Copy another raster's contents into this one.
    pub fn copy_from(&mut self, other: &Raster<T>) {
        self.assert_same_grid(other);
        self.data.copy_from_slice(&other.data);
    }

    /// Elementwise map into a new raster on the same grid.
    pub fn map<U: Copy>(&self, f: impl FnMut(&T) -> U) -> Raster<U> {
        Raster { grid: Arc::clone(&self.grid), data: self.data.iter().map(f).collect() }
    }

    /// True when both rasters are bound to the same grid instance.
    pub fn same_grid<U>(&self, other: &Raster<U>) -> bool {
        Arc::ptr_eq(&self.grid, &other.grid)
    }

    /// Panic unless `other` shares this raster's grid.
    pub fn assert_same_grid<U>(&self, other: &Raster<U>) {
        assert!(self.same_grid(other), "raster operands are bound to different grids");
    }

    /// Panic unless this raster is bound to `grid`.
    pub fn assert_on_grid(&self, grid: &Arc<Grid>) {
        assert!(Arc::ptr_eq(&self.grid, grid), "raster is bound to a different grid");
    }

    /// Consume into the raw element vector.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T> Index<usize> for Raster<T> {
    type Output = T;
    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T> IndexMut<usize> for Raster<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

impl<T: PartialEq> PartialEq for Raster<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.grid, &other.grid) && self.data == other.data
    }
}

impl<T: fmt::Debug> fmt::Debug for Raster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster").field("len", &self.data.len()).finish_non_exhaustive()
    }
}

/// Numeric element types a scalar raster may hold.
///
/// Integer arithmetic wraps, so `a + b - b == a` holds exactly.
pub trait Numeric: Copy + PartialOrd + Default + fmt::Debug {
    /// Sum.
    fn add(self, o: Self) -> Self;
    /// Difference.
    fn sub(self, o: Self) -> Self;
    /// Product.
    fn mul(self, o: Self) -> Self;
    /// Quotient (integer division by zero yields zero).
    fn div(self, o: Self) -> Self;
    /// Widen to f32.
    fn to_f32(self) -> f32;
}

macro_rules! impl_numeric_int {
    ($($t:ty),*) => {$(
        impl Numeric for $t {
            #[inline] fn add(self, o: Self) -> Self { self.wrapping_add(o) }
            #[inline] fn sub(self, o: Self) -> Self { self.wrapping_sub(o) }
            #[inline] fn mul(self, o: Self) -> Self { self.wrapping_mul(o) }
            #[inline] fn div(self, o: Self) -> Self { self.checked_div(o).unwrap_or(0) }
            #[inline] fn to_f32(self) -> f32 { self as f32 }
        }
    )*};
}
impl_numeric_int!(u8, u16, i32);

impl Numeric for f32 {
    #[inline]
    fn add(self, o: Self) -> Self {
        self + o
    }
    #[inline]
    fn sub(self, o: Self) -> Self {
        self - o
    }
    #[inline]
    fn mul(self, o: Self) -> Self {
        self * o
    }
    #[inline]
    fn div(self, o: Self) -> Self {
        self / o
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

impl<T: Numeric> Raster<T> {
    /// Widen any numeric raster to f32.
    pub fn to_float(&self) -> Float32Raster {
        self.map(|v| v.to_f32())
    }
}

impl Float32Raster {
    /// Explicit narrowing: truncate toward zero, saturating at the u16 range (NaN → 0).
    pub fn to_u16(&self) -> Uint16Raster {
        self.map(|&v| v as u16)
    }

    /// Explicit narrowing: truncate toward zero, saturating at the u8 range (NaN → 0).
    pub fn to_u8(&self) -> Uint8Raster {
        self.map(|&v| v as u8)
    }

    /// Explicit narrowing: truncate toward zero, saturating at the i32 range (NaN → 0).
    pub fn to_i32(&self) -> Int32Raster {
        self.map(|&v| v as i32)
    }
}

impl Uint8Raster {
    /// Widen labels/masks to u16.
    pub fn to_u16(&self) -> Uint16Raster {
        self.map(|&v| u16::from(v))
    }
}

/// A scalar raster of any supported element type, as produced by field getters.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyScalarRaster {
    /// 8-bit masks/labels
    U8(Uint8Raster),
    /// 16-bit labels/ids
    U16(Uint16Raster),
    /// Float field
    F32(Float32Raster),
}

impl AnyScalarRaster {
    /// Widen to a float raster (the only representation consumers render).
    pub fn into_f32(self) -> Float32Raster {
        match self {
            Self::U8(r) => r.to_float(),
            Self::U16(r) => r.to_float(),
            Self::F32(r) => r,
        }
    }

    /// Owning grid.
    pub fn grid(&self) -> &Arc<Grid> {
        match self {
            Self::U8(r) => r.grid(),
            Self::U16(r) => r.grid(),
            Self::F32(r) => r.grid(),
        }
    }
}

/// Resample `raster` at arbitrary query positions: each output element copies the value
/// of the grid vertex nearest to the matching position.
///
/// Resampling at the grid's own positions reproduces `raster` exactly.
pub fn get_nearest_values<T: Copy>(raster: &Raster<T>, positions: &VectorRaster) -> Raster<T> {
    let mut out = raster.clone();
    get_nearest_values_into(raster, positions, &mut out);
    out
}

/// [`get_nearest_values`] writing into a caller-owned output (must not alias `raster`).
pub fn get_nearest_values_into<T: Copy>(
    raster: &Raster<T>,
    positions: &VectorRaster,
    out: &mut Raster<T>,
) {
    raster.assert_same_grid(positions);
    raster.assert_same_grid(out);
    let grid = raster.grid();
    for i in 0..grid.cells {
        let j = grid.nearest(positions[i], i);
        out.data[i] = raster.data[j];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "does not match grid vertex count")]
    fn wrong_length_panics() {
        let g = Arc::new(Grid::new(1));
        let _ = Raster::from_vec(&g, vec![0.0f32; 3]);
    }

    #[test]
    fn narrowing_truncates() {
        let g = Arc::new(Grid::new(0));
        let r = Raster::from_fn(&g, |i| i as f32 + 0.9);
        let u = r.to_u16();
        assert_eq!(u[3], 3);
        assert_eq!(Raster::new(&g, -4.0f32).to_u8()[0], 0);
    }

    #[test]
    fn any_raster_widens() {
        let g = Arc::new(Grid::new(0));
        let any = AnyScalarRaster::U8(Raster::new(&g, 1u8));
        assert_eq!(any.into_f32(), Raster::new(&g, 1.0f32));
    }
}
