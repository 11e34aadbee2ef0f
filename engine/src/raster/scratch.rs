//! Named scratch buffers sized once per grid.

use std::sync::Arc;

use super::{Float32Raster, Uint8Raster, VectorRaster};
use crate::grid::Grid;

/// Reusable working rasters, passed as `&mut` to the operations that need them.
///
/// Contents are unspecified on entry to any call that takes the arena.
#[derive(Debug, Clone)]
pub struct ScratchArena {
    /// Asthenosphere pressure and other scalar intermediates
    pub pressure: Float32Raster,
    /// Diffusion double buffer
    pub smoothed: Float32Raster,
    /// Working mask
    pub mask: Uint8Raster,
    /// Vector intermediates (gradients, rotated positions)
    pub vectors: VectorRaster,
}

impl ScratchArena {
    /// Allocate all buffers for `grid`.
    pub fn new(grid: &Arc<Grid>) -> Self {
        Self {
            pressure: Float32Raster::new(grid, 0.0),
            smoothed: Float32Raster::new(grid, 0.0),
            mask: Uint8Raster::new(grid, 0),
            vectors: VectorRaster::new(grid, [0.0; 3]),
        }
    }

    /// Grid the buffers are sized for.
    pub fn grid(&self) -> &Arc<Grid> {
        self.pressure.grid()
    }
}
