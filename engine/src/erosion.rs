//! Slope-limited erosion of land cells.
//!
//! Each land cell loses `rate · dt · slope` metres, where slope is the in-plate
//! gradient magnitude of elevation divided by the planet radius. The loss is capped at
//! the cell's highest strictly lower in-plate neighbor, so a cell that stood above a
//! neighbor never ends below it. Thickness drops by the amount that keeps isostasy in
//! agreement with the new elevation.

use serde::{Deserialize, Serialize};

use crate::isostasy;
use crate::plates::Plate;
use crate::raster::scalar::tangent_gradient;

/// Parameters controlling land erosion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionParams {
    /// Elevation loss per Myr at unit slope (m/Myr)
    pub rate_m_per_myr: f32,
}

impl Default for ErosionParams {
    fn default() -> Self {
        Self { rate_m_per_myr: 1000.0 }
    }
}

/// Stats of one erosion pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ErosionStats {
    /// Cells that lost elevation
    pub cells_eroded: usize,
    /// Largest single-cell loss (m)
    pub max_drop_m: f32,
}

impl Plate {
    /// Erode land cells for `dt_myr` on a planet of `radius_km`.
    pub fn erode(&mut self, dt_myr: f64, params: &ErosionParams, radius_km: f32) -> ErosionStats {
        let mut stats = ErosionStats::default();
        if dt_myr <= 0.0 || params.rate_m_per_myr <= 0.0 {
            return stats;
        }
        let grid = std::sync::Arc::clone(self.grid());
        let radius_m = radius_km as f64 * 1000.0;
        let k = params.rate_m_per_myr as f64 * dt_myr;

        let mut drops: Vec<(usize, f32, f32)> = Vec::new();
        for i in 0..grid.cells {
            let e = self.elevation[i];
            if !self.owns(i) || e <= 0.0 {
                continue;
            }
            // unowned neighbors read as flat so plate edges don't count as slope
            let g = tangent_gradient(&grid, i, |j| {
                if self.owns(j) {
                    self.elevation[j] as f64
                } else {
                    e as f64
                }
            });
            let slope = crate::geo::norm32(g) as f64 / radius_m;
            let floor = grid.n1[i]
                .iter()
                .map(|&j| j as usize)
                .filter(|&j| self.owns(j) && self.elevation[j] < e)
                .map(|j| self.elevation[j])
                .fold(None, |m: Option<f32>, v| Some(m.map_or(v, |m| m.max(v))));
            let Some(floor) = floor else { continue };
            let drop = ((k * slope) as f32).min(e - floor);
            if drop > 0.0 {
                drops.push((i, drop, floor));
            }
        }

        for &(i, drop, floor) in &drops {
            // clamp so rounding cannot take the cell below its floor
            let e = (self.elevation[i] - drop).max(floor);
            let drop = self.elevation[i] - e;
            self.elevation[i] = e;
            self.thickness[i] = (self.thickness[i] + isostasy::thickness_for_uplift(-drop, self.density[i])).max(0.0);
            stats.max_drop_m = stats.max_drop_m.max(drop);
        }
        stats.cells_eroded = drops.len();
        log::debug!(
            "[erosion] plate={} cells={} max_drop_m={:.2}",
            self.id.0,
            stats.cells_eroded,
            stats.max_drop_m
        );
        stats
    }
}
