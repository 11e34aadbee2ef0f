//! Rifting: plates fill the gaps that open behind them with fresh ocean crust.

use crate::boundaries::{Boundaries, EdgeClass};
use crate::isostasy::RockColumn;
use crate::plates::Plate;
use crate::raster::{morphology, Uint16Raster, Uint8Raster};

/// Which gap vertices a rift pass may claim.
#[derive(Debug, Clone, Copy)]
pub enum RiftMode<'a> {
    /// Only gaps inside the plate's tension zone (see [`tension_zone`])
    Tension(&'a Uint8Raster),
    /// Any gap touching the plate (fills holes left by resampling)
    Any,
}

/// Vertices where plate `plate` (an index into the plate list behind `owner`) was
/// pulling away from a neighboring plate, widened by `hops` rings.
///
/// `owner` and `boundaries` describe the plates before they moved; both endpoints of
/// every divergent edge touching the plate are marked.
pub fn tension_zone(boundaries: &Boundaries, owner: &Uint16Raster, plate: u16, hops: u32) -> Uint8Raster {
    let mut zone = Uint8Raster::new(owner.grid(), 0);
    for &(u, v, class) in &boundaries.edges {
        let (u, v) = (u as usize, v as usize);
        if class == EdgeClass::Divergent && (owner[u] == plate || owner[v] == plate) {
            zone[u] = 1;
            zone[v] = 1;
        }
    }
    morphology::dilation(&zone, hops)
}

impl Plate {
    /// Claim unowned, uncovered vertices next to this plate as new ocean cells.
    ///
    /// `coverage` marks vertices owned by any plate and is updated with the claims. In
    /// [`RiftMode::Tension`] a gap is claimed only inside the given zone, so plates
    /// converging with every neighbor claim nothing. One pass grows the plate by at most
    /// one ring of cells. Returns the number of claimed vertices.
    pub fn rift(&mut self, coverage: &mut Uint8Raster, mode: RiftMode<'_>) -> usize {
        coverage.assert_same_grid(&self.mask);
        if let RiftMode::Tension(zone) = mode {
            zone.assert_same_grid(&self.mask);
        }
        let grid = std::sync::Arc::clone(self.grid());
        let ocean = RockColumn::OCEAN.isostasy();

        let mut claims: Vec<usize> = Vec::new();
        for g in 0..grid.cells {
            if coverage[g] != 0 {
                continue;
            }
            let open = match mode {
                RiftMode::Any => true,
                RiftMode::Tension(zone) => zone[g] != 0,
            };
            if open && grid.n1[g].iter().any(|&c| self.owns(c as usize)) {
                claims.push(g);
            }
        }

        for &g in &claims {
            self.set_cell(g, ocean, 0.0);
            coverage[g] = 1;
        }
        if !claims.is_empty() {
            self.update_borders();
            let pass = if matches!(mode, RiftMode::Any) { "any" } else { "tension" };
            log::debug!("[rift] plate={} pass={} claimed={}", self.id.0, pass, claims.len());
        }
        claims.len()
    }
}
