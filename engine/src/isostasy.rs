//! Rock columns and Airy isostasy.
//!
//! A column floats on the mantle: its freeboard is the part of its thickness not
//! compensated by the mantle root. Columns that end up below sea level carry a water
//! load, which deepens them further.

use serde::{Deserialize, Serialize};

use crate::geo;

/// Depth of the ocean surface above the reference datum (m).
pub const SEALEVEL: f32 = 3682.0;
/// Upper mantle density (kg/m³).
pub const MANTLE_DENSITY: f32 = 3300.0;
/// Sea water density (kg/m³).
pub const WATER_DENSITY: f32 = 1026.0;

/// One cell's geology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RockColumn {
    /// Surface elevation relative to sea level (m)
    pub elevation: f32,
    /// Crust thickness (m)
    pub thickness: f32,
    /// Mean crust density (kg/m³)
    pub density: f32,
}

impl RockColumn {
    /// Fresh oceanic crust (Charette & Smith 2010; White, McKenzie & O'Nions 1992;
    /// Carlson & Raskin 1984).
    pub const OCEAN: RockColumn = RockColumn { elevation: -3682.0, thickness: 7100.0, density: 2890.0 };

    /// Continental shield (Sverdrup & Fleming 1942; Zandt & Ammon 1995).
    pub const LAND: RockColumn = RockColumn { elevation: 840.0, thickness: 36900.0, density: 2700.0 };

    /// The same column with `elevation` recomputed from thickness and density.
    pub fn isostasy(self) -> RockColumn {
        RockColumn { elevation: isostatic_elevation(self.thickness, self.density), ..self }
    }

    /// Lighter than the midpoint between the two templates.
    pub fn is_continental(&self) -> bool {
        is_continental_density(self.density)
    }
}

/// Equilibrium elevation (m, relative to sea level) of a column.
///
/// Increases with thickness and decreases with density.
pub fn isostatic_elevation(thickness: f32, density: f32) -> f32 {
    let freeboard = thickness * (1.0 - density / MANTLE_DENSITY) - SEALEVEL;
    if freeboard < 0.0 {
        freeboard * MANTLE_DENSITY / (MANTLE_DENSITY - WATER_DENSITY)
    } else {
        freeboard
    }
}

/// Thickness change that raises a column of `density` by `d_elevation` above sea level.
pub fn thickness_for_uplift(d_elevation: f32, density: f32) -> f32 {
    let buoyancy = 1.0 - density / MANTLE_DENSITY;
    if buoyancy <= 0.0 {
        0.0
    } else {
        d_elevation / buoyancy
    }
}

/// Continental crust test on density alone.
pub fn is_continental_density(density: f32) -> bool {
    density < 0.5 * (RockColumn::LAND.density + RockColumn::OCEAN.density)
}

/// Tendency to sink (0 for shield crust, 1 for fresh ocean floor) of a cell with
/// `effective_density` = cell density + plate density offset.
pub fn subductability(effective_density: f32) -> f32 {
    geo::smoothstep(RockColumn::LAND.density, RockColumn::OCEAN.density, effective_density)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn isostasy_is_idempotent() {
        let c = RockColumn::OCEAN.isostasy();
        assert_eq!(c, c.isostasy());
        assert!(c.elevation < 0.0);
        assert!(RockColumn::LAND.isostasy().elevation > 0.0);
    }

    #[test]
    fn thicker_and_lighter_rides_higher() {
        assert!(isostatic_elevation(30_000.0, 2800.0) > isostatic_elevation(20_000.0, 2800.0));
        assert!(isostatic_elevation(30_000.0, 2700.0) > isostatic_elevation(30_000.0, 2900.0));
        // monotone across the shoreline too
        assert!(isostatic_elevation(20_300.0, 2700.0) > isostatic_elevation(20_200.0, 2700.0));
    }

    #[test]
    fn uplift_inverts_isostasy_above_sea_level() {
        let t = 40_000.0;
        let e0 = isostatic_elevation(t, 2700.0);
        let dt = thickness_for_uplift(-100.0, 2700.0);
        assert_relative_eq!(isostatic_elevation(t + dt, 2700.0), e0 - 100.0, epsilon = 0.01);
    }

    #[test]
    fn templates_classify() {
        assert!(RockColumn::LAND.is_continental());
        assert!(!RockColumn::OCEAN.is_continental());
        assert_eq!(subductability(2600.0), 0.0);
        assert_eq!(subductability(3000.0), 1.0);
    }
}
