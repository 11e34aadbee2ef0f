//! World configuration.
//!
//! Defaults reproduce early-Earth values. Every field is optional when deserialized;
//! missing fields take their default.

use serde::{Deserialize, Serialize};

use crate::erosion::ErosionParams;
use crate::plates::SplitParams;

/// Invalid configuration values.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Field must be strictly positive and finite
    #[error("{field} must be positive and finite, got {value}")]
    NonPositive {
        /// Field name
        field: &'static str,
        /// Offending value
        value: f64,
    },
    /// Field must be zero or positive and finite
    #[error("{field} must be non-negative and finite, got {value}")]
    Negative {
        /// Field name
        field: &'static str,
        /// Offending value
        value: f64,
    },
    /// Field outside its allowed interval
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Offending value
        value: f64,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Supercontinent cycle bounds are inverted
    #[error("cycle duration range [{min}, {max}] Myr is empty")]
    CycleRange {
        /// Shortest cycle
        min: f32,
        /// Longest cycle
        max: f32,
    },
}

/// Parameters for a [`crate::world::World`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Planet radius (km)
    pub radius_km: f32,
    /// Target plate count for [`crate::world::World::split`]
    pub plates_num: usize,
    /// Radius of the initial continental shield (km)
    pub continent_radius_km: f32,
    /// Width over which collision thickening spreads (km)
    pub mountain_width_km: f32,
    /// Plates at or below this many cells are deleted
    pub min_plate_size: usize,
    /// Seed for the shield position, generators, and supercontinent cycle
    pub seed: u64,
    /// Shortest supercontinent cycle (Myr)
    pub cycle_min_duration_myr: f32,
    /// Longest supercontinent cycle (Myr)
    pub cycle_max_duration_myr: f32,
    /// Land erosion
    pub erosion: ErosionParams,
    /// Plate splitting
    pub split: SplitParams,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            radius_km: 6367.0,
            plates_num: 7,
            continent_radius_km: 1250.0,
            mountain_width_km: 300.0,
            min_plate_size: 100,
            seed: 0,
            cycle_min_duration_myr: 150.0,
            cycle_max_duration_myr: 500.0,
            erosion: ErosionParams::default(),
            split: SplitParams::default(),
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value: value as f64 })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value: value as f64 })
    }
}

impl WorldConfig {
    /// Check every field; the first violation is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("radius_km", self.radius_km)?;
        if self.plates_num == 0 {
            return Err(ConfigError::OutOfRange {
                field: "plates_num",
                value: 0.0,
                min: 1.0,
                max: u16::MAX as f64,
            });
        }
        non_negative("continent_radius_km", self.continent_radius_km)?;
        non_negative("mountain_width_km", self.mountain_width_km)?;
        positive("cycle_min_duration_myr", self.cycle_min_duration_myr)?;
        positive("cycle_max_duration_myr", self.cycle_max_duration_myr)?;
        if self.cycle_min_duration_myr > self.cycle_max_duration_myr {
            return Err(ConfigError::CycleRange {
                min: self.cycle_min_duration_myr,
                max: self.cycle_max_duration_myr,
            });
        }
        non_negative("erosion.rate_m_per_myr", self.erosion.rate_m_per_myr)?;
        let rate = self.split.pressure_smoothing_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::OutOfRange {
                field: "split.pressure_smoothing_rate",
                value: rate as f64,
                min: 0.0,
                max: 1.0,
            });
        }
        let cos = self.split.plate_map.wand.min_cosine;
        if !(-1.0..=1.0).contains(&cos) {
            return Err(ConfigError::OutOfRange {
                field: "split.plate_map.wand.min_cosine",
                value: cos as f64,
                min: -1.0,
                max: 1.0,
            });
        }
        if self.split.plate_map.max_regions == 0 {
            return Err(ConfigError::OutOfRange {
                field: "split.plate_map.max_regions",
                value: 0.0,
                min: 1.0,
                max: u16::MAX as f64,
            });
        }
        Ok(())
    }

    /// Convert a surface distance (km) to a central angle (radians).
    pub fn km_to_angle(&self, km: f32) -> f64 {
        km as f64 / self.radius_km as f64
    }
}
