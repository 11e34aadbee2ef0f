//! Lithos engine: raster field algebra on a geodesic sphere and a plate tectonics
//! lifecycle built on top of it.
//!
//! Rasters ([`raster`]) are flat per-vertex arrays bound to one shared [`grid::Grid`].
//! Plates ([`plates`]) own a subset of the vertices and carry rock columns; a
//! [`world::World`] steps them through move, erode, rift and deform phases.
#![deny(missing_docs)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::dbg_macro, clippy::large_enum_variant)]

pub mod boundaries;
pub mod config;
pub mod erosion;
pub mod fields;
pub mod geo;
pub mod grid;
pub mod isostasy;
pub mod plates;
pub mod random;
pub mod raster;
pub mod rifting;
pub mod subduction;
pub mod supercontinent;
pub mod world;

pub use config::{ConfigError, WorldConfig};
pub use grid::Grid;
pub use plates::{Plate, PlateId};
pub use world::{PlateObserver, StepStats, World};

/// Returns the engine version string from Cargo metadata.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
