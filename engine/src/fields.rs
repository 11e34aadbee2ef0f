//! Read-only field getters for consumers of the simulation (renderers, exporters).
//!
//! Getters merge per-plate rasters into whole-world rasters: each vertex takes the value
//! of the first plate owning it, and unowned vertices read 0. A getter may reuse a
//! caller-provided raster for its result; the caller owns that buffer. Getters that
//! resolve vertex owners also take an optional scratch raster for that index; its
//! contents are overwritten. [`plate_ids`] and [`plate_mask`] copy straight into their
//! result and need no scratch.

use std::collections::BTreeMap;
use std::fmt;

use crate::geo;
use crate::isostasy;
use crate::plates::{Plate, PlateId};
use crate::raster::segmentation::NO_LABEL;
use crate::raster::{AnyScalarRaster, Float32Raster, Uint16Raster, Uint8Raster, VectorRaster};
use crate::world::World;

fn reuse<T: Copy>(world: &World, out: Option<crate::raster::Raster<T>>, fill: T) -> crate::raster::Raster<T> {
    match out {
        Some(mut r) => {
            r.assert_on_grid(&world.grid);
            r.fill(fill);
            r
        }
        None => crate::raster::Raster::new(&world.grid, fill),
    }
}

fn with_owner<R>(world: &World, scratch: Option<&mut Uint16Raster>, f: impl FnOnce(&Uint16Raster) -> R) -> R {
    match scratch {
        Some(buf) => {
            world.owner_into(buf);
            f(buf)
        }
        None => f(&world.owner()),
    }
}

fn merged(
    world: &World,
    out: Option<Float32Raster>,
    scratch: Option<&mut Uint16Raster>,
    value: impl Fn(&Plate, usize) -> f32,
) -> Float32Raster {
    let mut r = reuse(world, out, 0.0);
    with_owner(world, scratch, |owner| {
        for i in 0..r.len() {
            let o = owner[i];
            if o != NO_LABEL {
                r[i] = value(&world.plates[o as usize], i);
            }
        }
    });
    r
}

/// Surface elevation relative to sea level (m).
pub fn elevation(world: &World, out: Option<Float32Raster>, scratch: Option<&mut Uint16Raster>) -> Float32Raster {
    merged(world, out, scratch, |p, i| p.elevation[i])
}

/// Crust thickness (m).
pub fn thickness(world: &World, out: Option<Float32Raster>, scratch: Option<&mut Uint16Raster>) -> Float32Raster {
    merged(world, out, scratch, |p, i| p.thickness[i])
}

/// Crust density (kg/m³).
pub fn density(world: &World, out: Option<Float32Raster>, scratch: Option<&mut Uint16Raster>) -> Float32Raster {
    merged(world, out, scratch, |p, i| p.density[i])
}

/// Crust age (Myr).
pub fn age(world: &World, out: Option<Float32Raster>, scratch: Option<&mut Uint16Raster>) -> Float32Raster {
    merged(world, out, scratch, |p, i| p.age[i])
}

/// Subductability of the effective density (0..1).
pub fn subductability(world: &World, out: Option<Float32Raster>, scratch: Option<&mut Uint16Raster>) -> Float32Raster {
    merged(world, out, scratch, |p, i| isostasy::subductability(p.effective_density(i)))
}

/// Index of the owning plate per vertex, `NO_LABEL` where none.
pub fn plate_ids(world: &World, out: Option<Uint16Raster>) -> Uint16Raster {
    let mut r = reuse(world, out, NO_LABEL);
    r.copy_from(&world.owner());
    r
}

/// Mask of plate `id`; `None` when no such plate is alive.
pub fn plate_mask(world: &World, id: PlateId, out: Option<Uint8Raster>) -> Option<Uint8Raster> {
    let plate = world.plate(id)?;
    let mut r = reuse(world, out, 0);
    r.copy_from(&plate.mask);
    Some(r)
}

/// Surface velocity `ω × r` of the owning plate (rad/Myr of arc).
pub fn velocity(world: &World, out: Option<VectorRaster>, scratch: Option<&mut Uint16Raster>) -> VectorRaster {
    let mut r = reuse(world, out, [0.0; 3]);
    with_owner(world, scratch, |owner| {
        for i in 0..r.len() {
            let o = owner[i];
            if o != NO_LABEL {
                r[i] = world.plates[o as usize].velocity_at(i);
            }
        }
    });
    r
}

/// Surface speed in km/Myr.
pub fn speed(world: &World, out: Option<Float32Raster>, scratch: Option<&mut Uint16Raster>) -> Float32Raster {
    let radius = world.config.radius_km;
    merged(world, out, scratch, |p, i| geo::norm32(p.velocity_at(i)) * radius)
}

/// A named scalar getter as stored in a [`FieldRegistry`].
pub type ScalarGetter = fn(&World) -> Option<AnyScalarRaster>;

/// Explicit name → getter table, built once and passed by reference.
#[derive(Clone, Default)]
pub struct FieldRegistry {
    getters: BTreeMap<String, ScalarGetter>,
}

impl FieldRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in scalar field.
    pub fn builtin() -> Self {
        let mut r = Self::new();
        r.register("elevation", |w| Some(AnyScalarRaster::F32(elevation(w, None, None))));
        r.register("thickness", |w| Some(AnyScalarRaster::F32(thickness(w, None, None))));
        r.register("density", |w| Some(AnyScalarRaster::F32(density(w, None, None))));
        r.register("age", |w| Some(AnyScalarRaster::F32(age(w, None, None))));
        r.register("subductability", |w| Some(AnyScalarRaster::F32(subductability(w, None, None))));
        r.register("speed", |w| Some(AnyScalarRaster::F32(speed(w, None, None))));
        r.register("plate_ids", |w| Some(AnyScalarRaster::U16(plate_ids(w, None))));
        r.register("largest_plate_mask", |w| {
            let largest = w.plates.iter().max_by_key(|p| p.get_size())?;
            plate_mask(w, largest.id, None).map(AnyScalarRaster::U8)
        });
        r
    }

    /// Add or replace a getter.
    pub fn register(&mut self, name: &str, getter: ScalarGetter) {
        self.getters.insert(name.to_owned(), getter);
    }

    /// Getter registered under `name`.
    pub fn get(&self, name: &str) -> Option<ScalarGetter> {
        self.getters.get(name).copied()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.getters.keys().map(String::as_str)
    }
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.getters.keys()).finish()
    }
}

/// One named field pulled every frame by a consumer.
///
/// A missing getter or missing data is reported once at warn level, then the feed stays
/// quiet until it produces data again.
#[derive(Clone)]
pub struct FieldFeed {
    name: String,
    getter: Option<ScalarGetter>,
    warned: bool,
}

impl FieldFeed {
    /// Feed for `name` looked up in `registry`.
    pub fn new(registry: &FieldRegistry, name: &str) -> Self {
        Self { name: name.to_owned(), getter: registry.get(name), warned: false }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current field widened to f32, or `None` when there is nothing to show.
    pub fn fetch(&mut self, world: &World) -> Option<Float32Raster> {
        match self.getter.and_then(|g| g(world)) {
            Some(r) => {
                self.warned = false;
                Some(r.into_f32())
            }
            None => {
                if !self.warned {
                    log::warn!("[fields] no raster for field '{}'; skipping", self.name);
                    self.warned = true;
                }
                None
            }
        }
    }

    /// Whether the current gap has already been reported.
    pub fn has_warned(&self) -> bool {
        self.warned
    }
}

impl fmt::Debug for FieldFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldFeed")
            .field("name", &self.name)
            .field("registered", &self.getter.is_some())
            .field("warned", &self.warned)
            .finish()
    }
}
