//! Plates: rigid cell partitions carrying rock-column rasters and an Euler rotation.
//!
//! A plate stores its fields structure-of-arrays as full-grid rasters. `mask` marks the
//! cells it owns; the other rasters are meaningful only where `mask` is set.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geo;
use crate::grid::Grid;
use crate::isostasy::{self, RockColumn};
use crate::random::Generator;
use crate::raster::segmentation::{self, PlateMapParams, NO_LABEL};
use crate::raster::{
    self, morphology, scalar, vector, Float32Raster, ScratchArena, Uint16Raster, Uint8Raster,
};

/// Stable plate identity, allocated in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlateId(pub u64);

/// Allocator handing out fresh [`PlateId`]s.
#[derive(Debug, Clone, Default)]
pub struct PlateIds {
    next: u64,
}

impl PlateIds {
    /// Allocator whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Next unused id.
    pub fn allocate(&mut self) -> PlateId {
        let id = PlateId(self.next);
        self.next += 1;
        id
    }
}

/// Read-only view of one plate cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Grid vertex id
    pub id: usize,
    /// Unit-sphere position
    pub position: [f32; 3],
    /// Rock column, `None` when the plate does not own the vertex
    pub content: Option<RockColumn>,
    /// Crust age (Myr)
    pub age: f32,
    /// Touches a vertex outside the plate
    pub is_border: bool,
}

/// Parameters of [`Plate::split`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitParams {
    /// Diffusion rate used to turn subductability into asthenosphere pressure
    pub pressure_smoothing_rate: f32,
    /// Diffusion rounds
    pub pressure_smoothing_iterations: u32,
    /// Segmentation of the resulting angular-velocity field
    pub plate_map: PlateMapParams,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self { pressure_smoothing_rate: 0.5, pressure_smoothing_iterations: 10, plate_map: PlateMapParams::default() }
    }
}

/// A rigid plate.
#[derive(Debug, Clone, PartialEq)]
pub struct Plate {
    /// Identity
    pub id: PlateId,
    /// 1 where the plate owns the vertex
    pub mask: Uint8Raster,
    /// Elevation relative to sea level (m)
    pub elevation: Float32Raster,
    /// Crust thickness (m)
    pub thickness: Float32Raster,
    /// Crust density (kg/m³)
    pub density: Float32Raster,
    /// Crust age (Myr)
    pub age: Float32Raster,
    /// 1 on owned cells that touch the outside
    pub border: Uint8Raster,
    /// Euler vector: rotation axis scaled by angular speed (rad/Myr)
    pub angular_velocity: [f32; 3],
    /// Added to every cell density when comparing plates (kg/m³)
    pub density_offset: f32,
    /// Plates sharing a border with this one, in plate-list order
    pub neighbors: Vec<PlateId>,
}

impl Plate {
    /// Plate owning no cells.
    pub fn new(id: PlateId, grid: &Arc<Grid>) -> Self {
        Self {
            id,
            mask: Uint8Raster::new(grid, 0),
            elevation: Float32Raster::new(grid, 0.0),
            thickness: Float32Raster::new(grid, 0.0),
            density: Float32Raster::new(grid, 0.0),
            age: Float32Raster::new(grid, 0.0),
            border: Uint8Raster::new(grid, 0),
            angular_velocity: [0.0; 3],
            density_offset: 0.0,
            neighbors: Vec::new(),
        }
    }

    /// Plate built from a per-vertex column choice; `None` leaves the vertex unowned.
    pub fn from_columns(id: PlateId, grid: &Arc<Grid>, mut column: impl FnMut(usize) -> Option<RockColumn>) -> Self {
        let mut plate = Self::new(id, grid);
        for i in 0..grid.cells {
            if let Some(c) = column(i) {
                plate.set_cell(i, c, 0.0);
            }
        }
        plate.update_borders();
        plate
    }

    /// Grid the plate lives on.
    pub fn grid(&self) -> &Arc<Grid> {
        self.mask.grid()
    }

    /// Whether the plate owns vertex `i`.
    #[inline]
    pub fn owns(&self, i: usize) -> bool {
        self.mask[i] != 0
    }

    /// Rock column at `i`, if owned.
    pub fn column(&self, i: usize) -> Option<RockColumn> {
        self.owns(i).then(|| RockColumn {
            elevation: self.elevation[i],
            thickness: self.thickness[i],
            density: self.density[i],
        })
    }

    /// Take ownership of `i` with the given column and crust age.
    pub fn set_cell(&mut self, i: usize, column: RockColumn, age: f32) {
        self.mask[i] = 1;
        self.elevation[i] = column.elevation;
        self.thickness[i] = column.thickness;
        self.density[i] = column.density;
        self.age[i] = age;
    }

    /// Give up ownership of `i`.
    pub fn clear_cell(&mut self, i: usize) {
        self.mask[i] = 0;
        self.border[i] = 0;
        self.elevation[i] = 0.0;
        self.thickness[i] = 0.0;
        self.density[i] = 0.0;
        self.age[i] = 0.0;
    }

    /// Owned cells in vertex order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let grid = self.grid();
        (0..grid.cells).filter(move |&i| self.owns(i)).map(move |i| Cell {
            id: i,
            position: grid.pos_xyz[i],
            content: self.column(i),
            age: self.age[i],
            is_border: self.border[i] != 0,
        })
    }

    /// Number of owned cells.
    pub fn get_size(&self) -> usize {
        morphology::count(&self.mask)
    }

    /// Number of owned continental cells.
    pub fn get_continental_size(&self) -> usize {
        (0..self.mask.len())
            .filter(|&i| self.owns(i) && isostasy::is_continental_density(self.density[i]))
            .count()
    }

    /// Angular speed (rad/Myr).
    pub fn angular_speed(&self) -> f32 {
        geo::norm32(self.angular_velocity)
    }

    /// Unit rotation axis, zero for a plate at rest.
    pub fn rotation_axis(&self) -> [f32; 3] {
        geo::to_f32(geo::normalize(geo::to_f64(self.angular_velocity)))
    }

    /// Surface velocity at vertex `i` in radians/Myr of arc (`ω × r`).
    pub fn velocity_at(&self, i: usize) -> [f32; 3] {
        geo::cross32(self.angular_velocity, self.grid().pos_xyz[i])
    }

    /// Cell density plus the plate offset.
    pub fn effective_density(&self, i: usize) -> f32 {
        self.density[i] + self.density_offset
    }

    /// Rotate the plate content by `|ω|·dt` about its axis and age every cell by `dt`.
    ///
    /// Each raster is resampled at back-rotated positions, so cells stay aligned with
    /// the grid. A plate at rest is left bit-for-bit unchanged apart from ageing.
    pub fn move_by(&mut self, dt_myr: f64, scratch: &mut ScratchArena) {
        let angle = self.angular_speed() as f64 * dt_myr;
        if angle != 0.0 {
            let grid = Arc::clone(self.grid());
            let axis = geo::normalize(geo::to_f64(self.angular_velocity));
            for (i, q) in scratch.vectors.as_mut_slice().iter_mut().enumerate() {
                *q = geo::to_f32(geo::rotate_about_axis(geo::to_f64(grid.pos_xyz[i]), axis, -angle));
            }
            for field in [&mut self.elevation, &mut self.thickness, &mut self.density, &mut self.age] {
                raster::get_nearest_values_into(field, &scratch.vectors, &mut scratch.pressure);
                std::mem::swap(field, &mut scratch.pressure);
            }
            raster::get_nearest_values_into(&self.mask, &scratch.vectors, &mut scratch.mask);
            std::mem::swap(&mut self.mask, &mut scratch.mask);
            log::debug!("[move] plate={} angle={:.5} cells={}", self.id.0, angle, self.get_size());
        }
        let dt = dt_myr as f32;
        for i in 0..self.mask.len() {
            if self.owns(i) {
                self.age[i] += dt;
            } else {
                self.age[i] = 0.0;
            }
        }
    }

    /// Recompute elevation of every owned cell from thickness and density.
    pub fn isostasy(&mut self) {
        for i in 0..self.mask.len() {
            if self.owns(i) {
                self.elevation[i] = isostasy::isostatic_elevation(self.thickness[i], self.density[i]);
            }
        }
    }

    /// Subductability of owned cells; unowned cells take the plate mean so the plate
    /// edge does not read as a pressure jump.
    pub fn subductability(&self) -> Float32Raster {
        let mut out = Float32Raster::new(self.grid(), 0.0);
        let mut sum = 0.0f64;
        let mut n = 0usize;
        for i in 0..self.mask.len() {
            if self.owns(i) {
                out[i] = isostasy::subductability(self.effective_density(i));
                sum += out[i] as f64;
                n += 1;
            }
        }
        let mean = if n == 0 { 0.0 } else { (sum / n as f64) as f32 };
        for i in 0..self.mask.len() {
            if !self.owns(i) {
                out[i] = mean;
            }
        }
        out
    }

    /// Mark owned cells that touch a vertex outside the plate.
    pub fn update_borders(&mut self) {
        self.border = morphology::margin(&self.mask, 1);
    }

    /// Rebuild the neighbor list from the shared owner raster (plate index per vertex).
    pub fn update_neighbors(&mut self, owner: &Uint16Raster, ids: &[PlateId]) {
        let grid = Arc::clone(self.grid());
        let mut seen = vec![false; ids.len()];
        for i in 0..grid.cells {
            if !self.owns(i) {
                continue;
            }
            for &nj in &grid.n1[i] {
                let o = owner[nj as usize];
                if o != NO_LABEL && (o as usize) < ids.len() && ids[o as usize] != self.id {
                    seen[o as usize] = true;
                }
            }
        }
        self.neighbors = ids.iter().zip(seen).filter(|&(_, s)| s).map(|(&id, _)| id).collect();
    }

    /// Partition the plate along its asthenosphere flow field.
    ///
    /// Subductability is diffused into a pressure field; the cross product of its
    /// gradient with position gives an angular-velocity field that is segmented with
    /// [`segmentation::plate_map`] inside the plate mask. Each region becomes a child
    /// plate that keeps the parent's rock columns and rotates about the region's mean
    /// angular-velocity direction at a freshly sampled speed.
    pub fn split(
        &self,
        params: &SplitParams,
        ids: &mut PlateIds,
        speed: &mut dyn Generator,
        density_offset: &mut dyn Generator,
        scratch: &mut ScratchArena,
    ) -> Vec<Plate> {
        let grid = Arc::clone(self.grid());
        let subductability = self.subductability();
        let pressure = scalar::laplacian_smooth(
            &subductability,
            params.pressure_smoothing_rate,
            params.pressure_smoothing_iterations,
            &mut scratch.smoothed,
        );
        scalar::gradient_into(&pressure, &mut scratch.vectors);
        let omega = vector::cross(&scratch.vectors, &vector::positions(&grid));
        let map = segmentation::plate_map(&omega, &self.mask, &params.plate_map);

        let mut children = Vec::with_capacity(map.count);
        for label in 0..map.count as u16 {
            let region = map.region(label);
            let mean = vector::masked_average(&omega, &region);
            let mut axis = geo::normalize(geo::to_f64(mean));
            if geo::norm(axis) == 0.0 {
                axis = geo::normalize(geo::to_f64(self.angular_velocity));
            }
            if geo::norm(axis) == 0.0 {
                axis = [0.0, 0.0, 1.0];
            }
            let s = speed.sample() as f64;
            let mut child = Plate::new(ids.allocate(), &grid);
            for i in 0..grid.cells {
                if region[i] != 0 {
                    if let Some(c) = self.column(i) {
                        child.set_cell(i, c, self.age[i]);
                    }
                }
            }
            child.angular_velocity = geo::to_f32([axis[0] * s, axis[1] * s, axis[2] * s]);
            child.density_offset = density_offset.sample();
            child.update_borders();
            children.push(child);
        }
        log::info!(
            "[split] plate={} cells={} children={} sizes={:?}",
            self.id.0,
            self.get_size(),
            children.len(),
            children.iter().map(Plate::get_size).collect::<Vec<_>>()
        );
        children
    }
}

/// Owner raster: index (in `plates`) of the first plate owning each vertex, or
/// [`NO_LABEL`].
pub fn owner_raster(grid: &Arc<Grid>, plates: &[Plate]) -> Uint16Raster {
    let mut owner = Uint16Raster::new(grid, NO_LABEL);
    owner_raster_into(plates, &mut owner);
    owner
}

/// [`owner_raster`] written into `owner`, whose previous contents are ignored.
pub fn owner_raster_into(plates: &[Plate], owner: &mut Uint16Raster) {
    owner.fill(NO_LABEL);
    for (k, p) in plates.iter().enumerate() {
        p.mask.assert_same_grid(owner);
        for i in 0..owner.len() {
            if p.owns(i) && owner[i] == NO_LABEL {
                owner[i] = k as u16;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hemispheres(grid: &Arc<Grid>) -> Plate {
        Plate::from_columns(PlateId(0), grid, |i| {
            Some(if grid.pos_xyz[i][2] > 0.0 { RockColumn::LAND } else { RockColumn::OCEAN })
        })
    }

    #[test]
    fn sizes_count_owned_and_continental_cells() {
        let g = Arc::new(Grid::new(2));
        let p = hemispheres(&g);
        assert_eq!(p.get_size(), g.cells);
        let north = (0..g.cells).filter(|&i| g.pos_xyz[i][2] > 0.0).count();
        assert_eq!(p.get_continental_size(), north);
        assert_eq!(p.cells().count(), g.cells);
        assert!(p.cells().all(|c| !c.is_border));
    }

    #[test]
    fn resting_plate_move_only_ages() {
        let g = Arc::new(Grid::new(2));
        let mut p = hemispheres(&g);
        let before = p.clone();
        let mut scratch = ScratchArena::new(&g);
        p.move_by(2.0, &mut scratch);
        assert_eq!(p.mask, before.mask);
        assert_eq!(p.elevation, before.elevation);
        assert!(p.age.iter().all(|&a| a == 2.0));
    }

    #[test]
    fn full_turn_returns_content() {
        let g = Arc::new(Grid::new(3));
        let mut p = hemispheres(&g);
        let before = p.clone();
        // a quarter turn about z maps the icosphere only approximately onto itself,
        // a full turn exactly
        p.angular_velocity = [0.0, 0.0, std::f32::consts::TAU];
        let mut scratch = ScratchArena::new(&g);
        p.move_by(1.0, &mut scratch);
        assert_eq!(p.mask, before.mask);
        assert_eq!(p.density, before.density);
    }

    #[test]
    fn ids_are_monotonic() {
        let mut ids = PlateIds::starting_at(5);
        assert_eq!(ids.allocate(), PlateId(5));
        assert_eq!(ids.allocate(), PlateId(6));
    }
}
