//! World state container and the per-step plate lifecycle.
//!
//! One call to [`World::simulate`] runs every phase over all plates before starting the
//! next phase: move, erode, isostasy, border refresh, rift, deform. Plates that shrink
//! to the deletion threshold are then removed, the supercontinent cycle advances, and
//! the clock ticks. Splitting is left to the caller, which can watch
//! [`StepStats::cycle_rolled`] for the end of a supercontinent phase.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::boundaries::{Boundaries, BoundaryStats};
use crate::config::{ConfigError, WorldConfig};
use crate::geo;
use crate::grid::Grid;
use crate::isostasy::RockColumn;
use crate::plates::{owner_raster, owner_raster_into, Plate, PlateId, PlateIds};
use crate::random::{Generator, NormalGenerator};
use crate::raster::segmentation::NO_LABEL;
use crate::raster::{ScratchArena, Uint16Raster, Uint8Raster};
use crate::rifting::{self, RiftMode};
use crate::subduction::Contacts;
use crate::supercontinent::SupercontinentCycle;

/// Normal relative speed (rad/Myr) below which a boundary edge is not divergent or
/// convergent.
const BOUNDARY_TAU: f32 = 1e-4;

/// Simulation clock information.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Clock {
    /// Current simulation time in Myr.
    pub t_myr: f64,
    /// Step index (starts at 0, increments per non-empty step).
    pub step_idx: u64,
}

/// Receives plate lifecycle events.
///
/// Observers are registered on one world with [`World::add_observer`]; there is no
/// process-wide publisher.
pub trait PlateObserver {
    /// A plate was added by a split.
    fn created(&mut self, _plate: &Plate) {}
    /// A plate finished a simulation step.
    fn updated(&mut self, _plate: &Plate) {}
    /// A plate was removed (split parent or too small).
    fn deleted(&mut self, _plate: &Plate) {}
}

/// Result summary for one step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepStats {
    /// Simulation time after the step (Myr).
    pub t_myr: f64,
    /// Time step size used (Myr).
    pub dt_myr: f64,
    /// Land cells lowered by erosion.
    pub eroded: usize,
    /// Vertices claimed by rifting.
    pub rifted: usize,
    /// Cells lost to subduction.
    pub subducted: usize,
    /// Cells lost to continental collision.
    pub collided: usize,
    /// Plates removed for being too small.
    pub deleted: usize,
    /// The supercontinent cycle entered a new phase during this step.
    pub cycle_rolled: bool,
    /// Boundary classes after deformation.
    pub boundaries: BoundaryStats,
    /// Plate count after the step.
    pub plates: usize,
}

/// The complete world state required for stepping.
pub struct World {
    /// Geodesic grid shared by every plate raster.
    pub grid: Arc<Grid>,
    /// Live plates in creation order.
    pub plates: Vec<Plate>,
    /// Simulation clock.
    pub clock: Clock,
    /// Parameters.
    pub config: WorldConfig,
    /// Long-period assembly/dispersal state.
    pub supercontinent_cycle: SupercontinentCycle,
    plate_speed: Box<dyn Generator>,
    plate_density_offset: Box<dyn Generator>,
    observers: Vec<Box<dyn PlateObserver>>,
    ids: PlateIds,
    scratch: ScratchArena,
}

impl World {
    /// World with one plate: a continental shield of `continent_radius_km` around a
    /// random point, ocean elsewhere. Generators are seeded from `config.seed`.
    pub fn new(grid: Arc<Grid>, config: WorldConfig) -> Result<Self, ConfigError> {
        let speed = NormalGenerator::plate_speed(config.seed ^ 0x5350_4545_4400);
        let density = NormalGenerator::density_offset(config.seed ^ 0x4445_4e53_0000);
        Self::with_generators(grid, config, Box::new(speed), Box::new(density))
    }

    /// [`World::new`] with caller-supplied plate speed and density offset generators.
    pub fn with_generators(
        grid: Arc<Grid>,
        config: WorldConfig,
        plate_speed: Box<dyn Generator>,
        plate_density_offset: Box<dyn Generator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let shield = geo::point_from_unit_samples(rng.gen::<f64>(), rng.gen::<f64>());
        let axis = geo::point_from_unit_samples(rng.gen::<f64>(), rng.gen::<f64>());
        let continent = config.km_to_angle(config.continent_radius_km);

        let mut world = Self::assemble(grid, config, Vec::new(), plate_speed, plate_density_offset);
        let grid = Arc::clone(&world.grid);
        let mut plate = Plate::from_columns(world.ids.allocate(), &grid, |i| {
            let template = if geo::arc_angle(shield, geo::to_f64(grid.pos_xyz[i])) < continent {
                RockColumn::LAND
            } else {
                RockColumn::OCEAN
            };
            Some(template.isostasy())
        });
        let s = world.plate_speed.sample() as f64;
        plate.angular_velocity = geo::to_f32([axis[0] * s, axis[1] * s, axis[2] * s]);
        plate.density_offset = world.plate_density_offset.sample();
        log::info!(
            "[world] init cells={} land={} speed={:.5}",
            grid.cells,
            plate.get_continental_size(),
            s
        );
        world.plates.push(plate);
        world.update_neighbors();
        world.update_borders();
        Ok(world)
    }

    /// World over caller-built plates, e.g. restored state or test fixtures.
    ///
    /// Panics if a plate is bound to a different grid.
    pub fn from_plates(
        grid: Arc<Grid>,
        config: WorldConfig,
        plates: Vec<Plate>,
        plate_speed: Box<dyn Generator>,
        plate_density_offset: Box<dyn Generator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        for p in &plates {
            p.mask.assert_on_grid(&grid);
        }
        let mut world = Self::assemble(grid, config, plates, plate_speed, plate_density_offset);
        world.update_neighbors();
        world.update_borders();
        Ok(world)
    }

    fn assemble(
        grid: Arc<Grid>,
        config: WorldConfig,
        plates: Vec<Plate>,
        plate_speed: Box<dyn Generator>,
        plate_density_offset: Box<dyn Generator>,
    ) -> Self {
        let next_id = plates.iter().map(|p| p.id.0 + 1).max().unwrap_or(0);
        let supercontinent_cycle = SupercontinentCycle::new(
            config.cycle_min_duration_myr,
            config.cycle_max_duration_myr,
            config.seed ^ 0x4359_434c_4500,
        );
        let scratch = ScratchArena::new(&grid);
        Self {
            grid,
            plates,
            clock: Clock::default(),
            config,
            supercontinent_cycle,
            plate_speed,
            plate_density_offset,
            observers: Vec::new(),
            ids: PlateIds::starting_at(next_id),
            scratch,
        }
    }

    /// Simulated time (Myr).
    pub fn age(&self) -> f64 {
        self.clock.t_myr
    }

    /// Register an observer for plate lifecycle events.
    pub fn add_observer(&mut self, observer: Box<dyn PlateObserver>) {
        self.observers.push(observer);
    }

    /// Plate with identity `id`.
    pub fn plate(&self, id: PlateId) -> Option<&Plate> {
        self.plates.iter().find(|p| p.id == id)
    }

    /// Index into `plates` of the first plate owning each vertex, or `NO_LABEL`.
    pub fn owner(&self) -> Uint16Raster {
        owner_raster(&self.grid, &self.plates)
    }

    /// [`World::owner`] written into a caller-owned buffer.
    ///
    /// Panics if `out` is bound to a different grid.
    pub fn owner_into(&self, out: &mut Uint16Raster) {
        out.assert_on_grid(&self.grid);
        owner_raster_into(&self.plates, out);
    }

    /// Recompute every plate's neighbor list.
    pub fn update_neighbors(&mut self) {
        let owner = self.owner();
        let ids: Vec<PlateId> = self.plates.iter().map(|p| p.id).collect();
        for p in self.plates.iter_mut() {
            p.update_neighbors(&owner, &ids);
        }
    }

    /// Recompute every plate's border cells.
    pub fn update_borders(&mut self) {
        for p in self.plates.iter_mut() {
            p.update_borders();
        }
    }

    /// Advance the world by `dt_myr`. A zero step changes nothing.
    ///
    /// Panics if `dt_myr` is negative or not finite; the clock never runs backwards.
    pub fn simulate(&mut self, dt_myr: f64) -> StepStats {
        assert!(dt_myr.is_finite() && dt_myr >= 0.0, "time step must be finite and non-negative, got {dt_myr}");
        let mut stats = StepStats { t_myr: self.clock.t_myr, plates: self.plates.len(), ..StepStats::default() };
        if dt_myr == 0.0 {
            return stats;
        }
        stats.dt_myr = dt_myr;

        // boundaries as they stand before the move decide where rifts open
        let pre_owner = self.owner();
        let pre_boundaries = Boundaries::classify(&pre_owner, &self.plates, BOUNDARY_TAU);
        let hops = self.travel_hops(dt_myr);

        for p in self.plates.iter_mut() {
            p.move_by(dt_myr, &mut self.scratch);
        }
        for p in self.plates.iter_mut() {
            stats.eroded += p.erode(dt_myr, &self.config.erosion, self.config.radius_km).cells_eroded;
        }
        for p in self.plates.iter_mut() {
            p.isostasy();
        }
        self.update_borders();
        stats.rifted = self.rift_all(&pre_boundaries, &pre_owner, hops);

        let contacts = Contacts::collect(&self.plates, self.config.km_to_angle(self.config.mountain_width_km));
        for p in self.plates.iter_mut() {
            let d = p.deform(&contacts);
            stats.subducted += d.subducted;
            stats.collided += d.collided;
        }
        self.update_neighbors();
        stats.boundaries = Boundaries::classify(&self.owner(), &self.plates, BOUNDARY_TAU).stats;

        for p in &self.plates {
            for o in self.observers.iter_mut() {
                o.updated(p);
            }
        }

        stats.deleted = self.remove_small_plates();
        stats.cycle_rolled = self.supercontinent_cycle.update(dt_myr);

        self.clock.t_myr += dt_myr;
        self.clock.step_idx += 1;
        stats.t_myr = self.clock.t_myr;
        stats.plates = self.plates.len();
        log::info!(
            "[step] t_myr={:.2} plates={} rifted={} subducted={} collided={} deleted={} div/conv/trans={}/{}/{}",
            stats.t_myr,
            stats.plates,
            stats.rifted,
            stats.subducted,
            stats.collided,
            stats.deleted,
            stats.boundaries.divergent,
            stats.boundaries.convergent,
            stats.boundaries.transform
        );
        stats
    }

    /// Run fixed steps of `dt_myr` until the clock reaches `t_end_myr`; returns the
    /// number of steps taken.
    pub fn run_to(&mut self, t_end_myr: f64, dt_myr: f64) -> u64 {
        if !dt_myr.is_finite() || dt_myr <= 0.0 {
            return 0;
        }
        let mut steps = 0;
        while self.clock.t_myr < t_end_myr {
            self.simulate(dt_myr);
            steps += 1;
        }
        steps
    }

    /// Split the plate with the most continental crust, unless the world already has
    /// `plates_num` plates. Children are appended in order; returns how many were
    /// created (0 when nothing changed).
    pub fn split(&mut self) -> usize {
        if self.plates.len() >= self.config.plates_num || self.plates.is_empty() {
            return 0;
        }
        let mut largest = 0usize;
        let mut best = self.plates[0].get_continental_size();
        for (k, p) in self.plates.iter().enumerate().skip(1) {
            let size = p.get_continental_size();
            if size > best {
                best = size;
                largest = k;
            }
        }
        let children = self.plates[largest].split(
            &self.config.split,
            &mut self.ids,
            self.plate_speed.as_mut(),
            self.plate_density_offset.as_mut(),
            &mut self.scratch,
        );
        if children.len() < 2 {
            log::debug!("[split] plate={} yielded {} region(s); kept", self.plates[largest].id.0, children.len());
            return 0;
        }
        let created = children.len();
        let parent = self.plates.remove(largest);
        for child in children {
            for o in self.observers.iter_mut() {
                o.created(&child);
            }
            self.plates.push(child);
        }
        for o in self.observers.iter_mut() {
            o.deleted(&parent);
        }
        self.update_neighbors();
        self.update_borders();
        created
    }

    /// Rings of cells the fastest plate can cross in `dt_myr`, plus one.
    fn travel_hops(&self, dt_myr: f64) -> u32 {
        let fastest = self.plates.iter().map(Plate::angular_speed).fold(0.0f32, f32::max) as f64;
        let spacing = (4.0 * std::f64::consts::PI / self.grid.cells.max(1) as f64).sqrt();
        ((fastest * dt_myr / spacing).ceil() as u32).saturating_add(1)
    }

    /// Tension rift for every plate inside its pre-move divergent zone, then
    /// unconditional rounds until every vertex is owned or no plate can grow.
    fn rift_all(&mut self, pre_boundaries: &Boundaries, pre_owner: &Uint16Raster, hops: u32) -> usize {
        let mut coverage = Uint8Raster::new(&self.grid, 0);
        for p in &self.plates {
            for (c, &m) in coverage.as_mut_slice().iter_mut().zip(p.mask.iter()) {
                *c |= m;
            }
        }
        let mut claimed = 0;
        for (k, p) in self.plates.iter_mut().enumerate() {
            let zone = rifting::tension_zone(pre_boundaries, pre_owner, k as u16, hops);
            claimed += p.rift(&mut coverage, RiftMode::Tension(&zone));
        }
        while coverage.iter().any(|&c| c == 0) {
            let round: usize = self.plates.iter_mut().map(|p| p.rift(&mut coverage, RiftMode::Any)).sum();
            if round == 0 {
                break;
            }
            claimed += round;
        }
        claimed
    }

    /// Remove plates at or below `min_plate_size` cells, never the last one.
    fn remove_small_plates(&mut self) -> usize {
        let snapshot: Vec<PlateId> = self.plates.iter().map(|p| p.id).collect();
        let mut deleted = 0;
        for id in snapshot {
            let Some(k) = self.plates.iter().position(|p| p.id == id) else { continue };
            let size = self.plates[k].get_size();
            if size > self.config.min_plate_size {
                continue;
            }
            if self.plates.len() == 1 {
                log::debug!("[world] keeping last plate={} cells={}", id.0, size);
                continue;
            }
            let plate = self.plates.remove(k);
            let orphans = self.reassign_orphans(&plate);
            log::info!("[world] delete plate={} cells={} reassigned={}", id.0, size, orphans);
            for o in self.observers.iter_mut() {
                o.deleted(&plate);
            }
            self.update_neighbors();
            deleted += 1;
        }
        if deleted > 0 {
            self.update_borders();
        }
        deleted
    }

    /// Hand the removed plate's cells, with their rock columns, to the surviving plate
    /// nearest by graph distance (ties to the earlier plate).
    fn reassign_orphans(&mut self, removed: &Plate) -> usize {
        let grid = Arc::clone(&self.grid);
        let mut owner = self.owner();
        let mut pending: Vec<usize> = (0..grid.cells).filter(|&i| removed.owns(i) && owner[i] == NO_LABEL).collect();
        let total = pending.len();
        while !pending.is_empty() {
            let layer: Vec<(usize, u16)> = pending
                .iter()
                .filter_map(|&i| {
                    grid.n1[i].iter().map(|&j| owner[j as usize]).filter(|&o| o != NO_LABEL).min().map(|o| (i, o))
                })
                .collect();
            if layer.is_empty() {
                break;
            }
            for &(i, o) in &layer {
                owner[i] = o;
                if let Some(column) = removed.column(i) {
                    self.plates[o as usize].set_cell(i, column, removed.age[i]);
                }
            }
            pending.retain(|&i| owner[i] == NO_LABEL);
        }
        // cut off from every survivor: the first plate takes them
        if let Some(first) = self.plates.first_mut() {
            for &i in &pending {
                if let Some(column) = removed.column(i) {
                    first.set_cell(i, column, removed.age[i]);
                }
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_world_has_one_plate_with_a_shield() {
        let g = Arc::new(Grid::new(3));
        let w = World::new(Arc::clone(&g), WorldConfig::default()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(w.plates.len(), 1);
        assert_eq!(w.plates[0].get_size(), g.cells);
        let land = w.plates[0].get_continental_size();
        assert!(land > 0 && land < g.cells / 2, "land={land}");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let g = Arc::new(Grid::new(1));
        let cfg = WorldConfig { radius_km: -1.0, ..WorldConfig::default() };
        assert!(matches!(World::new(g, cfg), Err(ConfigError::NonPositive { field: "radius_km", .. })));
    }
}
