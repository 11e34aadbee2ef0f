use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use lithos::config::WorldConfig;
use lithos::grid::Grid;
use lithos::isostasy::RockColumn;
use lithos::plates::{Plate, PlateId};
use lithos::world::{PlateObserver, World};

#[derive(Default)]
struct Events {
    created: Vec<PlateId>,
    updated: usize,
    deleted: Vec<PlateId>,
}

struct Recorder(Rc<RefCell<Events>>);

impl PlateObserver for Recorder {
    fn created(&mut self, plate: &Plate) {
        self.0.borrow_mut().created.push(plate.id);
    }
    fn updated(&mut self, _plate: &Plate) {
        self.0.borrow_mut().updated += 1;
    }
    fn deleted(&mut self, plate: &Plate) {
        self.0.borrow_mut().deleted.push(plate.id);
    }
}

fn record(world: &mut World) -> Rc<RefCell<Events>> {
    let events = Rc::new(RefCell::new(Events::default()));
    world.add_observer(Box::new(Recorder(Rc::clone(&events))));
    events
}

fn resting_world(grid: Arc<Grid>, config: WorldConfig) -> World {
    World::with_generators(grid, config, Box::new(|| 0.0f32), Box::new(|| 0.0f32)).unwrap()
}

fn assert_partitioned(world: &World) {
    for i in 0..world.grid.cells {
        let owners = world.plates.iter().filter(|p| p.owns(i)).count();
        assert_eq!(owners, 1, "vertex {i} has {owners} owners");
    }
}

#[test]
fn zero_step_changes_nothing() {
    let g = Arc::new(Grid::new(3));
    let mut w = World::new(g, WorldConfig::default()).unwrap();
    let before = w.plates.clone();
    let stats = w.simulate(0.0);
    assert_eq!(w.age(), 0.0);
    assert_eq!(w.clock.step_idx, 0);
    assert_eq!(w.plates, before);
    assert_eq!(stats.plates, 1);
    assert_eq!(stats.rifted + stats.subducted + stats.deleted, 0);
    assert!(!stats.cycle_rolled);
}

#[test]
fn resting_single_plate_only_ages() {
    let g = Arc::new(Grid::new(3));
    // default plates_num: a rolled-over cycle must not split on its own
    let mut w = resting_world(Arc::clone(&g), WorldConfig::default());
    let events = record(&mut w);
    let before = w.plates[0].clone();
    let mut rolled = 0;
    for _ in 0..100 {
        let stats = w.simulate(5.0);
        assert_eq!(stats.plates, 1);
        rolled += usize::from(stats.cycle_rolled);
    }
    assert!(rolled > 0, "the cycle never rolled over");
    assert_eq!(w.age(), 500.0);
    assert_eq!(w.clock.step_idx, 100);
    assert_eq!(w.plates.len(), 1);
    let p = &w.plates[0];
    assert_eq!(p.id, before.id);
    assert_eq!(p.mask, before.mask);
    assert_eq!(p.density, before.density);
    assert_eq!(p.angular_velocity, before.angular_velocity);
    assert!(p.age.iter().all(|&a| a == 500.0));
    let events = events.borrow();
    assert!(events.created.is_empty());
    assert!(events.deleted.is_empty());
    assert_eq!(events.updated, 100);
}

#[test]
fn small_plate_is_deleted_once_and_its_cells_reassigned() {
    let g = Arc::new(Grid::new(4));
    let small: Vec<usize> = g.ball(1000, 4).into_iter().take(50).collect();
    let in_small = |i: usize| small.contains(&i);
    let big = Plate::from_columns(PlateId(0), &g, |i| (!in_small(i)).then_some(RockColumn::OCEAN.isostasy()));
    let tiny = Plate::from_columns(PlateId(1), &g, |i| in_small(i).then_some(RockColumn::LAND.isostasy()));
    assert_eq!(tiny.get_size(), 50);

    let config = WorldConfig { plates_num: 1, ..WorldConfig::default() };
    let mut w = World::from_plates(Arc::clone(&g), config, vec![big, tiny], Box::new(|| 0.0f32), Box::new(|| 0.0f32))
        .unwrap();
    assert_eq!(w.plates[0].neighbors, vec![PlateId(1)]);
    let events = record(&mut w);

    let stats = w.simulate(1.0);
    assert_eq!(stats.deleted, 1);
    assert_eq!(events.borrow().deleted, vec![PlateId(1)]);
    assert_eq!(w.plates.len(), 1);
    assert_eq!(w.plates[0].get_size(), g.cells);
    // the orphaned cells keep their continental crust
    assert_eq!(w.plates[0].get_continental_size(), 50);
    assert!(w.plates[0].neighbors.is_empty());

    w.simulate(1.0);
    assert_eq!(events.borrow().deleted.len(), 1);
}

#[test]
#[should_panic(expected = "time step")]
fn negative_step_is_rejected() {
    let g = Arc::new(Grid::new(2));
    let mut w = World::new(g, WorldConfig::default()).unwrap();
    w.simulate(1.0);
    w.simulate(-1.0);
}

#[test]
#[should_panic(expected = "time step")]
fn nan_step_is_rejected() {
    let g = Arc::new(Grid::new(2));
    let mut w = World::new(g, WorldConfig::default()).unwrap();
    w.simulate(f64::NAN);
}

#[test]
fn run_to_ignores_unusable_steps() {
    let g = Arc::new(Grid::new(2));
    let mut w = World::new(g, WorldConfig::default()).unwrap();
    assert_eq!(w.run_to(10.0, f64::NAN), 0);
    assert_eq!(w.run_to(10.0, -2.0), 0);
    assert_eq!(w.age(), 0.0);
}

#[test]
fn last_plate_is_never_deleted() {
    let g = Arc::new(Grid::new(1));
    // 42 cells, under the deletion threshold
    let config = WorldConfig { plates_num: 1, ..WorldConfig::default() };
    let mut w = resting_world(Arc::clone(&g), config);
    let stats = w.simulate(1.0);
    assert_eq!(stats.deleted, 0);
    assert_eq!(w.plates.len(), 1);
}

#[test]
fn split_at_target_count_is_a_noop() {
    let g = Arc::new(Grid::new(3));
    let config = WorldConfig { plates_num: 1, ..WorldConfig::default() };
    let mut w = World::new(g, config).unwrap();
    let events = record(&mut w);
    let before = w.plates.clone();
    assert_eq!(w.split(), 0);
    assert_eq!(w.plates, before);
    assert!(events.borrow().created.is_empty());
}

#[test]
fn split_below_target_partitions_the_parent() {
    let g = Arc::new(Grid::new(4));
    let mut config = WorldConfig::default();
    config.split.plate_map.min_region_size = 1;
    let mut w = World::with_generators(Arc::clone(&g), config, Box::new(|| 0.01f32), Box::new(|| 0.0f32)).unwrap();
    let events = record(&mut w);
    let land = w.plates[0].get_continental_size();

    let created = w.split();
    assert!(created >= 2, "created={created}");
    assert_eq!(w.plates.len(), created);
    assert_partitioned(&w);
    assert_eq!(w.plates.iter().map(Plate::get_continental_size).sum::<usize>(), land);
    let mut ids: Vec<PlateId> = w.plates.iter().map(|p| p.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), created);
    assert!(ids.iter().all(|&id| id > PlateId(0)));
    assert!(w.plates.iter().all(|p| (p.angular_speed() - 0.01).abs() < 1e-6));

    let events = events.borrow();
    assert_eq!(events.created, ids);
    assert_eq!(events.deleted, vec![PlateId(0)]);
}

#[test]
fn moving_plates_keep_the_grid_covered_once() {
    let g = Arc::new(Grid::new(4));
    let mut config = WorldConfig::default();
    config.split.plate_map.min_region_size = 1;
    let mut w = World::with_generators(Arc::clone(&g), config, Box::new(|| 0.01f32), Box::new(|| 0.0f32)).unwrap();
    w.split();
    for _ in 0..5 {
        let stats = w.simulate(2.0);
        assert_eq!(stats.plates, w.plates.len());
        assert_partitioned(&w);
    }
    assert_eq!(w.age(), 10.0);
}

#[test]
fn identical_seeds_reproduce_runs() {
    let g = Arc::new(Grid::new(3));
    let mut a = World::new(Arc::clone(&g), WorldConfig { seed: 11, ..WorldConfig::default() }).unwrap();
    let mut b = World::new(Arc::clone(&g), WorldConfig { seed: 11, ..WorldConfig::default() }).unwrap();
    a.split();
    b.split();
    a.run_to(6.0, 2.0);
    b.run_to(6.0, 2.0);
    assert_eq!(a.plates, b.plates);
    assert_eq!(a.age(), b.age());
}
