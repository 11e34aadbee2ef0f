use std::sync::Arc;

use lithos::config::WorldConfig;
use lithos::fields::{self, FieldFeed, FieldRegistry};
use lithos::grid::Grid;
use lithos::isostasy::RockColumn;
use lithos::plates::{Plate, PlateId};
use lithos::raster::segmentation::NO_LABEL;
use lithos::raster::{AnyScalarRaster, Float32Raster, Uint16Raster};
use lithos::world::World;

fn two_plates() -> World {
    let g = Arc::new(Grid::new(3));
    let mut north = Plate::from_columns(PlateId(0), &g, |i| (g.pos_xyz[i][2] >= 0.0).then_some(RockColumn::LAND.isostasy()));
    north.angular_velocity = [0.0, 0.0, 0.02];
    let south = Plate::from_columns(PlateId(1), &g, |i| (g.pos_xyz[i][2] < 0.0).then_some(RockColumn::OCEAN.isostasy()));
    World::from_plates(g, WorldConfig::default(), vec![north, south], Box::new(|| 0.0f32), Box::new(|| 0.0f32))
        .unwrap()
}

#[test]
fn getters_merge_plates() {
    let w = two_plates();
    let g = Arc::clone(&w.grid);
    let elevation = fields::elevation(&w, None, None);
    let ids = fields::plate_ids(&w, None);
    let speed = fields::speed(&w, None, None);
    for i in 0..g.cells {
        let north = g.pos_xyz[i][2] >= 0.0;
        assert_eq!(ids[i], if north { 0 } else { 1 });
        let expected = if north { RockColumn::LAND.isostasy() } else { RockColumn::OCEAN.isostasy() };
        assert_eq!(elevation[i], expected.elevation);
        if !north {
            assert_eq!(speed[i], 0.0);
        }
    }
    assert!(speed.iter().any(|&s| s > 0.0));
    assert!(ids.iter().all(|&l| l != NO_LABEL));
}

#[test]
fn getters_reuse_the_callers_buffer() {
    let w = two_plates();
    let result = Float32Raster::new(&w.grid, 123.0);
    // stale owner indices in the scratch must not leak into the result
    let mut scratch = Uint16Raster::new(&w.grid, 7);
    let density = fields::density(&w, Some(result), Some(&mut scratch));
    assert_eq!(density, fields::density(&w, None, None));
    assert!(density.iter().all(|&d| d != 123.0));
    assert_eq!(scratch, w.owner());

    let velocity = fields::velocity(&w, None, Some(&mut scratch));
    assert_eq!(velocity, fields::velocity(&w, None, None));
}

#[test]
fn plate_mask_of_unknown_plate_is_none() {
    let w = two_plates();
    assert!(fields::plate_mask(&w, PlateId(99), None).is_none());
    let mask = fields::plate_mask(&w, PlateId(1), None).unwrap();
    assert_eq!(mask, w.plates[1].mask);
}

#[test]
fn registry_lists_builtins_by_name() {
    let registry = FieldRegistry::builtin();
    let names: Vec<&str> = registry.names().collect();
    for name in ["age", "density", "elevation", "plate_ids", "speed", "subductability", "thickness"] {
        assert!(names.contains(&name), "missing {name}");
    }
    let w = two_plates();
    let getter = registry.get("plate_ids").unwrap();
    assert!(matches!(getter(&w), Some(AnyScalarRaster::U16(_))));
    assert!(registry.get("rainfall").is_none());
}

#[test]
fn feed_widens_integer_fields() {
    let registry = FieldRegistry::builtin();
    let w = two_plates();
    let mut feed = FieldFeed::new(&registry, "plate_ids");
    let r = feed.fetch(&w).unwrap();
    assert_eq!(r, fields::plate_ids(&w, None).to_float());
    assert!(!feed.has_warned());
}

#[test]
fn feed_warns_once_when_data_is_missing() {
    let mut registry = FieldRegistry::builtin();
    registry.register("nothing", |_| None);
    let w = two_plates();

    let mut unknown = FieldFeed::new(&registry, "rainfall");
    assert!(unknown.fetch(&w).is_none());
    assert!(unknown.has_warned());
    assert!(unknown.fetch(&w).is_none());
    assert!(unknown.has_warned());

    let mut empty = FieldFeed::new(&registry, "nothing");
    assert_eq!(empty.name(), "nothing");
    assert!(empty.fetch(&w).is_none());
    assert!(empty.has_warned());
}
