use lithos::geo;
use lithos::grid::{Grid, GridError};

#[test]
fn grid_constructs() {
    let g = Grid::new(0);
    assert_eq!(g.cells, 12);
    assert_eq!(g.pos_xyz.len(), g.cells);
    assert_eq!(g.area.len(), g.cells);
    assert_eq!(g.n1.len(), g.cells);
    assert!(g.n1.iter().all(|n| n.len() == 5));

    let g = Grid::new(3);
    assert_eq!(g.cells, 10 * 4usize.pow(3) + 2);
    let pentagons = g.n1.iter().filter(|n| n.len() == 5).count();
    assert_eq!(pentagons, 12);
    let total: f64 = g.area.iter().map(|&a| a as f64).sum();
    approx::assert_relative_eq!(total, 4.0 * std::f64::consts::PI, max_relative = 1e-5);
}

#[test]
fn adjacency_is_symmetric_and_sorted() {
    let g = Grid::new(2);
    for (i, n) in g.n1.iter().enumerate() {
        assert!(n.windows(2).all(|w| w[0] < w[1]));
        for &j in n {
            assert!(g.n1[j as usize].contains(&(i as u32)));
        }
    }
}

#[test]
fn nearest_finds_vertices_and_nearby_points() {
    let g = Grid::new(3);
    for i in (0..g.cells).step_by(17) {
        assert_eq!(g.nearest(g.pos_xyz[i], i), i);
        // any hint reaches the same vertex
        assert_eq!(g.nearest(g.pos_xyz[i], 0), i);
        let p = g.pos_xyz[i];
        let nudged = [p[0] * 1.01 + 0.001, p[1] * 1.01, p[2] * 1.01];
        assert_eq!(g.nearest(nudged, (i + 100) % g.cells), i);
    }
}

fn brute_nearest(g: &Grid, q: [f64; 3]) -> f64 {
    g.pos_xyz.iter().map(|&p| geo::dot(geo::to_f64(p), q)).fold(f64::MIN, f64::max)
}

#[test]
fn base_icosahedron_has_equal_edges() {
    let g = Grid::new(0);
    let edge = (1.0f64 / 5.0f64.sqrt()).acos();
    for i in 0..g.cells {
        for &j in &g.n1[i] {
            let a = geo::arc_angle(geo::to_f64(g.pos_xyz[i]), geo::to_f64(g.pos_xyz[j as usize]));
            approx::assert_abs_diff_eq!(a, edge, epsilon = 1e-6);
        }
    }
}

#[test]
fn closest_vertex_is_always_a_neighbor() {
    for level in 0..=4 {
        let g = Grid::new(level);
        for i in 0..g.cells {
            let pi = geo::to_f64(g.pos_xyz[i]);
            let closest = (0..g.cells)
                .filter(|&j| j != i)
                .max_by(|&a, &b| {
                    let da = geo::dot(geo::to_f64(g.pos_xyz[a]), pi);
                    let db = geo::dot(geo::to_f64(g.pos_xyz[b]), pi);
                    da.total_cmp(&db)
                })
                .unwrap();
            let best = geo::dot(geo::to_f64(g.pos_xyz[closest]), pi);
            // ties are fine as long as one of the tied vertices is adjacent
            let adjacent = g.n1[i].iter().any(|&j| geo::dot(geo::to_f64(g.pos_xyz[j as usize]), pi) >= best - 1e-9);
            assert!(adjacent, "level {level} vertex {i}");
        }
    }
}

#[test]
fn nearest_matches_brute_force_for_rotated_points() {
    let g = Grid::new(4);
    let axis = geo::normalize([0.3, -0.5, 0.8]);
    for i in (0..g.cells).step_by(7) {
        let q = geo::rotate_about_axis(geo::to_f64(g.pos_xyz[i]), axis, 0.7);
        let best = brute_nearest(&g, q);
        for hint in [i, 0, g.cells - 1] {
            let found = g.nearest(geo::to_f32(q), hint);
            let d = geo::dot(geo::to_f64(g.pos_xyz[found]), q);
            approx::assert_abs_diff_eq!(d, best, epsilon = 1e-6);
        }
    }
}

#[test]
fn ball_grows_by_rings() {
    let g = Grid::new(3);
    // a hexagonal vertex (not one of the 12 originals)
    let seed = 100;
    assert_eq!(g.n1[seed].len(), 6);
    assert_eq!(g.ball(seed, 0), vec![seed]);
    assert_eq!(g.ball(seed, 1).len(), 7);
    assert_eq!(g.ball(seed, 2).len(), 19);
}

#[test]
fn from_parts_validates_the_mesh() {
    let s = 1.0 / 3f32.sqrt();
    let tetra = vec![[s, s, s], [s, -s, -s], [-s, s, -s], [-s, -s, s]];
    let full = |k: u32| -> Vec<u32> { (0..4).filter(|&j| j != k).collect() };
    let g = Grid::from_parts(tetra.clone(), (0..4).map(full).collect()).unwrap();
    assert_eq!(g.cells, 4);
    assert_eq!(g.n1[0].as_slice(), &[1, 2, 3]);

    assert!(matches!(Grid::from_parts(vec![], vec![]), Err(GridError::Empty)));
    assert!(matches!(
        Grid::from_parts(tetra.clone(), vec![vec![1]]),
        Err(GridError::LengthMismatch { positions: 4, neighbors: 1 })
    ));
    let mut asym: Vec<Vec<u32>> = (0..4).map(full).collect();
    asym[1].retain(|&j| j != 0);
    assert!(matches!(Grid::from_parts(tetra.clone(), asym), Err(GridError::Asymmetric { cell: 0, neighbor: 1 })));
    let mut bad: Vec<Vec<u32>> = (0..4).map(full).collect();
    bad[2].push(9);
    assert!(matches!(Grid::from_parts(tetra, bad), Err(GridError::BadNeighbor { cell: 2, neighbor: 9 })));
}

#[test]
fn cache_round_trip_minimal() -> Result<(), GridError> {
    let g = Grid::new(2);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.cache");
    g.save_cache(&path)?;
    let g2 = Grid::load_cache(&path)?;
    assert_eq!(g.cells, g2.cells);
    assert_eq!(g.pos_xyz, g2.pos_xyz);
    assert_eq!(g.area, g2.area);
    assert_eq!(g.n1, g2.n1);
    assert_eq!(g.level, g2.level);
    Ok(())
}

#[test]
fn cache_rejects_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not_a_grid.cache");
    std::fs::write(&path, b"definitely not a grid cache").unwrap();
    assert!(matches!(Grid::load_cache(&path), Err(GridError::BadHeader)));
    assert!(matches!(Grid::load_cache(dir.path().join("missing")), Err(GridError::Io(_))));
}
