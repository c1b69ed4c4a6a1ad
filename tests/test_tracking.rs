//! Geometry tracking scenarios: surface intersections, cell adjacency,
//! nested universes, lattices, and boundary conditions.

mod common;

use approx::assert_relative_eq;
use common::{build_geometry, pin_lattice_definitions};
use helios::navigator::{CrossingOutcome, Navigator, TrackingConfig};
use helios::surface::{BoundaryKind, Sense, Surface};
use nalgebra::Vector3;

// === Surface intersection scenarios ===

#[test]
fn test_sphere_ray_distance() {
    // Unit sphere at the origin, ray from (0, 0, -2) toward +z
    let sphere = Surface::from_tag("s", "so", &[1.0], BoundaryKind::default()).unwrap();
    let distance = sphere
        .intersect(
            &Vector3::new(0.0, 0.0, -2.0),
            &Vector3::new(0.0, 0.0, 1.0),
            Sense::Positive,
        )
        .unwrap();
    assert_relative_eq!(distance, 1.0, epsilon = 1e-9);
}

#[test]
fn test_cylinder_ray_distance() {
    // c/z radius 1 at (0, 0), ray from (2, 0, 0) toward -x
    let cylinder =
        Surface::from_tag("c", "c/z", &[0.0, 0.0, 1.0], BoundaryKind::default()).unwrap();
    let distance = cylinder
        .intersect(
            &Vector3::new(2.0, 0.0, 0.0),
            &Vector3::new(-1.0, 0.0, 0.0),
            Sense::Positive,
        )
        .unwrap();
    assert_relative_eq!(distance, 1.0, epsilon = 1e-12);
}

#[test]
fn test_plane_ray_distance() {
    // px at x = 5, ray from the origin toward +x, sense -
    let plane = Surface::from_tag("p", "px", &[5.0], BoundaryKind::default()).unwrap();
    let distance = plane
        .intersect(
            &Vector3::zeros(),
            &Vector3::new(1.0, 0.0, 0.0),
            Sense::Negative,
        )
        .unwrap();
    assert_relative_eq!(distance, 5.0, epsilon = 1e-12);
}

#[test]
fn test_tangent_ray_misses_cylinder() {
    // Ray along z tangent to a unit cylinder centered at (1, 0)
    let cylinder =
        Surface::from_tag("c", "c/z", &[1.0, 0.0, 1.0], BoundaryKind::default()).unwrap();
    assert!(cylinder
        .intersect(
            &Vector3::zeros(),
            &Vector3::new(0.0, 0.0, 1.0),
            Sense::Positive,
        )
        .is_none());
}

// === Navigator scenarios ===

#[test]
fn test_reflection_flips_one_component() {
    // Reflective pz at z = 0; incoming (1, 1, -1)/sqrt(3) leaves as
    // (1, 1, +1)/sqrt(3)
    let geometry = build_geometry(
        r#"[
        {"object": "surface", "user_id": "floor", "tag": "pz", "coefficients": [0.0],
         "boundary": "reflective"},
        {"object": "surface", "user_id": "lid", "tag": "so", "coefficients": [50.0],
         "boundary": "vacuum"},
        {"object": "cell", "user_id": "upper", "surfaces": ["+floor", "-lid"]}
    ]"#,
    );
    let navigator = Navigator::new(&geometry, TrackingConfig::default());
    let direction = Vector3::new(1.0, 1.0, -1.0) / 3.0_f64.sqrt();
    let mut state = navigator
        .locate(&Vector3::new(0.0, 0.0, 1e-6), &direction)
        .unwrap();
    let hit = navigator.distance_to_next(&state).unwrap();
    let outcome = navigator.cross(&mut state, &hit).unwrap();
    assert_eq!(outcome, CrossingOutcome::Reflected);

    let expected = Vector3::new(1.0, 1.0, 1.0) / 3.0_f64.sqrt();
    for axis in 0..3 {
        assert_relative_eq!(state.direction[axis], expected[axis], epsilon = 1e-12);
    }
    assert_relative_eq!(
        state.direction.norm(),
        1.0,
        epsilon = 1e-14
    );
}

#[test]
fn test_adjacency_invariant_across_many_steps() {
    // After every crossing the particle must land in a cell and the next
    // flight distance must be strictly positive.
    let geometry = build_geometry(pin_lattice_definitions());
    let navigator = Navigator::new(&geometry, TrackingConfig::default());
    let directions = [
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.6, 0.8, 0.0),
        Vector3::new(-0.48, 0.6, 0.64),
    ];
    for direction in directions {
        let mut state = navigator
            .locate(&Vector3::new(-0.77, -0.31, 0.0), &direction.normalize())
            .unwrap();
        for step in 0..200 {
            let hit = navigator.distance_to_next(&state).unwrap();
            assert!(
                hit.distance > 0.0,
                "step {step} along {direction:?}: non-positive flight {}",
                hit.distance
            );
            match navigator.cross(&mut state, &hit).unwrap() {
                CrossingOutcome::Leaked => break,
                CrossingOutcome::Crossed | CrossingOutcome::Reflected => {}
            }
        }
    }
}

#[test]
fn test_lattice_walk_east() {
    // Walking east through the 2x2 lattice: rod, water, water, rod, water,
    // then out into the pool.
    let geometry = build_geometry(pin_lattice_definitions());
    let navigator = Navigator::new(&geometry, TrackingConfig::default());
    let mut state = navigator
        .locate(
            &Vector3::new(-0.5, -0.5, 0.0),
            &Vector3::new(1.0, 0.0, 0.0),
        )
        .unwrap();
    assert_eq!(geometry.cells[state.current().cell].user_id, "rod");
    assert_eq!(state.levels.len(), 2);

    let mut visited = vec![geometry.cells[state.current().cell].user_id.clone()];
    loop {
        let hit = navigator.distance_to_next(&state).unwrap();
        match navigator.cross(&mut state, &hit).unwrap() {
            CrossingOutcome::Leaked => break,
            _ => visited.push(geometry.cells[state.current().cell].user_id.clone()),
        }
    }
    assert_eq!(
        visited,
        vec!["rod", "water", "water", "rod", "water", "pool_e"],
        "cell sequence along the eastward walk"
    );
}

#[test]
fn test_lattice_local_coordinates_are_slot_centered() {
    let geometry = build_geometry(pin_lattice_definitions());
    let navigator = Navigator::new(&geometry, TrackingConfig::default());
    // World (0.5, 0.5, 0) is the center of slot (1, 1)
    let state = navigator
        .locate(&Vector3::new(0.5, 0.5, 0.0), &Vector3::new(1.0, 0.0, 0.0))
        .unwrap();
    assert_eq!(geometry.cells[state.current().cell].user_id, "rod");
    assert_relative_eq!(state.current().position.x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(state.current().position.y, 0.0, epsilon = 1e-12);
}

#[test]
fn test_unbounded_point_is_an_error() {
    let geometry = build_geometry(pin_lattice_definitions());
    let navigator = Navigator::new(&geometry, TrackingConfig::default());
    let err = navigator
        .locate(
            &Vector3::new(30.0, 0.0, 0.0),
            &Vector3::new(1.0, 0.0, 0.0),
        )
        .unwrap_err();
    assert!(err.to_string().contains("unbounded"), "message: {err}");
}

#[test]
fn test_vacuum_leak_from_pool() {
    let geometry = build_geometry(pin_lattice_definitions());
    let navigator = Navigator::new(&geometry, TrackingConfig::default());
    let mut state = navigator
        .locate(
            &Vector3::new(5.0, 0.0, 0.0),
            &Vector3::new(1.0, 0.0, 0.0),
        )
        .unwrap();
    let hit = navigator.distance_to_next(&state).unwrap();
    assert_relative_eq!(hit.distance, 15.0, epsilon = 1e-9);
    assert_eq!(
        navigator.cross(&mut state, &hit).unwrap(),
        CrossingOutcome::Leaked
    );
}

#[test]
fn test_fill_translation_shifts_child_frame() {
    // A pin universe shifted to (2, 0): the rod is found at world (2, 0)
    let geometry = build_geometry(
        r#"[
        {"object": "surface", "user_id": "edge", "tag": "so", "coefficients": [10.0],
         "boundary": "vacuum"},
        {"object": "surface", "user_id": "window", "tag": "c/z",
         "coefficients": [2.0, 0.0, 1.0]},
        {"object": "surface", "user_id": "pin", "tag": "c/z",
         "coefficients": [0.0, 0.0, 0.3]},
        {"object": "surface", "user_id": "pin_window", "tag": "c/z",
         "coefficients": [0.0, 0.0, 1.0]},
        {"object": "cell", "user_id": "holder", "surfaces": ["-window", "-edge"],
         "fill": "pincell", "fill_translation": [2.0, 0.0, 0.0]},
        {"object": "cell", "user_id": "outside", "surfaces": ["+window", "-edge"]},
        {"object": "cell", "user_id": "rod", "universe": "pincell",
         "surfaces": ["-pin"]},
        {"object": "cell", "user_id": "clad", "universe": "pincell",
         "surfaces": ["+pin", "-pin_window"]}
    ]"#,
    );
    let navigator = Navigator::new(&geometry, TrackingConfig::default());
    let state = navigator
        .locate(&Vector3::new(2.1, 0.0, 0.0), &Vector3::new(1.0, 0.0, 0.0))
        .unwrap();
    assert_eq!(geometry.cells[state.current().cell].user_id, "rod");
    assert_relative_eq!(state.current().position.x, 0.1, epsilon = 1e-12);

    let state = navigator
        .locate(&Vector3::new(2.5, 0.0, 0.0), &Vector3::new(1.0, 0.0, 0.0))
        .unwrap();
    assert_eq!(geometry.cells[state.current().cell].user_id, "clad");
}

#[test]
fn test_infinite_lattice_wraps_forever() {
    // An infinite 1-D lattice of 1 cm slabs: the walk alternates between the
    // two slot universes without ever running out of tiles.
    let geometry = build_geometry(
        r#"[
        {"object": "surface", "user_id": "edge", "tag": "so", "coefficients": [40.0],
         "boundary": "vacuum"},
        {"object": "surface", "user_id": "slab_lo", "tag": "px",
         "coefficients": [-0.5]},
        {"object": "surface", "user_id": "slab_hi", "tag": "px",
         "coefficients": [0.5]},
        {"object": "cell", "user_id": "world", "surfaces": ["-edge"],
         "fill": "tiling"},
        {"object": "lattice", "user_id": "tiling", "shape": [2, 1, 1],
         "pitch": [1.0, 0.0, 0.0], "origin": [0.0, 0.0, 0.0], "kind": "infinite",
         "slots": ["u_a", "u_b"]},
        {"object": "cell", "user_id": "slab_a", "universe": "u_a",
         "surfaces": ["+slab_lo", "-slab_hi"]},
        {"object": "cell", "user_id": "slab_b", "universe": "u_b",
         "surfaces": ["+slab_lo", "-slab_hi"]}
    ]"#,
    );
    let navigator = Navigator::new(&geometry, TrackingConfig::default());
    let mut state = navigator
        .locate(&Vector3::new(0.25, 0.0, 0.0), &Vector3::new(1.0, 0.0, 0.0))
        .unwrap();
    let mut visited = vec![geometry.cells[state.current().cell].user_id.clone()];
    for step in 0..6 {
        let hit = navigator.distance_to_next(&state).unwrap();
        // First flight covers the rest of the starting slab, then full tiles
        let expected = if step == 0 { 0.75 } else { 1.0 };
        assert_relative_eq!(hit.distance, expected, epsilon = 1e-6);
        navigator.cross(&mut state, &hit).unwrap();
        visited.push(geometry.cells[state.current().cell].user_id.clone());
    }
    assert_eq!(
        visited,
        vec!["slab_a", "slab_b", "slab_a", "slab_b", "slab_a", "slab_b", "slab_a"],
    );
}
