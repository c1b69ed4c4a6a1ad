//! Property-based tests for tracking and ACE invariants.
//!
//! Randomized inputs exercise the sign-stability, reflection, interpolation,
//! and round-trip guarantees the transport loop depends on.

mod common;

use helios::ace::{AceTable, Block};
use helios::nuclide::log_linear_interpolate;
use helios::surface::{quadratic_intersect, BoundaryKind, Sense, Surface, SURFACE_TOLERANCE};
use helios::universe::{Lattice, LatticeKind};
use nalgebra::Vector3;
use proptest::prelude::*;

// === Custom Strategies ===

// Points kept away from the unit scale surfaces used below.
fn arb_point() -> impl Strategy<Value = Vector3<f64>> {
    (-8.0..8.0f64, -8.0..8.0f64, -8.0..8.0f64).prop_map(|(x, y, z)| Vector3::new(x, y, z))
}

// Non-degenerate directions, normalized.
fn arb_direction() -> impl Strategy<Value = Vector3<f64>> {
    (-1.0..1.0f64, -1.0..1.0f64, -1.0..1.0f64)
        .prop_filter_map("direction must have usable length", |(x, y, z)| {
            let v = Vector3::new(x, y, z);
            (v.norm() > 1e-3).then(|| v.normalize())
        })
}

fn arb_surface() -> impl Strategy<Value = Surface> {
    prop_oneof![
        (-5.0..5.0f64).prop_map(|d| {
            Surface::from_tag("s", "px", &[d], BoundaryKind::default()).unwrap()
        }),
        ((-3.0..3.0f64), (-3.0..3.0f64), (0.5..4.0f64)).prop_map(|(u, v, r)| {
            Surface::from_tag("s", "c/z", &[u, v, r], BoundaryKind::default()).unwrap()
        }),
        ((-3.0..3.0f64), (-3.0..3.0f64), (-3.0..3.0f64), (0.5..4.0f64)).prop_map(
            |(x, y, z, r)| {
                Surface::from_tag("s", "s", &[x, y, z, r], BoundaryKind::default()).unwrap()
            }
        ),
    ]
}

// === Property Tests ===

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Sub-tolerance translations never flip the sign of f(p) for points
    // that are not on the surface.
    #[test]
    fn sign_stable_under_sub_tolerance_moves(
        surface in arb_surface(),
        point in arb_point(),
        shift in arb_direction(),
    ) {
        let value = surface.function(&point);
        prop_assume!(value.abs() > 1e-6);
        let moved = point + shift * (SURFACE_TOLERANCE / 10.0);
        prop_assert_eq!(
            Sense::of(value),
            surface.sense_of(&moved),
            "sense flipped by a sub-tolerance move"
        );
    }

    // A returned intersection distance is always strictly positive, and the
    // surface function at the hit point is near zero.
    #[test]
    fn intersections_are_forward_and_on_surface(
        surface in arb_surface(),
        point in arb_point(),
        direction in arb_direction(),
    ) {
        prop_assume!(surface.function(&point).abs() > 1e-6);
        let sense = surface.sense_of(&point);
        if let Some(distance) = surface.intersect(&point, &direction, sense) {
            prop_assert!(distance > 0.0);
            let hit = point + direction * distance;
            prop_assert!(
                surface.function(&hit).abs() < 1e-6,
                "hit point is off the surface by {:.2e}",
                surface.function(&hit)
            );
        }
    }

    // Translating a surface translates its zero set exactly.
    #[test]
    fn translated_surface_shifts_function(
        surface in arb_surface(),
        point in arb_point(),
        shift in arb_point(),
    ) {
        let moved = surface.translated(&shift);
        let direct = surface.function(&point);
        let via_shift = moved.function(&(point + shift));
        prop_assert!(
            (direct - via_shift).abs() < 1e-9,
            "f(p) = {direct} but f_t(p + t) = {via_shift}"
        );
    }

    // Specular reflection preserves the direction norm to machine epsilon.
    #[test]
    fn reflection_preserves_speed(
        direction in arb_direction(),
        normal in arb_direction(),
    ) {
        let reflected = direction - 2.0 * direction.dot(&normal) * normal;
        prop_assert!(
            (reflected.norm() - direction.norm()).abs() < 1e-12,
            "reflection changed the speed by {:.2e}",
            (reflected.norm() - direction.norm()).abs()
        );
    }

    // The shared quadratic solver only ever returns forward distances.
    #[test]
    fn quadratic_solutions_are_positive(
        a in -4.0..4.0f64,
        k in -4.0..4.0f64,
        c in -4.0..4.0f64,
        negative_sense in any::<bool>(),
    ) {
        let sense = if negative_sense { Sense::Negative } else { Sense::Positive };
        if let Some(t) = quadratic_intersect(a, k, c, sense, SURFACE_TOLERANCE) {
            prop_assert!(t > 0.0, "non-positive root {t}");
        }
    }

    // Log-linear interpolation stays within the bracketing values.
    #[test]
    fn interpolation_is_bounded(
        values in prop::collection::vec(0.1..1000.0f64, 2..20),
        fraction in 0.0..1.0f64,
    ) {
        let energies: Vec<f64> = (0..values.len())
            .map(|index| 1e-9 * 10.0f64.powi(index as i32))
            .collect();
        let energy = energies[0] * (energies[energies.len() - 1] / energies[0]).powf(fraction);
        let result = log_linear_interpolate(&energies, &values, energy);
        let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(result >= lo - 1e-9 && result <= hi + 1e-9);
    }

    // An infinite lattice always produces local coordinates within half a
    // pitch of the slot center on tiled axes.
    #[test]
    fn infinite_lattice_local_coordinates_are_small(
        x in -50.0..50.0f64,
        y in -50.0..50.0f64,
        pitch in 0.5..3.0f64,
    ) {
        let lattice = Lattice::try_new(
            "lat",
            [3, 2, 1],
            Vector3::new(pitch, pitch, 0.0),
            Vector3::zeros(),
            LatticeKind::Infinite,
            vec![0, 1, 2, 3, 4, 5],
        )
        .unwrap();
        let point = Vector3::new(x, y, 7.0);
        let slot = lattice.locate(&point).unwrap();
        let local = point - slot.translation;
        prop_assert!(local.x.abs() <= pitch / 2.0 + 1e-9);
        prop_assert!(local.y.abs() <= pitch / 2.0 + 1e-9);
        prop_assert!((local.z - 7.0).abs() < 1e-12, "pass-through axis moved");
    }

    // ITIE tables of random size round-trip through dump and reparse.
    #[test]
    fn itie_round_trip(
        count in 1usize..40,
        scale in 0.5..2.0f64,
    ) {
        let energies: Vec<f64> = (0..count)
            .map(|index| scale * 1e-9 * (index as f64 + 1.0))
            .collect();
        let cross_sections: Vec<f64> = (0..count)
            .map(|index| 20.0 / (index as f64 + 1.0))
            .collect();
        let table = AceTable::from_blocks(
            common::ace_header("lwtr.10t"),
            vec![Block::Itie { energies, cross_sections }],
        )
        .unwrap();
        prop_assert_eq!(table.rebuild().unwrap(), table);
    }
}
