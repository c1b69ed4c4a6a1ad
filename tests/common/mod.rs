//! Shared test utilities: reference geometries and ACE tables.

#![allow(dead_code)]

use helios::ace::{AceHeader, AceTable, Block, NuForm};
use helios::definitions::parse_definitions;
use helios::geometry::Geometry;
use helios::material::{Material, MaterialsModule};
use helios::nuclide::Nuclide;

/// Build a geometry from a JSON definition stream (no materials module).
pub fn build_geometry(json: &str) -> Geometry {
    Geometry::from_definitions(&parse_definitions(json).unwrap(), None).unwrap()
}

/// A 2x2 bounded pin lattice inside a vacuum box: root holds one fill cell
/// covered by the lattice window, pins of radius 0.4 on a 1 cm pitch.
pub fn pin_lattice_definitions() -> &'static str {
    r#"[
        {"object": "surface", "user_id": "edge", "tag": "so", "coefficients": [20.0],
         "boundary": "vacuum"},
        {"object": "surface", "user_id": "win_lo_x", "tag": "px", "coefficients": [-1.0]},
        {"object": "surface", "user_id": "win_hi_x", "tag": "px", "coefficients": [1.0]},
        {"object": "surface", "user_id": "win_lo_y", "tag": "py", "coefficients": [-1.0]},
        {"object": "surface", "user_id": "win_hi_y", "tag": "py", "coefficients": [1.0]},
        {"object": "surface", "user_id": "pin", "tag": "c/z",
         "coefficients": [0.0, 0.0, 0.4]},
        {"object": "surface", "user_id": "slot_lo_x", "tag": "px", "coefficients": [-0.5]},
        {"object": "surface", "user_id": "slot_hi_x", "tag": "px", "coefficients": [0.5]},
        {"object": "surface", "user_id": "slot_lo_y", "tag": "py", "coefficients": [-0.5]},
        {"object": "surface", "user_id": "slot_hi_y", "tag": "py", "coefficients": [0.5]},
        {"object": "cell", "user_id": "core", "fill": "grid",
         "surfaces": ["+win_lo_x", "-win_hi_x", "+win_lo_y", "-win_hi_y", "-edge"]},
        {"object": "cell", "user_id": "pool_w",
         "surfaces": ["-edge", "-win_lo_x"]},
        {"object": "cell", "user_id": "pool_e",
         "surfaces": ["-edge", "+win_hi_x"]},
        {"object": "cell", "user_id": "pool_s",
         "surfaces": ["-edge", "+win_lo_x", "-win_hi_x", "-win_lo_y"]},
        {"object": "cell", "user_id": "pool_n",
         "surfaces": ["-edge", "+win_lo_x", "-win_hi_x", "+win_hi_y"]},
        {"object": "lattice", "user_id": "grid", "shape": [2, 2, 1],
         "pitch": [1.0, 1.0, 0.0], "origin": [-1.0, -1.0, 0.0], "kind": "bounded",
         "slots": ["pincell", "pincell", "pincell", "pincell"]},
        {"object": "cell", "user_id": "rod", "universe": "pincell",
         "surfaces": ["-pin"]},
        {"object": "cell", "user_id": "water", "universe": "pincell",
         "surfaces": ["+pin", "+slot_lo_x", "-slot_hi_x", "+slot_lo_y", "-slot_hi_y"]}
    ]"#
}

/// Standard test header for a given zaid.
pub fn ace_header(zaid: &str) -> AceHeader {
    AceHeader {
        zaid: zaid.to_string(),
        atomic_weight_ratio: 0.99917,
        temperature: 2.5301e-8,
        date: "08/01/26".to_string(),
        comment: "generated for tests".to_string(),
        material: "mat 125".to_string(),
    }
}

/// A continuous-energy table with ESZ, NU, and SIG blocks.
pub fn sample_ce_table(zaid: &str) -> AceTable {
    AceTable::from_blocks(
        ace_header(zaid),
        vec![
            Block::Esz {
                energies: vec![1e-9, 1e-6, 1e-3, 1.0, 20.0],
                total: vec![1160.0, 48.0, 21.0, 4.2, 0.48],
                absorption: vec![1100.0, 33.0, 1.0, 3e-5, 3e-6],
                elastic: vec![60.0, 15.0, 20.0, 4.2, 0.48],
                heating: vec![0.0, 0.0, 0.0, 0.5, 9.8],
            },
            Block::Nu {
                form: NuForm::Tabular {
                    energies: vec![1e-9, 1.0, 20.0],
                    values: vec![2.42, 2.48, 4.1],
                },
            },
            Block::Sig {
                reactions: vec![helios::ace::ReactionXs {
                    mt: 102,
                    first_index: 1,
                    values: vec![1099.0, 32.0, 0.9, 2e-5, 2e-6],
                }],
            },
        ],
    )
    .unwrap()
}

/// The two-block table of the round-trip scenario: ESZ plus the thermal
/// incident-energy grid, five energies each.
pub fn esz_itie_table(zaid: &str) -> AceTable {
    AceTable::from_blocks(
        ace_header(zaid),
        vec![
            Block::Esz {
                energies: vec![1e-9, 1e-8, 1e-7, 1e-6, 1e-5],
                total: vec![100.0, 80.0, 60.0, 40.0, 20.0],
                absorption: vec![50.0, 40.0, 30.0, 20.0, 10.0],
                elastic: vec![50.0, 40.0, 30.0, 20.0, 10.0],
                heating: vec![0.0, 0.1, 0.2, 0.3, 0.4],
            },
            Block::Itie {
                energies: vec![1e-9, 2e-9, 4e-9, 8e-9, 1.6e-8],
                cross_sections: vec![12.0, 10.0, 8.0, 6.0, 4.0],
            },
        ],
    )
    .unwrap()
}

/// A nuclide with energy-independent cross sections.
pub fn flat_nuclide(zaid: &str, total: f64, absorption: f64, awr: f64) -> Nuclide {
    let table = AceTable::from_blocks(
        AceHeader {
            zaid: zaid.to_string(),
            atomic_weight_ratio: awr,
            temperature: 2.5301e-8,
            date: "08/01/26".to_string(),
            comment: "flat".to_string(),
            material: "mat".to_string(),
        },
        vec![Block::Esz {
            energies: vec![1e-9, 20.0],
            total: vec![total, total],
            absorption: vec![absorption, absorption],
            elastic: vec![total - absorption, total - absorption],
            heating: vec![0.0, 0.0],
        }],
    )
    .unwrap();
    Nuclide::from_table(&table).unwrap()
}

/// A one-material module around a strong flat absorber.
pub fn absorber_module(density: f64) -> MaterialsModule {
    let mut module = MaterialsModule::default();
    module
        .add_nuclide(flat_nuclide("5010.70c", 10.0, 9.0, 10.0))
        .unwrap();
    module.add_material(Material {
        user_id: "absorber".to_string(),
        index: 0,
        density,
        composition: vec![(0, 1.0)],
    });
    module
}
