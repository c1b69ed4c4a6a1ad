//! Materials: compositions over nuclides and macroscopic cross sections.
//!
//! A material does not pre-union energy grids; each query walks its
//! composition and interpolates every nuclide on its own grid.

use crate::ace::read_ace_file;
use crate::definitions::{MaterialDefinition, ObjectDefinition};
use crate::error::{HeliosError, Result};
use crate::nuclide::{Nuclide, Reaction};
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Outcome of sampling a collision channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionChannel {
    /// The particle is absorbed.
    Absorption,
    /// The particle scatters elastically.
    Scatter,
}

/// A material: normalized composition plus bulk atom density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Author-chosen identifier; user ids may be shared between materials.
    pub user_id: String,
    /// Dense internal id assigned at setup.
    pub index: usize,
    /// Atom density in atoms/(barn cm).
    pub density: f64,
    /// `(nuclide internal id, atom fraction)`; fractions sum to one.
    pub composition: Vec<(usize, f64)>,
}

impl Material {
    /// Macroscopic cross section in 1/cm:
    /// `Sigma_r(E) = N * sum_i a_i * sigma_{r,i}(E)`.
    pub fn macro_xs(&self, nuclides: &[Nuclide], reaction: Reaction, energy: f64) -> f64 {
        self.density
            * self
                .composition
                .iter()
                .map(|&(nuclide, fraction)| {
                    fraction * nuclides[nuclide].micro_xs(reaction, energy)
                })
                .sum::<f64>()
    }

    /// Sample the free flight distance to the next collision.
    ///
    /// Returns `None` when the total cross section vanishes (the particle
    /// streams without colliding).
    pub fn sample_distance_to_collision<R: Rng>(
        &self,
        nuclides: &[Nuclide],
        energy: f64,
        rng: &mut R,
    ) -> Option<f64> {
        let sigma_total = self.macro_xs(nuclides, Reaction::Total, energy);
        if sigma_total <= 0.0 {
            return None;
        }
        Some(-rng.gen::<f64>().ln() / sigma_total)
    }

    /// Sample the collision nuclide and channel at `energy`.
    ///
    /// The nuclide is picked proportionally to its partial total cross
    /// section, then the channel by the absorption-to-total ratio of that
    /// nuclide.
    pub fn sample_collision<R: Rng>(
        &self,
        nuclides: &[Nuclide],
        energy: f64,
        rng: &mut R,
    ) -> (usize, CollisionChannel) {
        let partials: Vec<(usize, f64)> = self
            .composition
            .iter()
            .map(|&(nuclide, fraction)| {
                (
                    nuclide,
                    fraction * nuclides[nuclide].micro_xs(Reaction::Total, energy),
                )
            })
            .collect();
        let total: f64 = partials.iter().map(|&(_, partial)| partial).sum();
        let mut xi = rng.gen::<f64>() * total;
        let mut picked = partials[partials.len() - 1].0;
        for &(nuclide, partial) in &partials {
            if xi < partial {
                picked = nuclide;
                break;
            }
            xi -= partial;
        }

        let nuclide = &nuclides[picked];
        let sigma_total = nuclide.micro_xs(Reaction::Total, energy);
        let sigma_absorption = nuclide.micro_xs(Reaction::Absorption, energy);
        let channel = if sigma_total > 0.0 && rng.gen::<f64>() * sigma_total < sigma_absorption
        {
            CollisionChannel::Absorption
        } else {
            CollisionChannel::Scatter
        };
        (picked, channel)
    }
}

/// The materials module: loaded nuclides plus resolved materials.
#[derive(Debug, Clone, Default)]
pub struct MaterialsModule {
    /// All nuclides, indexed by internal id.
    pub nuclides: Vec<Nuclide>,
    /// All materials, indexed by internal id.
    pub materials: Vec<Material>,
    nuclide_index: IndexMap<String, usize>,
    material_index: IndexMap<String, Vec<usize>>,
}

impl MaterialsModule {
    /// Build the module from its staged definitions.
    ///
    /// Nuclide definitions load their ACE files first so material
    /// compositions can resolve in a single pass regardless of order.
    pub fn from_definitions(definitions: &[ObjectDefinition]) -> Result<Self> {
        let mut module = MaterialsModule::default();
        for definition in definitions {
            if let ObjectDefinition::Nuclide(def) = definition {
                module.load_nuclide(&def.user_id, Path::new(&def.path))?;
            }
        }
        for definition in definitions {
            if let ObjectDefinition::Material(def) = definition {
                module.intern_material(def)?;
            }
        }
        Ok(module)
    }

    /// Load a nuclide from an ACE file, matching the table by zaid.
    pub fn load_nuclide(&mut self, zaid: &str, path: &Path) -> Result<usize> {
        let tables = read_ace_file(path)?;
        let table = tables
            .iter()
            .find(|table| table.header.zaid == zaid)
            .ok_or_else(|| HeliosError::MaterialResolutionError {
                nuclide_id: zaid.to_string(),
            })?;
        self.add_nuclide(Nuclide::from_table(table)?)
    }

    /// Register an already-built nuclide; duplicate zaids are rejected.
    pub fn add_nuclide(&mut self, mut nuclide: Nuclide) -> Result<usize> {
        if self.nuclide_index.contains_key(&nuclide.zaid) {
            return Err(HeliosError::ParseError {
                path: nuclide.zaid.clone(),
                reason: "duplicate nuclide zaid".to_string(),
            });
        }
        let index = self.nuclides.len();
        nuclide.index = index;
        self.nuclide_index.insert(nuclide.zaid.clone(), index);
        self.nuclides.push(nuclide);
        Ok(index)
    }

    /// Register an already-built material under its user id.
    ///
    /// Unlike nuclides, duplicate material user ids are accepted; lookups
    /// return every instance.
    pub fn add_material(&mut self, mut material: Material) -> usize {
        let index = self.materials.len();
        material.index = index;
        self.material_index
            .entry(material.user_id.clone())
            .or_default()
            .push(index);
        self.materials.push(material);
        index
    }

    fn intern_material(&mut self, def: &MaterialDefinition) -> Result<()> {
        if def.density <= 0.0 || !def.density.is_finite() {
            return Err(HeliosError::ParseError {
                path: def.user_id.clone(),
                reason: format!("density must be positive, got {}", def.density),
            });
        }
        if def.composition.is_empty() {
            return Err(HeliosError::ParseError {
                path: def.user_id.clone(),
                reason: "material has an empty composition".to_string(),
            });
        }
        let mut composition = Vec::with_capacity(def.composition.len());
        let mut total_fraction = 0.0;
        for entry in &def.composition {
            let nuclide = self.nuclide_index.get(&entry.nuclide).copied().ok_or_else(
                || HeliosError::MaterialResolutionError {
                    nuclide_id: entry.nuclide.clone(),
                },
            )?;
            if entry.fraction <= 0.0 {
                return Err(HeliosError::ParseError {
                    path: def.user_id.clone(),
                    reason: format!(
                        "nuclide '{}' has non-positive fraction {}",
                        entry.nuclide, entry.fraction
                    ),
                });
            }
            total_fraction += entry.fraction;
            composition.push((nuclide, entry.fraction));
        }
        for entry in &mut composition {
            entry.1 /= total_fraction;
        }
        self.add_material(Material {
            user_id: def.user_id.clone(),
            index: 0,
            density: def.density,
            composition,
        });
        Ok(())
    }

    /// Nuclide internal id by zaid.
    pub fn nuclide(&self, zaid: &str) -> Option<usize> {
        self.nuclide_index.get(zaid).copied()
    }

    /// All material internal ids sharing a user id. Materials are the one
    /// module where user ids may legitimately repeat.
    pub fn materials_with_id(&self, user_id: &str) -> &[usize] {
        self.material_index
            .get(user_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first material with a user id, if any.
    pub fn material(&self, user_id: &str) -> Option<usize> {
        self.materials_with_id(user_id).first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ace::{AceHeader, AceTable, Block};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flat_nuclide(zaid: &str, total: f64, absorption: f64) -> Nuclide {
        let table = AceTable::from_blocks(
            AceHeader {
                zaid: zaid.to_string(),
                atomic_weight_ratio: 1.0,
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

    fn two_nuclide_module() -> MaterialsModule {
        let mut module = MaterialsModule::default();
        module.add_nuclide(flat_nuclide("1001.70c", 20.0, 0.2)).unwrap();
        module.add_nuclide(flat_nuclide("8016.70c", 4.0, 0.0)).unwrap();
        let definitions = crate::definitions::parse_definitions(
            r#"[{"object": "material", "user_id": "water", "density": 0.1,
                 "composition": [{"nuclide": "1001.70c", "fraction": 2.0},
                                 {"nuclide": "8016.70c", "fraction": 1.0}]}]"#,
        )
        .unwrap();
        for definition in &definitions {
            if let ObjectDefinition::Material(def) = definition {
                module.intern_material(def).unwrap();
            }
        }
        module
    }

    #[test]
    fn test_macro_xs() {
        let module = two_nuclide_module();
        let material = &module.materials[module.material("water").unwrap()];
        // Sigma = 0.1 * (2/3 * 20 + 1/3 * 4) = 0.1 * 44/3
        let sigma = material.macro_xs(&module.nuclides, Reaction::Total, 1.0);
        assert_relative_eq!(sigma, 0.1 * 44.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fractions_are_normalized() {
        let module = two_nuclide_module();
        let material = &module.materials[module.material("water").unwrap()];
        let total: f64 = material.composition.iter().map(|&(_, f)| f).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_collision_distance_mean() {
        let module = two_nuclide_module();
        let material = &module.materials[module.material("water").unwrap()];
        let sigma = material.macro_xs(&module.nuclides, Reaction::Total, 1.0);
        let mut rng = StdRng::seed_from_u64(17);
        let n = 50_000;
        let mean: f64 = (0..n)
            .map(|_| {
                material
                    .sample_distance_to_collision(&module.nuclides, 1.0, &mut rng)
                    .unwrap()
            })
            .sum::<f64>()
            / n as f64;
        // Mean free path is 1 / Sigma_t
        assert_relative_eq!(mean, 1.0 / sigma, epsilon = 0.05 / sigma);
    }

    #[test]
    fn test_void_like_material_streams() {
        let mut module = MaterialsModule::default();
        module.add_nuclide(flat_nuclide("2004.70c", 0.0, 0.0)).unwrap();
        let material = Material {
            user_id: "empty".to_string(),
            index: 0,
            density: 1.0,
            composition: vec![(0, 1.0)],
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(material
            .sample_distance_to_collision(&module.nuclides, 1.0, &mut rng)
            .is_none());
    }

    #[test]
    fn test_sample_collision_prefers_dominant_nuclide() {
        let module = two_nuclide_module();
        let material = &module.materials[module.material("water").unwrap()];
        let mut rng = StdRng::seed_from_u64(23);
        let n = 20_000;
        let hydrogen = module.nuclide("1001.70c").unwrap();
        let hits = (0..n)
            .map(|_| material.sample_collision(&module.nuclides, 1.0, &mut rng))
            .filter(|&(nuclide, _)| nuclide == hydrogen)
            .count();
        // Hydrogen carries 2/3 * 20 of the 44/3 partial total: ~91%
        let fraction = hits as f64 / n as f64;
        assert!(
            (fraction - 40.0 / 44.0).abs() < 0.02,
            "hydrogen collision fraction {fraction}"
        );
    }

    #[test]
    fn test_unresolved_nuclide() {
        // No nuclides loaded: the composition reference cannot resolve
        let definitions = crate::definitions::parse_definitions(
            r#"[{"object": "material", "user_id": "water", "density": 0.1,
                 "composition": [{"nuclide": "1001.70c", "fraction": 1.0}]}]"#,
        )
        .unwrap();
        let err = MaterialsModule::from_definitions(&definitions).unwrap_err();
        assert!(
            matches!(err, HeliosError::MaterialResolutionError { .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_duplicate_material_ids_allowed() {
        let mut module = MaterialsModule::default();
        module.add_nuclide(flat_nuclide("1001.70c", 20.0, 0.2)).unwrap();
        let definitions = crate::definitions::parse_definitions(
            r#"[{"object": "material", "user_id": "fuel", "density": 0.05,
                 "composition": [{"nuclide": "1001.70c", "fraction": 1.0}]},
                {"object": "material", "user_id": "fuel", "density": 0.07,
                 "composition": [{"nuclide": "1001.70c", "fraction": 1.0}]}]"#,
        )
        .unwrap();
        for definition in &definitions {
            if let ObjectDefinition::Material(def) = definition {
                module.intern_material(def).unwrap();
            }
        }
        assert_eq!(module.materials_with_id("fuel").len(), 2);
        assert_eq!(module.material("fuel"), Some(0));
    }

    #[test]
    fn test_duplicate_nuclide_rejected() {
        let mut module = MaterialsModule::default();
        module.add_nuclide(flat_nuclide("1001.70c", 20.0, 0.2)).unwrap();
        let err = module
            .add_nuclide(flat_nuclide("1001.70c", 10.0, 0.1))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"), "message: {err}");
    }
}
