//! Source sampling.
//!
//! A source is a weighted sum of distributions over (position, direction,
//! energy). Distributions are reusable across sources by user id. All
//! samplers take a generic `Rng` so histories can own deterministic streams.

use crate::definitions::{DistributionDefinition, ObjectDefinition, SourceDefinition};
use crate::error::{HeliosError, Result};
use crate::particle::Particle;
use indexmap::IndexMap;
use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Position marginal of a source distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PositionDistribution {
    /// All particles born at one point.
    Point {
        /// Birth position.
        position: [f64; 3],
    },
    /// Uniform over an axis-aligned box.
    Box {
        /// Lower corner.
        lower: [f64; 3],
        /// Upper corner.
        upper: [f64; 3],
    },
}

impl PositionDistribution {
    /// Sample a birth position.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vector3<f64> {
        match self {
            PositionDistribution::Point { position } => {
                Vector3::new(position[0], position[1], position[2])
            }
            PositionDistribution::Box { lower, upper } => Vector3::new(
                lower[0] + rng.gen::<f64>() * (upper[0] - lower[0]),
                lower[1] + rng.gen::<f64>() * (upper[1] - lower[1]),
                lower[2] + rng.gen::<f64>() * (upper[2] - lower[2]),
            ),
        }
    }
}

/// Direction marginal of a source distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DirectionDistribution {
    /// Uniform over the unit sphere.
    Isotropic,
    /// A fixed direction; normalized at sampling time.
    Mono {
        /// Flight direction (need not be unit length in the input).
        direction: [f64; 3],
    },
}

impl DirectionDistribution {
    /// Sample a unit flight direction.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vector3<f64> {
        match self {
            DirectionDistribution::Isotropic => sample_isotropic(rng),
            DirectionDistribution::Mono { direction } => {
                Vector3::new(direction[0], direction[1], direction[2]).normalize()
            }
        }
    }
}

/// Energy marginal of a source distribution. Energies are in MeV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EnergyDistribution {
    /// Monoenergetic.
    Mono {
        /// Birth energy.
        energy: f64,
    },
    /// Watt fission spectrum with parameters `a` (MeV) and `b` (1/MeV).
    Watt {
        /// Spectrum parameter a.
        a: f64,
        /// Spectrum parameter b.
        b: f64,
    },
    /// Maxwellian spectrum with nuclear temperature `temperature` (MeV).
    Maxwell {
        /// Nuclear temperature.
        temperature: f64,
    },
}

impl EnergyDistribution {
    /// Sample a birth energy in MeV.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match self {
            EnergyDistribution::Mono { energy } => *energy,
            EnergyDistribution::Watt { a, b } => sample_watt(*a, *b, rng),
            EnergyDistribution::Maxwell { temperature } => sample_maxwell(*temperature, rng),
        }
    }
}

/// Uniform direction on the unit sphere: cosine of the polar angle uniform
/// in [-1, 1), azimuth uniform in [0, 2 pi).
pub fn sample_isotropic<R: Rng>(rng: &mut R) -> Vector3<f64> {
    let mu = 2.0 * rng.gen::<f64>() - 1.0;
    let phi = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
    let sin_theta = (1.0 - mu * mu).sqrt();
    Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), mu)
}

/// Maxwellian energy sample at nuclear temperature `t` (MeV).
pub fn sample_maxwell<R: Rng>(t: f64, rng: &mut R) -> f64 {
    let xi1: f64 = rng.gen();
    let xi2: f64 = rng.gen();
    let xi3: f64 = rng.gen();
    let c = (std::f64::consts::FRAC_PI_2 * xi3).cos();
    -t * (xi1.ln() + xi2.ln() * c * c)
}

/// Watt fission spectrum sample via the Maxwellian shift identity.
pub fn sample_watt<R: Rng>(a: f64, b: f64, rng: &mut R) -> f64 {
    let w = sample_maxwell(a, rng);
    let shifted = w + a * a * b / 4.0 + (2.0 * rng.gen::<f64>() - 1.0) * (a * a * b * w).sqrt();
    shifted.max(0.0)
}

/// A named distribution over (position, direction, energy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Author-chosen identifier.
    pub user_id: String,
    /// Dense internal id assigned at setup.
    pub index: usize,
    /// Position marginal.
    pub position: PositionDistribution,
    /// Direction marginal.
    pub direction: DirectionDistribution,
    /// Energy marginal.
    pub energy: EnergyDistribution,
}

impl Distribution {
    /// Sample a full birth state.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Particle {
        Particle::new(
            self.position.sample(rng),
            self.direction.sample(rng),
            self.energy.sample(rng),
        )
    }
}

/// A source: a weighted sum of distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Author-chosen identifier.
    pub user_id: String,
    /// Dense internal id assigned at setup.
    pub index: usize,
    /// `(distribution internal id, cumulative weight)` pairs; the last
    /// cumulative weight is the total.
    pub cumulative: Vec<(usize, f64)>,
}

impl Source {
    /// Pick a distribution by cumulative weight.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> usize {
        let total = self.cumulative.last().map_or(0.0, |&(_, weight)| weight);
        let xi = rng.gen::<f64>() * total;
        for &(distribution, cumulative_weight) in &self.cumulative {
            if xi < cumulative_weight {
                return distribution;
            }
        }
        // Guard against xi == total from floating-point rounding
        self.cumulative.last().map(|&(d, _)| d).unwrap_or(0)
    }
}

/// The source module: distributions plus sources built from definitions.
#[derive(Debug, Clone, Default)]
pub struct SourceModule {
    /// All distributions, indexed by internal id.
    pub distributions: Vec<Distribution>,
    /// All sources, indexed by internal id.
    pub sources: Vec<Source>,
    distribution_index: IndexMap<String, usize>,
    source_index: IndexMap<String, usize>,
}

impl SourceModule {
    /// Build the module from its staged definitions.
    ///
    /// Distributions are interned first so sources can resolve references in
    /// a single pass regardless of definition order.
    pub fn from_definitions(definitions: &[ObjectDefinition]) -> Result<Self> {
        let mut module = SourceModule::default();
        for definition in definitions {
            if let ObjectDefinition::Distribution(def) = definition {
                module.intern_distribution(def)?;
            }
        }
        for definition in definitions {
            if let ObjectDefinition::Source(def) = definition {
                module.intern_source(def)?;
            }
        }
        Ok(module)
    }

    fn intern_distribution(&mut self, def: &DistributionDefinition) -> Result<()> {
        if self.distribution_index.contains_key(&def.user_id) {
            return Err(HeliosError::ParseError {
                path: def.user_id.clone(),
                reason: "duplicate distribution user id".to_string(),
            });
        }
        let index = self.distributions.len();
        self.distribution_index.insert(def.user_id.clone(), index);
        self.distributions.push(Distribution {
            user_id: def.user_id.clone(),
            index,
            position: def.position.clone(),
            direction: def.direction.clone(),
            energy: def.energy.clone(),
        });
        Ok(())
    }

    fn intern_source(&mut self, def: &SourceDefinition) -> Result<()> {
        let mut cumulative = Vec::with_capacity(def.distributions.len());
        let mut running = 0.0;
        for entry in &def.distributions {
            let distribution = self
                .distribution_index
                .get(&entry.distribution)
                .copied()
                .ok_or_else(|| HeliosError::ObjectMissing {
                    module: crate::definitions::SOURCE_MODULE.to_string(),
                    user_id: entry.distribution.clone(),
                })?;
            if entry.weight <= 0.0 {
                return Err(HeliosError::ParseError {
                    path: def.user_id.clone(),
                    reason: format!(
                        "distribution '{}' has non-positive weight {}",
                        entry.distribution, entry.weight
                    ),
                });
            }
            running += entry.weight;
            cumulative.push((distribution, running));
        }
        if cumulative.is_empty() {
            return Err(HeliosError::ParseError {
                path: def.user_id.clone(),
                reason: "source has no distributions".to_string(),
            });
        }
        let index = self.sources.len();
        self.source_index.insert(def.user_id.clone(), index);
        self.sources.push(Source {
            user_id: def.user_id.clone(),
            index,
            cumulative,
        });
        Ok(())
    }

    /// Look up a distribution internal id by user id.
    pub fn distribution(&self, user_id: &str) -> Option<usize> {
        self.distribution_index.get(user_id).copied()
    }

    /// Look up a source internal id by user id.
    pub fn source(&self, user_id: &str) -> Option<usize> {
        self.source_index.get(user_id).copied()
    }

    /// Sample one birth particle from a source.
    pub fn sample<R: Rng>(&self, source: usize, rng: &mut R) -> Particle {
        let distribution = self.sources[source].pick(rng);
        self.distributions[distribution].sample(rng)
    }
}
