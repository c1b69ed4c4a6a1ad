//! Run settings.
//!
//! Tolerances, the global seed, and batch sizes. Everything has a default so
//! an input without a settings block still runs.

use crate::definitions::{ObjectDefinition, SettingsDefinition};
use crate::error::Result;

/// Default tolerance below which a particle counts as on a surface.
pub fn default_surface_tolerance() -> f64 {
    crate::surface::SURFACE_TOLERANCE
}

/// Default post-crossing nudge distance.
pub fn default_nudge() -> f64 {
    1e-8
}

/// Default global seed.
pub fn default_seed() -> u64 {
    1
}

/// Default histories per batch.
pub fn default_histories() -> usize {
    1000
}

/// Default number of batches.
pub fn default_batches() -> usize {
    10
}

/// The settings module.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Tolerance below which a particle counts as on a surface.
    pub surface_tolerance: f64,
    /// Post-crossing nudge distance along the flight direction.
    pub nudge: f64,
    /// Global seed; history streams derive from it deterministically.
    pub seed: u64,
    /// Histories per batch.
    pub histories: usize,
    /// Number of batches.
    pub batches: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            surface_tolerance: default_surface_tolerance(),
            nudge: default_nudge(),
            seed: default_seed(),
            histories: default_histories(),
            batches: default_batches(),
        }
    }
}

impl Settings {
    /// Build the module from its staged definitions.
    ///
    /// The first settings definition wins; extras are ignored with a warning.
    pub fn from_definitions(definitions: &[ObjectDefinition]) -> Result<Self> {
        let mut blocks = definitions.iter().filter_map(|definition| match definition {
            ObjectDefinition::Settings(def) => Some(def),
            _ => None,
        });
        let Some(first) = blocks.next() else {
            return Ok(Settings::default());
        };
        for extra in blocks {
            tracing::warn!(
                "ignoring extra settings block '{}' (first one wins)",
                extra.user_id
            );
        }
        Ok(Self::from_definition(first))
    }

    fn from_definition(def: &SettingsDefinition) -> Self {
        Self {
            surface_tolerance: def.surface_tolerance,
            nudge: def.nudge,
            seed: def.seed,
            histories: def.histories,
            batches: def.batches,
        }
    }
}
