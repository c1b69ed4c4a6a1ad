//! Nuclides: ACE-backed microscopic cross-sections.

use crate::ace::{AceTable, Block, BlockTag};
use crate::error::{HeliosError, Result};
use serde::{Deserialize, Serialize};

/// Reaction channels a nuclide can be queried for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reaction {
    /// Total interaction.
    Total,
    /// Absorption (disappearance).
    Absorption,
    /// Elastic scattering.
    Elastic,
}

/// A nuclide built from one continuous-energy ACE table.
///
/// Holds the principal cross sections on the table's energy grid; lookups
/// interpolate log-linearly (linear in `ln E`) between tabulated points and
/// clamp outside the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nuclide {
    /// The zaid this nuclide was built from.
    pub zaid: String,
    /// Dense internal id assigned by the materials module.
    pub index: usize,
    /// Atomic weight ratio to the neutron mass.
    pub atomic_weight_ratio: f64,
    /// Table temperature as kT in MeV.
    pub temperature: f64,
    energies: Vec<f64>,
    total: Vec<f64>,
    absorption: Vec<f64>,
    elastic: Vec<f64>,
}

impl Nuclide {
    /// Build a nuclide from a parsed table; the table must carry an ESZ
    /// block (thermal tables cannot back a nuclide).
    pub fn from_table(table: &AceTable) -> Result<Self> {
        let Some(Block::Esz {
            energies,
            total,
            absorption,
            elastic,
            ..
        }) = table.block(BlockTag::Esz)
        else {
            return Err(HeliosError::AceParseError {
                offset: 0,
                reason: format!("table '{}' has no ESZ block", table.header.zaid),
            });
        };
        Ok(Self {
            zaid: table.header.zaid.clone(),
            index: 0,
            atomic_weight_ratio: table.header.atomic_weight_ratio,
            temperature: table.header.temperature,
            energies: energies.clone(),
            total: total.clone(),
            absorption: absorption.clone(),
            elastic: elastic.clone(),
        })
    }

    /// The tabulated energy grid.
    pub fn energy_grid(&self) -> &[f64] {
        &self.energies
    }

    /// Microscopic cross section in barns for `reaction` at `energy` (MeV).
    pub fn micro_xs(&self, reaction: Reaction, energy: f64) -> f64 {
        let values = match reaction {
            Reaction::Total => &self.total,
            Reaction::Absorption => &self.absorption,
            Reaction::Elastic => &self.elastic,
        };
        log_linear_interpolate(&self.energies, values, energy)
    }
}

/// Interpolate `values` over `energies` linearly in `ln E`.
///
/// Queries outside the grid clamp to the end values; a single-point grid is
/// constant everywhere.
pub fn log_linear_interpolate(energies: &[f64], values: &[f64], energy: f64) -> f64 {
    debug_assert_eq!(energies.len(), values.len());
    match energies {
        [] => 0.0,
        [_] => values[0],
        _ => {
            if energy <= energies[0] {
                return values[0];
            }
            if energy >= energies[energies.len() - 1] {
                return values[values.len() - 1];
            }
            // partition_point gives the first grid index above the query
            let upper = energies.partition_point(|&grid| grid <= energy);
            let lower = upper - 1;
            let fraction = (energy.ln() - energies[lower].ln())
                / (energies[upper].ln() - energies[lower].ln());
            values[lower] + fraction * (values[upper] - values[lower])
        }
    }
}
