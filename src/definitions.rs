//! Parsed input definitions.
//!
//! The input grammar itself is out of scope: definitions arrive as a JSON
//! array of tagged objects. Each definition knows which module consumes it
//! (`module_name`) and its author-chosen user id; the environment routes
//! definitions by module name and hands them to factories at setup.

use crate::error::{HeliosError, Result};
use crate::source::{DirectionDistribution, EnergyDistribution, PositionDistribution};
use crate::surface::BoundaryKind;
use crate::universe::LatticeKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Module name of the settings module.
pub const SETTINGS_MODULE: &str = "settings";
/// Module name of the source module.
pub const SOURCE_MODULE: &str = "source";
/// Module name of the materials module.
pub const MATERIALS_MODULE: &str = "materials";
/// Module name of the geometry module.
pub const GEOMETRY_MODULE: &str = "geometry";

/// A surface definition: name tag plus coefficient vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDefinition {
    /// Author-chosen identifier.
    pub user_id: String,
    /// External surface name tag (`px`, `c/z`, `so`, ...).
    pub tag: String,
    /// Kind-specific coefficients.
    pub coefficients: Vec<f64>,
    /// Boundary condition; transmissive when omitted.
    #[serde(default)]
    pub boundary: BoundaryKind,
}

/// A cell definition: signed surface references plus content.
///
/// Sense list entries are strings of the form `"-name"` or `"+name"`; a bare
/// name means positive sense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellDefinition {
    /// Author-chosen identifier.
    pub user_id: String,
    /// User id of the universe this cell belongs to; root (`"0"`) if omitted.
    #[serde(default = "default_universe")]
    pub universe: String,
    /// Signed surface user ids forming the half-space conjunction.
    pub surfaces: Vec<String>,
    /// Material user id, mutually exclusive with `fill`.
    #[serde(default)]
    pub material: Option<String>,
    /// Fill universe user id, mutually exclusive with `material`.
    #[serde(default)]
    pub fill: Option<String>,
    /// Translation applied when descending into the fill universe.
    #[serde(default)]
    pub fill_translation: Option<[f64; 3]>,
}

fn default_universe() -> String {
    crate::universe::ROOT_UNIVERSE_ID.to_string()
}

/// A lattice definition: a universe tiled on a regular grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeDefinition {
    /// User id of the lattice universe itself.
    pub user_id: String,
    /// Slots per axis.
    pub shape: [usize; 3],
    /// Slot pitch per axis.
    pub pitch: [f64; 3],
    /// Corner of slot `(0, 0, 0)`.
    #[serde(default)]
    pub origin: [f64; 3],
    /// Bounded or infinite periodicity.
    pub kind: LatticeKind,
    /// Universe user ids per slot, x-fastest ordering.
    pub slots: Vec<String>,
}

/// One `(nuclide, atom fraction)` entry of a material composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuclideFraction {
    /// Nuclide user id (the zaid).
    pub nuclide: String,
    /// Atom fraction; normalized over the composition at setup.
    pub fraction: f64,
}

/// A material definition: bulk density plus composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDefinition {
    /// Author-chosen identifier.
    pub user_id: String,
    /// Atom density in atoms/(barn cm).
    pub density: f64,
    /// Composition entries.
    pub composition: Vec<NuclideFraction>,
}

/// A nuclide definition pointing at an ACE data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuclideDefinition {
    /// Nuclide user id; must match the zaid of the table in the file.
    pub user_id: String,
    /// Path to the ASCII ACE file holding the table.
    pub path: String,
}

/// The settings definition; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsDefinition {
    /// Author-chosen identifier.
    pub user_id: String,
    /// Tolerance below which a particle counts as on a surface.
    #[serde(default = "crate::settings::default_surface_tolerance")]
    pub surface_tolerance: f64,
    /// Post-crossing nudge distance along the flight direction.
    #[serde(default = "crate::settings::default_nudge")]
    pub nudge: f64,
    /// Global seed; per-history streams derive from it.
    #[serde(default = "crate::settings::default_seed")]
    pub seed: u64,
    /// Histories per batch.
    #[serde(default = "crate::settings::default_histories")]
    pub histories: usize,
    /// Number of batches.
    #[serde(default = "crate::settings::default_batches")]
    pub batches: usize,
}

/// A weighted reference from a source to a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedDistribution {
    /// Distribution user id.
    pub distribution: String,
    /// Relative weight; normalized over the source at setup.
    pub weight: f64,
}

/// A source definition: a weighted sum of distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Author-chosen identifier.
    pub user_id: String,
    /// Weighted distribution references.
    pub distributions: Vec<WeightedDistribution>,
}

/// A reusable distribution over (position, direction, energy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionDefinition {
    /// Author-chosen identifier; sources reference it by this id.
    pub user_id: String,
    /// Position marginal.
    pub position: PositionDistribution,
    /// Direction marginal.
    pub direction: DirectionDistribution,
    /// Energy marginal.
    pub energy: EnergyDistribution,
}

/// A parsed input object, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object", rename_all = "snake_case")]
pub enum ObjectDefinition {
    /// A surface (geometry module).
    Surface(SurfaceDefinition),
    /// A cell (geometry module).
    Cell(CellDefinition),
    /// A lattice universe (geometry module).
    Lattice(LatticeDefinition),
    /// A material (materials module).
    Material(MaterialDefinition),
    /// A nuclide backed by an ACE file (materials module).
    Nuclide(NuclideDefinition),
    /// The settings block (settings module).
    Settings(SettingsDefinition),
    /// A source (source module).
    Source(SourceDefinition),
    /// A sampling distribution (source module).
    Distribution(DistributionDefinition),
}

impl ObjectDefinition {
    /// Which module consumes this definition.
    pub fn module_name(&self) -> &'static str {
        match self {
            ObjectDefinition::Surface(_)
            | ObjectDefinition::Cell(_)
            | ObjectDefinition::Lattice(_) => GEOMETRY_MODULE,
            ObjectDefinition::Material(_) | ObjectDefinition::Nuclide(_) => MATERIALS_MODULE,
            ObjectDefinition::Settings(_) => SETTINGS_MODULE,
            ObjectDefinition::Source(_) | ObjectDefinition::Distribution(_) => SOURCE_MODULE,
        }
    }

    /// The author-chosen identifier of this definition.
    pub fn user_id(&self) -> &str {
        match self {
            ObjectDefinition::Surface(def) => &def.user_id,
            ObjectDefinition::Cell(def) => &def.user_id,
            ObjectDefinition::Lattice(def) => &def.user_id,
            ObjectDefinition::Material(def) => &def.user_id,
            ObjectDefinition::Nuclide(def) => &def.user_id,
            ObjectDefinition::Settings(def) => &def.user_id,
            ObjectDefinition::Source(def) => &def.user_id,
            ObjectDefinition::Distribution(def) => &def.user_id,
        }
    }
}

/// Parse a definition stream from a JSON array.
pub fn parse_definitions(json: &str) -> Result<Vec<ObjectDefinition>> {
    serde_json::from_str(json).map_err(|e| HeliosError::ParseError {
        path: "inline".to_string(),
        reason: e.to_string(),
    })
}

/// Parse a definition stream from a JSON file.
pub fn parse_definitions_file(path: &Path) -> Result<Vec<ObjectDefinition>> {
    let json = std::fs::read_to_string(path)?;
    parse_definitions(&json).map_err(|e| {
        if let HeliosError::ParseError { reason, .. } = e {
            HeliosError::ParseError {
                path: path.display().to_string(),
                reason,
            }
        } else {
            e
        }
    })
}

/// Split a signed surface reference (`"-name"`, `"+name"`, `"name"`) into
/// its user id and sense.
pub fn parse_signed_surface(reference: &str) -> (&str, crate::surface::Sense) {
    use crate::surface::Sense;
    match reference.as_bytes().first() {
        Some(b'-') => (&reference[1..], Sense::Negative),
        Some(b'+') => (&reference[1..], Sense::Positive),
        _ => (reference, Sense::Positive),
    }
}
