//! Error types for the helios crate.

use thiserror::Error;

/// Main error type for helios operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Error variant fields are self-documenting via #[error] attribute
pub enum HeliosError {
    /// Malformed input definition.
    #[error("Parse error in {path}: {reason}")]
    ParseError { path: String, reason: String },

    /// Surface construction rejected the given coefficients.
    #[error("Bad surface '{user_id}': {reason}")]
    BadSurfaceCreation { user_id: String, reason: String },

    /// Point location failed at the root universe.
    #[error("Geometry is unbounded at ({x}, {y}, {z})")]
    GeometryUnbounded { x: f64, y: f64, z: f64 },

    /// Two cells both claimed a sampled point during the consistency sweep.
    #[error("Cells '{cell_a}' and '{cell_b}' overlap at ({x}, {y}, {z})")]
    OverlappingCells {
        cell_a: String,
        cell_b: String,
        x: f64,
        y: f64,
        z: f64,
    },

    /// A module was staged without a registered factory.
    #[error("No factory registered for module '{name}'")]
    MissingFactory { name: String },

    /// Typed lookup for a module that was never set up.
    #[error("Module '{name}' is not present in the environment")]
    ModuleMissing { name: String },

    /// User id not found in a module's index.
    #[error("Object '{user_id}' not found in module '{module}'")]
    ObjectMissing { module: String, user_id: String },

    /// ACE block schema violation at a word offset into XSS.
    #[error("ACE parse error at word {offset}: {reason}")]
    AceParseError { offset: usize, reason: String },

    /// Material references a nuclide whose ACE table is not loaded.
    #[error("Material resolution failed: nuclide '{nuclide_id}' has no loaded table")]
    MaterialResolutionError { nuclide_id: String },

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for helios operations.
pub type Result<T> = std::result::Result<T, HeliosError>;

// === Validation Helpers ===

/// Check that a surface parameter is strictly positive (radii, pitches).
#[inline]
pub fn check_positive(value: f64, user_id: &str, name: &str) -> Result<()> {
    if value <= 0.0 || !value.is_finite() {
        return Err(HeliosError::BadSurfaceCreation {
            user_id: user_id.to_string(),
            reason: format!("{name} must be positive and finite, got {value}"),
        });
    }
    Ok(())
}

/// Check that a coefficient vector has exactly the expected length.
#[inline]
pub fn check_coefficient_count(actual: usize, expected: usize, user_id: &str) -> Result<()> {
    if actual != expected {
        return Err(HeliosError::BadSurfaceCreation {
            user_id: user_id.to_string(),
            reason: format!("expected {expected} coefficients, got {actual}"),
        });
    }
    Ok(())
}
