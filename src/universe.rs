//! Universes and lattices.
//!
//! A universe is an ordered collection of cells meant to tile a region; a
//! lattice is a universe specialization that tiles its parent cell with a
//! regular grid of slots, each slot naming a universe. Slot universes are
//! defined about their slot center.

use crate::cell::Cell;
use crate::error::{HeliosError, Result};
use crate::surface::Surface;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// User id reserved for the root universe.
pub const ROOT_UNIVERSE_ID: &str = "0";

/// Periodicity rule of a lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatticeKind {
    /// Declared extents; indices outside them are a geometry error.
    Bounded,
    /// Indices wrap with the Euclidean remainder; the tiling repeats forever.
    Infinite,
}

/// A regular rectangular grid of universe slots (1-D, 2-D, or 3-D).
///
/// Axes with `shape[axis] == 1` and zero pitch are pass-through: the lattice
/// does not tile along them and local coordinates keep their value there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    /// Number of slots along each axis.
    pub shape: [usize; 3],
    /// Slot pitch along each axis; must be positive where `shape > 1`.
    pub pitch: Vector3<f64>,
    /// Corner of slot `(0, 0, 0)`.
    pub origin: Vector3<f64>,
    /// Bounded or infinite periodicity.
    pub kind: LatticeKind,
    /// Universe internal id per slot, x-fastest ordering; length is the
    /// product of `shape`.
    pub slots: Vec<usize>,
}

/// Result of mapping a point into a lattice slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeSlot {
    /// Universe internal id occupying the slot.
    pub universe: usize,
    /// Grid indices after the periodic rule was applied.
    pub indices: [i64; 3],
    /// World-frame position of the slot center; local coordinates are
    /// `point - translation`.
    pub translation: Vector3<f64>,
}

impl Lattice {
    /// Validate shape/pitch/slot-count consistency.
    pub fn try_new(
        user_id: &str,
        shape: [usize; 3],
        pitch: Vector3<f64>,
        origin: Vector3<f64>,
        kind: LatticeKind,
        slots: Vec<usize>,
    ) -> Result<Self> {
        let expected = shape.iter().product::<usize>();
        if expected == 0 {
            return Err(HeliosError::ParseError {
                path: user_id.to_string(),
                reason: "lattice shape has a zero extent".to_string(),
            });
        }
        if slots.len() != expected {
            return Err(HeliosError::ParseError {
                path: user_id.to_string(),
                reason: format!(
                    "lattice declares {expected} slots but fills {}",
                    slots.len()
                ),
            });
        }
        for axis in 0..3 {
            if shape[axis] > 1 && pitch[axis] <= 0.0 {
                return Err(HeliosError::ParseError {
                    path: user_id.to_string(),
                    reason: format!(
                        "lattice pitch must be positive along tiled axis {axis}, got {}",
                        pitch[axis]
                    ),
                });
            }
        }
        Ok(Self {
            shape,
            pitch,
            origin,
            kind,
            slots,
        })
    }

    /// Map a world point to its slot.
    ///
    /// Bounded lattices report `GeometryUnbounded` for indices outside the
    /// declared extents; infinite lattices wrap them.
    pub fn locate(&self, point: &Vector3<f64>) -> Result<LatticeSlot> {
        let mut indices = [0_i64; 3];
        let mut translation = Vector3::zeros();
        for axis in 0..3 {
            if self.shape[axis] == 1 && self.pitch[axis] <= 0.0 {
                // Pass-through axis: a single untiled slot
                continue;
            }
            let raw = ((point[axis] - self.origin[axis]) / self.pitch[axis]).floor() as i64;
            let extent = self.shape[axis] as i64;
            let wrapped = match self.kind {
                LatticeKind::Infinite => raw.rem_euclid(extent),
                LatticeKind::Bounded => {
                    if raw < 0 || raw >= extent {
                        return Err(HeliosError::GeometryUnbounded {
                            x: point.x,
                            y: point.y,
                            z: point.z,
                        });
                    }
                    raw
                }
            };
            indices[axis] = wrapped;
            // Slot center in the world frame; for infinite lattices the
            // center of the *actual* tile the point is in, not the wrapped one,
            // so local coordinates stay near the origin.
            translation[axis] =
                self.origin[axis] + (raw as f64 + 0.5) * self.pitch[axis];
        }
        let flat = (indices[2] as usize * self.shape[1] + indices[1] as usize)
            * self.shape[0]
            + indices[0] as usize;
        Ok(LatticeSlot {
            universe: self.slots[flat],
            indices,
            translation,
        })
    }
}

/// A container of cells, optionally specialized as a lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    /// Free-form identifier chosen by the input author; `"0"` is the root.
    pub user_id: String,
    /// Dense internal id assigned at setup.
    pub index: usize,
    /// Internal ids of the cells in this universe, in definition order.
    pub cells: Vec<usize>,
    /// Internal id of the parent fill cell; `None` for the root. This is a
    /// weak back-edge into the geometry's frozen cell table, never owning.
    pub parent_cell: Option<usize>,
    /// Lattice specialization, if this universe tiles its parent.
    pub lattice: Option<Lattice>,
}

impl Universe {
    /// A plain universe with no cells linked yet.
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            index: 0,
            cells: Vec::new(),
            parent_cell: None,
            lattice: None,
        }
    }

    /// Whether this universe is the distinguished root.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.user_id == ROOT_UNIVERSE_ID
    }

    /// First cell whose `contains` check accepts `point`, or `None`.
    ///
    /// `None` at the root level is an unbounded-geometry user error; for a
    /// lattice it means the point belongs to a neighboring tile.
    pub fn find_cell(
        &self,
        point: &Vector3<f64>,
        cells: &[Cell],
        surfaces: &[Surface],
    ) -> Option<usize> {
        self.cells
            .iter()
            .copied()
            .find(|&cell| cells[cell].contains(point, surfaces))
    }
}
