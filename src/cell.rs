//! Cells: regions defined as conjunctions of surface half-spaces.
//!
//! A point is inside a cell iff its sense with respect to every surface in
//! the cell's sense list matches the stored sign. A cell is either filled by
//! another universe or carries a material (or neither, for void cells),
//! never both.

use crate::error::{HeliosError, Result};
use crate::surface::{Sense, Surface};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One entry of a cell's sense list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenseEntry {
    /// Internal id of the surface in the geometry's surface table.
    pub surface: usize,
    /// Required sign of the surface function inside the cell.
    pub sense: Sense,
}

/// What a cell contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellContent {
    /// Nothing: particles stream through without colliding.
    #[default]
    Void,
    /// A material, by internal id in the materials module.
    Material(usize),
    /// A nested universe, by internal id in the geometry's universe table.
    Fill(usize),
}

/// A region of space bounded by surface half-spaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Free-form identifier chosen by the input author.
    pub user_id: String,
    /// Dense internal id assigned at setup.
    pub index: usize,
    /// Ordered half-space conjunction defining the region.
    pub senses: Vec<SenseEntry>,
    /// Fill universe, material, or void.
    pub content: CellContent,
    /// Translation applied when descending into the fill universe, if any.
    pub fill_translation: Vector3<f64>,
}

impl Cell {
    /// Create a cell, rejecting a definition that sets both fill and material.
    pub fn try_new(
        user_id: &str,
        senses: Vec<SenseEntry>,
        material: Option<usize>,
        fill: Option<usize>,
    ) -> Result<Self> {
        let content = match (material, fill) {
            (Some(_), Some(_)) => {
                return Err(HeliosError::ParseError {
                    path: user_id.to_string(),
                    reason: "cell sets both a material and a fill universe".to_string(),
                });
            }
            (Some(mat), None) => CellContent::Material(mat),
            (None, Some(universe)) => CellContent::Fill(universe),
            (None, None) => CellContent::Void,
        };
        if senses.is_empty() {
            return Err(HeliosError::ParseError {
                path: user_id.to_string(),
                reason: "cell has an empty sense list".to_string(),
            });
        }
        Ok(Self {
            user_id: user_id.to_string(),
            index: 0,
            senses,
            content,
            fill_translation: Vector3::zeros(),
        })
    }

    /// Whether `point` satisfies every half-space of the sense list.
    ///
    /// The first sign mismatch short-circuits.
    pub fn contains(&self, point: &Vector3<f64>, surfaces: &[Surface]) -> bool {
        self.senses
            .iter()
            .all(|entry| surfaces[entry.surface].sense_of(point) == entry.sense)
    }

    /// Distance to the nearest bounding surface along `direction`.
    ///
    /// Returns the surface's internal id and the distance. Ties break on the
    /// lexicographically earlier surface user id so results are deterministic
    /// regardless of sense-list order.
    pub fn boundary(
        &self,
        point: &Vector3<f64>,
        direction: &Vector3<f64>,
        surfaces: &[Surface],
        surface_tol: f64,
    ) -> Option<(usize, f64)> {
        self.boundary_skipping(point, direction, surfaces, surface_tol, None, 0.0)
    }

    /// Like [`Cell::boundary`], but ignores a re-hit of `last_crossed` within
    /// `rehit_window` of the ray origin. The navigator sets the window to the
    /// nudge distance so a freshly crossed surface is not crossed again on
    /// floating-point residue.
    pub fn boundary_skipping(
        &self,
        point: &Vector3<f64>,
        direction: &Vector3<f64>,
        surfaces: &[Surface],
        surface_tol: f64,
        last_crossed: Option<usize>,
        rehit_window: f64,
    ) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for entry in &self.senses {
            let surface = &surfaces[entry.surface];
            let Some(distance) =
                surface.intersect_with_tolerance(point, direction, entry.sense, surface_tol)
            else {
                continue;
            };
            if last_crossed == Some(entry.surface) && distance <= rehit_window {
                continue;
            }
            best = match best {
                None => Some((entry.surface, distance)),
                Some((best_surface, best_distance)) => {
                    if distance < best_distance
                        || (distance == best_distance
                            && surfaces[entry.surface].user_id < surfaces[best_surface].user_id)
                    {
                        Some((entry.surface, distance))
                    } else {
                        Some((best_surface, best_distance))
                    }
                }
            };
        }
        best
    }

    /// Stored sense of this cell with respect to `surface`.
    ///
    /// Consults the sense list directly, never the surface function.
    pub fn sense(&self, surface: usize) -> Option<Sense> {
        self.senses
            .iter()
            .find(|entry| entry.surface == surface)
            .map(|entry| entry.sense)
    }

    /// Whether this cell is the same region as `self` with exactly one sense
    /// entry flipped on `surface`.
    ///
    /// This is the adjacency test the navigator uses to find the neighbor
    /// across a crossed surface.
    pub fn is_neighbor_across(&self, other: &Cell, surface: usize) -> bool {
        let (Some(own), Some(theirs)) = (self.sense(surface), other.sense(surface)) else {
            return false;
        };
        own == theirs.flipped()
    }

    /// The fill universe id, if this cell is filled.
    #[inline]
    pub fn fill(&self) -> Option<usize> {
        match self.content {
            CellContent::Fill(universe) => Some(universe),
            _ => None,
        }
    }

    /// The material id, if this cell carries one.
    #[inline]
    pub fn material(&self) -> Option<usize> {
        match self.content {
            CellContent::Material(material) => Some(material),
            _ => None,
        }
    }
}
