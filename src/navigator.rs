//! Point location and boundary tracking through the universe tree.
//!
//! Each transported particle carries a stack of levels, one per nested
//! universe; the deepest level is current. All coordinate transforms are
//! pure translations, so a single flight direction is shared by every level.

use crate::cell::CellContent;
use crate::error::{HeliosError, Result};
use crate::geometry::Geometry;
use crate::settings::Settings;
use crate::surface::BoundaryKind;
use nalgebra::Vector3;

/// Tolerances used while tracking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingConfig {
    /// Tolerance below which a particle counts as on a surface.
    pub surface_tolerance: f64,
    /// Distance the particle is nudged past a crossed surface.
    pub nudge: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            surface_tolerance: crate::surface::SURFACE_TOLERANCE,
            nudge: 1e-8,
        }
    }
}

impl From<&Settings> for TrackingConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            surface_tolerance: settings.surface_tolerance,
            nudge: settings.nudge,
        }
    }
}

/// How a stack level was entered.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LevelOrigin {
    /// The root universe.
    Root,
    /// Descended through a fill cell.
    Fill,
    /// Descended into a lattice slot; keeps the lattice universe and the
    /// lattice-frame-to-slot-frame translation so the particle can re-slot.
    LatticeSlot {
        lattice: usize,
        slot_translation: Vector3<f64>,
    },
}

/// One level of the per-particle universe stack.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackLevel {
    /// Universe this level tracks through.
    pub universe: usize,
    /// Current cell within that universe.
    pub cell: usize,
    /// Position in this level's local frame.
    pub position: Vector3<f64>,
    /// Surface crossed most recently at this level; skipped on re-hit.
    pub last_surface: Option<usize>,
    origin: LevelOrigin,
}

/// The full tracking state of one particle.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackState {
    /// The universe stack, root first; the deepest entry is current.
    pub levels: Vec<TrackLevel>,
    /// Unit flight direction, shared by every level.
    pub direction: Vector3<f64>,
}

impl TrackState {
    /// The deepest (current) level.
    pub fn current(&self) -> &TrackLevel {
        self.levels.last().expect("track state has at least the root level")
    }

    /// Position in the world frame.
    pub fn world_position(&self) -> Vector3<f64> {
        self.levels[0].position
    }

    /// The material id of the current cell, if it carries one.
    pub fn material(&self, geometry: &Geometry) -> Option<usize> {
        geometry.cells[self.current().cell].material()
    }
}

/// A pending boundary crossing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryHit {
    /// Flight distance to the crossing.
    pub distance: f64,
    /// Stack level whose cell produced the minimum.
    pub level: usize,
    /// Internal id of the surface being crossed.
    pub surface: usize,
}

/// What happened when a boundary was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingOutcome {
    /// The particle moved into an adjacent cell (possibly changing levels).
    Crossed,
    /// The surface was reflective; the direction was mirrored in place.
    Reflected,
    /// The surface was a vacuum boundary; the particle left the problem.
    Leaked,
}

/// Tracking queries over a frozen geometry.
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'a> {
    geometry: &'a Geometry,
    config: TrackingConfig,
}

impl<'a> Navigator<'a> {
    /// A navigator over `geometry` with the given tolerances.
    pub fn new(geometry: &'a Geometry, config: TrackingConfig) -> Self {
        Self { geometry, config }
    }

    /// The geometry this navigator tracks through.
    pub fn geometry(&self) -> &'a Geometry {
        self.geometry
    }

    /// Build the level stack for a particle at a world position.
    pub fn locate(
        &self,
        position: &Vector3<f64>,
        direction: &Vector3<f64>,
    ) -> Result<TrackState> {
        let root = &self.geometry.universes[self.geometry.root];
        let cell = root
            .find_cell(position, &self.geometry.cells, &self.geometry.surfaces)
            .ok_or_else(|| unbounded_at(position))?;
        let mut state = TrackState {
            levels: vec![TrackLevel {
                universe: self.geometry.root,
                cell,
                position: *position,
                last_surface: None,
                origin: LevelOrigin::Root,
            }],
            direction: *direction,
        };
        self.descend(&mut state)?;
        Ok(state)
    }

    /// Minimum distance to the next surface across every stack level.
    ///
    /// Fails as unbounded when no level has a forward boundary, which means
    /// a cell is open along the flight direction.
    pub fn distance_to_next(&self, state: &TrackState) -> Result<BoundaryHit> {
        let mut best: Option<BoundaryHit> = None;
        for (level_index, level) in state.levels.iter().enumerate() {
            let cell = &self.geometry.cells[level.cell];
            let Some((surface, distance)) = cell.boundary_skipping(
                &level.position,
                &state.direction,
                &self.geometry.surfaces,
                self.config.surface_tolerance,
                level.last_surface,
                self.config.nudge,
            ) else {
                continue;
            };
            if best.is_none_or(|hit| distance < hit.distance) {
                best = Some(BoundaryHit {
                    distance,
                    level: level_index,
                    surface,
                });
            }
        }
        best.ok_or_else(|| unbounded_at(&state.world_position()))
    }

    /// Move the particle `distance` along its direction at every level,
    /// without crossing anything (the collision-site move).
    pub fn advance(&self, state: &mut TrackState, distance: f64) {
        let step = state.direction * distance;
        for level in &mut state.levels {
            level.position += step;
        }
    }

    /// Advance the particle to the crossing and update the stack.
    pub fn cross(&self, state: &mut TrackState, hit: &BoundaryHit) -> Result<CrossingOutcome> {
        let distance = hit.distance;
        for level in &mut state.levels {
            level.position += state.direction * distance;
        }
        let surface = &self.geometry.surfaces[hit.surface];
        match surface.boundary {
            BoundaryKind::Reflective => {
                // Mirror the direction about the unit normal at the crossing
                // point; the particle stays in its cell.
                let normal = surface
                    .normal(&state.levels[hit.level].position)
                    .normalize();
                state.direction -= 2.0 * state.direction.dot(&normal) * normal;
                let nudge = state.direction * self.config.nudge;
                for level in &mut state.levels {
                    level.position += nudge;
                }
                state.levels[hit.level].last_surface = Some(hit.surface);
                Ok(CrossingOutcome::Reflected)
            }
            BoundaryKind::Vacuum => Ok(CrossingOutcome::Leaked),
            BoundaryKind::Transmissive => {
                let nudge = state.direction * self.config.nudge;
                for level in &mut state.levels {
                    level.position += nudge;
                }
                self.relocate(state, hit)?;
                Ok(CrossingOutcome::Crossed)
            }
        }
    }

    /// Find the cell on the far side of a crossing, popping and re-slotting
    /// levels as needed, then descend into any fills it opens.
    ///
    /// Within a universe the neighbor is preferentially the cell identical
    /// to the current one up to the flipped sense on the crossed surface; a
    /// full scan of the universe is the fallback.
    fn relocate(&self, state: &mut TrackState, hit: &BoundaryHit) -> Result<()> {
        let world = state.world_position();
        state.levels.truncate(hit.level + 1);
        loop {
            let level = state.levels.last().expect("crossing level still present");
            let universe = &self.geometry.universes[level.universe];
            let found = self
                .neighbor_across(level, hit.surface)
                .or_else(|| {
                    universe.find_cell(
                        &level.position,
                        &self.geometry.cells,
                        &self.geometry.surfaces,
                    )
                });
            if let Some(cell) = found {
                let level = state.levels.last_mut().expect("level still present");
                level.cell = cell;
                level.last_surface = Some(hit.surface);
                return self.descend(state);
            }
            match level.origin {
                LevelOrigin::LatticeSlot {
                    lattice,
                    slot_translation,
                } => {
                    let lattice_position = level.position + slot_translation;
                    let grid = self.geometry.universes[lattice]
                        .lattice
                        .as_ref()
                        .expect("lattice origin points at a lattice universe");
                    match grid.locate(&lattice_position) {
                        Ok(slot) => {
                            let local = lattice_position - slot.translation;
                            let cell = self.geometry.universes[slot.universe]
                                .find_cell(&local, &self.geometry.cells, &self.geometry.surfaces)
                                .ok_or_else(|| unbounded_at(&local))?;
                            let level =
                                state.levels.last_mut().expect("level still present");
                            *level = TrackLevel {
                                universe: slot.universe,
                                cell,
                                position: local,
                                last_surface: Some(hit.surface),
                                origin: LevelOrigin::LatticeSlot {
                                    lattice,
                                    slot_translation: slot.translation,
                                },
                            };
                            return self.descend(state);
                        }
                        // Left a bounded lattice entirely: resume the search
                        // one level up, in the cell holding the lattice
                        Err(_) => {
                            state.levels.pop();
                            if state.levels.is_empty() {
                                return Err(unbounded_at(&world));
                            }
                        }
                    }
                }
                LevelOrigin::Fill => {
                    state.levels.pop();
                    if state.levels.is_empty() {
                        return Err(unbounded_at(&world));
                    }
                }
                LevelOrigin::Root => return Err(unbounded_at(&world)),
            }
        }
    }

    /// The cell adjacent to `level.cell` across `surface`: same universe,
    /// sense flipped on that one surface, and containing the level position.
    fn neighbor_across(&self, level: &TrackLevel, surface: usize) -> Option<usize> {
        let current = &self.geometry.cells[level.cell];
        self.geometry.universes[level.universe]
            .cells
            .iter()
            .copied()
            .find(|&candidate| {
                candidate != level.cell
                    && current.is_neighbor_across(&self.geometry.cells[candidate], surface)
                    && self.geometry.cells[candidate]
                        .contains(&level.position, &self.geometry.surfaces)
            })
    }

    /// Push levels while the current cell is a fill, resolving lattice hops.
    fn descend(&self, state: &mut TrackState) -> Result<()> {
        loop {
            let level = state.current();
            let cell = &self.geometry.cells[level.cell];
            let CellContent::Fill(child) = cell.content else {
                return Ok(());
            };
            let mut position = level.position - cell.fill_translation;
            let mut origin = LevelOrigin::Fill;
            let mut universe = child;
            while let Some(lattice) = &self.geometry.universes[universe].lattice {
                let slot = lattice.locate(&position)?;
                position -= slot.translation;
                origin = LevelOrigin::LatticeSlot {
                    lattice: universe,
                    slot_translation: slot.translation,
                };
                universe = slot.universe;
            }
            let cell = self.geometry.universes[universe]
                .find_cell(&position, &self.geometry.cells, &self.geometry.surfaces)
                .ok_or_else(|| unbounded_at(&position))?;
            state.levels.push(TrackLevel {
                universe,
                cell,
                position,
                last_surface: None,
                origin,
            });
        }
    }
}

fn unbounded_at(position: &Vector3<f64>) -> HeliosError {
    HeliosError::GeometryUnbounded {
        x: position.x,
        y: position.y,
        z: position.z,
    }
}
