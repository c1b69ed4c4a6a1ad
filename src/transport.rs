//! The transport driver: flight loop and history batches.
//!
//! Geometry, materials, and tables are read-only after setup and shared by
//! every worker; each history owns its particle, its level stack, and an RNG
//! stream seeded from the global seed plus the history index, so runs are
//! reproducible at any thread count.

use crate::environment::Environment;
use crate::error::Result;
use crate::material::{CollisionChannel, MaterialsModule};
use crate::navigator::{CrossingOutcome, Navigator, TrackingConfig, TrackState};
use crate::particle::ParticleStatus;
use crate::settings::Settings;
use crate::source::{sample_isotropic, SourceModule};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Hard cap on flights per history; beyond it the particle is lost.
const MAX_FLIGHTS: usize = 100_000;

/// Per-history record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryOutcome {
    /// Terminal particle status.
    pub status: ParticleStatus,
    /// Number of collisions.
    pub collisions: usize,
    /// Total flight path length in cm.
    pub path_length: f64,
}

/// Aggregated counts over one batch of histories.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatchTally {
    /// Histories run.
    pub histories: usize,
    /// Total collisions.
    pub collisions: usize,
    /// Particles absorbed.
    pub absorbed: usize,
    /// Particles leaked through vacuum boundaries.
    pub leaked: usize,
    /// Particles lost to tracking failures.
    pub lost: usize,
    /// Summed path length in cm.
    pub path_length: f64,
}

impl BatchTally {
    fn absorb(&mut self, outcome: &HistoryOutcome) {
        self.histories += 1;
        self.collisions += outcome.collisions;
        self.path_length += outcome.path_length;
        match outcome.status {
            ParticleStatus::Absorbed => self.absorbed += 1,
            ParticleStatus::Leaked => self.leaked += 1,
            ParticleStatus::Lost => self.lost += 1,
            ParticleStatus::Alive => {}
        }
    }
}

/// Transport one particle from birth to termination.
///
/// Tracking failures do not propagate: they terminate the particle as lost
/// and the caller moves on to the next history.
pub fn run_history<R: Rng>(
    navigator: &Navigator<'_>,
    materials: Option<&MaterialsModule>,
    source: &SourceModule,
    source_id: usize,
    rng: &mut R,
) -> HistoryOutcome {
    let geometry = navigator.geometry();
    let mut particle = source.sample(source_id, rng);
    let mut outcome = HistoryOutcome {
        status: ParticleStatus::Alive,
        collisions: 0,
        path_length: 0.0,
    };

    let mut state = match navigator.locate(&particle.position, &particle.direction) {
        Ok(state) => state,
        Err(error) => {
            particle.mark_lost(error.to_string());
            outcome.status = particle.status;
            return outcome;
        }
    };

    for _ in 0..MAX_FLIGHTS {
        let to_collision = state
            .material(geometry)
            .zip(materials)
            .and_then(|(material, module)| {
                module.materials[material].sample_distance_to_collision(
                    &module.nuclides,
                    particle.energy,
                    rng,
                )
            });
        let hit = match navigator.distance_to_next(&state) {
            Ok(hit) => hit,
            Err(error) => {
                particle.mark_lost(error.to_string());
                break;
            }
        };

        match to_collision {
            Some(distance) if distance < hit.distance => {
                navigator.advance(&mut state, distance);
                outcome.path_length += distance;
                outcome.collisions += 1;
                let module = materials.expect("collision sampled without materials");
                let material = &module.materials
                    [state.material(geometry).expect("collision in a material cell")];
                let (nuclide, channel) =
                    material.sample_collision(&module.nuclides, particle.energy, rng);
                match channel {
                    CollisionChannel::Absorption => {
                        particle.status = ParticleStatus::Absorbed;
                        break;
                    }
                    CollisionChannel::Scatter => {
                        elastic_scatter(
                            &mut particle,
                            module.nuclides[nuclide].atomic_weight_ratio,
                            rng,
                        );
                        set_direction(&mut state, particle.direction);
                    }
                }
            }
            _ => {
                outcome.path_length += hit.distance;
                match navigator.cross(&mut state, &hit) {
                    Ok(CrossingOutcome::Leaked) => {
                        particle.status = ParticleStatus::Leaked;
                        break;
                    }
                    Ok(CrossingOutcome::Crossed) | Ok(CrossingOutcome::Reflected) => {
                        particle.direction = state.direction;
                    }
                    Err(error) => {
                        particle.mark_lost(error.to_string());
                        break;
                    }
                }
            }
        }
        particle.position = state.world_position();
    }

    if particle.status == ParticleStatus::Alive {
        particle.mark_lost("flight limit exceeded");
    }
    if let Some(failure) = &particle.failure {
        tracing::debug!("history terminated lost: {failure}");
    }
    outcome.status = particle.status;
    outcome
}

/// Isotropic elastic scatter off a free target of mass ratio `awr`.
///
/// The outgoing energy fraction is uniform on `[alpha, 1]` with
/// `alpha = ((A - 1) / (A + 1))^2`, the s-wave slowing-down kernel.
fn elastic_scatter<R: Rng>(
    particle: &mut crate::particle::Particle,
    awr: f64,
    rng: &mut R,
) {
    let alpha = ((awr - 1.0) / (awr + 1.0)).powi(2);
    particle.energy *= alpha + rng.gen::<f64>() * (1.0 - alpha);
    particle.direction = sample_isotropic(rng);
}

/// Point the track state along a new direction, clearing the crossed-surface
/// memory that no longer applies.
fn set_direction(state: &mut TrackState, direction: nalgebra::Vector3<f64>) {
    state.direction = direction;
    for level in &mut state.levels {
        level.last_surface = None;
    }
}

/// Run one batch of histories against a set-up environment.
///
/// History `i` of batch `b` draws from a stream seeded with
/// `seed + b * histories + i`, so results are independent of thread count
/// and schedule.
pub fn run_batch(environment: &Environment, batch: usize) -> Result<BatchTally> {
    let settings = environment
        .get::<Settings>()
        .ok()
        .cloned()
        .unwrap_or_default();
    let geometry = environment.get::<crate::geometry::Geometry>()?;
    let source = environment.get::<SourceModule>()?;
    let materials = environment.get::<MaterialsModule>().ok();
    let navigator = Navigator::new(geometry, TrackingConfig::from(&settings));
    let source_id = 0;

    let first = settings
        .seed
        .wrapping_add((batch * settings.histories) as u64);
    let history = |index: usize| {
        let mut rng = StdRng::seed_from_u64(first.wrapping_add(index as u64));
        run_history(&navigator, materials, source, source_id, &mut rng)
    };

    // Outcomes are collected in history order and tallied sequentially so
    // the floating-point sums are identical at any thread count.
    #[cfg(feature = "rayon")]
    let outcomes: Vec<HistoryOutcome> = (0..settings.histories)
        .into_par_iter()
        .map(history)
        .collect();

    #[cfg(not(feature = "rayon"))]
    let outcomes: Vec<HistoryOutcome> = (0..settings.histories).map(history).collect();

    let mut tally = BatchTally::default();
    for outcome in &outcomes {
        tally.absorb(outcome);
    }
    Ok(tally)
}

/// Run every batch of the configured run.
pub fn run(environment: &Environment) -> Result<Vec<BatchTally>> {
    let settings = environment
        .get::<Settings>()
        .ok()
        .cloned()
        .unwrap_or_default();
    let mut batches = Vec::with_capacity(settings.batches);
    for batch in 0..settings.batches {
        let tally = run_batch(environment, batch)?;
        tracing::debug!(
            batch,
            histories = tally.histories,
            leaked = tally.leaked,
            absorbed = tally.absorbed,
            "batch complete"
        );
        batches.push(tally);
    }
    Ok(batches)
}
