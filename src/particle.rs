//! Particle state.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Life-cycle status of a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParticleStatus {
    /// Still being transported.
    #[default]
    Alive,
    /// Absorbed in a collision.
    Absorbed,
    /// Crossed a vacuum boundary out of the problem.
    Leaked,
    /// Terminated by a tracking failure; the history continues with the
    /// next particle.
    Lost,
}

/// State of one neutron in flight.
///
/// Plain data container; transport operations live in `transport` and
/// `navigator`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    /// Position in the world frame (cm).
    pub position: Vector3<f64>,
    /// Unit flight direction.
    pub direction: Vector3<f64>,
    /// Kinetic energy (MeV).
    pub energy: f64,
    /// Statistical weight.
    pub weight: f64,
    /// Life-cycle status.
    pub status: ParticleStatus,
    /// Failure description when `status` is `Lost`.
    pub failure: Option<String>,
}

impl Particle {
    /// A live particle at the given birth state with unit weight.
    pub fn new(position: Vector3<f64>, direction: Vector3<f64>, energy: f64) -> Self {
        Self {
            position,
            direction,
            energy,
            weight: 1.0,
            status: ParticleStatus::Alive,
            failure: None,
        }
    }

    /// Whether this particle is still being transported.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.status == ParticleStatus::Alive
    }

    /// Terminate with a tracking failure; the failure text is kept for the
    /// history record.
    pub fn mark_lost(&mut self, reason: impl Into<String>) {
        self.status = ParticleStatus::Lost;
        self.failure = Some(reason.into());
    }
}
