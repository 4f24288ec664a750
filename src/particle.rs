use crate::error::{Result, SimError};
use crate::position::{dot, DimVec, Position, Velocity};

pub type ParticleId = u32;

/// A hard disc.
///
/// Position only ever changes by linear drift and velocity only at a
/// resolved contact. `generation` is bumped on every contact the particle takes
/// part in, which lets queued predictions involving it be recognised as stale.
#[derive(PartialEq, Debug, Clone)]
pub struct Particle {
    id: ParticleId,
    pos: Position,
    vel: Velocity,
    radius: f64,
    mass: f64,
    generation: u64,
}

impl Particle {
    /// Errors with `InvalidInitialState` if radius or mass is not a positive
    /// finite number, or if position or velocity is not finite.
    pub fn new(id: ParticleId, pos: Position, vel: Velocity, radius: f64, mass: f64) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(SimError::InvalidInitialState(format!(
                "ball {id}: radius must be finite and > 0, got {radius}"
            )));
        }
        if !mass.is_finite() || mass <= 0.0 {
            return Err(SimError::InvalidInitialState(format!(
                "ball {id}: mass must be finite and > 0, got {mass}"
            )));
        }
        if !(pos.x().is_finite() && pos.y().is_finite()) {
            return Err(SimError::InvalidInitialState(format!(
                "ball {id}: position must be finite"
            )));
        }
        if !(vel.x().is_finite() && vel.y().is_finite()) {
            return Err(SimError::InvalidInitialState(format!(
                "ball {id}: velocity must be finite"
            )));
        }
        Ok(Self {
            id,
            pos,
            vel,
            radius,
            mass,
            generation: 0,
        })
    }

    pub fn id(&self) -> ParticleId {
        self.id
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    pub fn vel(&self) -> Velocity {
        self.vel
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn speed_sqd(&self) -> f64 {
        dot(self.vel, self.vel)
    }

    pub fn speed(&self) -> f64 {
        self.speed_sqd().sqrt()
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.speed_sqd()
    }

    pub fn momentum(&self) -> DimVec {
        self.vel.scale_by(self.mass)
    }

    /// Linear extrapolation by `dt`. Returns the distance covered.
    pub fn drift(&mut self, dt: f64) -> f64 {
        let dp = self.vel.scale_by(dt);
        self.pos = self.pos + dp;
        dp.l2_norm()
    }

    /// Sets a post-contact velocity and marks the particle as changed.
    pub fn update_vel(&mut self, new_vel: Velocity) {
        self.vel = new_vel;
        self.generation = self.generation.saturating_add(1);
    }
}

/// The particle population, kept sorted by id for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct Particles {
    particles: Vec<Particle>,
}

impl Particles {
    /// Errors if two particles share an id.
    pub fn new(mut particles: Vec<Particle>) -> Result<Self> {
        particles.sort_by_key(|p| p.id());
        if let Some(w) = particles.windows(2).find(|w| w[0].id() == w[1].id()) {
            return Err(SimError::InvalidInitialState(format!(
                "duplicate ball id {}",
                w[0].id()
            )));
        }
        Ok(Self { particles })
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn index_of(&self, p_id: ParticleId) -> Result<usize> {
        self.particles
            .binary_search_by_key(&p_id, |p| p.id())
            .map_err(|_| SimError::UnknownParticle(p_id))
    }

    pub fn particle(&self, p_id: ParticleId) -> Result<&Particle> {
        let idx = self.index_of(p_id)?;
        Ok(&self.particles[idx])
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(|p| p.kinetic_energy()).sum()
    }

    pub fn momentum(&self) -> DimVec {
        let mut total = DimVec::zeroes();
        for p in self.particles.iter() {
            total += p.momentum();
        }
        total
    }
}
