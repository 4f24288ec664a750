use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::consts::MAX_PLACEMENT_ATTEMPTS;
use crate::container::Container;
use crate::error::{Result, SimError};
use crate::particle::{Particle, ParticleId, Particles};
use crate::position::{DimVec, Position};
use crate::{InputParams, Prng};

/// One ball of the initial-state dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub id: ParticleId,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub mass: f64,
    pub radius: f64,
}

impl ParticleRecord {
    pub fn to_particle(&self) -> Result<Particle> {
        Particle::new(
            self.id,
            DimVec::new(self.position),
            DimVec::new(self.velocity),
            self.radius,
            self.mass,
        )
    }
}

impl From<&Particle> for ParticleRecord {
    fn from(p: &Particle) -> Self {
        Self {
            id: p.id(),
            position: [p.pos().x(), p.pos().y()],
            velocity: [p.vel().x(), p.vel().y()],
            mass: p.mass(),
            radius: p.radius(),
        }
    }
}

/// How initial speeds are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityDistribution {
    /// Every ball moves at exactly `rms_speed` in a random direction.
    #[default]
    FixedSpeed,
    /// Each component is normal with variance `rms_speed^2 / 2`.
    Gaussian,
}

pub fn load_initial_state(path: impl AsRef<Path>) -> Result<Vec<ParticleRecord>> {
    let rdr = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(rdr)?)
}

pub fn save_initial_state(records: &[ParticleRecord], path: impl AsRef<Path>) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut w, records)?;
    writeln!(w)?;
    Ok(())
}

/// Builds the population and checks it against `container`.
pub fn particles_from_records(records: &[ParticleRecord], container: &Container) -> Result<Particles> {
    let particles = records
        .iter()
        .map(ParticleRecord::to_particle)
        .collect::<Result<Vec<_>>>()?;
    let particles = Particles::new(particles)?;
    crate::simulation::validate_state(&particles, container)?;
    Ok(particles)
}

fn random_position(rng: &mut Prng, reach: f64) -> Position {
    let x = rng.random_range(-reach..reach);
    let y = rng.random_range(-reach..reach);
    DimVec::new([x, y])
}

/// Rejection-sample non-touching positions inside the container.
pub fn place_balls(
    num_particles: usize,
    ball_radius: f64,
    container: &Container,
    rng: &mut Prng,
) -> Result<Vec<Position>> {
    let reach = container.contact_distance(ball_radius);
    if reach <= 0.0 {
        return Err(SimError::InvalidParam(format!(
            "ball radius {ball_radius} does not fit in container radius {}",
            container.radius()
        )));
    }
    let min_sep_sqd = (2.0 * ball_radius) * (2.0 * ball_radius);

    let mut placed: Vec<Position> = Vec::with_capacity(num_particles);
    while placed.len() < num_particles {
        let mut attempts = 0;
        let pos = loop {
            if attempts >= MAX_PLACEMENT_ATTEMPTS {
                return Err(SimError::InvalidInitialState(format!(
                    "too many balls: placed {} of {} after {} attempts",
                    placed.len(),
                    num_particles,
                    MAX_PLACEMENT_ATTEMPTS
                )));
            }
            attempts += 1;
            let candidate = random_position(rng, reach);
            if container.pos_in_container(candidate, ball_radius)
                && placed
                    .iter()
                    .all(|&q| (candidate - q).l2_norm_sqd() > min_sep_sqd)
            {
                break candidate;
            }
        };
        placed.push(pos);
    }
    Ok(placed)
}

pub fn random_velocity(
    dist: VelocityDistribution,
    rms_speed: f64,
    rng: &mut Prng,
) -> Result<DimVec> {
    if rms_speed == 0.0 {
        return Ok(DimVec::zeroes());
    }
    match dist {
        VelocityDistribution::FixedSpeed => {
            let vx = rng.random_range(-rms_speed..=rms_speed);
            let vy = (rms_speed * rms_speed - vx * vx).max(0.0).sqrt();
            let vy = if rng.random::<bool>() { vy } else { -vy };
            Ok(DimVec::new([vx, vy]))
        }
        VelocityDistribution::Gaussian => {
            let normal = Normal::new(0.0, rms_speed / std::f64::consts::SQRT_2)
                .map_err(|e| SimError::InvalidParam(format!("rms speed {rms_speed}: {e}")))?;
            Ok(DimVec::new([normal.sample(rng), normal.sample(rng)]))
        }
    }
}

/// Random initial state for `ip`: non-touching balls with ids `0..num_particles`.
pub fn generate(ip: &InputParams, rng: &mut Prng) -> Result<Vec<ParticleRecord>> {
    let container = Container::new(ip.container_radius)?;
    let positions = place_balls(ip.num_particles, ip.ball_radius, &container, rng)?;
    let mut records = Vec::with_capacity(positions.len());
    for (id, pos) in positions.into_iter().enumerate() {
        let vel = random_velocity(ip.velocity_distribution, ip.rms_speed, rng)?;
        records.push(ParticleRecord {
            id: id as ParticleId,
            position: [pos.x(), pos.y()],
            velocity: [vel.x(), vel.y()],
            mass: ip.ball_mass,
            radius: ip.ball_radius,
        });
    }
    log::info!(
        "Generated {} balls ({:?} velocities)",
        records.len(),
        ip.velocity_distribution
    );
    Ok(records)
}
