use serde::Serialize;

use crate::container::Container;
use crate::particle::Particles;
use crate::position::DimVec;

/// Per-ball tallies over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BallTally {
    pub distance: f64,
    pub ball_collisions: u64,
    pub wall_collisions: u64,
}

impl BallTally {
    /// Distance travelled per ball-ball collision, 0 before the first one.
    pub fn mean_free_path(&self) -> f64 {
        if self.ball_collisions == 0 {
            0.0
        } else {
            self.distance / self.ball_collisions as f64
        }
    }
}

/// Point on the observables-against-time curves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time: f64,
    pub kinetic_energy: f64,
    pub pressure: f64,
    pub temperature: f64,
}

/// Running accumulators of a simulation.
///
/// Written only by the driver; everything else reads them.
#[derive(Debug, Clone, Serialize)]
pub struct Observables {
    num_particles: usize,
    elapsed_time: f64,
    kinetic_energy: f64,
    initial_kinetic_energy: f64,
    cumulative_wall_impulse: f64,
    ball_collisions: u64,
    wall_collisions: u64,
    ticks: u64,
    tallies: Vec<BallTally>,
}

impl Observables {
    pub fn new(particles: &Particles) -> Self {
        let kinetic_energy = particles.kinetic_energy();
        Self {
            num_particles: particles.num_particles(),
            elapsed_time: 0.0,
            kinetic_energy,
            initial_kinetic_energy: kinetic_energy,
            cumulative_wall_impulse: 0.0,
            ball_collisions: 0,
            wall_collisions: 0,
            ticks: 0,
            tallies: vec![BallTally::default(); particles.num_particles()],
        }
    }

    pub(crate) fn advance_clock(&mut self, dt: f64) {
        self.elapsed_time += dt;
    }

    pub(crate) fn record_drift(&mut self, idx: usize, distance: f64) {
        self.tallies[idx].distance += distance;
    }

    pub(crate) fn record_ball_collision(&mut self, idx0: usize, idx1: usize) {
        self.ball_collisions += 1;
        self.tallies[idx0].ball_collisions += 1;
        self.tallies[idx1].ball_collisions += 1;
    }

    pub(crate) fn record_wall_collision(&mut self, idx: usize, impulse: f64) {
        self.wall_collisions += 1;
        self.tallies[idx].wall_collisions += 1;
        self.cumulative_wall_impulse += impulse;
    }

    pub(crate) fn record_tick(&mut self, kinetic_energy: f64) {
        self.ticks += 1;
        self.kinetic_energy = kinetic_energy;
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.kinetic_energy
    }

    pub fn initial_kinetic_energy(&self) -> f64 {
        self.initial_kinetic_energy
    }

    pub fn cumulative_wall_impulse(&self) -> f64 {
        self.cumulative_wall_impulse
    }

    pub fn ball_collisions(&self) -> u64 {
        self.ball_collisions
    }

    pub fn wall_collisions(&self) -> u64 {
        self.wall_collisions
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tallies(&self) -> &[BallTally] {
        &self.tallies
    }

    /// Mean force per unit length of wall: impulse / (elapsed time * circumference).
    pub fn pressure(&self, container: &Container) -> f64 {
        if self.elapsed_time <= 0.0 {
            return 0.0;
        }
        self.cumulative_wall_impulse / (self.elapsed_time * container.circumference())
    }

    pub fn sample(&self, container: &Container) -> Sample {
        Sample {
            time: self.elapsed_time,
            kinetic_energy: self.kinetic_energy,
            pressure: self.pressure(container),
            temperature: self.temperature(),
        }
    }

    /// kT in units with k_B = 1; two degrees of freedom per disc.
    pub fn temperature(&self) -> f64 {
        if self.num_particles == 0 {
            return 0.0;
        }
        self.kinetic_energy / self.num_particles as f64
    }

    /// |KE - KE_0| / KE_0, or 0 for a system at rest.
    pub fn relative_energy_drift(&self) -> f64 {
        if self.initial_kinetic_energy == 0.0 {
            return 0.0;
        }
        (self.kinetic_energy - self.initial_kinetic_energy).abs() / self.initial_kinetic_energy
    }
}

pub fn rms_speed(particles: &Particles) -> f64 {
    if particles.is_empty() {
        return 0.0;
    }
    let sum: f64 = particles.iter().map(|p| p.speed_sqd()).sum();
    (sum / particles.num_particles() as f64).sqrt()
}

pub fn total_momentum(particles: &Particles) -> DimVec {
    particles.momentum()
}

/// 2-D Maxwell-Boltzmann speed density, `(m v / kT) exp(-m v^2 / 2 kT)`.
pub fn maxwell_boltzmann_2d(speed: f64, mass: f64, kt: f64) -> f64 {
    if kt <= 0.0 || speed < 0.0 {
        return 0.0;
    }
    mass * speed / kt * (-mass * speed * speed / (2.0 * kt)).exp()
}

/// Equal-width histogram of particle speeds on `[0, max_speed)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedHistogram {
    bin_width: f64,
    counts: Vec<usize>,
    total: usize,
}

impl SpeedHistogram {
    /// Speeds at or past `max_speed` land in the last bin.
    pub fn new(speeds: impl IntoIterator<Item = f64>, num_bins: usize, max_speed: f64) -> Self {
        let num_bins = num_bins.max(1);
        let bin_width = if max_speed > 0.0 {
            max_speed / num_bins as f64
        } else {
            1.0
        };
        let mut counts = vec![0; num_bins];
        let mut total = 0;
        for s in speeds {
            let bin = ((s / bin_width).floor().max(0.0) as usize).min(num_bins - 1);
            counts[bin] += 1;
            total += 1;
        }
        Self {
            bin_width,
            counts,
            total,
        }
    }

    pub fn from_particles(particles: &Particles, num_bins: usize) -> Self {
        let max_speed = particles.iter().map(|p| p.speed()).fold(0.0, f64::max);
        // a little headroom so the fastest ball is not alone in the last bin
        Self::new(particles.iter().map(|p| p.speed()), num_bins, 1.1 * max_speed)
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn bin_centre(&self, bin: usize) -> f64 {
        (bin as f64 + 0.5) * self.bin_width
    }

    /// Counts normalised so the histogram integrates to 1.
    pub fn density(&self) -> Vec<f64> {
        if self.total == 0 {
            return vec![0.0; self.counts.len()];
        }
        let norm = self.total as f64 * self.bin_width;
        self.counts.iter().map(|&c| c as f64 / norm).collect()
    }
}
