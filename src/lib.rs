use std::ops::ControlFlow;

use consts::MAX_PARTICLES;
use container::Container;
use error::{Result, SimError};
use initial_state::{generate, load_initial_state, particles_from_records, VelocityDistribution};
use num_traits::Zero;
use quickcheck::{Arbitrary, Gen};
use scheduler::Strategy;
use serde::{Deserialize, Serialize};
use simulation::{Simulation, TickReport};

pub mod cli;
pub mod collision_detection;
pub mod collision_response;
pub mod consts;
pub mod container;
pub mod error;
pub mod event;
pub mod initial_state;
pub mod io;
pub mod observables;
pub mod particle;
pub mod position;
pub mod scheduler;
pub mod simulation;

pub type Prng = rand_xoshiro::Xoshiro256PlusPlus;

/// When a run stops.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunLength {
    Ticks(u64),
    /// Stop at this simulation time; the last stretch is drifted without a contact.
    Time(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputParams {
    pub seed: u64,
    pub num_particles: usize,
    pub ball_radius: f64,
    pub ball_mass: f64,
    pub container_radius: f64,
    pub rms_speed: f64,
    pub velocity_distribution: VelocityDistribution,
    pub strategy: Strategy,
    pub frame_every: u64, // in ticks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<String>,
    pub run_length: RunLength,
}

impl Default for InputParams {
    fn default() -> Self {
        let seed = 1337;
        let num_particles = 15;
        let ball_radius = 1.0;
        let ball_mass = 1.0;
        let container_radius = 10.0;
        let rms_speed = 5.0;

        Self {
            seed,
            num_particles,
            ball_radius,
            ball_mass,
            container_radius,
            rms_speed,
            velocity_distribution: VelocityDistribution::FixedSpeed,
            strategy: Strategy::FullRescan,
            frame_every: 10,
            initial_state: None,
            run_length: RunLength::Ticks(1000),
        }
    }
}

fn positive_finite(name: &str, x: f64) -> Result<()> {
    if x.is_finite() && x > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidParam(format!(
            "{name} must be finite and > 0, got {x}"
        )))
    }
}

impl InputParams {
    // Range checks only; whether the balls actually fit is found out at placement.
    pub fn check(&self) -> Result<()> {
        if self.num_particles > MAX_PARTICLES {
            return Err(SimError::InvalidParam(format!(
                "at most {MAX_PARTICLES} balls are supported, got {}",
                self.num_particles
            )));
        }
        positive_finite("ball_radius", self.ball_radius)?;
        positive_finite("ball_mass", self.ball_mass)?;
        positive_finite("container_radius", self.container_radius)?;
        positive_finite("rms_speed", self.rms_speed)?;
        if self.ball_radius >= self.container_radius {
            return Err(SimError::InvalidParam(format!(
                "ball radius {} does not fit in container radius {}",
                self.ball_radius, self.container_radius
            )));
        }
        match self.run_length {
            RunLength::Ticks(0) => {
                return Err(SimError::InvalidParam("run_length.ticks must be > 0".into()))
            }
            RunLength::Time(t) => positive_finite("run_length.time", t)?,
            RunLength::Ticks(_) => {}
        }
        if self.frame_every == 0 {
            return Err(SimError::InvalidParam("frame_every must be > 0".into()));
        }
        Ok(())
    }
}

// for arbitrary trait
fn usize_in_range(g: &mut Gen, min: usize, max: usize) -> usize {
    if min == max {
        return max;
    }
    let x = usize::arbitrary(g);
    x % (max - min) + min
}

fn f64_in_range(g: &mut Gen, min: f64, max: f64) -> f64 {
    let mut r = f64::INFINITY;
    while !(r.is_normal() || r.is_zero()) {
        let x = f64::arbitrary(g).abs();
        r = x % (max - min) + min;
    }
    r
}

// dilute enough that random placement always succeeds
impl Arbitrary for InputParams {
    fn arbitrary(g: &mut Gen) -> Self {
        let num_particles = usize_in_range(g, 1, 10);
        let ball_radius = f64_in_range(g, 0.1, 0.5);
        let container_radius = f64_in_range(g, 8.0, 20.0);
        let ball_mass = f64_in_range(g, 0.1, 10.0);
        let rms_speed = f64_in_range(g, 0.1, 10.0);
        let velocity_distribution = if bool::arbitrary(g) {
            VelocityDistribution::FixedSpeed
        } else {
            VelocityDistribution::Gaussian
        };
        let strategy = if bool::arbitrary(g) {
            Strategy::FullRescan
        } else {
            Strategy::EventQueue
        };

        Self {
            seed: u64::arbitrary(g),
            num_particles,
            ball_radius,
            ball_mass,
            container_radius,
            rms_speed,
            velocity_distribution,
            strategy,
            frame_every: 1,
            initial_state: None,
            run_length: RunLength::Ticks(usize_in_range(g, 1, 50) as u64),
        }
    }
}

/// Builds a simulation from the dataset named in `ip`, or from a freshly
/// generated random state when there is none.
pub fn simulation_from_params(ip: &InputParams, rng: &mut Prng) -> Result<Simulation> {
    ip.check()?;
    let container = Container::new(ip.container_radius)?;
    let records = match &ip.initial_state {
        Some(path) => load_initial_state(path)?,
        None => generate(ip, rng)?,
    };
    let particles = particles_from_records(&records, &container)?;
    Simulation::new(particles, container, ip.strategy)
}

/// Observer run after every committed tick. Returning `Break` stops the run.
pub trait TickCallback {
    fn run(&mut self, sim: &Simulation, report: &TickReport) -> ControlFlow<()>;
}

impl<F> TickCallback for F
where
    F: FnMut(&Simulation, &TickReport) -> ControlFlow<()>,
{
    fn run(&mut self, sim: &Simulation, report: &TickReport) -> ControlFlow<()> {
        self(sim, report)
    }
}

pub fn run_simulation(
    sim: &mut Simulation,
    run_length: RunLength,
    mut callback: Option<&mut dyn TickCallback>,
) -> Result<()> {
    let mut notify = |sim: &Simulation, report: &TickReport| match callback.as_deref_mut() {
        Some(cb) => cb.run(sim, report),
        None => ControlFlow::Continue(()),
    };
    match run_length {
        RunLength::Ticks(n) => {
            for _ in 0..n {
                let report = sim.tick()?;
                if notify(&*sim, &report).is_break() {
                    break;
                }
            }
        }
        RunLength::Time(limit) => {
            while let Some(report) = sim.tick_until(limit)? {
                if notify(&*sim, &report).is_break() {
                    break;
                }
            }
        }
    }
    log::info!(
        "Finished after {} ticks, t = {}, {} ball and {} wall collisions",
        sim.num_ticks(),
        sim.elapsed_time(),
        sim.observables().ball_collisions(),
        sim.observables().wall_collisions()
    );
    Ok(())
}
