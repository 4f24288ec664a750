use std::fs::{self, create_dir_all};
use std::ops::ControlFlow;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use rand::SeedableRng;
use snooker::cli::SnookerConfig;
use snooker::io::{
    clear_out_files, write_geometry_png, write_observables_png, write_speeds_png, write_tcl,
    EventLogWriter, XYZWriter,
};
use snooker::observables::{rms_speed, total_momentum, Sample, SpeedHistogram};
use snooker::simulation::{Simulation, TickReport};
use snooker::{run_simulation, simulation_from_params, InputParams, Prng, TickCallback};

struct StdCallback {
    frame_every: u64,
    writer: Option<XYZWriter>,
    events: EventLogWriter,
    samples: Vec<Sample>,
    // first output failure; the run is stopped when it happens
    error: Option<anyhow::Error>,
}

impl StdCallback {
    fn record(&mut self, sim: &Simulation, report: &TickReport) -> anyhow::Result<()> {
        self.events.write_records(&report.events)?;
        if report.tick % self.frame_every == 0 {
            self.samples.push(sim.observables().sample(sim.container()));
            if let Some(writer) = self.writer.as_mut() {
                writer.write_xyz_frame(&sim.snapshot())?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.events.flush()?;
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl TickCallback for StdCallback {
    fn run(&mut self, sim: &Simulation, report: &TickReport) -> ControlFlow<()> {
        match self.record(sim, report) {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                self.error = Some(e);
                ControlFlow::Break(())
            }
        }
    }
}

fn print_summary(sim: &Simulation) {
    let obs = sim.observables();
    println!("-----------------------------------------");
    println!("Ticks: {}", sim.num_ticks());
    println!("Elapsed time: {:.6}", sim.elapsed_time());
    println!(
        "Collisions: {} ball-ball, {} ball-wall",
        obs.ball_collisions(),
        obs.wall_collisions()
    );
    println!("Kinetic energy: {:.6}", obs.kinetic_energy());
    println!("Relative energy drift: {:e}", obs.relative_energy_drift());
    println!("Temperature (kT): {:.6}", obs.temperature());
    println!("Pressure: {:.6}", sim.pressure());
    println!("RMS speed: {:.6}", rms_speed(sim.particles()));
    let p = total_momentum(sim.particles());
    println!("Total momentum: ({:.6}, {:.6})", p.x(), p.y());
    for (ball, tally) in sim.particles().iter().zip(obs.tallies()) {
        println!(
            "ball {:>3}: pos ({:>8.4}, {:>8.4}) vel ({:>8.4}, {:>8.4}) mean free path {:.4}",
            ball.id(),
            ball.pos().x(),
            ball.pos().y(),
            ball.vel().x(),
            ball.vel().y(),
            tally.mean_free_path()
        );
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Get commandline arguments
    let config = SnookerConfig::parse();

    let mut ip: InputParams = if !config.input().is_empty() {
        let contents = fs::read_to_string(config.input())
            .with_context(|| format!("reading {}", config.input()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", config.input()))?
    } else {
        InputParams::default()
    };
    if let Some(seed) = config.seed() {
        ip.seed = seed;
    }
    if let Some(path) = config.initial_state() {
        ip.initial_state = Some(path.to_string());
    }
    ip.check().context("invalid parameters")?;

    // Seed the rng
    println!("Using seed = {:?}", ip.seed);
    let mut rng = Prng::seed_from_u64(ip.seed);

    // Generate the simulator
    let mut sim = simulation_from_params(&ip, &mut rng).context("building the initial state")?;
    println!("Initial configuration ok");

    // Init I/O
    println!("Writing output to {}", config.output_dir());
    create_dir_all(config.output_dir())
        .with_context(|| format!("creating {}", config.output_dir()))?;
    clear_out_files(&config)?;

    // dump full config toml to output directory
    let toml = toml::to_string(&ip)?;
    fs::write(config.toml(), toml).with_context(|| format!("writing {}", config.toml()))?;

    let started = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let events = EventLogWriter::new(&config.events(started))?;
    let mut writer = if config.render() {
        Some(XYZWriter::new(&config.trajectory())?)
    } else {
        None
    };
    if let Some(w) = writer.as_mut() {
        w.write_xyz_frame(&sim.snapshot())?;
    }

    let mut callback = StdCallback {
        frame_every: ip.frame_every,
        writer,
        events,
        samples: vec![sim.observables().sample(sim.container())],
        error: None,
    };

    // Run the simulation
    let outcome = run_simulation(&mut sim, ip.run_length, Some(&mut callback));
    callback.finish()?;
    outcome.context("simulation stopped")?;

    // Write visualizations to disc
    if config.render() {
        let ball_radius = sim.particles().iter().map(|p| p.radius()).fold(0.0, f64::max);
        write_tcl(sim.container(), ball_radius, &config.vmd())?;
        write_geometry_png(&sim, &config.geometry())?;
        write_observables_png(&callback.samples, &config.observables_plot())?;
        let hist = SpeedHistogram::from_particles(sim.particles(), 20);
        write_speeds_png(
            &hist,
            ip.ball_mass,
            sim.observables().temperature(),
            &config.speeds_plot(),
        )?;
    }

    print_summary(&sim);
    Ok(())
}
