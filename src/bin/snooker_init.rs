use std::fs::{self, create_dir_all};

use anyhow::Context;
use clap::Parser;
use rand::SeedableRng;
use snooker::cli::SnookerConfig;
use snooker::container::Container;
use snooker::initial_state::{generate, particles_from_records, save_initial_state};
use snooker::{InputParams, Prng};

// Generates an initial state and writes it to --initial-state, or to
// <output-dir>/initial_state.json when that is not given.
fn main() -> anyhow::Result<()> {
    env_logger::init();

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
    ip.check().context("invalid parameters")?;

    println!("Using seed = {:?}", ip.seed);
    let mut rng = Prng::seed_from_u64(ip.seed);
    let records = generate(&ip, &mut rng).context("placing balls")?;

    // same check the simulation applies on load
    let container = Container::new(ip.container_radius)?;
    particles_from_records(&records, &container)?;

    let out = match config.initial_state() {
        Some(path) => path.to_string(),
        None => {
            create_dir_all(config.output_dir())
                .with_context(|| format!("creating {}", config.output_dir()))?;
            config.initial_state_out()
        }
    };
    save_initial_state(&records, &out).with_context(|| format!("writing {out}"))?;
    println!("Wrote {} balls to {}", records.len(), out);
    Ok(())
}
