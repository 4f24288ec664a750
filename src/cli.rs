use clap::Parser;

#[derive(Parser, Debug, Clone)]
pub struct SnookerConfig {
    /// TOML parameter file; defaults are used when empty.
    #[arg(long, default_value = "")]
    input: String,
    #[arg(long, default_value = "./out")]
    output_dir: String,
    /// Overrides the seed in the parameter file.
    #[arg(long)]
    seed: Option<u64>,
    /// JSON initial-state dataset; overrides the parameter file.
    #[arg(long)]
    initial_state: Option<String>,
    /// Skip the trajectory, VMD script and PNG outputs.
    #[arg(long)]
    no_render: bool,
}

impl SnookerConfig {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    pub fn set_output_dir(&mut self, s: &str) {
        self.output_dir = s.to_string();
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn initial_state(&self) -> Option<&str> {
        self.initial_state.as_deref()
    }

    pub fn render(&self) -> bool {
        !self.no_render
    }

    pub fn toml(&self) -> String {
        format!("{}/config.toml", self.output_dir())
    }

    pub fn vmd(&self) -> String {
        format!("{}/vmd.tcl", self.output_dir())
    }

    pub fn geometry(&self) -> String {
        format!("{}/geometry.png", self.output_dir())
    }

    pub fn observables_plot(&self) -> String {
        format!("{}/observables.png", self.output_dir())
    }

    pub fn speeds_plot(&self) -> String {
        format!("{}/speeds.png", self.output_dir())
    }

    pub fn trajectory(&self) -> String {
        format!("{}/trajectory.xyz", self.output_dir())
    }

    pub fn initial_state_out(&self) -> String {
        format!("{}/initial_state.json", self.output_dir())
    }

    /// Event log, named after the run's start time in seconds since the epoch.
    pub fn events(&self, unix_ts: u64) -> String {
        format!("{}/events_{}.jsonl", self.output_dir(), unix_ts)
    }
}
