/// Changing consts in this file will probably break the simulation
/// please don't do that
// Contact times at or below this are treated as the contact that was just resolved.
pub const TIME_TOLERANCE: f64 = 1e-12;
// Candidates within this much of the minimum time are resolved in the same tick.
pub const SIMULTANEITY_TOL: f64 = 1e-12;
// Gap (in length units) under which two surfaces count as touching.
pub const CONTACT_TOL: f64 = 1e-9;
// Upper bound on chained contact resolutions per tick, per particle.
pub const SETTLE_ITERS_PER_PARTICLE: usize = 4;
// Relative kinetic-energy drift that gets a warning in the log.
pub const ENERGY_DRIFT_WARN: f64 = 1e-6;
// Give up placing a ball after this many rejected positions.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 500;
pub const MAX_PARTICLES: usize = 10000;
// How often (in ticks) progress gets logged at info level.
pub const LOG_EVERY: u64 = 1000;
