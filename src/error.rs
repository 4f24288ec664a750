use thiserror::Error;

use crate::particle::ParticleId;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised by the simulation core.
///
/// Only genuine failures end up here. A pair or wall that will never be hit is
/// not an error, prediction just returns `None` for it.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid configuration value.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// The initial state violates a precondition (overlap, escaped ball, bad mass...).
    #[error("invalid initial state: {0}")]
    InvalidInitialState(String),

    /// No ball-ball or ball-wall candidate exists, so the run cannot advance.
    #[error("no collision event can be found at t = {elapsed_time}")]
    NoEvent { elapsed_time: f64 },

    /// Geometry that makes a contact normal undefined.
    #[error("degenerate contact: {0}")]
    Degenerate(String),

    /// Lookup of a particle id that is not part of the population.
    #[error("no particle with id {0}")]
    UnknownParticle(ParticleId),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = SimError::InvalidInitialState("balls 0 and 1 overlap".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("invalid initial state"));
        assert!(msg.contains("overlap"));

        let e = SimError::NoEvent { elapsed_time: 2.5 };
        assert!(e.to_string().contains("2.5"));
    }
}
