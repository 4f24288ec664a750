use std::cmp::Ordering;

use ordered_float::NotNan;
use serde::Serialize;

use crate::error::{Result, SimError};
use crate::particle::ParticleId;

/// What touches what.
///
/// At equal times ball-ball contacts come before wall contacts, then lower ids first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// `i < j` always.
    BallBall { i: ParticleId, j: ParticleId },
    BallWall { i: ParticleId },
}

impl EventKind {
    pub fn ball_ball(a: ParticleId, b: ParticleId) -> Self {
        if a < b {
            EventKind::BallBall { i: a, j: b }
        } else {
            EventKind::BallBall { i: b, j: a }
        }
    }

    #[inline]
    pub(crate) fn order_key(&self) -> (u8, ParticleId, ParticleId) {
        match *self {
            EventKind::BallBall { i, j } => (0, i, j),
            EventKind::BallWall { i } => (1, i, 0),
        }
    }

    pub fn participants(&self) -> (ParticleId, Option<ParticleId>) {
        match *self {
            EventKind::BallBall { i, j } => (i, Some(j)),
            EventKind::BallWall { i } => (i, None),
        }
    }

    pub fn involves(&self, p_id: ParticleId) -> bool {
        match *self {
            EventKind::BallBall { i, j } => i == p_id || j == p_id,
            EventKind::BallWall { i } => i == p_id,
        }
    }

    pub fn is_wall(&self) -> bool {
        matches!(self, EventKind::BallWall { .. })
    }
}

/// A predicted contact at absolute simulation time `time`.
///
/// `gen_i`/`gen_j` snapshot the participants' generation counters at
/// prediction time; once either participant has been in another contact the
/// prediction no longer describes its trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    time: NotNan<f64>,
    kind: EventKind,
    gen_i: u64,
    gen_j: Option<u64>,
}

impl Event {
    pub fn new(time: f64, kind: EventKind, gen_i: u64, gen_j: Option<u64>) -> Result<Self> {
        if !time.is_finite() {
            return Err(SimError::Degenerate(format!(
                "event time must be finite, got {time}"
            )));
        }
        let time = NotNan::new(time)
            .map_err(|_| SimError::Degenerate("event time cannot be NaN".into()))?;
        Ok(Self {
            time,
            kind,
            gen_i,
            gen_j,
        })
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.time.into_inner()
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Still describes the participants' current trajectories?
    #[inline]
    pub fn is_valid(&self, gen_i_now: u64, gen_j_now: Option<u64>) -> bool {
        self.gen_i == gen_i_now
            && match (self.gen_j, gen_j_now) {
                (Some(a), Some(b)) => a == b,
                (None, _) => true,
                (Some(_), None) => false,
            }
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.kind.order_key().cmp(&other.kind.order_key()))
            .then_with(|| {
                (self.gen_i, self.gen_j.unwrap_or(0)).cmp(&(other.gen_i, other.gen_j.unwrap_or(0)))
            })
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One resolved contact, as handed to the output logger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub tick: u64,
    pub time: f64,
    #[serde(flatten)]
    pub kind: EventKind,
    /// Post-contact velocity of each participant.
    pub velocities: Vec<(ParticleId, [f64; 2])>,
    /// Impulse given to the wall by this contact (0 for ball-ball).
    pub wall_impulse: f64,
    pub cumulative_wall_impulse: f64,
    pub kinetic_energy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use EventKind::{BallBall, BallWall};

    #[test]
    fn rejects_non_finite_time() {
        assert!(Event::new(f64::NAN, BallWall { i: 0 }, 0, None).is_err());
        assert!(Event::new(f64::INFINITY, BallWall { i: 0 }, 0, None).is_err());
    }

    #[test]
    fn ball_ball_ids_are_ordered() {
        assert_eq!(EventKind::ball_ball(7, 3), BallBall { i: 3, j: 7 });
        assert_eq!(EventKind::ball_ball(3, 7), BallBall { i: 3, j: 7 });
    }

    #[test]
    fn ordering_by_time_then_kind_then_ids() -> Result<()> {
        let early_wall = Event::new(1.0, BallWall { i: 9 }, 0, None)?;
        let late_pair = Event::new(2.0, BallBall { i: 0, j: 1 }, 0, Some(0))?;
        assert!(early_wall < late_pair);

        let pair = Event::new(5.0, BallBall { i: 4, j: 5 }, 0, Some(0))?;
        let wall = Event::new(5.0, BallWall { i: 0 }, 0, None)?;
        assert!(pair < wall);

        let low = Event::new(5.0, BallBall { i: 1, j: 8 }, 0, Some(0))?;
        assert!(low < pair);
        Ok(())
    }

    #[test]
    fn validity_follows_generations() -> Result<()> {
        let e = Event::new(1.0, BallBall { i: 1, j: 2 }, 10, Some(20))?;
        assert!(e.is_valid(10, Some(20)));
        assert!(!e.is_valid(11, Some(20)));
        assert!(!e.is_valid(10, Some(21)));
        assert!(!e.is_valid(10, None));

        let w = Event::new(1.0, BallWall { i: 3 }, 7, None)?;
        assert!(w.is_valid(7, None));
        assert!(!w.is_valid(8, None));
        Ok(())
    }

    #[test]
    fn involvement() {
        let k = BallBall { i: 1, j: 2 };
        assert!(k.involves(1) && k.involves(2) && !k.involves(3));
        assert_eq!(k.participants(), (1, Some(2)));
        assert!(BallWall { i: 4 }.is_wall());
    }

    #[test]
    fn record_serializes_flat() {
        let rec = EventRecord {
            tick: 3,
            time: 1.5,
            kind: BallWall { i: 2 },
            velocities: vec![(2, [1.0, -1.0])],
            wall_impulse: 2.0,
            cumulative_wall_impulse: 6.0,
            kinetic_energy: 1.0,
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"kind\":\"ball_wall\""));
        assert!(json.contains("\"i\":2"));
        assert!(json.contains("\"cumulative_wall_impulse\":6.0"));
    }
}
