use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::consts::CONTACT_TOL;
use crate::error::{Result, SimError};
use crate::particle::Particle;
use crate::position::{dot, Position};

/// Circular container centred on the origin. It is the only boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Container {
    radius: f64,
}

impl Container {
    pub fn new(radius: f64) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(SimError::InvalidParam(format!(
                "container radius must be finite and > 0, got {radius}"
            )));
        }
        Ok(Self { radius })
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn circumference(&self) -> f64 {
        2.0 * PI * self.radius
    }

    pub fn area(&self) -> f64 {
        PI * self.radius * self.radius
    }

    /// Distance from the centre at which a ball of `ball_radius` touches the wall.
    pub fn contact_distance(&self, ball_radius: f64) -> f64 {
        self.radius - ball_radius
    }

    /// Gap between the ball's surface and the wall (negative once it pokes through).
    pub fn wall_gap(&self, p: &Particle) -> f64 {
        self.contact_distance(p.radius()) - p.pos().l2_norm()
    }

    pub fn pos_in_container(&self, pos: Position, ball_radius: f64) -> bool {
        let limit = self.contact_distance(ball_radius);
        limit > 0.0 && dot(pos, pos) <= limit * limit
    }

    /// Containment allowing for `CONTACT_TOL` of round-off.
    pub fn contains(&self, p: &Particle) -> bool {
        self.wall_gap(p) >= -CONTACT_TOL
    }
}
