use crate::error::{Result, SimError};
use crate::particle::Particle;
use crate::position::{dot, unit, Velocity};

/// Post-contact velocities of two discs touching along their line of centres.
///
/// One-dimensional elastic collision along the unit normal `n` from `p0` to
/// `p1`. The tangential components are left alone, so momentum and kinetic
/// energy of the pair are both conserved.
pub fn resolve_ball_contact(p0: &Particle, p1: &Particle) -> Result<(Velocity, Velocity)> {
    let n = unit(p1.pos() - p0.pos()).ok_or_else(|| {
        SimError::Degenerate(format!(
            "balls {} and {} have coincident centres",
            p0.id(),
            p1.id()
        ))
    })?;

    let (m0, m1) = (p0.mass(), p1.mass());
    // closing speed along n
    let u = dot(p0.vel() - p1.vel(), n);
    let total = m0 + m1;

    let v0 = p0.vel() - n.scale_by(2.0 * m1 / total * u);
    let v1 = p1.vel() + n.scale_by(2.0 * m0 / total * u);
    Ok((v0, v1))
}

/// Specular reflection off the container wall.
///
/// Returns the new velocity and the normal impulse handed to the wall,
/// `2 m |v . n|`.
pub fn resolve_wall_contact(p: &Particle) -> Result<(Velocity, f64)> {
    let n = unit(p.pos()).ok_or_else(|| {
        SimError::Degenerate(format!("ball {} touches the wall from the centre", p.id()))
    })?;
    let v_n = dot(p.vel(), n);
    let new_vel = p.vel() - n.scale_by(2.0 * v_n);
    Ok((new_vel, 2.0 * p.mass() * v_n.abs()))
}
