use crate::{
    consts::{CONTACT_TOL, TIME_TOLERANCE},
    container::Container,
    particle::Particle,
    position::dot,
};

/// Time until the surfaces of `a` and `b` meet, if they ever do.
///
/// Solves `|r + v t|^2 = R^2` with `r = pos_b - pos_a`, `v = vel_b - vel_a` and
/// `R` the sum of radii, written as `a t^2 + 2 b t + c = 0`. Only the earlier
/// root of a closing trajectory counts. Returns `None` for no relative motion,
/// a miss, a receding pair, or a root within `TIME_TOLERANCE` of now (the
/// contact that was just resolved).
pub fn time_to_ball_contact(p0: &Particle, p1: &Particle) -> Option<f64> {
    let r = p1.pos() - p0.pos();
    let v = p1.vel() - p0.vel();
    let contact = p0.radius() + p1.radius();

    let a = dot(v, v);
    if a == 0.0 {
        return None;
    }
    let b = dot(r, v);
    let c = dot(r, r) - contact * contact;

    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    if b >= 0.0 {
        // receding or overlapping-and-separating: the earlier root is never ahead of us
        return None;
    }

    // same root as (-b - sqrt(disc)) / a without the cancellation
    let t = c / (-b + disc.sqrt());
    (t > TIME_TOLERANCE && t.is_finite()).then_some(t)
}

/// True when `a` and `b` are touching (within `CONTACT_TOL`) and moving into each other.
pub fn in_ball_contact(p0: &Particle, p1: &Particle) -> bool {
    let r = p1.pos() - p0.pos();
    let v = p1.vel() - p0.vel();
    let gap = r.l2_norm() - (p0.radius() + p1.radius());
    gap <= CONTACT_TOL && dot(r, v) < 0.0
}

impl Container {
    /// Time until `p` touches the wall from the inside.
    ///
    /// Solves `|pos + vel t| = Rc - r`. Inside the container the earlier root is
    /// in the past, so the later (exit) root is the contact.
    pub fn time_to_wall_contact(&self, p: &Particle) -> Option<f64> {
        let pos = p.pos();
        let vel = p.vel();
        let reach = self.contact_distance(p.radius());

        let a = dot(vel, vel);
        if a == 0.0 {
            return None;
        }
        let b = dot(pos, vel);
        let c = dot(pos, pos) - reach * reach;

        let disc = b * b - a * c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();

        let t = if b > 0.0 {
            // product of the roots is c / a
            -c / (b + sqrt_disc)
        } else {
            (-b + sqrt_disc) / a
        };
        (t > TIME_TOLERANCE && t.is_finite()).then_some(t)
    }

    /// True when `p` is touching the wall (within `CONTACT_TOL`) and heading outwards.
    pub fn in_wall_contact(&self, p: &Particle) -> bool {
        self.wall_gap(p) <= CONTACT_TOL && dot(p.pos(), p.vel()) > 0.0
    }
}
