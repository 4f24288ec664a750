use std::cmp::Reverse;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::collision_detection::time_to_ball_contact;
use crate::consts::SIMULTANEITY_TOL;
use crate::container::Container;
use crate::error::Result;
use crate::event::{Event, EventKind};
use crate::particle::{Particle, Particles};

/// How the next event is found each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Re-evaluate every pair and every wall contact from scratch.
    #[default]
    FullRescan,
    /// Keep predictions in a heap and drop the ones whose participants have since collided.
    EventQueue,
}

pub fn ball_event(p0: &Particle, p1: &Particle, now: f64) -> Result<Option<Event>> {
    let Some(dt) = time_to_ball_contact(p0, p1) else {
        return Ok(None);
    };
    // generations follow the (lower id, higher id) order of the event kind
    let (lo, hi) = if p0.id() < p1.id() { (p0, p1) } else { (p1, p0) };
    Event::new(
        now + dt,
        EventKind::ball_ball(lo.id(), hi.id()),
        lo.generation(),
        Some(hi.generation()),
    )
    .map(Some)
}

pub fn wall_event(container: &Container, p: &Particle, now: f64) -> Result<Option<Event>> {
    match container.time_to_wall_contact(p) {
        Some(dt) => Ok(Some(Event::new(
            now + dt,
            EventKind::BallWall { i: p.id() },
            p.generation(),
            None,
        )?)),
        None => Ok(None),
    }
}

/// The earliest candidate seen so far, plus every other candidate within
/// `SIMULTANEITY_TOL` of it.
#[derive(Debug, Default, Clone)]
pub struct Candidates {
    best: Option<Event>,
    ties: Vec<Event>,
}

impl Candidates {
    pub fn offer(&mut self, ev: Event) {
        match self.best {
            None => self.best = Some(ev),
            Some(best) if ev < best => {
                self.ties.push(best);
                self.best = Some(ev);
                let cutoff = ev.time() + SIMULTANEITY_TOL;
                self.ties.retain(|t| t.time() <= cutoff);
            }
            Some(best) => {
                if ev.time() <= best.time() + SIMULTANEITY_TOL {
                    self.ties.push(ev);
                }
            }
        }
    }

    pub fn merge(mut self, other: Candidates) -> Candidates {
        if let Some(best) = other.best {
            self.offer(best);
        }
        for ev in other.ties {
            self.offer(ev);
        }
        self
    }

    pub fn best(&self) -> Option<Event> {
        self.best
    }

    /// The earliest event first, then its ties in event order.
    pub fn into_events(self) -> Vec<Event> {
        let mut out = Vec::with_capacity(1 + self.ties.len());
        if let Some(best) = self.best {
            out.push(best);
            let mut ties = self.ties;
            ties.sort();
            out.extend(ties);
        }
        out
    }
}

fn scan_row(particles: &[Particle], container: &Container, now: f64, i: usize) -> Result<Candidates> {
    let mut cands = Candidates::default();
    let p = &particles[i];
    if let Some(ev) = wall_event(container, p, now)? {
        cands.offer(ev);
    }
    for q in &particles[i + 1..] {
        if let Some(ev) = ball_event(p, q, now)? {
            cands.offer(ev);
        }
    }
    Ok(cands)
}

/// Every ball-ball pair and every ball-wall contact, O(N^2).
#[cfg(not(feature = "parallel"))]
pub fn full_scan(particles: &[Particle], container: &Container, now: f64) -> Result<Candidates> {
    let mut cands = Candidates::default();
    for i in 0..particles.len() {
        cands = cands.merge(scan_row(particles, container, now, i)?);
    }
    Ok(cands)
}

/// Every ball-ball pair and every ball-wall contact, O(N^2), rows in parallel.
/// The selection is a total order so the result does not depend on scheduling.
#[cfg(feature = "parallel")]
pub fn full_scan(particles: &[Particle], container: &Container, now: f64) -> Result<Candidates> {
    use rayon::prelude::*;
    (0..particles.len())
        .into_par_iter()
        .map(|i| scan_row(particles, container, now, i))
        .try_reduce(Candidates::default, |a, b| Ok(a.merge(b)))
}

/// Predicted contacts keyed by absolute time.
///
/// Entries are never removed when a participant collides; they are recognised
/// as stale by their generation snapshot when they reach the top.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn rebuild(&mut self, particles: &Particles, container: &Container, now: f64) -> Result<()> {
        self.heap.clear();
        let ps = particles.as_slice();
        for (i, p) in ps.iter().enumerate() {
            if let Some(ev) = wall_event(container, p, now)? {
                self.heap.push(Reverse(ev));
            }
            for q in &ps[i + 1..] {
                if let Some(ev) = ball_event(p, q, now)? {
                    self.heap.push(Reverse(ev));
                }
            }
        }
        Ok(())
    }

    /// Fresh predictions for the particle at index `idx` against the wall and every other particle.
    pub fn schedule_for(
        &mut self,
        idx: usize,
        particles: &Particles,
        container: &Container,
        now: f64,
    ) -> Result<()> {
        let ps = particles.as_slice();
        let p = &ps[idx];
        if let Some(ev) = wall_event(container, p, now)? {
            self.heap.push(Reverse(ev));
        }
        for (k, q) in ps.iter().enumerate() {
            if k == idx {
                continue;
            }
            if let Some(ev) = ball_event(p, q, now)? {
                self.heap.push(Reverse(ev));
            }
        }
        Ok(())
    }

    fn is_current(ev: &Event, particles: &Particles) -> Result<bool> {
        let (i, j) = ev.kind().participants();
        let gen_i = particles.particle(i)?.generation();
        let gen_j = match j {
            Some(j) => Some(particles.particle(j)?.generation()),
            None => None,
        };
        Ok(ev.is_valid(gen_i, gen_j))
    }

    /// Earliest prediction that is still current, discarding stale ones on the way.
    pub fn peek_valid(&mut self, particles: &Particles) -> Result<Option<Event>> {
        while let Some(Reverse(ev)) = self.heap.peek().copied() {
            if Self::is_current(&ev, particles)? {
                return Ok(Some(ev));
            }
            self.heap.pop();
        }
        Ok(None)
    }

    pub fn pop_valid(&mut self, particles: &Particles) -> Result<Option<Event>> {
        let next = self.peek_valid(particles)?;
        if next.is_some() {
            self.heap.pop();
        }
        Ok(next)
    }

    /// The earliest current prediction and every current one within
    /// `SIMULTANEITY_TOL` of it, in event order.
    pub fn pop_group(&mut self, particles: &Particles) -> Result<Vec<Event>> {
        let Some(first) = self.pop_valid(particles)? else {
            return Ok(Vec::new());
        };
        let cutoff = first.time() + SIMULTANEITY_TOL;
        let mut group = vec![first];
        while let Some(ev) = self.peek_valid(particles)? {
            if ev.time() > cutoff {
                break;
            }
            self.heap.pop();
            group.push(ev);
        }
        Ok(group)
    }
}
