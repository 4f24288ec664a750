use std::collections::BTreeSet;

use serde::Serialize;

use crate::collision_detection::in_ball_contact;
use crate::collision_response::{resolve_ball_contact, resolve_wall_contact};
use crate::consts::{CONTACT_TOL, ENERGY_DRIFT_WARN, LOG_EVERY, SETTLE_ITERS_PER_PARTICLE};
use crate::container::Container;
use crate::error::{Result, SimError};
use crate::event::{Event, EventKind, EventRecord};
use crate::observables::Observables;
use crate::particle::{ParticleId, Particles};
use crate::scheduler::{full_scan, EventQueue, Strategy};

/// One ball as seen by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapshotEntry {
    pub id: ParticleId,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub radius: f64,
}

/// Committed state after a tick, in identity order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub elapsed_time: f64,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub dt: f64,
    pub elapsed_time: f64,
    /// Every contact resolved in this tick, in resolution order. Never empty.
    pub events: Vec<EventRecord>,
}

enum NextEvents {
    Due(Vec<Event>),
    BeyondLimit,
}

/// Errors with `InvalidInitialState` if a ball pokes out of the container or
/// two balls overlap by more than `CONTACT_TOL`.
pub fn validate_state(particles: &Particles, container: &Container) -> Result<()> {
    for p in particles.iter() {
        if !container.contains(p) {
            return Err(SimError::InvalidInitialState(format!(
                "ball {} at ({}, {}) is not inside the container",
                p.id(),
                p.pos().x(),
                p.pos().y()
            )));
        }
    }
    let ps = particles.as_slice();
    for (i, p) in ps.iter().enumerate() {
        for q in &ps[i + 1..] {
            let gap = (q.pos() - p.pos()).l2_norm() - (p.radius() + q.radius());
            if gap < -CONTACT_TOL {
                return Err(SimError::InvalidInitialState(format!(
                    "balls {} and {} overlap by {}",
                    p.id(),
                    q.id(),
                    -gap
                )));
            }
        }
    }
    Ok(())
}

/// Event-driven hard-disc simulation in a circular container.
///
/// Each tick moves the clock to the next contact, drifts every ball there and
/// resolves that contact (plus any others happening at the same instant).
/// Observers only ever see state between ticks.
#[derive(Debug)]
pub struct Simulation {
    particles: Particles,
    container: Container,
    strategy: Strategy,
    queue: EventQueue,
    observables: Observables,
    drift_warned: bool,
}

impl Simulation {
    pub fn new(particles: Particles, container: Container, strategy: Strategy) -> Result<Self> {
        validate_state(&particles, &container)?;
        let observables = Observables::new(&particles);
        let mut sim = Self {
            particles,
            container,
            strategy,
            queue: EventQueue::new(),
            observables,
            drift_warned: false,
        };
        sim.settle_initial_contacts()?;
        if strategy == Strategy::EventQueue {
            sim.queue.rebuild(&sim.particles, &sim.container, 0.0)?;
        }
        log::info!(
            "Starting simulation: {} balls, container radius {}, {:?}, KE = {}",
            sim.particles.num_particles(),
            sim.container.radius(),
            strategy,
            sim.observables.kinetic_energy()
        );
        Ok(sim)
    }

    /// Contacts already due at t = 0 have no positive root, so no tick would
    /// ever pick them up. They are resolved here, before the first prediction.
    fn settle_initial_contacts(&mut self) -> Result<()> {
        let mut touched: BTreeSet<usize> = (0..self.particles.num_particles()).collect();
        let mut records = Vec::new();
        self.settle(0, &mut records, &mut touched)?;
        if !records.is_empty() {
            log::debug!("resolved {} contacts present at t = 0", records.len());
        }
        Ok(())
    }

    pub fn particles(&self) -> &Particles {
        &self.particles
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn observables(&self) -> &Observables {
        &self.observables
    }

    pub fn elapsed_time(&self) -> f64 {
        self.observables.elapsed_time()
    }

    pub fn num_ticks(&self) -> u64 {
        self.observables.ticks()
    }

    pub fn pressure(&self) -> f64 {
        self.observables.pressure(&self.container)
    }

    pub fn is_well_formed(&self) -> bool {
        validate_state(&self.particles, &self.container).is_ok()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.num_ticks(),
            elapsed_time: self.elapsed_time(),
            entries: self
                .particles
                .iter()
                .map(|p| SnapshotEntry {
                    id: p.id(),
                    position: [p.pos().x(), p.pos().y()],
                    velocity: [p.vel().x(), p.vel().y()],
                    radius: p.radius(),
                })
                .collect(),
        }
    }

    /// Advance to the next contact and resolve it.
    ///
    /// Errors with `NoEvent` when nothing will ever collide again.
    pub fn tick(&mut self) -> Result<TickReport> {
        self.step(None)?.ok_or(SimError::NoEvent {
            elapsed_time: self.elapsed_time(),
        })
    }

    /// Like `tick`, but if the next contact lies beyond `limit` every ball is
    /// drifted to `limit` instead and `None` is returned.
    pub fn tick_until(&mut self, limit: f64) -> Result<Option<TickReport>> {
        if !(limit >= self.elapsed_time()) {
            return Err(SimError::InvalidParam(format!(
                "time limit {limit} is before the current time {}",
                self.elapsed_time()
            )));
        }
        self.step(Some(limit))
    }

    fn next_events(&mut self, limit: Option<f64>) -> Result<NextEvents> {
        let now = self.elapsed_time();
        let beyond = |t: f64| limit.is_some_and(|l| t > l);
        match self.strategy {
            Strategy::FullRescan => {
                let cands = full_scan(self.particles.as_slice(), &self.container, now)?;
                match cands.best() {
                    None => Err(SimError::NoEvent { elapsed_time: now }),
                    Some(best) if beyond(best.time()) => Ok(NextEvents::BeyondLimit),
                    Some(_) => Ok(NextEvents::Due(cands.into_events())),
                }
            }
            Strategy::EventQueue => match self.queue.peek_valid(&self.particles)? {
                None => Err(SimError::NoEvent { elapsed_time: now }),
                Some(best) if beyond(best.time()) => Ok(NextEvents::BeyondLimit),
                Some(_) => Ok(NextEvents::Due(self.queue.pop_group(&self.particles)?)),
            },
        }
    }

    fn step(&mut self, limit: Option<f64>) -> Result<Option<TickReport>> {
        let now = self.elapsed_time();
        let events = match self.next_events(limit)? {
            NextEvents::Due(events) => events,
            NextEvents::BeyondLimit => {
                if let Some(limit) = limit {
                    self.drift_all(limit - now);
                }
                return Ok(None);
            }
        };
        let (primary, ties) = events
            .split_first()
            .ok_or(SimError::NoEvent { elapsed_time: now })?;

        let dt = (primary.time() - now).max(0.0);
        self.drift_all(dt);

        let tick = self.observables.ticks() + 1;
        let mut records = Vec::new();
        let mut touched = BTreeSet::new();

        self.resolve(primary.kind(), tick, &mut records, &mut touched)?;
        for tie in ties {
            // the primary may have changed a participant's course
            if self.in_contact(tie.kind())? {
                self.resolve(tie.kind(), tick, &mut records, &mut touched)?;
            }
        }
        self.settle(tick, &mut records, &mut touched)?;

        if self.strategy == Strategy::EventQueue {
            let now = self.elapsed_time();
            for &idx in &touched {
                self.queue
                    .schedule_for(idx, &self.particles, &self.container, now)?;
            }
        }

        self.observables.record_tick(self.particles.kinetic_energy());
        self.check_energy();
        if tick % LOG_EVERY == 0 {
            log::info!(
                "tick {}: t = {:.6}, KE = {:.6}, P = {:.6}",
                tick,
                self.elapsed_time(),
                self.observables.kinetic_energy(),
                self.pressure()
            );
        }

        Ok(Some(TickReport {
            tick,
            dt,
            elapsed_time: self.elapsed_time(),
            events: records,
        }))
    }

    fn drift_all(&mut self, dt: f64) {
        for (idx, p) in self.particles.as_mut_slice().iter_mut().enumerate() {
            let dist = p.drift(dt);
            self.observables.record_drift(idx, dist);
        }
        self.observables.advance_clock(dt);
    }

    fn in_contact(&self, kind: EventKind) -> Result<bool> {
        Ok(match kind {
            EventKind::BallBall { i, j } => {
                in_ball_contact(self.particles.particle(i)?, self.particles.particle(j)?)
            }
            EventKind::BallWall { i } => self.container.in_wall_contact(self.particles.particle(i)?),
        })
    }

    fn resolve(
        &mut self,
        kind: EventKind,
        tick: u64,
        records: &mut Vec<EventRecord>,
        touched: &mut BTreeSet<usize>,
    ) -> Result<()> {
        let (velocities, wall_impulse) = match kind {
            EventKind::BallBall { i, j } => {
                let (ii, jj) = (self.particles.index_of(i)?, self.particles.index_of(j)?);
                let ps = self.particles.as_mut_slice();
                let (vi, vj) = resolve_ball_contact(&ps[ii], &ps[jj])?;
                ps[ii].update_vel(vi);
                ps[jj].update_vel(vj);
                self.observables.record_ball_collision(ii, jj);
                touched.insert(ii);
                touched.insert(jj);
                (vec![(i, [vi.x(), vi.y()]), (j, [vj.x(), vj.y()])], 0.0)
            }
            EventKind::BallWall { i } => {
                let ii = self.particles.index_of(i)?;
                let ps = self.particles.as_mut_slice();
                let (v, impulse) = resolve_wall_contact(&ps[ii])?;
                ps[ii].update_vel(v);
                self.observables.record_wall_collision(ii, impulse);
                touched.insert(ii);
                (vec![(i, [v.x(), v.y()])], impulse)
            }
        };
        log::debug!(
            "tick {}: resolved {:?} at t = {}",
            tick,
            kind,
            self.elapsed_time()
        );
        records.push(EventRecord {
            tick,
            time: self.elapsed_time(),
            kind,
            velocities,
            wall_impulse,
            cumulative_wall_impulse: self.observables.cumulative_wall_impulse(),
            kinetic_energy: self.particles.kinetic_energy(),
        });
        Ok(())
    }

    /// Contact (touching and closing) involving one of the particles at `touched`,
    /// earliest in event order.
    fn pending_contact(&self, touched: &BTreeSet<usize>) -> Option<EventKind> {
        let ps = self.particles.as_slice();
        let mut found: Option<EventKind> = None;
        let mut consider = |kind: EventKind| {
            if found.map_or(true, |f| kind.order_key() < f.order_key()) {
                found = Some(kind);
            }
        };
        for &idx in touched {
            let p = &ps[idx];
            if self.container.in_wall_contact(p) {
                consider(EventKind::BallWall { i: p.id() });
            }
            for (k, q) in ps.iter().enumerate() {
                if k != idx && in_ball_contact(p, q) {
                    consider(EventKind::ball_ball(p.id(), q.id()));
                }
            }
        }
        found
    }

    /// Resolve contacts chained off this tick's resolutions, one pair at a time.
    fn settle(
        &mut self,
        tick: u64,
        records: &mut Vec<EventRecord>,
        touched: &mut BTreeSet<usize>,
    ) -> Result<()> {
        let cap = SETTLE_ITERS_PER_PARTICLE * self.particles.num_particles().max(1);
        let mut iters = 0;
        while let Some(kind) = self.pending_contact(touched) {
            if iters >= cap {
                log::warn!(
                    "tick {}: still resolving chained contacts after {} passes, moving on",
                    tick,
                    cap
                );
                break;
            }
            self.resolve(kind, tick, records, touched)?;
            iters += 1;
        }
        Ok(())
    }

    fn check_energy(&mut self) {
        let drift = self.observables.relative_energy_drift();
        if drift > ENERGY_DRIFT_WARN && !self.drift_warned {
            log::warn!(
                "kinetic energy drifted by {:e} (relative) at t = {}",
                drift,
                self.elapsed_time()
            );
            self.drift_warned = true;
        }
    }
}
