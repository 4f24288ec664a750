use std::f64::consts::PI;
use std::ops::ControlFlow;

use approx::assert_relative_eq;
use quickcheck_macros::quickcheck;
use rand::SeedableRng;
use snooker::{
    container::Container,
    error::SimError,
    event::EventKind,
    initial_state::{generate, particles_from_records, save_initial_state, ParticleRecord},
    particle::{Particle, Particles},
    position::DimVec,
    run_simulation,
    scheduler::Strategy,
    simulation::{Simulation, TickReport},
    simulation_from_params, InputParams, Prng, RunLength,
};

const TEST_EPSILON: f64 = 0.000001;

fn ball(id: u32, pos: [f64; 2], vel: [f64; 2], radius: f64) -> Particle {
    Particle::new(id, DimVec::new(pos), DimVec::new(vel), radius, 1.0).unwrap()
}

fn simulation(balls: Vec<Particle>, container_radius: f64, strategy: Strategy) -> Simulation {
    Simulation::new(
        Particles::new(balls).unwrap(),
        Container::new(container_radius).unwrap(),
        strategy,
    )
    .unwrap()
}

fn random_simulation(ip: &InputParams) -> Simulation {
    let mut rng = Prng::seed_from_u64(ip.seed);
    simulation_from_params(ip, &mut rng).unwrap()
}

/// Recomputed geometry at the time of the first contact resolved in a tick.
fn contact_gap(sim: &Simulation, kind: EventKind) -> f64 {
    let ps = sim.particles();
    match kind {
        EventKind::BallBall { i, j } => {
            let (a, b) = (ps.particle(i).unwrap(), ps.particle(j).unwrap());
            (b.pos() - a.pos()).l2_norm() - (a.radius() + b.radius())
        }
        EventKind::BallWall { i } => sim.container().wall_gap(ps.particle(i).unwrap()),
    }
}

fn check_tick(sim: &Simulation, report: &TickReport, prev_time: f64) {
    assert!(report.dt >= 0.0);
    assert!(sim.elapsed_time() >= prev_time);
    assert!(!report.events.is_empty());
    assert!(sim.is_well_formed(), "overlap or escape at tick {}", report.tick);
    // no resolution moves a ball, so the primary contact is still exact
    assert!(contact_gap(sim, report.events[0].kind).abs() < 1e-7);
}

#[test]
fn head_on_equal_masses_exchange_velocities() {
    let mut sim = simulation(
        vec![
            ball(0, [-4.0, 0.0], [2.0, 0.0], 1.0),
            ball(1, [4.0, 0.0], [-2.0, 0.0], 1.0),
        ],
        10.0,
        Strategy::FullRescan,
    );
    let report = sim.tick().unwrap();
    assert_eq!(report.events[0].kind, EventKind::BallBall { i: 0, j: 1 });
    assert_relative_eq!(report.dt, 1.5, epsilon = TEST_EPSILON);
    let ps = sim.particles().as_slice();
    assert_relative_eq!(ps[0].vel().x(), -2.0, epsilon = TEST_EPSILON);
    assert_relative_eq!(ps[1].vel().x(), 2.0, epsilon = TEST_EPSILON);
    assert_relative_eq!(ps[0].vel().y(), 0.0, epsilon = TEST_EPSILON);
}

#[test]
fn radial_wall_bounce_reverses_velocity() {
    let mut sim = simulation(vec![ball(0, [0.0, 3.0], [0.0, 2.0], 1.0)], 10.0, Strategy::FullRescan);
    let report = sim.tick().unwrap();
    assert_eq!(report.events[0].kind, EventKind::BallWall { i: 0 });
    assert_relative_eq!(report.dt, 3.0, epsilon = TEST_EPSILON);
    let p = &sim.particles().as_slice()[0];
    assert_relative_eq!(p.pos().y(), 9.0, epsilon = TEST_EPSILON);
    assert_relative_eq!(p.vel().y(), -2.0, epsilon = TEST_EPSILON);
    assert_relative_eq!(p.vel().x(), 0.0, epsilon = TEST_EPSILON);
    assert_relative_eq!(report.events[0].wall_impulse, 4.0, epsilon = TEST_EPSILON);
}

#[test]
fn parallel_tracks_never_collide() {
    // opposite directions on tracks 6 apart; first wall contact after ~13.5
    for strategy in [Strategy::FullRescan, Strategy::EventQueue] {
        let mut sim = simulation(
            vec![
                ball(0, [-5.0, 3.0], [1.0, 0.0], 1.0),
                ball(1, [5.0, -3.0], [-1.0, 0.0], 1.0),
            ],
            10.0,
            strategy,
        );
        run_simulation(&mut sim, RunLength::Time(13.0), None).unwrap();
        assert_eq!(sim.num_ticks(), 0);
        assert_eq!(sim.observables().ball_collisions(), 0);
        assert_relative_eq!(sim.elapsed_time(), 13.0, epsilon = TEST_EPSILON);
        assert_relative_eq!(sim.particles().as_slice()[0].pos().x(), 8.0, epsilon = TEST_EPSILON);
    }
}

#[test]
fn single_ball_hits_wall_at_regular_intervals() {
    // impact parameter 4 inside reach 9: every chord is 2 sqrt(65) long
    for strategy in [Strategy::FullRescan, Strategy::EventQueue] {
        let mut sim = simulation(vec![ball(0, [0.0, 4.0], [2.0, 0.0], 1.0)], 10.0, strategy);
        let ke = sim.observables().kinetic_energy();
        let mut times = Vec::new();
        let mut cb = |s: &Simulation, report: &TickReport| {
            assert!(report.events.iter().all(|r| r.kind == EventKind::BallWall { i: 0 }));
            assert_relative_eq!(s.observables().kinetic_energy(), ke, max_relative = 1e-12);
            times.push(report.elapsed_time);
            ControlFlow::Continue(())
        };
        run_simulation(&mut sim, RunLength::Ticks(2000), Some(&mut cb)).unwrap();

        assert_relative_eq!(times[0], 65f64.sqrt() / 2.0, epsilon = TEST_EPSILON);
        for w in times.windows(2) {
            assert_relative_eq!(w[1] - w[0], 65f64.sqrt(), epsilon = 1e-6);
        }

        // P -> m v^2 / (2 pi Rc (Rc - r)) for a single ball
        let expected = 4.0 / (2.0 * PI * 10.0 * 9.0);
        assert_relative_eq!(sim.pressure(), expected, max_relative = 1e-2);
        assert_eq!(sim.observables().wall_collisions(), 2000);
    }
}

#[test]
fn gas_keeps_invariants_every_tick() {
    for strategy in [Strategy::FullRescan, Strategy::EventQueue] {
        let ip = InputParams {
            strategy,
            ..InputParams::default()
        };
        let mut sim = random_simulation(&ip);
        let ke0 = sim.observables().kinetic_energy();
        let mut prev_time = 0.0;
        let mut cb = |s: &Simulation, report: &TickReport| {
            check_tick(s, report, prev_time);
            assert!(report.dt > 0.0);
            prev_time = s.elapsed_time();
            ControlFlow::Continue(())
        };
        run_simulation(&mut sim, RunLength::Ticks(2000), Some(&mut cb)).unwrap();
        assert_relative_eq!(sim.observables().kinetic_energy(), ke0, max_relative = 1e-9);
        assert!(sim.observables().ball_collisions() > 0);
        assert!(sim.pressure() > 0.0);
    }
}

#[test]
fn touching_pair_closing_at_start_bounces_apart() {
    for strategy in [Strategy::FullRescan, Strategy::EventQueue] {
        let balls = vec![
            ball(0, [-1.0, 0.0], [1.0, 0.0], 1.0),
            ball(1, [1.0, 0.0], [-1.0, 0.0], 1.0),
            ball(2, [0.0, 5.0], [0.0, 0.0], 1.0),
        ];
        let mut sim = simulation(balls, 10.0, strategy);
        // already resolved before the first tick
        assert_eq!(sim.observables().ball_collisions(), 1);
        let ps = sim.particles();
        assert_relative_eq!(ps.particle(0).unwrap().vel().x(), -1.0);
        assert_relative_eq!(ps.particle(1).unwrap().vel().x(), 1.0);

        let report = sim.tick().unwrap();
        assert_relative_eq!(report.dt, 8.0, epsilon = TEST_EPSILON);
        assert!(sim.is_well_formed());
        let ps = sim.particles();
        assert_relative_eq!(ps.particle(0).unwrap().pos().x(), -9.0, epsilon = TEST_EPSILON);
        assert_relative_eq!(ps.particle(1).unwrap().pos().x(), 9.0, epsilon = TEST_EPSILON);
    }
}

#[test]
fn ball_on_the_wall_heading_out_is_reflected_at_start() {
    for strategy in [Strategy::FullRescan, Strategy::EventQueue] {
        let mut sim = simulation(vec![ball(0, [9.0, 0.0], [1.0, 0.0], 1.0)], 10.0, strategy);
        assert_eq!(sim.observables().wall_collisions(), 1);
        assert_relative_eq!(sim.particles().particle(0).unwrap().vel().x(), -1.0);

        let report = sim.tick().unwrap();
        assert_eq!(report.events[0].kind, EventKind::BallWall { i: 0 });
        assert_relative_eq!(report.dt, 18.0, epsilon = TEST_EPSILON);
        assert!(sim.is_well_formed());
        let p = sim.particles().particle(0).unwrap();
        assert_relative_eq!(p.pos().x(), -9.0, epsilon = TEST_EPSILON);
        assert_relative_eq!(p.vel().x(), 1.0);
    }
}

#[test]
fn strategies_agree_on_a_dilute_gas() {
    let ip = InputParams {
        num_particles: 3,
        ball_radius: 0.2,
        seed: 11,
        ..InputParams::default()
    };
    let run = |strategy: Strategy| {
        let ip = InputParams {
            strategy,
            ..ip.clone()
        };
        let mut sim = random_simulation(&ip);
        let mut log = Vec::new();
        let mut cb = |_: &Simulation, report: &TickReport| {
            for r in &report.events {
                log.push((r.kind, r.time));
            }
            ControlFlow::Continue(())
        };
        run_simulation(&mut sim, RunLength::Ticks(40), Some(&mut cb)).unwrap();
        log
    };
    let rescan = run(Strategy::FullRescan);
    let queued = run(Strategy::EventQueue);
    assert_eq!(rescan.len(), queued.len());
    for ((k0, t0), (k1, t1)) in rescan.iter().zip(queued.iter()) {
        assert_eq!(k0, k1);
        assert_relative_eq!(t0, t1, epsilon = TEST_EPSILON);
    }
}

#[test]
fn simultaneous_wall_contacts_share_a_tick() {
    // four balls, one per axis direction, all reach the wall together
    let mut sim = simulation(
        vec![
            ball(0, [3.0, 0.0], [1.0, 0.0], 0.5),
            ball(1, [0.0, 3.0], [0.0, 1.0], 0.5),
            ball(2, [-3.0, 0.0], [-1.0, 0.0], 0.5),
            ball(3, [0.0, -3.0], [0.0, -1.0], 0.5),
        ],
        10.0,
        Strategy::FullRescan,
    );
    let report = sim.tick().unwrap();
    assert_relative_eq!(report.dt, 6.5, epsilon = TEST_EPSILON);
    let kinds: Vec<EventKind> = report.events.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        (0..4).map(|i| EventKind::BallWall { i }).collect::<Vec<_>>()
    );
    for p in sim.particles().iter() {
        assert!(p.speed() > 0.0);
        // all heading back in
        assert!(p.pos().x() * p.vel().x() + p.pos().y() * p.vel().y() < 0.0);
    }
}

#[test]
fn initial_state_dataset_is_validated() {
    let records = vec![
        ParticleRecord {
            id: 0,
            position: [0.0, 0.0],
            velocity: [1.0, 0.0],
            mass: 1.0,
            radius: 1.0,
        },
        ParticleRecord {
            id: 1,
            position: [1.0, 0.0],
            velocity: [0.0, 0.0],
            mass: 1.0,
            radius: 1.0,
        },
    ];
    let path = std::env::temp_dir().join(format!("snooker_overlap_{}.json", std::process::id()));
    save_initial_state(&records, &path).unwrap();
    let ip = InputParams {
        initial_state: Some(path.to_string_lossy().into_owned()),
        ..InputParams::default()
    };
    let mut rng = Prng::seed_from_u64(0);
    let res = simulation_from_params(&ip, &mut rng);
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(res, Err(SimError::InvalidInitialState(_))));

    let bad_mass = ParticleRecord {
        mass: 0.0,
        ..records[0].clone()
    };
    let c = Container::new(10.0).unwrap();
    assert!(matches!(
        particles_from_records(&[bad_mass], &c),
        Err(SimError::InvalidInitialState(_))
    ));
}

#[test]
fn empty_container_cannot_advance() {
    let ip = InputParams {
        num_particles: 0,
        ..InputParams::default()
    };
    let mut sim = random_simulation(&ip);
    assert!(matches!(
        run_simulation(&mut sim, RunLength::Ticks(10), None),
        Err(SimError::NoEvent { .. })
    ));
}

#[test]
fn generated_state_round_trips_into_the_same_run() {
    let ip = InputParams::default();
    let mut rng = Prng::seed_from_u64(ip.seed);
    let records = generate(&ip, &mut rng).unwrap();
    let container = Container::new(ip.container_radius).unwrap();

    let mut direct = random_simulation(&ip);
    let mut loaded = Simulation::new(
        particles_from_records(&records, &container).unwrap(),
        container,
        ip.strategy,
    )
    .unwrap();
    run_simulation(&mut direct, RunLength::Ticks(50), None).unwrap();
    run_simulation(&mut loaded, RunLength::Ticks(50), None).unwrap();
    assert_eq!(direct.snapshot(), loaded.snapshot());
}

#[quickcheck]
fn arbitrary_runs_conserve_energy_and_stay_well_formed(ip: InputParams) -> bool {
    let mut rng = Prng::seed_from_u64(ip.seed);
    let Ok(mut sim) = simulation_from_params(&ip, &mut rng) else {
        return false;
    };
    let ke0 = sim.observables().kinetic_energy();
    let mut ok = true;
    let mut cb = |s: &Simulation, _: &TickReport| {
        ok &= s.is_well_formed();
        ControlFlow::Continue(())
    };
    if run_simulation(&mut sim, ip.run_length, Some(&mut cb)).is_err() {
        return false;
    }
    let ke1 = sim.observables().kinetic_energy();
    ok && (ke1 - ke0).abs() <= 1e-9 * ke0.max(1.0)
}
