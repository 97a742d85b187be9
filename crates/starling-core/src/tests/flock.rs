//! Steering behavior observed through whole ticks.

use glam::Vec2;

use crate::params::SimConfig;
use crate::simulation::{Simulation, SimulationError};
use crate::store::Behavior;
use crate::tests::helpers::sim_with_capacity;

fn distance(sim: &Simulation, a: roost::EntityId, b: roost::EntityId) -> f32 {
    sim.store()
        .position_of(a)
        .distance(sim.store().position_of(b))
}

#[test]
fn cohesion_draws_boids_together() {
    let mut sim = Simulation::new(SimConfig::default());
    let a = sim.spawn_boid(Vec2::ZERO, 0, Behavior::COHESION);
    let b = sim.spawn_boid(Vec2::new(40.0, 0.0), 0, Behavior::COHESION);

    let before = distance(&sim, a, b);
    for _ in 0..5 {
        sim.step().unwrap();
    }
    assert!(distance(&sim, a, b) < before);
}

#[test]
fn separation_pushes_boids_apart() {
    let mut sim = Simulation::new(SimConfig::default());
    let a = sim.spawn_boid(Vec2::ZERO, 0, Behavior::SEPARATION);
    let b = sim.spawn_boid(Vec2::new(10.0, 0.0), 0, Behavior::SEPARATION);

    let before = distance(&sim, a, b);
    for _ in 0..5 {
        sim.step().unwrap();
    }
    assert!(distance(&sim, a, b) > before);
}

#[test]
fn alignment_converges_headings() {
    let mut sim = Simulation::new(SimConfig::default());
    let a = sim.spawn_boid(Vec2::ZERO, 0, Behavior::ALIGNMENT);
    let b = sim.spawn_boid(Vec2::new(20.0, 0.0), 0, Behavior::ALIGNMENT);
    sim.store_mut().set_velocity(b, Vec2::new(0.0, 2.0));

    for _ in 0..10 {
        sim.step().unwrap();
    }
    // The stationary boid picks up its neighbor's heading.
    assert!(sim.store().velocity_of(a).y > 0.0);
}

#[test]
fn seek_moves_toward_the_target() {
    let mut sim = Simulation::new(SimConfig::default());
    let a = sim.spawn_boid(Vec2::ZERO, 0, Behavior::SEEK);
    sim.store_mut()
        .set_seek_target(a, Some(Vec2::new(300.0, 0.0)));

    for _ in 0..10 {
        sim.step().unwrap();
    }
    assert!(sim.store().position_of(a).x > 0.0);
}

#[test]
fn teams_have_separate_indexes() {
    let mut sim = Simulation::new(SimConfig::default());
    let a = sim.spawn_boid(Vec2::ZERO, 0, Behavior::FLOCKING);
    let _b = sim.spawn_boid(Vec2::new(5.0, 0.0), 1, Behavior::FLOCKING);

    let own = sim.retrieve(0, Vec2::ZERO, 50.0).unwrap();
    assert_eq!(own, &[a]);
}

#[test]
fn rival_separation_repels_across_teams() {
    let mut sim = Simulation::new(SimConfig::default());
    let a = sim.spawn_boid(Vec2::ZERO, 0, Behavior::SEPARATION);
    let b = sim.spawn_boid(Vec2::new(40.0, 0.0), 1, Behavior::SEPARATION);

    // 40 apart: outside the same-team radius (25) but inside the rival
    // radius (50), so only the cross-team term acts.
    let before = distance(&sim, a, b);
    for _ in 0..5 {
        sim.step().unwrap();
    }
    assert!(distance(&sim, a, b) > before);
}

#[test]
fn positions_wrap_at_the_world_edge() {
    let mut sim = Simulation::new(SimConfig::default());
    let a = sim.spawn_boid(Vec2::new(1199.0, 0.0), 0, Behavior::empty());
    sim.store_mut().set_velocity(a, Vec2::new(3.0, 0.0));

    sim.step().unwrap();
    let position = sim.store().position_of(a);
    assert!(sim.config().bounds.contains(position));
    assert!(position.x < 0.0);
}

#[test]
fn overflowing_the_scratch_buffers_is_a_checked_error() {
    let mut sim = sim_with_capacity(4);
    for i in 0..5 {
        sim.spawn_boid(Vec2::new(i as f32, 0.0), 0, Behavior::FLOCKING);
    }
    assert!(matches!(sim.step(), Err(SimulationError::Capacity(_))));
}

#[test]
#[should_panic(expected = "out of range")]
fn querying_an_unknown_team_panics() {
    let mut sim = Simulation::new(SimConfig::default());
    let _ = sim.retrieve(9, Vec2::ZERO, 10.0);
}

#[test]
fn debug_recording_captures_per_behavior_forces() {
    let mut sim = Simulation::new(SimConfig {
        record_debug: true,
        ..SimConfig::default()
    });
    let a = sim.spawn_boid(Vec2::ZERO, 0, Behavior::FLOCKING);
    let _b = sim.spawn_boid(Vec2::new(10.0, 0.0), 0, Behavior::FLOCKING);

    sim.step().unwrap();
    let record = sim.store().debug_record(a).unwrap();
    assert!(record.separation.length() > 0.0);
    assert!(record.cohesion.length() > 0.0);
}
