use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use roost::EntityId;

use crate::params::SimConfig;
use crate::simulation::Simulation;
use crate::store::Behavior;

/// Spawns `count` flocking boids scattered uniformly over the world.
pub fn spawn_scattered(sim: &mut Simulation, count: usize, team: u8, seed: u64) -> Vec<EntityId> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let bounds = sim.config().bounds;
    (0..count)
        .map(|_| {
            let position = Vec2::new(
                rng.gen_range(bounds.min.x..bounds.max.x),
                rng.gen_range(bounds.min.y..bounds.max.y),
            );
            sim.spawn_boid(position, team, Behavior::FLOCKING)
        })
        .collect()
}

/// A default world with a given scratch-buffer capacity.
pub fn sim_with_capacity(max_boids: usize) -> Simulation {
    Simulation::new(SimConfig {
        max_boids,
        ..SimConfig::default()
    })
}
