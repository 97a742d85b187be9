//! Long-running soak: the full two-team world at production scale.

use glam::Vec2;
use proptest::prelude::*;

use crate::params::SimConfig;
use crate::simulation::Simulation;
use crate::tests::helpers::spawn_scattered;

// Covers the whole world from the origin (the far corner is ~1697 away).
const WORLD_RADIUS: f32 = 1800.0;

#[test]
fn five_hundred_boids_survive_a_thousand_ticks() {
    let mut sim = Simulation::new(SimConfig::default());
    spawn_scattered(&mut sim, 250, 0, 0xA);
    spawn_scattered(&mut sim, 250, 1, 0xB);

    for _ in 0..1000 {
        sim.step().unwrap();
    }

    // Nobody was lost, duplicated, or pushed out of bounds.
    let bounds = sim.config().bounds;
    for id in sim.store().iter_live() {
        assert!(bounds.contains(sim.store().position_of(id)));
    }

    let mut indexed = 0;
    for team in 0..2 {
        let stats = sim.tree_stats(team);
        indexed += stats.entries;
        assert!(
            stats.max_leaf_entries <= sim.config().leaf_capacity,
            "leaf over capacity: {stats:?}"
        );

        let found = sim.retrieve(team, Vec2::ZERO, WORLD_RADIUS).unwrap();
        assert_eq!(found.len(), 250);
    }
    assert_eq!(indexed, 500);
    assert_eq!(sim.tick(), 1000);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn random_populations_stay_fully_indexed(
        seed in any::<u64>(),
        per_team in 1_usize..80,
    ) {
        let mut sim = Simulation::new(SimConfig::default());
        spawn_scattered(&mut sim, per_team, 0, seed);
        spawn_scattered(&mut sim, per_team, 1, seed.wrapping_add(1));

        for _ in 0..50 {
            sim.step().unwrap();
        }

        for team in 0..2 {
            prop_assert_eq!(sim.tree_stats(team).entries, per_team);
            let found = sim.retrieve(team, Vec2::ZERO, WORLD_RADIUS).unwrap();
            prop_assert_eq!(found.len(), per_team);
        }
        let bounds = sim.config().bounds;
        for id in sim.store().iter_live() {
            prop_assert!(bounds.contains(sim.store().position_of(id)));
        }
    }
}
