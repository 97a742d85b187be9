//! Tuning parameters and world configuration.
//!
//! Everything here is plain data with serde support, so a whole scenario can
//! be loaded from JSON and tweaked without recompiling.

use roost::Aabb;
use serde::{Deserialize, Serialize};

/// Steering-force tuning knobs shared by every flocking behavior.
///
/// The defaults are balanced for a 2400x2400 world at one tick per frame:
/// forces are small relative to velocity, so turns are smooth rather than
/// instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockingParams {
    /// Upper bound on the length of any single steering force.
    pub max_force: f32,
    /// Upper bound on speed, applied after integration.
    pub max_velocity: f32,
    /// Neighbors closer than this push the boid away.
    pub separation_radius: f32,
    /// Weight of the separation force against same-team neighbors.
    pub separation_coefficient: f32,
    /// Radius of the avoidance query against opposing teams.
    pub rival_separation_radius: f32,
    /// Extra weight applied on top of `separation_coefficient` when the
    /// neighbor belongs to another team.
    pub rival_separation_multiplier: f32,
    /// Radius within which neighbor headings are averaged.
    pub alignment_radius: f32,
    /// Weight of the alignment force.
    pub alignment_coefficient: f32,
    /// Radius within which neighbor positions are averaged.
    pub cohesion_radius: f32,
    /// Weight of the cohesion force.
    pub cohesion_coefficient: f32,
    /// How far ahead of the boid the path-following predictor looks.
    pub path_lookahead: f32,
    /// Distance to the final path point that counts as arrival.
    pub goal_radius: f32,
}

impl Default for FlockingParams {
    fn default() -> Self {
        Self {
            max_force: 0.05,
            max_velocity: 3.0,
            separation_radius: 25.0,
            separation_coefficient: 1.5,
            rival_separation_radius: 50.0,
            rival_separation_multiplier: 2.0,
            alignment_radius: 50.0,
            alignment_coefficient: 1.0,
            cohesion_radius: 50.0,
            cohesion_coefficient: 1.0,
            path_lookahead: 20.0,
            goal_radius: 30.0,
        }
    }
}

impl FlockingParams {
    /// Radius that covers every same-team behavior in one spatial query.
    #[must_use]
    pub fn neighbor_radius(&self) -> f32 {
        self.separation_radius
            .max(self.alignment_radius)
            .max(self.cohesion_radius)
    }
}

/// World-level configuration fixed at simulation startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// World bounds; positions wrap around the edges.
    pub bounds: Aabb,
    /// Entries a quadtree leaf holds before splitting.
    pub leaf_capacity: usize,
    /// Number of teams, each with its own spatial index.
    pub teams: usize,
    /// Sizing hint for the shared scratch buffers. Queries fail loudly if
    /// the live population outgrows this.
    pub max_boids: usize,
    /// When set, the store keeps a per-entity table of the forces applied
    /// each tick, for inspectors and tests.
    pub record_debug: bool,
    /// Steering tuning.
    pub flocking: FlockingParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            bounds: Aabb::centered(2400.0, 2400.0),
            leaf_capacity: 20,
            teams: 2,
            max_boids: 512,
            record_debug: false,
            flocking: FlockingParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn default_bounds_are_origin_centered() {
        let config = SimConfig::default();
        assert_eq!(config.bounds.min, Vec2::new(-1200.0, -1200.0));
        assert_eq!(config.bounds.max, Vec2::new(1200.0, 1200.0));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{"teams": 4}"#).unwrap();
        assert_eq!(config.teams, 4);
        assert_eq!(config.leaf_capacity, 20);
        assert_eq!(config.flocking.max_force, 0.05);
    }

    #[test]
    fn params_round_trip_through_json() {
        let params = FlockingParams {
            max_velocity: 5.0,
            ..FlockingParams::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: FlockingParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn neighbor_radius_covers_all_behaviors() {
        let params = FlockingParams::default();
        assert_eq!(params.neighbor_radius(), 50.0);
    }
}
