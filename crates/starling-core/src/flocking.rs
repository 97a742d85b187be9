//! Steering-force computation.
//!
//! Every behavior reduces to the same pipeline: derive a desired direction,
//! scale it to maximum speed, subtract the current velocity, and clamp the
//! result to the maximum force. The caller weights the returned force by the
//! behavior's coefficient and feeds it through
//! [`ComponentStore::apply_force`], which divides by mass.
//!
//! Neighbor lists come from the per-team quadtrees and may be gathered with
//! a radius wider than an individual behavior wants, so each behavior
//! re-filters by its own radius using squared distances.

use glam::Vec2;
use roost::EntityId;

use crate::params::FlockingParams;
use crate::path::Path;
use crate::store::ComponentStore;

/// Clamps a vector to a maximum length.
#[must_use]
pub fn limit(v: Vec2, max: f32) -> Vec2 {
    if v.length_squared() > max * max {
        v.normalize() * max
    } else {
        v
    }
}

/// Steering force that turns the current velocity toward a direction.
///
/// A zero direction produces zero force, so behaviors with nothing to say
/// simply contribute nothing.
#[must_use]
pub fn move_towards(velocity: Vec2, direction: Vec2, params: &FlockingParams) -> Vec2 {
    let direction = direction.normalize_or_zero();
    if direction == Vec2::ZERO {
        return Vec2::ZERO;
    }
    limit(direction * params.max_velocity - velocity, params.max_force)
}

/// Steering force toward a fixed point.
#[must_use]
pub fn seek(position: Vec2, velocity: Vec2, target: Vec2, params: &FlockingParams) -> Vec2 {
    move_towards(velocity, target - position, params)
}

/// Force pushing away from neighbors closer than `radius`, each weighted by
/// inverse distance so the nearest dominate.
///
/// Self is excluded by id. A neighbor exactly coincident with the boid has
/// no away direction and is skipped.
#[must_use]
pub fn separation(
    store: &ComponentStore,
    id: EntityId,
    neighbors: &[EntityId],
    radius: f32,
    params: &FlockingParams,
) -> Vec2 {
    let position = store.position_of(id);
    let radius_squared = radius * radius;
    let mut away = Vec2::ZERO;
    let mut count = 0u32;

    for &other in neighbors {
        if other == id {
            continue;
        }
        let offset = position - store.position_of(other);
        let distance_squared = offset.length_squared();
        if distance_squared > 0.0 && distance_squared < radius_squared {
            // offset / d^2 == normalized offset weighted by 1/d.
            away += offset / distance_squared;
            count += 1;
        }
    }

    if count == 0 {
        return Vec2::ZERO;
    }
    move_towards(store.velocity_of(id), away, params)
}

/// Force turning toward the average heading of same-team neighbors within
/// the alignment radius.
#[must_use]
pub fn alignment(
    store: &ComponentStore,
    id: EntityId,
    neighbors: &[EntityId],
    params: &FlockingParams,
) -> Vec2 {
    let position = store.position_of(id);
    let radius_squared = params.alignment_radius * params.alignment_radius;
    let mut heading = Vec2::ZERO;
    let mut count = 0u32;

    for &other in neighbors {
        if other == id {
            continue;
        }
        if position.distance_squared(store.position_of(other)) < radius_squared {
            heading += store.velocity_of(other);
            count += 1;
        }
    }

    if count == 0 {
        return Vec2::ZERO;
    }
    move_towards(store.velocity_of(id), heading, params)
}

/// Force pulling toward the center of mass of same-team neighbors within
/// the cohesion radius.
#[must_use]
pub fn cohesion(
    store: &ComponentStore,
    id: EntityId,
    neighbors: &[EntityId],
    params: &FlockingParams,
) -> Vec2 {
    let position = store.position_of(id);
    let radius_squared = params.cohesion_radius * params.cohesion_radius;
    let mut sum = Vec2::ZERO;
    let mut count = 0u32;

    for &other in neighbors {
        if other == id {
            continue;
        }
        let other_position = store.position_of(other);
        if position.distance_squared(other_position) < radius_squared {
            sum += other_position;
            count += 1;
        }
    }

    if count == 0 {
        return Vec2::ZERO;
    }
    #[allow(clippy::cast_precision_loss)]
    let center = sum / count as f32;
    seek(position, store.velocity_of(id), center, params)
}

/// Outcome of one path-following step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PathSteering {
    /// Steering force to apply.
    pub force: Vec2,
    /// The point steered toward, when off the corridor.
    pub target: Option<Vec2>,
    /// Set when the boid is within the goal radius of the final waypoint.
    pub goal_reached: bool,
}

/// Path following with velocity lookahead.
///
/// The position a lookahead ahead of the boid is projected onto the path;
/// when that prediction strays outside the corridor radius the boid seeks a
/// point slightly ahead of the projection, otherwise it just keeps turning
/// into the direction of travel.
#[must_use]
pub fn follow_path(
    position: Vec2,
    velocity: Vec2,
    path: &Path,
    params: &FlockingParams,
) -> PathSteering {
    let Some(goal) = path.goal() else {
        return PathSteering::default();
    };

    if position.distance_squared(goal) < params.goal_radius * params.goal_radius {
        return PathSteering {
            force: Vec2::ZERO,
            target: None,
            goal_reached: true,
        };
    }

    let predicted = position + velocity.normalize_or_zero() * params.path_lookahead;
    let Some((on_path, direction)) = path.closest_point(predicted) else {
        // Degenerate single-point path: head straight for the goal.
        return PathSteering {
            force: seek(position, velocity, goal, params),
            target: Some(goal),
            goal_reached: false,
        };
    };

    if predicted.distance_squared(on_path) > path.radius() * path.radius() {
        let target = on_path + direction * params.path_lookahead;
        PathSteering {
            force: seek(position, velocity, target, params),
            target: Some(target),
            goal_reached: false,
        }
    } else {
        PathSteering {
            force: move_towards(velocity, direction, params),
            target: None,
            goal_reached: false,
        }
    }
}
