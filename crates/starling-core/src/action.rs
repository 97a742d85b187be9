//! Deferred world mutations carried as scheduler payloads.

use glam::Vec2;
use roost::EntityId;
use serde::{Deserialize, Serialize};

/// A world mutation the simulation performs when its task fires.
///
/// Actions are data, not closures, so they can be scheduled ticks ahead,
/// attached to event keys, serialized into scenario files, and inspected in
/// tests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Remove an entity from the world.
    Despawn(EntityId),
    /// Add a flocking boid to a team.
    Spawn {
        /// Where the boid appears.
        position: Vec2,
        /// Team the boid joins.
        team: u8,
    },
}
