//! Flat per-entity component storage.
//!
//! Components live in parallel `Vec`s indexed by the raw entity id, so the
//! hot per-tick loops walk contiguous memory. Despawned slots go on a free
//! list and are reused by later spawns; a slot's contents are garbage while
//! it is on the free list, which is harmless because only live ids ever
//! reach the spatial indexes or the force passes.

use glam::Vec2;
use roost::{EntityId, PositionMap};
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Which steering behaviors drive an entity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Behavior: u32 {
        /// Push away from nearby entities.
        const SEPARATION = 1;
        /// Match the average heading of same-team neighbors.
        const ALIGNMENT = 1 << 1;
        /// Steer toward the same-team neighborhood center.
        const COHESION = 1 << 2;
        /// Steer toward the stored seek target.
        const SEEK = 1 << 3;
        /// Follow the assigned path.
        const PATH_FOLLOW = 1 << 4;
        /// The classic boid triple.
        const FLOCKING = Self::SEPARATION.bits() | Self::ALIGNMENT.bits() | Self::COHESION.bits();
    }
}

/// Per-entity force breakdown captured when debug recording is on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DebugRecord {
    /// Separation force applied this tick (rival avoidance included).
    pub separation: Vec2,
    /// Alignment force applied this tick.
    pub alignment: Vec2,
    /// Cohesion force applied this tick.
    pub cohesion: Vec2,
    /// Seek force applied this tick.
    pub seek: Vec2,
    /// Path-following force applied this tick.
    pub path: Vec2,
    /// The path point currently steered toward, when following.
    pub path_target: Option<Vec2>,
}

/// Columnar entity storage with free-list slot reuse.
#[derive(Debug, Default)]
pub struct ComponentStore {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    accelerations: Vec<Vec2>,
    masses: Vec<f32>,
    max_speeds: Vec<f32>,
    teams: Vec<u8>,
    behaviors: Vec<Behavior>,
    seek_targets: Vec<Option<Vec2>>,
    paths: Vec<Option<u32>>,
    alive: Vec<bool>,
    free: Vec<u32>,
    live: usize,
    debug: Option<Vec<DebugRecord>>,
}

impl ComponentStore {
    /// Creates an empty store. With `record_debug` set, a [`DebugRecord`]
    /// is kept per entity and refreshed every tick.
    #[must_use]
    pub fn new(record_debug: bool) -> Self {
        Self {
            debug: record_debug.then(Vec::new),
            ..Self::default()
        }
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no entities are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated, live or not. Live ids are always
    /// below this.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.positions.len()
    }

    /// Whether `id` refers to a live entity.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.get(id.index()).copied().unwrap_or(false)
    }

    /// Iterates the ids of all live entities, in slot order.
    pub fn iter_live(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(i, _)| EntityId::new(u32::try_from(i).unwrap_or(u32::MAX)))
    }

    /// Allocates an entity, reusing a free slot when one exists.
    pub fn spawn(
        &mut self,
        position: Vec2,
        team: u8,
        behavior: Behavior,
        mass: f32,
        max_speed: f32,
    ) -> EntityId {
        self.live += 1;
        if let Some(slot) = self.free.pop() {
            let i = slot as usize;
            self.positions[i] = position;
            self.velocities[i] = Vec2::ZERO;
            self.accelerations[i] = Vec2::ZERO;
            self.masses[i] = mass;
            self.max_speeds[i] = max_speed;
            self.teams[i] = team;
            self.behaviors[i] = behavior;
            self.seek_targets[i] = None;
            self.paths[i] = None;
            self.alive[i] = true;
            if let Some(debug) = &mut self.debug {
                debug[i] = DebugRecord::default();
            }
            return EntityId::new(slot);
        }

        let id = u32::try_from(self.positions.len()).unwrap_or(u32::MAX);
        self.positions.push(position);
        self.velocities.push(Vec2::ZERO);
        self.accelerations.push(Vec2::ZERO);
        self.masses.push(mass);
        self.max_speeds.push(max_speed);
        self.teams.push(team);
        self.behaviors.push(behavior);
        self.seek_targets.push(None);
        self.paths.push(None);
        self.alive.push(true);
        if let Some(debug) = &mut self.debug {
            debug.push(DebugRecord::default());
        }
        EntityId::new(id)
    }

    /// Frees an entity's slot. Returns `false` when `id` was not live, in
    /// which case nothing changes.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let i = id.index();
        if !self.is_alive(id) {
            return false;
        }
        self.alive[i] = false;
        self.free.push(id.as_u32());
        self.live -= 1;
        true
    }

    /// Position of a live entity.
    #[must_use]
    pub fn position_of(&self, id: EntityId) -> Vec2 {
        self.positions[id.index()]
    }

    /// Overwrites an entity's position.
    pub fn set_position(&mut self, id: EntityId, position: Vec2) {
        self.positions[id.index()] = position;
    }

    /// Velocity of a live entity.
    #[must_use]
    pub fn velocity_of(&self, id: EntityId) -> Vec2 {
        self.velocities[id.index()]
    }

    /// Overwrites an entity's velocity.
    pub fn set_velocity(&mut self, id: EntityId, velocity: Vec2) {
        self.velocities[id.index()] = velocity;
    }

    /// Accumulated acceleration for this tick.
    #[must_use]
    pub fn acceleration_of(&self, id: EntityId) -> Vec2 {
        self.accelerations[id.index()]
    }

    /// Mass of an entity.
    #[must_use]
    pub fn mass_of(&self, id: EntityId) -> f32 {
        self.masses[id.index()]
    }

    /// Per-entity speed limit, applied after integration.
    #[must_use]
    pub fn max_speed_of(&self, id: EntityId) -> f32 {
        self.max_speeds[id.index()]
    }

    /// Team an entity belongs to.
    #[must_use]
    pub fn team_of(&self, id: EntityId) -> u8 {
        self.teams[id.index()]
    }

    /// Behavior flags of an entity.
    #[must_use]
    pub fn behavior_of(&self, id: EntityId) -> Behavior {
        self.behaviors[id.index()]
    }

    /// Mutable behavior flags, for toggling behaviors at runtime.
    pub fn behavior_mut(&mut self, id: EntityId) -> &mut Behavior {
        &mut self.behaviors[id.index()]
    }

    /// The point a `SEEK` entity steers toward.
    #[must_use]
    pub fn seek_target_of(&self, id: EntityId) -> Option<Vec2> {
        self.seek_targets[id.index()]
    }

    /// Sets the seek target. Only read while the `SEEK` flag is set.
    pub fn set_seek_target(&mut self, id: EntityId, target: Option<Vec2>) {
        self.seek_targets[id.index()] = target;
    }

    /// The path assigned to a `PATH_FOLLOW` entity.
    #[must_use]
    pub fn path_of(&self, id: EntityId) -> Option<u32> {
        self.paths[id.index()]
    }

    /// Assigns a path by registry id.
    pub fn set_path(&mut self, id: EntityId, path: Option<u32>) {
        self.paths[id.index()] = path;
    }

    /// Adds a force to the acceleration accumulator, scaled by inverse
    /// mass.
    pub fn apply_force(&mut self, id: EntityId, force: Vec2) {
        let i = id.index();
        self.accelerations[i] += force / self.masses[i];
    }

    /// Folds the accumulated acceleration into velocity, clamps speed, and
    /// clears the accumulator. Does not move the entity.
    pub fn integrate_velocity(&mut self, id: EntityId) {
        let i = id.index();
        let mut velocity = self.velocities[i] + self.accelerations[i];
        let max = self.max_speeds[i];
        if velocity.length_squared() > max * max {
            velocity = velocity.normalize() * max;
        }
        self.velocities[i] = velocity;
        self.accelerations[i] = Vec2::ZERO;
    }

    /// Last tick's force breakdown for an entity. `None` unless the store
    /// was built with debug recording.
    #[must_use]
    pub fn debug_record(&self, id: EntityId) -> Option<&DebugRecord> {
        self.debug.as_ref().map(|table| &table[id.index()])
    }

    /// Mutable debug record, `None` when recording is off.
    pub fn debug_record_mut(&mut self, id: EntityId) -> Option<&mut DebugRecord> {
        self.debug.as_mut().map(|table| &mut table[id.index()])
    }
}

impl PositionMap for ComponentStore {
    fn position(&self, id: EntityId) -> Vec2 {
        self.positions[id.index()]
    }
}
