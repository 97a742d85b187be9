//! The per-tick simulation loop.

use glam::Vec2;
use roost::{EntityId, QuadTree, ScratchArray, TreeStats};
use tracing::{debug, trace, warn};

use crate::action::Action;
use crate::flocking;
use crate::params::SimConfig;
use crate::path::Path;
use crate::scheduler::{EventKey, SchedulerError, TaskId, Tick, TickScheduler};
use crate::store::{Behavior, ComponentStore};

/// Errors surfaced by [`Simulation::step`] and the query API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    /// A shared scratch buffer overflowed; the live population exceeds
    /// `SimConfig::max_boids`.
    #[error(transparent)]
    Capacity(#[from] roost::Error),
}

/// The world: component store, one spatial index per team, the tick
/// scheduler, and the registered paths.
///
/// Everything runs on the calling thread; `step` drives exactly one tick.
///
/// Tick order matches what the force math assumes:
/// 1. advance the tick and perform fired scheduler tasks;
/// 2. accumulate steering forces from each entity's behaviors;
/// 3. integrate velocity and position, wrapping at the world edges;
/// 4. re-home moved entities in the per-team quadtrees and merge
///    underpopulated nodes.
pub struct Simulation {
    store: ComponentStore,
    trees: Vec<QuadTree>,
    scheduler: TickScheduler<Action>,
    paths: Vec<Path>,
    neighbors: ScratchArray<EntityId>,
    rivals: ScratchArray<EntityId>,
    escaped: ScratchArray<EntityId>,
    config: SimConfig,
    tick: Tick,
}

impl Simulation {
    /// Creates an empty world from a configuration.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let trees = (0..config.teams)
            .map(|_| QuadTree::new(config.bounds, config.leaf_capacity))
            .collect();
        Self {
            store: ComponentStore::new(config.record_debug),
            trees,
            scheduler: TickScheduler::new(),
            paths: Vec::new(),
            neighbors: ScratchArray::new(config.max_boids),
            rivals: ScratchArray::new(config.max_boids),
            escaped: ScratchArray::new(config.max_boids),
            config,
            tick: 0,
        }
    }

    /// The current tick. Zero until the first `step`.
    #[must_use]
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Read access to the component store.
    #[must_use]
    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    /// Mutable access to the component store, for toggling behaviors and
    /// targets between ticks. Directly edited positions are re-homed by the
    /// next step's move pass.
    pub fn store_mut(&mut self) -> &mut ComponentStore {
        &mut self.store
    }

    /// Read access to the scheduler, for peeking queued tasks.
    #[must_use]
    pub fn scheduler(&self) -> &TickScheduler<Action> {
        &self.scheduler
    }

    /// Registers a path and returns its id for [`ComponentStore::set_path`].
    pub fn add_path(&mut self, path: Path) -> u32 {
        self.paths.push(path);
        u32::try_from(self.paths.len() - 1).unwrap_or(u32::MAX)
    }

    /// Looks up a registered path.
    #[must_use]
    pub fn path(&self, id: u32) -> Option<&Path> {
        self.paths.get(id as usize)
    }

    /// Spawns a boid at rest with unit mass and the configured speed limit.
    ///
    /// The position is wrapped into the world bounds first, so the spatial
    /// insert cannot fail.
    ///
    /// # Panics
    ///
    /// Panics if `team` is not below the configured team count.
    pub fn spawn_boid(&mut self, position: Vec2, team: u8, behavior: Behavior) -> EntityId {
        assert!(
            (team as usize) < self.trees.len(),
            "team {team} out of range ({} teams)",
            self.trees.len()
        );
        let position = self.config.bounds.wrap(position);
        let id = self.store.spawn(
            position,
            team,
            behavior,
            1.0,
            self.config.flocking.max_velocity,
        );
        self.trees[team as usize].insert(id, &self.store);
        trace!(%id, team, ?position, "spawned boid");
        id
    }

    /// Removes an entity from the world and fires its despawn event.
    ///
    /// Returns `false` (and changes nothing) when `id` is not live.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.store.is_alive(id) {
            return false;
        }
        let team = self.store.team_of(id) as usize;
        self.trees[team].remove(id, &self.store);
        self.store.despawn(id);
        trace!(%id, team, "despawned");
        self.run_event(EventKey::despawned(id));
        true
    }

    /// Queues an action for a future tick. See [`TickScheduler::schedule`].
    pub fn schedule(&mut self, tick: Tick, action: Action, every: Option<u64>) -> TaskId {
        self.scheduler.schedule(tick, action, every)
    }

    /// Registers an action against an event key.
    pub fn schedule_event(&mut self, key: EventKey, action: Action) -> TaskId {
        self.scheduler.schedule_event(key, action)
    }

    /// Cancels a queued action.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownTask`] for ids that are not live.
    pub fn unschedule(&mut self, id: TaskId) -> Result<(), SchedulerError> {
        self.scheduler.unschedule(id)
    }

    /// Fires an event key now, performing every action registered on it.
    pub fn trigger_event(&mut self, key: EventKey) {
        self.run_event(key);
    }

    /// Entities of `team` within `radius` of `center`. The slice borrows
    /// the shared neighbor buffer and is valid until the next query.
    ///
    /// # Errors
    ///
    /// Fails when more entities match than `max_boids` allows.
    ///
    /// # Panics
    ///
    /// Panics if `team` is not below the configured team count.
    pub fn retrieve(
        &mut self,
        team: u8,
        center: Vec2,
        radius: f32,
    ) -> Result<&[EntityId], SimulationError> {
        assert!(
            (team as usize) < self.trees.len(),
            "team {team} out of range ({} teams)",
            self.trees.len()
        );
        self.trees[team as usize].retrieve(&self.store, center, radius, &mut self.neighbors)?;
        Ok(self.neighbors.as_slice())
    }

    /// Structural statistics for a team's spatial index.
    ///
    /// # Panics
    ///
    /// Panics if `team` is not below the configured team count.
    #[must_use]
    pub fn tree_stats(&self, team: u8) -> TreeStats {
        assert!(
            (team as usize) < self.trees.len(),
            "team {team} out of range ({} teams)",
            self.trees.len()
        );
        self.trees[team as usize].stats()
    }

    /// Advances the world by one tick.
    ///
    /// # Errors
    ///
    /// Fails when a scratch buffer overflows, which means the live
    /// population exceeds `SimConfig::max_boids`. The world may be left
    /// mid-tick; the population has to shrink before stepping again.
    pub fn step(&mut self) -> Result<(), SimulationError> {
        self.tick += 1;
        debug!(tick = self.tick, entities = self.store.len(), "step");

        for task in self.scheduler.handle_tick(self.tick) {
            self.perform(task.payload);
        }

        self.accumulate_forces()?;
        self.integrate();
        self.rebuild_indexes()
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::Despawn(id) => {
                self.despawn(id);
            }
            Action::Spawn { position, team } => {
                if (team as usize) < self.trees.len() {
                    self.spawn_boid(position, team, Behavior::FLOCKING);
                } else {
                    warn!(team, "scheduled spawn for unknown team, skipping");
                }
            }
        }
    }

    fn run_event(&mut self, key: EventKey) {
        for task in self.scheduler.trigger_event(key) {
            self.perform(task.payload);
        }
    }

    fn accumulate_forces(&mut self) -> Result<(), SimulationError> {
        let params = self.config.flocking;
        let mut arrivals: Vec<EntityId> = Vec::new();

        for slot in 0..self.store.slot_count() {
            let id = EntityId::new(u32::try_from(slot).unwrap_or(u32::MAX));
            if !self.store.is_alive(id) {
                continue;
            }
            let behavior = self.store.behavior_of(id);
            let team = self.store.team_of(id) as usize;
            let position = self.store.position_of(id);
            let velocity = self.store.velocity_of(id);

            if behavior.contains(Behavior::PATH_FOLLOW) {
                if let Some(path) = self
                    .store
                    .path_of(id)
                    .and_then(|p| self.paths.get(p as usize))
                {
                    let steering = flocking::follow_path(position, velocity, path, &params);
                    if steering.goal_reached {
                        arrivals.push(id);
                    } else {
                        self.store.apply_force(id, steering.force);
                        if let Some(record) = self.store.debug_record_mut(id) {
                            record.path = steering.force;
                            record.path_target = steering.target;
                        }
                    }
                }
            }

            if behavior.contains(Behavior::SEEK) {
                if let Some(target) = self.store.seek_target_of(id) {
                    let force = flocking::seek(position, velocity, target, &params);
                    self.store.apply_force(id, force);
                    if let Some(record) = self.store.debug_record_mut(id) {
                        record.seek = force;
                    }
                }
            }

            if !behavior.intersects(Behavior::FLOCKING) {
                continue;
            }

            // One query at the widest radius serves all three behaviors.
            self.trees[team].retrieve(
                &self.store,
                position,
                params.neighbor_radius(),
                &mut self.neighbors,
            )?;

            if behavior.contains(Behavior::SEPARATION) {
                let mut force = flocking::separation(
                    &self.store,
                    id,
                    self.neighbors.as_slice(),
                    params.separation_radius,
                    &params,
                ) * params.separation_coefficient;

                for (other_team, tree) in self.trees.iter().enumerate() {
                    if other_team == team {
                        continue;
                    }
                    tree.retrieve(
                        &self.store,
                        position,
                        params.rival_separation_radius,
                        &mut self.rivals,
                    )?;
                    force += flocking::separation(
                        &self.store,
                        id,
                        self.rivals.as_slice(),
                        params.rival_separation_radius,
                        &params,
                    ) * params.separation_coefficient
                        * params.rival_separation_multiplier;
                }

                self.store.apply_force(id, force);
                if let Some(record) = self.store.debug_record_mut(id) {
                    record.separation = force;
                }
            }

            if behavior.contains(Behavior::ALIGNMENT) {
                let force = flocking::alignment(&self.store, id, self.neighbors.as_slice(), &params)
                    * params.alignment_coefficient;
                self.store.apply_force(id, force);
                if let Some(record) = self.store.debug_record_mut(id) {
                    record.alignment = force;
                }
            }

            if behavior.contains(Behavior::COHESION) {
                let force = flocking::cohesion(&self.store, id, self.neighbors.as_slice(), &params)
                    * params.cohesion_coefficient;
                self.store.apply_force(id, force);
                if let Some(record) = self.store.debug_record_mut(id) {
                    record.cohesion = force;
                }
            }
        }

        // Arrival strips the flag before the event fires, so a handler that
        // inspects the entity sees it already done with the path and the
        // event can never fire twice.
        for id in arrivals {
            self.store.behavior_mut(id).remove(Behavior::PATH_FOLLOW);
            self.store.set_path(id, None);
            debug!(%id, "path goal reached");
            self.run_event(EventKey::goal_reached(id));
        }

        Ok(())
    }

    fn integrate(&mut self) {
        let bounds = self.config.bounds;
        for slot in 0..self.store.slot_count() {
            let id = EntityId::new(u32::try_from(slot).unwrap_or(u32::MAX));
            if !self.store.is_alive(id) {
                continue;
            }
            self.store.integrate_velocity(id);
            let next = bounds.wrap(self.store.position_of(id) + self.store.velocity_of(id));
            self.store.set_position(id, next);
        }
    }

    fn rebuild_indexes(&mut self) -> Result<(), SimulationError> {
        for tree in &mut self.trees {
            tree.move_entities(&self.store, &mut self.escaped)?;
            tree.cleanup();
        }
        Ok(())
    }
}
