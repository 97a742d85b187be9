//! Tick-indexed task scheduler.
//!
//! Tasks are stored in buckets keyed by the absolute tick they fire on, or
//! by an [`EventKey`] for tasks that are triggered manually instead of by
//! the clock. A side-table maps every live [`TaskId`] to its exact bucket
//! slot, which makes cancellation and repeating-task rescheduling O(1)
//! amortized: the bucket swap-pops and the relocated entry's recorded index
//! is patched, never scanned.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Absolute simulation tick.
pub type Tick = u64;

/// Unique identifier for a scheduled task, monotonically increasing per
/// scheduler.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    /// Returns the raw `u64` value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of manually triggered events the simulation fires.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum EventKind {
    /// An entity was removed from the world.
    Despawned = 0,
    /// A path-following entity reached the end of its path.
    GoalReached = 1,
}

const EVENT_KIND_BITS: u32 = 4;
const EVENT_KIND_MASK: u32 = (1 << EVENT_KIND_BITS) - 1;

/// Key for a manually triggered event, packing an [`EventKind`] and the
/// entity it concerns.
///
/// Event keys form their own namespace: they can never collide with tick
/// numbers because the scheduler keys buckets by an explicit tick/event
/// discriminant rather than by sign.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey(u32);

impl EventKey {
    /// Packs an event kind and entity id into a key.
    #[must_use]
    pub fn new(kind: EventKind, entity: roost::EntityId) -> Self {
        Self((entity.as_u32() << EVENT_KIND_BITS) | kind as u32)
    }

    /// Key for `entity` being despawned.
    #[must_use]
    pub fn despawned(entity: roost::EntityId) -> Self {
        Self::new(EventKind::Despawned, entity)
    }

    /// Key for `entity` reaching its path goal.
    #[must_use]
    pub fn goal_reached(entity: roost::EntityId) -> Self {
        Self::new(EventKind::GoalReached, entity)
    }

    /// Returns the entity this key concerns.
    #[must_use]
    pub fn entity(self) -> roost::EntityId {
        roost::EntityId::new(self.0 >> EVENT_KIND_BITS)
    }

    /// Returns the raw packed value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the raw kind bits.
    #[must_use]
    pub const fn kind_bits(self) -> u32 {
        self.0 & EVENT_KIND_MASK
    }
}

/// Bucket key: either a clock-driven tick or a manually triggered event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum SlotKey {
    Tick(Tick),
    Event(EventKey),
}

/// Where a live task currently sits.
#[derive(Debug, Copy, Clone)]
struct TaskLocation {
    key: SlotKey,
    index: usize,
}

/// A task queued in the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask<T> {
    /// Caller-supplied payload.
    pub payload: T,
    /// Handle for O(1) cancellation.
    pub id: TaskId,
    /// When set, the task re-queues itself `every` ticks after firing.
    pub every: Option<u64>,
}

/// Errors produced by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// The task id was never scheduled, already fired, or was cancelled.
    #[error("unknown task id {0}")]
    UnknownTask(TaskId),
}

/// Maps absolute ticks (and event keys) to lists of tasks.
///
/// # Example
///
/// ```
/// use starling_core::scheduler::TickScheduler;
///
/// let mut scheduler = TickScheduler::new();
/// let id = scheduler.schedule(10, "spawn wave", None);
/// assert_eq!(scheduler.tasks(10).len(), 1);
///
/// scheduler.unschedule(id).unwrap();
/// assert!(scheduler.tasks(10).is_empty());
/// ```
#[derive(Debug)]
pub struct TickScheduler<T> {
    buckets: HashMap<SlotKey, Vec<ScheduledTask<T>>>,
    locations: HashMap<TaskId, TaskLocation>,
    next_id: u64,
}

impl<T> Default for TickScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TickScheduler<T> {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            locations: HashMap::new(),
            next_id: 0,
        }
    }

    /// Returns the number of live (not yet fired or cancelled) tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.locations.len()
    }

    fn push_task(&mut self, key: SlotKey, payload: T, every: Option<u64>) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;

        let bucket = self.buckets.entry(key).or_default();
        bucket.push(ScheduledTask { payload, id, every });
        self.locations.insert(
            id,
            TaskLocation {
                key,
                index: bucket.len() - 1,
            },
        );

        id
    }

    /// Queues a task to fire at the given absolute tick, optionally
    /// repeating `every` ticks thereafter. A zero interval cannot repeat
    /// and is normalized to a one-shot.
    pub fn schedule(&mut self, tick: Tick, payload: T, every: Option<u64>) -> TaskId {
        let every = every.filter(|&interval| interval > 0);
        self.push_task(SlotKey::Tick(tick), payload, every)
    }

    /// Registers a task against an event key, to fire when the event is
    /// manually triggered rather than by tick advancement.
    pub fn schedule_event(&mut self, key: EventKey, payload: T) -> TaskId {
        self.push_task(SlotKey::Event(key), payload, None)
    }

    /// Cancels a task.
    ///
    /// O(1): the bucket swap-pops the slot and the relocated entry's
    /// recorded index is patched.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownTask`] when the id was never
    /// scheduled, already fired, or was already cancelled.
    pub fn unschedule(&mut self, id: TaskId) -> Result<(), SchedulerError> {
        let location = self
            .locations
            .remove(&id)
            .ok_or(SchedulerError::UnknownTask(id))?;

        if let Some(bucket) = self.buckets.get_mut(&location.key) {
            bucket.swap_remove(location.index);
            if let Some(moved) = bucket.get(location.index) {
                if let Some(loc) = self.locations.get_mut(&moved.id) {
                    loc.index = location.index;
                }
            }
            if bucket.is_empty() {
                self.buckets.remove(&location.key);
            }
        }

        Ok(())
    }

    /// Read-only peek at the tasks queued for a tick. Empty when none are.
    #[must_use]
    pub fn tasks(&self, tick: Tick) -> &[ScheduledTask<T>] {
        self.buckets
            .get(&SlotKey::Tick(tick))
            .map_or(&[], Vec::as_slice)
    }

    /// Read-only peek at the tasks registered against an event key.
    #[must_use]
    pub fn event_tasks(&self, key: EventKey) -> &[ScheduledTask<T>] {
        self.buckets
            .get(&SlotKey::Event(key))
            .map_or(&[], Vec::as_slice)
    }
}

impl<T: Clone> TickScheduler<T> {
    /// Fires and returns every task queued for `tick`, deleting the bucket.
    ///
    /// Repeating tasks are re-queued at `tick + every` under the same
    /// [`TaskId`]; one-shot tasks are complete and their ids forgotten.
    /// Call exactly once per tick.
    pub fn handle_tick(&mut self, tick: Tick) -> Vec<ScheduledTask<T>> {
        self.fire(SlotKey::Tick(tick))
    }

    /// Fires and returns every task registered against an event key.
    ///
    /// Identical to tick firing except that it is invoked on demand. A
    /// repeating task registered on an event re-queues on the same key and
    /// so acts as a persistent handler. Triggering a key with no tasks
    /// returns an empty list and has no side effects.
    pub fn trigger_event(&mut self, key: EventKey) -> Vec<ScheduledTask<T>> {
        self.fire(SlotKey::Event(key))
    }

    fn fire(&mut self, key: SlotKey) -> Vec<ScheduledTask<T>> {
        let Some(tasks) = self.buckets.remove(&key) else {
            return Vec::new();
        };

        for task in &tasks {
            if let Some(every) = task.every {
                let next = match key {
                    SlotKey::Tick(tick) => SlotKey::Tick(tick + every),
                    SlotKey::Event(event) => SlotKey::Event(event),
                };
                let bucket = self.buckets.entry(next).or_default();
                bucket.push(task.clone());
                if let Some(location) = self.locations.get_mut(&task.id) {
                    location.key = next;
                    location.index = bucket.len() - 1;
                }
            } else {
                self.locations.remove(&task.id);
            }
        }

        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roost::EntityId;

    #[test]
    fn scheduled_task_fires_exactly_once() {
        let mut scheduler = TickScheduler::new();
        scheduler.schedule(5, "hello", None);

        assert!(scheduler.tasks(4).is_empty());
        assert_eq!(scheduler.tasks(5).len(), 1);

        let fired = scheduler.handle_tick(5);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].payload, "hello");

        assert!(scheduler.tasks(5).is_empty());
        assert!(scheduler.handle_tick(5).is_empty());
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn repeating_task_requeues_under_the_same_id() {
        let mut scheduler = TickScheduler::new();
        let id = scheduler.schedule(10, 42, Some(3));

        let fired = scheduler.handle_tick(10);
        assert_eq!(fired[0].id, id);

        assert_eq!(scheduler.tasks(13).len(), 1);
        assert_eq!(scheduler.tasks(13)[0].id, id);
        assert_eq!(scheduler.task_count(), 1);

        let fired = scheduler.handle_tick(13);
        assert_eq!(fired[0].id, id);
        assert_eq!(scheduler.tasks(16).len(), 1);
    }

    #[test]
    fn zero_interval_is_a_one_shot() {
        let mut scheduler = TickScheduler::new();
        // An interval of zero would requeue into the bucket that just
        // fired, leaving a task that can never fire again.
        scheduler.schedule(5, 'z', Some(0));

        let fired = scheduler.handle_tick(5);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].every, None);
        assert!(scheduler.tasks(5).is_empty());
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn repeating_task_can_be_cancelled_after_requeue() {
        let mut scheduler = TickScheduler::new();
        let id = scheduler.schedule(1, (), Some(2));
        scheduler.handle_tick(1);

        scheduler.unschedule(id).unwrap();
        assert!(scheduler.tasks(3).is_empty());
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn unschedule_removes_from_bucket() {
        let mut scheduler = TickScheduler::new();
        let id = scheduler.schedule(7, 'a', None);
        scheduler.unschedule(id).unwrap();
        assert!(scheduler.tasks(7).is_empty());
    }

    #[test]
    fn unschedule_patches_the_relocated_entry() {
        let mut scheduler = TickScheduler::new();
        let a = scheduler.schedule(3, 'a', None);
        let b = scheduler.schedule(3, 'b', None);
        let c = scheduler.schedule(3, 'c', None);

        // Removing the first slot swaps 'c' into it; its recorded index
        // must follow, so cancelling it afterwards still works.
        scheduler.unschedule(a).unwrap();
        scheduler.unschedule(c).unwrap();

        let remaining = scheduler.tasks(3);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b);
        assert_eq!(remaining[0].payload, 'b');
    }

    #[test]
    fn unschedule_unknown_id_is_a_checked_error() {
        let mut scheduler = TickScheduler::<u8>::new();
        let id = scheduler.schedule(1, 0, None);
        scheduler.handle_tick(1);
        assert_eq!(
            scheduler.unschedule(id),
            Err(SchedulerError::UnknownTask(id))
        );
    }

    #[test]
    fn events_fire_on_demand() {
        let mut scheduler = TickScheduler::new();
        let key = EventKey::goal_reached(EntityId::new(9));
        scheduler.schedule_event(key, "despawn");

        assert_eq!(scheduler.event_tasks(key).len(), 1);

        let fired = scheduler.trigger_event(key);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].payload, "despawn");
        assert!(scheduler.trigger_event(key).is_empty());
    }

    #[test]
    fn triggering_an_empty_event_has_no_side_effects() {
        let mut scheduler = TickScheduler::<u8>::new();
        scheduler.schedule(4, 1, None);

        let fired = scheduler.trigger_event(EventKey::despawned(EntityId::new(1)));
        assert!(fired.is_empty());
        assert_eq!(scheduler.task_count(), 1);
        assert_eq!(scheduler.tasks(4).len(), 1);
    }

    #[test]
    fn event_and_tick_namespaces_never_collide() {
        let mut scheduler = TickScheduler::new();
        // Entity 0, kind 0 packs to a raw key of 0; tick 0 must stay
        // separate.
        let key = EventKey::despawned(EntityId::new(0));
        assert_eq!(key.as_u32(), 0);

        scheduler.schedule(0, "tick", None);
        scheduler.schedule_event(key, "event");

        assert_eq!(scheduler.tasks(0).len(), 1);
        assert_eq!(scheduler.event_tasks(key).len(), 1);
        assert_eq!(scheduler.handle_tick(0).len(), 1);
        assert_eq!(scheduler.trigger_event(key).len(), 1);
    }

    #[test]
    fn event_key_round_trips_entity() {
        let key = EventKey::goal_reached(EntityId::new(123));
        assert_eq!(key.entity(), EntityId::new(123));
        assert_eq!(key.kind_bits(), EventKind::GoalReached as u32);
    }
}
