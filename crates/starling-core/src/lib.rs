//! # Starling Core
//!
//! Tick-based multi-agent flocking simulation.
//!
//! A population of boids, split into opposing teams, moves under combined
//! steering forces (separation, alignment, cohesion, seek, path-following)
//! while a tick-indexed scheduler drives delayed and recurring game events.
//! Neighbor queries run against one [`roost::QuadTree`] per team, refreshed
//! incrementally every tick.
//!
//! ## Architecture
//!
//! - [`store::ComponentStore`]: flat per-entity component arrays (position,
//!   velocity, acceleration, mass, team, behavior flags, ...).
//! - [`scheduler::TickScheduler`]: absolute-tick task buckets with O(1)
//!   cancellation and manually triggered event keys.
//! - [`flocking`]: per-behavior force accumulation into the acceleration
//!   component.
//! - [`simulation::Simulation`]: the per-tick orchestrator tying the above
//!   together.
//!
//! ## Usage
//!
//! ```
//! use glam::Vec2;
//! use starling_core::simulation::Simulation;
//! use starling_core::params::SimConfig;
//! use starling_core::store::Behavior;
//!
//! let mut sim = Simulation::new(SimConfig::default());
//! let id = sim.spawn_boid(Vec2::new(-900.0, -900.0), 0, Behavior::FLOCKING);
//!
//! for _ in 0..10 {
//!     sim.step().unwrap();
//! }
//! assert_eq!(sim.tick(), 10);
//! # let _ = id;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export roost for spatial queries
pub use roost;

pub mod action;
pub mod flocking;
pub mod params;
pub mod path;
pub mod scheduler;
pub mod simulation;
pub mod store;

// Re-exports for convenience
pub use action::Action;
pub use params::{FlockingParams, SimConfig};
pub use path::{Path, PathPoint, Segment};
pub use roost::EntityId;
pub use scheduler::{EventKey, EventKind, ScheduledTask, TaskId, Tick, TickScheduler};
pub use simulation::{Simulation, SimulationError};
pub use store::{Behavior, ComponentStore};

#[cfg(test)]
mod tests;
