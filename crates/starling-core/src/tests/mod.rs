//! Crate-level integration tests driving whole-world ticks.

mod helpers;

mod flock;
mod scenario;
