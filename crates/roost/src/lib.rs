//! # Roost
//!
//! Fixed-capacity storage primitives and an adaptive 2D spatial index for
//! tick-based simulations.
//!
//! Roost is built around three pieces:
//!
//! - [`RingBuffer`]: a fixed-capacity circular queue with O(1) push,
//!   evict-oldest, and swap-based removal. Backs quadtree leaf storage.
//! - [`ScratchArray`]: a capacity-bounded append buffer with a used-count,
//!   reused across ticks so neighbor queries never touch the allocator.
//! - [`QuadTree`]: a recursive spatial partition over entity positions with
//!   incremental re-classification as entities move, circular range queries,
//!   and merge-on-shrink.
//!
//! Entity positions live outside the tree: every operation that needs them
//! takes a [`PositionMap`] so the index never duplicates the source of truth.
//!
//! ## Quick Start
//!
//! ```
//! use glam::Vec2;
//! use roost::{Aabb, EntityId, QuadTree, ScratchArray};
//!
//! let positions = vec![Vec2::new(10.0, 10.0), Vec2::new(-40.0, 25.0)];
//! let mut tree = QuadTree::new(Aabb::centered(200.0, 200.0), 4);
//!
//! tree.insert(EntityId::new(0), &positions);
//! tree.insert(EntityId::new(1), &positions);
//!
//! let mut near = ScratchArray::new(16);
//! tree.retrieve(&positions, Vec2::new(0.0, 0.0), 30.0, &mut near).unwrap();
//! assert_eq!(near.as_slice(), &[EntityId::new(0)]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod ring;
pub mod scratch;
pub mod tree;

// Re-exports for convenience
pub use ring::RingBuffer;
pub use scratch::ScratchArray;
pub use tree::{QuadTree, TreeStats, MAX_DEPTH};

use glam::Vec2;
use std::fmt;

/// Errors produced by the fixed-capacity primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A loud push hit the capacity limit of a [`ScratchArray`].
    ///
    /// The shared scratch buffers are sized once at startup; running into
    /// this means the world holds more live entities than the buffers were
    /// configured for.
    #[error("scratch buffer full (capacity {capacity})")]
    CapacityExceeded {
        /// Capacity of the buffer that rejected the push.
        capacity: usize,
    },
}

/// Unique identifier for an entity tracked by the spatial index.
///
/// The index never owns entity state; an `EntityId` is an opaque handle into
/// whatever component store the caller keeps positions in. Ids are dense
/// `u32` values so they double as array indices.
#[derive(
    Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an `EntityId` from a raw `u32` value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the id as a `usize`, for indexing component arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u32 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Read access to entity positions, the external source of truth for the
/// spatial index.
pub trait PositionMap {
    /// Returns the current position of `id`.
    fn position(&self, id: EntityId) -> Vec2;
}

impl PositionMap for [Vec2] {
    fn position(&self, id: EntityId) -> Vec2 {
        self[id.index()]
    }
}

impl PositionMap for Vec<Vec2> {
    fn position(&self, id: EntityId) -> Vec2 {
        self[id.index()]
    }
}

impl<P: PositionMap + ?Sized> PositionMap for &P {
    fn position(&self, id: EntityId) -> Vec2 {
        (**self).position(id)
    }
}

/// Axis-aligned bounding box over 2D space.
///
/// Containment is half-open: the minimum edge is inclusive, the maximum edge
/// exclusive. This matches the quadrant assignment rule (`p >= center` goes
/// to the high child), so a point exactly on a split line belongs to exactly
/// one child and range queries near boundaries have no gaps or duplicates.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Aabb {
    /// Minimum corner (inclusive).
    pub min: Vec2,
    /// Maximum corner (exclusive).
    pub max: Vec2,
}

impl Aabb {
    /// Creates bounds from min/max corners.
    #[must_use]
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates bounds of the given dimensions centered at the origin.
    #[must_use]
    pub fn centered(width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(-width / 2.0, -height / 2.0),
            max: Vec2::new(width / 2.0, height / 2.0),
        }
    }

    /// Returns the center of the bounds.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Returns the size of the bounds.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Checks whether a point is inside the bounds (min inclusive, max
    /// exclusive).
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x < self.max.x
            && point.y >= self.min.y
            && point.y < self.max.y
    }

    /// Returns the quadrant index `(x, y)` for a point, comparing against
    /// the center. `1` means the high half.
    #[must_use]
    pub fn quadrant_index(&self, point: Vec2) -> (usize, usize) {
        let center = self.center();
        (
            usize::from(point.x >= center.x),
            usize::from(point.y >= center.y),
        )
    }

    /// Returns the bounds of the child quadrant at `(x, y)`.
    #[must_use]
    pub fn quadrant(&self, x: usize, y: usize) -> Self {
        let center = self.center();
        let min = Vec2::new(
            if x == 0 { self.min.x } else { center.x },
            if y == 0 { self.min.y } else { center.y },
        );
        let max = Vec2::new(
            if x == 0 { center.x } else { self.max.x },
            if y == 0 { center.y } else { self.max.y },
        );
        Self { min, max }
    }

    /// Wraps a point into the bounds with modular arithmetic.
    ///
    /// The result always satisfies [`Aabb::contains`], which makes wrapping
    /// the cheap way to uphold the index's "positions stay inside the root"
    /// invariant.
    #[must_use]
    pub fn wrap(&self, point: Vec2) -> Vec2 {
        let size = self.size();
        Vec2::new(
            self.min.x + (point.x - self.min.x).rem_euclid(size.x),
            self.min.y + (point.y - self.min.y).rem_euclid(size.y),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let bounds = Aabb::centered(10.0, 10.0);
        assert!(bounds.contains(Vec2::ZERO));
        assert!(bounds.contains(Vec2::new(-5.0, -5.0)));
        assert!(!bounds.contains(Vec2::new(5.0, 0.0)));
        assert!(!bounds.contains(Vec2::new(0.0, 5.0)));
    }

    #[test]
    fn quadrant_assignment_matches_containment() {
        let bounds = Aabb::centered(10.0, 10.0);

        // A point exactly on the split line goes to the high child, which
        // also contains it (inclusive min edge).
        let on_line = Vec2::new(0.0, -1.0);
        let (x, y) = bounds.quadrant_index(on_line);
        assert_eq!((x, y), (1, 0));
        assert!(bounds.quadrant(x, y).contains(on_line));
        assert!(!bounds.quadrant(0, 0).contains(on_line));
    }

    #[test]
    fn quadrant_bounds() {
        let bounds = Aabb::centered(10.0, 10.0);
        let child = bounds.quadrant(0, 0);
        assert_eq!(child.min, Vec2::new(-5.0, -5.0));
        assert_eq!(child.max, Vec2::ZERO);

        let child = bounds.quadrant(1, 1);
        assert_eq!(child.min, Vec2::ZERO);
        assert_eq!(child.max, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn wrap_lands_inside() {
        let bounds = Aabb::centered(10.0, 10.0);
        assert_eq!(bounds.wrap(Vec2::new(6.0, 0.0)), Vec2::new(-4.0, 0.0));
        assert_eq!(bounds.wrap(Vec2::new(-6.0, -7.0)), Vec2::new(4.0, 3.0));
        // Wrapping the exclusive max edge lands on the inclusive min edge.
        assert!(bounds.contains(bounds.wrap(Vec2::new(5.0, 5.0))));
    }

    #[test]
    fn bounds_round_trip_through_json() {
        let bounds = Aabb::from_min_max(Vec2::new(-1200.0, -1200.0), Vec2::new(1200.0, 1200.0));
        let json = serde_json::to_string(&bounds).unwrap();
        let back: Aabb = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bounds);
    }

    #[test]
    fn entity_id_round_trips() {
        let id = EntityId::new(7);
        assert_eq!(id.as_u32(), 7);
        assert_eq!(id.index(), 7);
        assert_eq!(u32::from(id), 7);
        assert_eq!(EntityId::from(7u32), id);
    }
}
