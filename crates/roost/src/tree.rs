//! Adaptive quadtree over entity positions.
//!
//! Each node is either a leaf holding entity ids in a [`RingBuffer`] or a
//! parent with four equal quadrants. Leaves split lazily on overflow and
//! merge back during [`QuadTree::cleanup`] once their combined population
//! fits a single leaf again. Leaves at [`MAX_DEPTH`] grow past `capacity`
//! instead of splitting: coincident positions can never be separated by
//! subdividing, so splitting has to bottom out.
//!
//! Positions are never copied into the tree: every operation reads them
//! through a [`PositionMap`], so the component store stays the single source
//! of truth and the per-tick move pass only has to re-home ids whose
//! position left their node.

use glam::Vec2;
use tracing::trace;

use crate::{Aabb, EntityId, Error, PositionMap, RingBuffer, ScratchArray};

/// Maximum node depth; the root is at depth 0.
///
/// A pile of entities at one position refills whichever quadrant it lands
/// in, so without a floor the split recursion would never terminate. Leaves
/// at this depth accept entries beyond their capacity instead.
pub const MAX_DEPTH: u8 = 16;

enum Node {
    Leaf { entries: RingBuffer<EntityId> },
    Parent { children: Box<[[QuadTree; 2]; 2]> },
}

/// A recursive 2D spatial partition over entity positions.
///
/// The root bounds are fixed for the tree's lifetime. Entities must stay
/// inside them: inserting an out-of-bounds position is an invariant
/// violation (the simulation wraps positions into the world precisely so
/// this never happens) and panics rather than degrading silently.
pub struct QuadTree {
    bounds: Aabb,
    center: Vec2,
    depth: u8,
    capacity: usize,
    node: Node,
}

impl QuadTree {
    /// Creates an empty tree over `bounds` where leaves hold at most
    /// `capacity` entities before splitting. Leaves at [`MAX_DEPTH`] exceed
    /// `capacity` rather than split further.
    #[must_use]
    pub fn new(bounds: Aabb, capacity: usize) -> Self {
        Self::with_depth(bounds, capacity, 0)
    }

    fn with_depth(bounds: Aabb, capacity: usize, depth: u8) -> Self {
        Self {
            bounds,
            center: bounds.center(),
            depth,
            capacity,
            node: Node::Leaf {
                entries: RingBuffer::new(capacity),
            },
        }
    }

    /// Returns the bounds this tree covers.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Returns the per-leaf capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the total number of entities stored in this subtree.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.node {
            Node::Leaf { entries } => entries.len(),
            Node::Parent { children } => children
                .iter()
                .flat_map(|row| row.iter())
                .map(QuadTree::len)
                .sum(),
        }
    }

    /// Returns true if this subtree holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resets the tree to a single empty leaf.
    pub fn clear(&mut self) {
        self.node = Node::Leaf {
            entries: RingBuffer::new(self.capacity),
        };
    }

    fn quadrant_of(&self, position: Vec2) -> (usize, usize) {
        (
            usize::from(position.x >= self.center.x),
            usize::from(position.y >= self.center.y),
        )
    }

    /// Inserts an entity, reading its position from `positions`.
    ///
    /// # Panics
    ///
    /// Panics if the position is outside this tree's bounds. World bounds
    /// wrapping upstream must guarantee this cannot happen; hitting it
    /// means a configuration bug, not a recoverable runtime condition.
    pub fn insert<P: PositionMap + ?Sized>(&mut self, id: EntityId, positions: &P) {
        let position = positions.position(id);
        assert!(
            self.bounds.contains(position),
            "entity {id} at {position} outside quadtree bounds {:?}",
            self.bounds
        );
        self.insert_at(id, position, positions);
    }

    fn insert_at<P: PositionMap + ?Sized>(&mut self, id: EntityId, position: Vec2, positions: &P) {
        match &mut self.node {
            Node::Leaf { entries } => {
                if !entries.is_full() {
                    entries.try_push(id);
                } else if self.depth >= MAX_DEPTH {
                    // Splitting cannot thin out a coincident pile; grow the
                    // leaf instead.
                    let mut grown = RingBuffer::new((entries.capacity() * 2).max(1));
                    for &entry in entries.iter() {
                        grown.try_push(entry);
                    }
                    grown.try_push(id);
                    *entries = grown;
                } else {
                    self.split(positions);
                    self.insert_at(id, position, positions);
                }
            }
            Node::Parent { children } => {
                let (x, y) = (
                    usize::from(position.x >= self.center.x),
                    usize::from(position.y >= self.center.y),
                );
                children[x][y].insert_at(id, position, positions);
            }
        }
    }

    /// Materializes four equal quadrants and redistributes the current
    /// entries among them.
    fn split<P: PositionMap + ?Sized>(&mut self, positions: &P) {
        let entries = match &mut self.node {
            Node::Leaf { entries } => std::mem::replace(entries, RingBuffer::new(0)),
            Node::Parent { .. } => return,
        };

        trace!(depth = self.depth, entries = entries.len(), "splitting leaf");

        let bounds = self.bounds;
        let capacity = self.capacity;
        let depth = self.depth + 1;
        self.node = Node::Parent {
            children: Box::new(std::array::from_fn(|x| {
                std::array::from_fn(|y| {
                    QuadTree::with_depth(bounds.quadrant(x, y), capacity, depth)
                })
            })),
        };

        for &id in entries.iter() {
            self.insert_at(id, positions.position(id), positions);
        }
    }

    /// Re-homes every entity whose position left its owning node.
    ///
    /// Called once per tick after positions change. Escapees are collected
    /// into `escaped` (cleared first) and bubble up only as far as the
    /// nearest ancestor that still contains them, which is far cheaper than
    /// a clear-and-rebuild when entities move a small distance per tick.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if `escaped` cannot hold the
    /// entities in flight; size it for the world's entity capacity.
    ///
    /// # Panics
    ///
    /// Panics if an entity's position is outside the root bounds.
    pub fn move_entities<P: PositionMap + ?Sized>(
        &mut self,
        positions: &P,
        escaped: &mut ScratchArray<EntityId>,
    ) -> Result<(), Error> {
        escaped.clear();
        self.bubble_escaped(positions, escaped)?;
        assert!(
            escaped.is_empty(),
            "{} entities escaped the quadtree root bounds {:?}",
            escaped.len(),
            self.bounds
        );
        Ok(())
    }

    fn bubble_escaped<P: PositionMap + ?Sized>(
        &mut self,
        positions: &P,
        escaped: &mut ScratchArray<EntityId>,
    ) -> Result<(), Error> {
        let start = escaped.mark();
        let end;

        match &mut self.node {
            Node::Leaf { entries } => {
                let mut i = 0;
                while let Some(&id) = entries.get(i) {
                    if self.bounds.contains(positions.position(id)) {
                        i += 1;
                    } else {
                        escaped.push(id)?;
                        entries.remove(i);
                        // The swap-based removal pulled an unvetted entry
                        // into slot i, so do not advance.
                    }
                }
                return Ok(());
            }
            Node::Parent { children } => {
                for row in children.iter_mut() {
                    for child in row.iter_mut() {
                        child.bubble_escaped(positions, escaped)?;
                    }
                }
                end = escaped.len();
            }
        }

        // Everything in [start, end) escaped from this subtree. Entities the
        // parent still contains crossed a child boundary and re-enter here;
        // the rest keep bubbling up through the shared buffer.
        escaped.truncate(start);
        for slot in start..end {
            let id = escaped.raw(slot);
            let position = positions.position(id);
            if self.bounds.contains(position) {
                self.insert_at(id, position, positions);
            } else {
                escaped.push(id)?;
            }
        }

        Ok(())
    }

    /// Collapses parents whose children settled back under capacity,
    /// bottom-up across the whole subtree.
    pub fn cleanup(&mut self) {
        if let Node::Parent { children } = &mut self.node {
            for row in children.iter_mut() {
                for child in row.iter_mut() {
                    child.cleanup();
                }
            }
        } else {
            return;
        }
        self.merge();
    }

    /// Converts this node back to a leaf when all four children are leaves
    /// whose combined population fits a single leaf.
    fn merge(&mut self) {
        let total = match &self.node {
            Node::Leaf { .. } => return,
            Node::Parent { children } => {
                let mut total = 0;
                for row in children.iter() {
                    for child in row.iter() {
                        match &child.node {
                            Node::Leaf { entries } => total += entries.len(),
                            Node::Parent { .. } => return,
                        }
                    }
                }
                total
            }
        };

        if total > self.capacity {
            return;
        }

        let old = std::mem::replace(
            &mut self.node,
            Node::Leaf {
                entries: RingBuffer::new(self.capacity),
            },
        );
        if let (Node::Parent { children }, Node::Leaf { entries }) = (old, &mut self.node) {
            for row in children.iter() {
                for child in row.iter() {
                    if let Node::Leaf {
                        entries: child_entries,
                    } = &child.node
                    {
                        for &id in child_entries.iter() {
                            // The precondition capped the combined count at
                            // this leaf's capacity.
                            entries.try_push(id);
                        }
                    }
                }
            }
            trace!(depth = self.depth, entries = total, "merged children into leaf");
        }
    }

    /// Collects every entity within `radius` of `center` into `out`
    /// (cleared first).
    ///
    /// The result is exact: an id is included iff the squared distance from
    /// its position to `center` is at most `radius²`, independent of tree
    /// shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if `out` cannot hold the result
    /// set.
    pub fn retrieve<P: PositionMap + ?Sized>(
        &self,
        positions: &P,
        center: Vec2,
        radius: f32,
        out: &mut ScratchArray<EntityId>,
    ) -> Result<(), Error> {
        out.clear();
        self.retrieve_into(positions, center, radius, radius * radius, out)
    }

    fn retrieve_into<P: PositionMap + ?Sized>(
        &self,
        positions: &P,
        near: Vec2,
        radius: f32,
        radius_squared: f32,
        out: &mut ScratchArray<EntityId>,
    ) -> Result<(), Error> {
        match &self.node {
            Node::Leaf { entries } => {
                if self.inside_circle(near, radius) {
                    // The whole node sits inside the query circle; skip the
                    // per-entity distance tests.
                    for &id in entries.iter() {
                        out.push(id)?;
                    }
                } else {
                    for &id in entries.iter() {
                        if positions.position(id).distance_squared(near) <= radius_squared {
                            out.push(id)?;
                        }
                    }
                }
            }
            Node::Parent { children } => {
                // Conservative circle/node overlap test: a child can only
                // contribute when the query center is within its bounding
                // circle radius plus the query radius. May visit a child
                // with no matches, never skips one with matches.
                let child_size = children[0][0].bounds.size();
                let reach =
                    child_size.x.max(child_size.y) * std::f32::consts::FRAC_1_SQRT_2 + radius;
                let reach_squared = reach * reach;

                for row in children.iter() {
                    for child in row.iter() {
                        if near.distance_squared(child.center) <= reach_squared {
                            child.retrieve_into(positions, near, radius, radius_squared, out)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// True when every point of this node's bounds lies within `radius` of
    /// `near` (farthest corner check via the node's bounding circle).
    fn inside_circle(&self, near: Vec2, radius: f32) -> bool {
        let half_diagonal = (self.bounds.size() * 0.5).length();
        let slack = radius - half_diagonal;
        slack >= 0.0 && self.center.distance_squared(near) <= slack * slack
    }

    /// Removes an entity from the leaf its current position maps to.
    ///
    /// Used when an entity despawns out-of-band; the position must not have
    /// changed since the last [`QuadTree::move_entities`] pass, otherwise
    /// the id may sit in a stale leaf and the removal misses it. Returns
    /// whether the id was found.
    pub fn remove<P: PositionMap + ?Sized>(&mut self, id: EntityId, positions: &P) -> bool {
        let position = positions.position(id);
        if !self.bounds.contains(position) {
            return false;
        }
        self.remove_at(id, position)
    }

    fn remove_at(&mut self, id: EntityId, position: Vec2) -> bool {
        match &mut self.node {
            Node::Leaf { entries } => {
                for i in 0..entries.len() {
                    if entries.get(i) == Some(&id) {
                        entries.remove(i);
                        return true;
                    }
                }
                false
            }
            Node::Parent { children } => {
                let (x, y) = (
                    usize::from(position.x >= self.center.x),
                    usize::from(position.y >= self.center.y),
                );
                children[x][y].remove_at(id, position)
            }
        }
    }

    /// Returns structural statistics for this subtree.
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        self.collect_stats(&mut stats);
        stats
    }

    fn collect_stats(&self, stats: &mut TreeStats) {
        stats.max_depth = stats.max_depth.max(self.depth);
        match &self.node {
            Node::Leaf { entries } => {
                stats.leaves += 1;
                stats.entries += entries.len();
                stats.max_leaf_entries = stats.max_leaf_entries.max(entries.len());
            }
            Node::Parent { children } => {
                stats.parents += 1;
                for row in children.iter() {
                    for child in row.iter() {
                        child.collect_stats(stats);
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for QuadTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadTree")
            .field("bounds", &self.bounds)
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Structural statistics about a [`QuadTree`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of leaf nodes.
    pub leaves: usize,
    /// Number of parent nodes.
    pub parents: usize,
    /// Total entities stored.
    pub entries: usize,
    /// Deepest node depth (root is 0).
    pub max_depth: u8,
    /// Largest single-leaf population.
    pub max_leaf_entries: usize,
}
