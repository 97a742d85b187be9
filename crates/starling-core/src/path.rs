//! Polyline paths and the segment geometry behind path following.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A directed line segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment start.
    pub start: Vec2,
    /// Segment end.
    pub end: Vec2,
}

impl Segment {
    /// Creates a segment between two points.
    #[must_use]
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    /// Unit direction from start to end, or zero for a degenerate segment.
    #[must_use]
    pub fn direction(&self) -> Vec2 {
        (self.end - self.start).normalize_or_zero()
    }

    /// Segment length.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Orthogonally projects a point onto the segment.
    ///
    /// Returns `None` when the foot of the perpendicular falls outside the
    /// segment (or the segment is degenerate); the caller decides which
    /// endpoint to fall back to.
    #[must_use]
    pub fn project_point(&self, point: Vec2) -> Option<Vec2> {
        let span = self.end - self.start;
        let length_squared = span.length_squared();
        if length_squared <= f32::EPSILON {
            return None;
        }
        let t = (point - self.start).dot(span) / length_squared;
        if (0.0..=1.0).contains(&t) {
            Some(self.start + span * t)
        } else {
            None
        }
    }
}

/// A waypoint on a [`Path`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    /// Waypoint position.
    pub position: Vec2,
}

impl From<Vec2> for PathPoint {
    fn from(position: Vec2) -> Self {
        Self { position }
    }
}

/// A polyline corridor: waypoints joined by segments, with a radius inside
/// which followers feel no corrective force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    points: Vec<PathPoint>,
    radius: f32,
}

impl Path {
    /// Builds a path from waypoint positions.
    #[must_use]
    pub fn new(points: impl IntoIterator<Item = Vec2>, radius: f32) -> Self {
        Self {
            points: points.into_iter().map(PathPoint::from).collect(),
            radius,
        }
    }

    /// The corridor half-width.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// The waypoints in travel order.
    #[must_use]
    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    /// The final waypoint, if the path has any.
    #[must_use]
    pub fn goal(&self) -> Option<Vec2> {
        self.points.last().map(|p| p.position)
    }

    /// Iterates the segments joining consecutive waypoints.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.points
            .windows(2)
            .map(|pair| Segment::new(pair[0].position, pair[1].position))
    }

    /// The same corridor traveled in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            points: self.points.iter().rev().copied().collect(),
            radius: self.radius,
        }
    }

    /// The corridor mirrored through the origin, for the opposing side of a
    /// symmetric world.
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| PathPoint::from(-p.position))
                .collect(),
            radius: self.radius,
        }
    }

    /// Finds the point on the path closest to `point`, together with the
    /// direction of travel there. `None` for paths with fewer than two
    /// waypoints.
    #[must_use]
    pub fn closest_point(&self, point: Vec2) -> Option<(Vec2, Vec2)> {
        let mut best: Option<(Vec2, Vec2, f32)> = None;
        for segment in self.segments() {
            // Off-segment projections clamp to the far endpoint so followers
            // are pulled around corners instead of stalling on them.
            let candidate = segment.project_point(point).unwrap_or(segment.end);
            let distance = candidate.distance_squared(point);
            if best.map_or(true, |(_, _, d)| distance < d) {
                best = Some((candidate, segment.direction(), distance));
            }
        }
        best.map(|(target, direction, _)| (target, direction))
    }
}
