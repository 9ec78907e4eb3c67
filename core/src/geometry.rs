//! Viewport-relative geometry and the enemy path.
//!
//! The path is authored once in percentage space and resolved against the
//! viewport whenever it is sampled, so a resize changes every future lookup
//! without touching the definition.

use serde::{Deserialize, Serialize};

use crate::Side;

/// Location in viewport pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal offset measured from the left edge in pixels.
    pub x: f32,
    /// Vertical offset measured from the top edge in pixels.
    pub y: f32,
}

impl Point {
    /// Creates a new point from pixel coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Moves toward `target` by at most `step` pixels.
    ///
    /// Returns the target itself once it lies within reach so callers never
    /// overshoot corners.
    #[must_use]
    pub fn step_towards(self, target: Self, step: f32) -> Self {
        let distance = self.distance(target);
        if distance <= step || distance <= f32::EPSILON {
            return target;
        }
        let ratio = step / distance;
        Self {
            x: self.x + (target.x - self.x) * ratio,
            y: self.y + (target.y - self.y) * ratio,
        }
    }
}

/// Position expressed as fractions of the viewport width and height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    /// Fraction of the viewport width, nominally in `[0, 1]`.
    pub nx: f32,
    /// Fraction of the viewport height, nominally in `[0, 1]`.
    pub ny: f32,
}

/// Waypoint authored in `0..=100` percentage space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PercentPoint {
    /// Percentage of the viewport width.
    pub x: f32,
    /// Percentage of the viewport height.
    pub y: f32,
}

impl PercentPoint {
    /// Creates a new percentage-space waypoint.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Dimensions of the drawable play area.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width of the play area in pixels.
    pub width: f32,
    /// Height of the play area in pixels.
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl Viewport {
    /// Creates a viewport with the provided pixel dimensions.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Resolves a percentage-space waypoint against this viewport.
    #[must_use]
    pub fn resolve(self, point: PercentPoint) -> Point {
        Point::new(
            point.x * self.width / 100.0,
            point.y * self.height / 100.0,
        )
    }

    /// Converts a pixel position into viewport fractions.
    #[must_use]
    pub fn normalize(self, point: Point) -> NormalizedPoint {
        NormalizedPoint {
            nx: ratio(point.x, self.width),
            ny: ratio(point.y, self.height),
        }
    }

    /// Converts viewport fractions back into pixel space.
    #[must_use]
    pub fn denormalize(self, point: NormalizedPoint) -> Point {
        Point::new(point.nx * self.width, point.ny * self.height)
    }

    /// Maps a position captured in `from` onto this viewport proportionally.
    #[must_use]
    pub fn rescale(self, point: Point, from: Self) -> Point {
        self.denormalize(from.normalize(point))
    }

    /// Reports which half of the map the point falls into.
    #[must_use]
    pub fn side_of(self, point: Point) -> Side {
        if point.x < self.width / 2.0 {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Horizontal coordinate of the vertical centre line.
    #[must_use]
    pub fn centre_line(self) -> f32 {
        self.width / 2.0
    }
}

fn ratio(value: f32, extent: f32) -> f32 {
    if extent <= f32::EPSILON {
        0.0
    } else {
        value / extent
    }
}

/// Waypoints shared by every stage, in percentage space.
pub const STANDARD_WAYPOINTS: [PercentPoint; 8] = [
    PercentPoint::new(0.0, 15.0),
    PercentPoint::new(20.0, 15.0),
    PercentPoint::new(20.0, 75.0),
    PercentPoint::new(50.0, 75.0),
    PercentPoint::new(50.0, 25.0),
    PercentPoint::new(80.0, 25.0),
    PercentPoint::new(80.0, 85.0),
    PercentPoint::new(92.0, 85.0),
];

/// Ordered polyline enemies follow from spawn to exit.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    waypoints: Vec<PercentPoint>,
}

impl Default for Path {
    fn default() -> Self {
        Self::standard()
    }
}

impl Path {
    /// Creates a path from percentage-space waypoints.
    #[must_use]
    pub fn new(waypoints: Vec<PercentPoint>) -> Self {
        Self { waypoints }
    }

    /// Path used by every stage of the campaign.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(STANDARD_WAYPOINTS.to_vec())
    }

    /// Number of waypoints on the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Reports whether the path has no waypoints at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Index of the exit waypoint; reaching it counts as a leak.
    #[must_use]
    pub fn final_index(&self) -> usize {
        self.waypoints.len().saturating_sub(1)
    }

    /// Resolves the waypoint at `index` against the viewport.
    #[must_use]
    pub fn waypoint(&self, index: usize, viewport: Viewport) -> Option<Point> {
        self.waypoints
            .get(index)
            .map(|point| viewport.resolve(*point))
    }

    /// Iterates the path segments in pixel space.
    pub fn segments(&self, viewport: Viewport) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.waypoints
            .windows(2)
            .map(move |pair| (viewport.resolve(pair[0]), viewport.resolve(pair[1])))
    }

    /// Shortest distance from `point` to any segment of the path.
    ///
    /// Returns infinity for paths with fewer than two waypoints.
    #[must_use]
    pub fn clearance(&self, point: Point, viewport: Viewport) -> f32 {
        self.segments(viewport)
            .map(|(start, end)| distance_to_segment(point, start, end))
            .fold(f32::INFINITY, f32::min)
    }
}

/// Distance from `point` to the closest point on the segment `start..end`.
#[must_use]
pub fn distance_to_segment(point: Point, start: Point, end: Point) -> f32 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_squared = dx * dx + dy * dy;
    if length_squared <= f32::EPSILON {
        return point.distance(start);
    }
    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_squared).clamp(0.0, 1.0);
    point.distance(Point::new(start.x + t * dx, start.y + t * dy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waypoints_resolve_against_current_viewport() {
        let path = Path::standard();
        let small = Viewport::new(100.0, 100.0);
        let large = Viewport::new(1000.0, 500.0);

        assert_eq!(path.waypoint(1, small), Some(Point::new(20.0, 15.0)));
        assert_eq!(path.waypoint(1, large), Some(Point::new(200.0, 75.0)));
        assert_eq!(path.waypoint(8, large), None);
        assert_eq!(path.final_index(), 7);
    }

    #[test]
    fn segment_distance_uses_closest_point() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(10.0, 0.0);

        assert_close(distance_to_segment(Point::new(5.0, 3.0), start, end), 3.0);
        assert_close(distance_to_segment(Point::new(-4.0, 3.0), start, end), 5.0);
        assert_close(distance_to_segment(Point::new(13.0, 4.0), start, end), 5.0);
        assert_close(
            distance_to_segment(Point::new(1.0, 1.0), start, start),
            2f32.sqrt(),
        );
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn step_towards_snaps_inside_reach() {
        let origin = Point::new(0.0, 0.0);
        let target = Point::new(3.0, 4.0);

        assert_eq!(origin.step_towards(target, 5.0), target);
        let partial = origin.step_towards(target, 2.5);
        assert!((partial.x - 1.5).abs() < 1e-6);
        assert!((partial.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn normalisation_survives_viewport_changes() {
        let from = Viewport::new(800.0, 600.0);
        let to = Viewport::new(400.0, 300.0);
        let point = Point::new(200.0, 450.0);

        let normalized = from.normalize(point);
        assert_eq!(normalized, NormalizedPoint { nx: 0.25, ny: 0.75 });
        assert_eq!(to.rescale(point, from), Point::new(100.0, 225.0));
    }

    #[test]
    fn centre_line_splits_sides() {
        let viewport = Viewport::new(800.0, 600.0);
        assert_eq!(viewport.side_of(Point::new(399.0, 10.0)), Side::Left);
        assert_eq!(viewport.side_of(Point::new(400.0, 10.0)), Side::Right);
    }
}
