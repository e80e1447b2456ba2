//! Pure geometry helpers in integer pixel space.
//!
//! Everything downstream of the detector (reconciler, zone, line) works on
//! truncated integer centers, so all predicates here take `Point` and use
//! exact integer arithmetic.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::BoundingBox;

/// A pixel-space point `(x, y)`.
pub type Point = Point2<i64>;

/// Largest absolute pixel coordinate accepted for boxes and zone vertices.
///
/// Keeps every cross product in the predicates below well inside `i128`.
pub const MAX_COORDINATE: i64 = 1 << 31;

/// Whether both coordinates of `p` are within `[-MAX_COORDINATE, MAX_COORDINATE]`.
pub fn in_coordinate_range(p: &Point) -> bool {
    p.x.unsigned_abs() <= MAX_COORDINATE as u64 && p.y.unsigned_abs() <= MAX_COORDINATE as u64
}

/// Center of a bounding box, truncated to pixel coordinates.
///
/// Each coordinate is truncated to an integer first (saturating), then the
/// midpoint is floored: `((x_min + x_max) / 2, (y_min + y_max) / 2)`.
pub fn center_of(bbox: &BoundingBox) -> Point {
    let mid = |lo: f64, hi: f64| ((lo as i64 as i128 + hi as i64 as i128).div_euclid(2)) as i64;
    Point::new(mid(bbox.x_min, bbox.x_max), mid(bbox.y_min, bbox.y_max))
}

/// Euclidean distance between two pixel points.
pub fn distance(p: &Point, q: &Point) -> f64 {
    let delta = Vector2::new(
        (p.x as i128 - q.x as i128) as f64,
        (p.y as i128 - q.y as i128) as f64,
    );
    delta.norm()
}

/// Strict counter-clockwise turn test for `a -> b -> c`.
///
/// Collinear triples are not counter-clockwise.
pub fn is_counter_clockwise(a: &Point, b: &Point, c: &Point) -> bool {
    let lhs = (c.y as i128 - a.y as i128) * (b.x as i128 - a.x as i128);
    let rhs = (b.y as i128 - a.y as i128) * (c.x as i128 - a.x as i128);
    lhs > rhs
}

/// Whether segment `p1-p2` properly intersects segment `p3-p4`.
///
/// Uses the orientation test: the endpoints of each segment must lie on
/// different sides of the other. Because the turn test is strict, collinear
/// and endpoint-touching configurations resolve to "no intersection", and a
/// degenerate segment (`p1 == p2`) never intersects anything.
pub fn segments_intersect(p1: &Point, p2: &Point, p3: &Point, p4: &Point) -> bool {
    is_counter_clockwise(p1, p3, p4) != is_counter_clockwise(p2, p3, p4)
        && is_counter_clockwise(p1, p2, p3) != is_counter_clockwise(p1, p2, p4)
}

/// Whether `point` lies inside or on the boundary of `polygon`.
///
/// Crossing-number test over the closed ring of vertices. Points exactly on
/// an edge or vertex count as inside. Returns false for fewer than 3 vertices.
pub fn point_in_polygon(point: &Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = polygon.len();
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];

        if on_segment(point, a, b) {
            return true;
        }

        if (a.y > point.y) != (b.y > point.y) {
            // x of the edge at point.y, compared without division
            let lhs = (point.x as i128 - a.x as i128) * (b.y as i128 - a.y as i128);
            let rhs = (point.y as i128 - a.y as i128) * (b.x as i128 - a.x as i128);
            let crosses = if b.y > a.y { lhs < rhs } else { lhs > rhs };
            if crosses {
                inside = !inside;
            }
        }
    }

    inside
}

fn on_segment(p: &Point, a: &Point, b: &Point) -> bool {
    let cross = (b.x as i128 - a.x as i128) * (p.y as i128 - a.y as i128)
        - (b.y as i128 - a.y as i128) * (p.x as i128 - a.x as i128);
    cross == 0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

/// A tripwire segment between two pixel points.
///
/// Serializes as `[[x1, y1], [x2, y2]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[[i64; 2]; 2]", into = "[[i64; 2]; 2]")]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
}

impl LineSegment {
    /// Create a new segment.
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Whether the movement `from -> to` crosses this segment.
    pub fn is_crossed_by(&self, from: &Point, to: &Point) -> bool {
        segments_intersect(from, to, &self.start, &self.end)
    }

    /// Both endpoints.
    pub fn endpoints(&self) -> [Point; 2] {
        [self.start, self.end]
    }
}

impl From<[[i64; 2]; 2]> for LineSegment {
    fn from(raw: [[i64; 2]; 2]) -> Self {
        Self::new(Point::new(raw[0][0], raw[0][1]), Point::new(raw[1][0], raw[1][1]))
    }
}

impl From<LineSegment> for [[i64; 2]; 2] {
    fn from(line: LineSegment) -> Self {
        [[line.start.x, line.start.y], [line.end.x, line.end.y]]
    }
}
