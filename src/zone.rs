//! Polygon zone intrusion.
//!
//! The zone is drawn interactively: each pointer click adds a vertex and a
//! finalize gesture closes the polygon once it has at least three vertices.
//! Containment is only ever reported for a closed zone.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::geometry::{center_of, in_coordinate_range, point_in_polygon, Point, MAX_COORDINATE};
use crate::{BoundingBox, Error, Result, TrackedObject};

/// Minimum number of vertices for a closable zone.
pub const MIN_ZONE_VERTICES: usize = 3;

/// Lifecycle of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneState {
    /// No vertices yet.
    Empty,
    /// At least one vertex, not finalized.
    Drawing,
    /// Finalized polygon with at least three vertices.
    Closed,
}

/// Detects objects whose bounding-box center lies inside a drawn polygon.
#[derive(Debug, Clone, Default)]
pub struct ZoneIntrusionDetector {
    vertices: Vec<Point>,
    closed: bool,
}

impl ZoneIntrusionDetector {
    /// Create a detector with an empty zone.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with an already-closed zone.
    ///
    /// # Errors
    /// `InvalidConfig` if fewer than three vertices are given or any vertex
    /// is out of coordinate range.
    pub fn with_polygon(vertices: Vec<Point>) -> Result<Self> {
        if let Some(p) = vertices.iter().find(|p| !in_coordinate_range(p)) {
            return Err(out_of_range(p));
        }
        if vertices.len() < MIN_ZONE_VERTICES {
            return Err(Error::InvalidConfig(format!(
                "zone polygon needs at least {} vertices, got {}",
                MIN_ZONE_VERTICES,
                vertices.len()
            )));
        }
        Ok(Self {
            vertices,
            closed: true,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ZoneState {
        if self.closed {
            ZoneState::Closed
        } else if self.vertices.is_empty() {
            ZoneState::Empty
        } else {
            ZoneState::Drawing
        }
    }

    /// Vertices in click order.
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Append a vertex to the zone being drawn.
    ///
    /// # Errors
    /// `ZoneClosed` once the zone has been finalized, `InvalidConfig` for a
    /// point out of coordinate range.
    pub fn add_vertex(&mut self, point: Point) -> Result<()> {
        if self.closed {
            warn!(x = point.x, y = point.y, "ignoring vertex for closed zone");
            return Err(Error::ZoneClosed);
        }
        if !in_coordinate_range(&point) {
            warn!(x = point.x, y = point.y, "ignoring out-of-range zone vertex");
            return Err(out_of_range(&point));
        }
        self.vertices.push(point);
        Ok(())
    }

    /// Close the zone if it has at least three vertices.
    ///
    /// With fewer vertices this is a no-op and the zone stays open.
    /// Returns whether the zone is closed afterwards.
    pub fn finalize(&mut self) -> bool {
        if !self.closed && self.vertices.len() >= MIN_ZONE_VERTICES {
            self.closed = true;
            info!(vertices = self.vertices.len(), "zone finalized");
        }
        self.closed
    }

    /// Discard the zone and start over.
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.closed = false;
    }

    /// Whether the center of `bbox` lies in the closed zone.
    ///
    /// Always false while the zone is not closed.
    pub fn contains(&self, bbox: &BoundingBox) -> bool {
        self.closed && point_in_polygon(&center_of(bbox), &self.vertices)
    }

    /// Pair every tracked object with its containment result.
    pub fn evaluate(&self, tracked_objects: &[TrackedObject]) -> Vec<(TrackedObject, bool)> {
        tracked_objects
            .iter()
            .map(|obj| (obj.clone(), self.contains(&obj.bounding_box)))
            .collect()
    }
}

fn out_of_range(p: &Point) -> Error {
    Error::InvalidConfig(format!(
        "zone vertex ({}, {}) outside +/-{}",
        p.x, p.y, MAX_COORDINATE
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox_at(cx: f64, cy: f64) -> BoundingBox {
        BoundingBox::new(cx - 5.0, cy - 5.0, cx + 5.0, cy + 5.0).unwrap()
    }

    fn triangle_zone() -> ZoneIntrusionDetector {
        let mut zone = ZoneIntrusionDetector::new();
        zone.add_vertex(Point::new(0, 0)).unwrap();
        zone.add_vertex(Point::new(100, 0)).unwrap();
        zone.add_vertex(Point::new(50, 100)).unwrap();
        assert!(zone.finalize());
        zone
    }

    // ===== State machine =====

    #[test]
    fn test_zone_lifecycle() {
        let mut zone = ZoneIntrusionDetector::new();
        assert_eq!(zone.state(), ZoneState::Empty);

        zone.add_vertex(Point::new(0, 0)).unwrap();
        assert_eq!(zone.state(), ZoneState::Drawing);

        zone.add_vertex(Point::new(100, 0)).unwrap();
        zone.add_vertex(Point::new(50, 100)).unwrap();
        assert_eq!(zone.state(), ZoneState::Drawing);

        assert!(zone.finalize());
        assert_eq!(zone.state(), ZoneState::Closed);
        assert_eq!(zone.vertices().len(), 3);
    }

    #[test]
    fn test_finalize_with_too_few_vertices_is_noop() {
        let mut zone = ZoneIntrusionDetector::new();
        assert!(!zone.finalize());
        assert_eq!(zone.state(), ZoneState::Empty);

        zone.add_vertex(Point::new(0, 0)).unwrap();
        zone.add_vertex(Point::new(100, 0)).unwrap();
        assert!(!zone.finalize());
        assert_eq!(zone.state(), ZoneState::Drawing);
    }

    #[test]
    fn test_add_vertex_after_close_is_rejected() {
        let mut zone = triangle_zone();
        assert!(matches!(zone.add_vertex(Point::new(0, 100)), Err(Error::ZoneClosed)));
        assert_eq!(zone.vertices().len(), 3);
    }

    #[test]
    fn test_out_of_range_vertex_is_rejected() {
        let mut zone = ZoneIntrusionDetector::new();
        assert!(matches!(
            zone.add_vertex(Point::new(i64::MAX, 0)),
            Err(Error::InvalidConfig(_))
        ));
        assert_eq!(zone.state(), ZoneState::Empty);

        let far = vec![Point::new(0, 0), Point::new(i64::MIN, 0), Point::new(50, 100)];
        assert!(ZoneIntrusionDetector::with_polygon(far).is_err());
    }

    #[test]
    fn test_reset() {
        let mut zone = triangle_zone();
        zone.reset();
        assert_eq!(zone.state(), ZoneState::Empty);
        assert!(!zone.contains(&bbox_at(50.0, 30.0)));
    }

    // ===== Containment =====

    #[test]
    fn test_contains_requires_closed_zone() {
        let mut zone = ZoneIntrusionDetector::new();
        zone.add_vertex(Point::new(0, 0)).unwrap();
        zone.add_vertex(Point::new(100, 0)).unwrap();
        zone.add_vertex(Point::new(50, 100)).unwrap();

        assert!(!zone.contains(&bbox_at(50.0, 30.0)), "open zone never contains");
    }

    #[test]
    fn test_contains_triangle() {
        let zone = triangle_zone();
        assert!(zone.contains(&bbox_at(50.0, 30.0)));
        assert!(!zone.contains(&bbox_at(50.0, 150.0)));
    }

    #[test]
    fn test_with_polygon() {
        let zone = ZoneIntrusionDetector::with_polygon(vec![
            Point::new(0, 0),
            Point::new(100, 0),
            Point::new(100, 100),
            Point::new(0, 100),
        ])
        .unwrap();
        assert_eq!(zone.state(), ZoneState::Closed);
        assert!(zone.contains(&bbox_at(20.0, 80.0)));

        assert!(ZoneIntrusionDetector::with_polygon(vec![Point::new(0, 0), Point::new(1, 1)]).is_err());
    }

    #[test]
    fn test_evaluate_pairs_every_object() {
        let zone = triangle_zone();
        let objects: Vec<TrackedObject> = [(1, 50.0, 30.0), (2, 50.0, 150.0)]
            .into_iter()
            .map(|(id, cx, cy)| TrackedObject {
                track_id: id,
                class_id: 0,
                class_label: "person".to_string(),
                bounding_box: bbox_at(cx, cy),
                confidence: 0.9,
            })
            .collect();

        let results = zone.evaluate(&objects);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.track_id, 1);
        assert!(results[0].1);
        assert_eq!(results[1].0.track_id, 2);
        assert!(!results[1].1);
        assert_eq!(zone.state(), ZoneState::Closed, "evaluate does not mutate the zone");
    }
}
