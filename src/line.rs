//! Tripwire line crossing.
//!
//! An object crosses a line when the segment from its previous center to its
//! current center intersects the line. The previous center comes from a
//! per-identity position history, so the first sighting of an identity has a
//! degenerate movement segment and can never register a crossing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::geometry::{LineSegment, Point};
use crate::{Error, Result, TrackId, TrackedObject};

/// Line configuration: the frame the lines live in and the lines themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    pub lines: Vec<LineSegment>,
}

/// Detects objects whose movement crosses any configured line.
#[derive(Debug, Clone)]
pub struct LineIntrusionDetector {
    lines: Vec<LineSegment>,
    frame_width: u32,
    frame_height: u32,
    history: HashMap<TrackId, Point>,
}

impl LineIntrusionDetector {
    /// Create a detector for lines inside a `frame_width x frame_height` frame.
    ///
    /// # Errors
    /// `InvalidConfig` for a zero-size frame, `LineOutOfBounds` if any
    /// endpoint lies outside `[0, width) x [0, height)`.
    pub fn new(lines: Vec<LineSegment>, frame_width: u32, frame_height: u32) -> Result<Self> {
        if frame_width == 0 || frame_height == 0 {
            return Err(Error::InvalidConfig(format!(
                "frame size must be non-zero, got {}x{}",
                frame_width, frame_height
            )));
        }

        for line in &lines {
            for p in line.endpoints() {
                let inside = (0..frame_width as i64).contains(&p.x) && (0..frame_height as i64).contains(&p.y);
                if !inside {
                    return Err(Error::LineOutOfBounds {
                        x: p.x,
                        y: p.y,
                        width: frame_width,
                        height: frame_height,
                    });
                }
            }
        }

        Ok(Self {
            lines,
            frame_width,
            frame_height,
            history: HashMap::new(),
        })
    }

    /// Create a detector from a [`LineConfig`].
    pub fn from_config(config: &LineConfig) -> Result<Self> {
        Self::new(config.lines.clone(), config.frame_width, config.frame_height)
    }

    /// Configured lines, indexed as in [`crossings`](Self::crossings).
    pub fn lines(&self) -> &[LineSegment] {
        &self.lines
    }

    /// Frame size as `(width, height)`.
    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    /// Indices of the lines crossed by this object since its last sighting.
    ///
    /// Records the object's current center as its new last position whether
    /// or not anything was crossed.
    pub fn crossings(&mut self, object: &TrackedObject) -> Vec<usize> {
        let current = object.center();
        let previous = match self.history.insert(object.track_id, current) {
            Some(previous) => previous,
            None => {
                debug!(track_id = object.track_id, "first sighting, no movement segment");
                current
            }
        };

        let crossed: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.is_crossed_by(&previous, &current))
            .map(|(i, _)| i)
            .collect();

        if !crossed.is_empty() {
            info!(
                track_id = object.track_id,
                class = %object.class_label,
                lines = ?crossed,
                "line crossing"
            );
        }

        crossed
    }

    /// Pair every tracked object with whether it crossed any line this frame.
    ///
    /// Each frame is judged on its own; an object that oscillates across a
    /// line fires on every frame in which it crosses.
    pub fn evaluate(&mut self, tracked_objects: &[TrackedObject]) -> Vec<(TrackedObject, bool)> {
        tracked_objects
            .iter()
            .map(|obj| {
                let intrusion = !self.crossings(obj).is_empty();
                (obj.clone(), intrusion)
            })
            .collect()
    }

    /// Last recorded center of an identity.
    pub fn last_position(&self, track_id: TrackId) -> Option<Point> {
        self.history.get(&track_id).copied()
    }

    /// Drop an identity's position history.
    pub fn forget(&mut self, track_id: TrackId) -> Option<Point> {
        self.history.remove(&track_id)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Drop every identity's position history.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
