//! Stable-identity objects emitted by the reconciler.

use serde::{Deserialize, Serialize};

use crate::geometry::{center_of, Point};
use crate::BoundingBox;

/// Stable identity assigned by the reconciler.
pub type TrackId = u64;

/// Mints track ids for one reconciler.
///
/// Ids start at 1 and the counter is kept strictly above every upstream id
/// the factory has been told about, so a minted id never reuses an identity
/// the upstream tracker already handed out.
#[derive(Debug, Clone)]
pub struct IdFactory {
    next_id: TrackId,
}

impl IdFactory {
    /// Create a new factory whose first minted id is 1.
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Mint a fresh id.
    pub fn mint(&mut self) -> TrackId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Record an upstream id so future minted ids skip past it.
    pub fn observe(&mut self, id: TrackId) {
        if id >= self.next_id {
            self.next_id = id.saturating_add(1);
        }
    }

    /// The id the next call to `mint` would return.
    pub fn peek(&self) -> TrackId {
        self.next_id
    }
}

impl Default for IdFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// An object with a reconciled identity for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    /// Stable identity.
    pub track_id: TrackId,

    /// Detector class index.
    pub class_id: u32,

    /// Human-readable class name.
    pub class_label: String,

    /// Box in pixel coordinates.
    pub bounding_box: BoundingBox,

    /// Detector confidence carried through from the raw detection.
    pub confidence: f64,
}

impl TrackedObject {
    /// Pixel center of the bounding box.
    pub fn center(&self) -> Point {
        center_of(&self.bounding_box)
    }
}
