//! Raw detector output consumed by the reconciler.

use serde::{Deserialize, Serialize};

use crate::geometry::MAX_COORDINATE;
use crate::{Error, Result};

/// Axis-aligned bounding box in pixel coordinates `(x_min, y_min, x_max, y_max)`.
///
/// Fields are public so detector adapters can build boxes cheaply; anything
/// built by struct literal is re-checked with [`BoundingBox::validate`]
/// before the engine uses it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Create a validated bounding box.
    ///
    /// # Errors
    /// `InvalidBoundingBox` if any coordinate is not finite, lies outside
    /// `[-MAX_COORDINATE, MAX_COORDINATE]`, or if the box is inverted or empty
    /// along either axis.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<Self> {
        let bbox = Self { x_min, y_min, x_max, y_max };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Create a bounding box from an `[x_min, y_min, x_max, y_max]` slice.
    pub fn from_slice(coords: &[f64]) -> Result<Self> {
        match coords {
            &[x_min, y_min, x_max, y_max] => Self::new(x_min, y_min, x_max, y_max),
            _ => Err(Error::InvalidBoundingBox {
                expected: "4 coordinates".to_string(),
                got: format!("{} coordinates", coords.len()),
            }),
        }
    }

    /// Create a bounding box from center/size (`x_center, y_center, width, height`).
    pub fn from_xywh(x_center: f64, y_center: f64, width: f64, height: f64) -> Result<Self> {
        Self::new(
            x_center - width / 2.0,
            y_center - height / 2.0,
            x_center + width / 2.0,
            y_center + height / 2.0,
        )
    }

    /// Check the `x_min < x_max`, `y_min < y_max` invariant.
    pub fn validate(&self) -> Result<()> {
        let coords = [self.x_min, self.y_min, self.x_max, self.y_max];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidBoundingBox {
                expected: "finite coordinates".to_string(),
                got: format!("{:?}", coords),
            });
        }
        if coords.iter().any(|c| c.abs() > MAX_COORDINATE as f64) {
            return Err(Error::InvalidBoundingBox {
                expected: format!("coordinates within +/-{}", MAX_COORDINATE),
                got: format!("{:?}", coords),
            });
        }
        if self.x_min >= self.x_max || self.y_min >= self.y_max {
            return Err(Error::InvalidBoundingBox {
                expected: "x_min < x_max and y_min < y_max".to_string(),
                got: format!("{:?}", coords),
            });
        }
        Ok(())
    }

    /// Convert to `(x_center, y_center, width, height)`.
    pub fn to_xywh(&self) -> (f64, f64, f64, f64) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
            self.width(),
            self.height(),
        )
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let iy = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }

    /// Scale coordinates into `[0, 1]` relative to a frame size.
    pub fn normalized(&self, frame_width: u32, frame_height: u32) -> Result<Self> {
        if frame_width == 0 || frame_height == 0 {
            return Err(Error::InvalidConfig(format!(
                "frame size must be non-zero, got {}x{}",
                frame_width, frame_height
            )));
        }
        let (w, h) = (frame_width as f64, frame_height as f64);
        Ok(Self {
            x_min: self.x_min / w,
            y_min: self.y_min / h,
            x_max: self.x_max / w,
            y_max: self.y_max / h,
        })
    }

    /// Scale normalized coordinates back to whole pixels.
    pub fn denormalized(&self, frame_width: u32, frame_height: u32) -> Self {
        let (w, h) = (frame_width as f64, frame_height as f64);
        Self {
            x_min: (self.x_min * w).trunc(),
            y_min: (self.y_min * h).trunc(),
            x_max: (self.x_max * w).trunc(),
            y_max: (self.y_max * h).trunc(),
        }
    }
}

/// One detection from the upstream detector/tracker for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Box in pixel coordinates.
    pub bounding_box: BoundingBox,

    /// Detector class index.
    pub class_id: u32,

    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,

    /// Identity proposed by the upstream tracker. `None` or a negative value
    /// (conventionally -1) means the tracker had no identity for this box.
    #[serde(default)]
    pub upstream_track_id: Option<i64>,
}

impl RawDetection {
    /// Create a new raw detection.
    pub fn new(
        bounding_box: BoundingBox,
        class_id: u32,
        confidence: f64,
        upstream_track_id: Option<i64>,
    ) -> Self {
        Self {
            bounding_box,
            class_id,
            confidence,
            upstream_track_id,
        }
    }

    /// Create a detection from a raw `[x_min, y_min, x_max, y_max]` slice.
    pub fn from_slice(
        coords: &[f64],
        class_id: u32,
        confidence: f64,
        upstream_track_id: Option<i64>,
    ) -> Result<Self> {
        let bounding_box = BoundingBox::from_slice(coords)?;
        Ok(Self::new(bounding_box, class_id, confidence, upstream_track_id))
    }

    /// The upstream identity, if it is usable.
    pub fn upstream_id(&self) -> Option<u64> {
        self.upstream_track_id
            .and_then(|id| u64::try_from(id).ok())
    }

    /// Check the bounding box and confidence.
    pub fn validate(&self) -> Result<()> {
        self.bounding_box.validate()?;
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::InvalidDetection(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}
