//! # Sentry Zone - Identity Reconciliation and Intrusion Detection
//!
//! Turns a per-frame stream of detector output into stable object identities,
//! then checks each identity against a user-drawn polygon zone and a fixed set
//! of tripwire lines.
//!
//! ## Features
//!
//! - Centroid-distance re-identification on top of noisy upstream track ids
//! - Interactively built polygon zones (add vertex / finalize)
//! - Line crossing via segment intersection against per-identity history
//! - A single-frame pipeline that chains all of the above behind a `Detector` seam
//!
//! ## Example
//!
//! ```rust,ignore
//! use sentry_zone::{
//!     BoundingBox, ClassLabels, IdentityReconciler, LineIntrusionDetector, LineSegment,
//!     Point, RawDetection, ReconcilerConfig,
//! };
//!
//! let labels = ClassLabels::from_names(["person", "car"]);
//! let mut reconciler = IdentityReconciler::new(ReconcilerConfig::default(), labels).unwrap();
//! let line = LineSegment::new(Point::new(0, 100), Point::new(200, 100));
//! let mut lines = LineIntrusionDetector::new(vec![line], 640, 480).unwrap();
//!
//! let det = RawDetection::new(BoundingBox::new(40.0, 40.0, 60.0, 60.0).unwrap(), 0, 0.9, Some(1));
//! let tracked = reconciler.reconcile(vec![det]);
//! let flags = lines.evaluate(&tracked);
//! ```

// Public modules
pub mod geometry;
pub mod detection;
pub mod tracked_object;
pub mod labels;
pub mod reconciler;
pub mod zone;
pub mod line;
pub mod pipeline;
pub mod config;

// Re-exports for convenience
pub use geometry::{LineSegment, Point};
pub use detection::{BoundingBox, RawDetection};
pub use tracked_object::{IdFactory, TrackId, TrackedObject};
pub use labels::ClassLabels;
pub use reconciler::{IdentityReconciler, ReconcilerConfig, UnidentifiedPolicy};
pub use zone::{ZoneIntrusionDetector, ZoneState};
pub use line::{LineConfig, LineIntrusionDetector};
pub use pipeline::{Detector, FrameReport, IntrusionPipeline, ObjectReport};
pub use config::EngineConfig;

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur in the intrusion engine
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Invalid detection: {0}")]
        InvalidDetection(String),

        #[error("Invalid bounding box: expected {expected}, got {got}")]
        InvalidBoundingBox { expected: String, got: String },

        #[error("Line endpoint ({x}, {y}) lies outside the {width}x{height} frame")]
        LineOutOfBounds { x: i64, y: i64, width: u32, height: u32 },

        #[error("Zone is already closed; reset it before adding vertices")]
        ZoneClosed,

        #[error("Config parse error: {0}")]
        ConfigParse(#[from] serde_json::Error),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),
    }

    /// Result type for engine operations
    pub type Result<T> = std::result::Result<T, Error>;
}
