//! Per-frame pipeline: detector output -> identities -> intrusion flags.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    IdentityReconciler, LineIntrusionDetector, RawDetection, Result, TrackedObject,
    ZoneIntrusionDetector,
};

/// The external detection/tracking model.
///
/// Implementations wrap whatever runs inference and convert its output into
/// [`RawDetection`]s once, at this boundary.
pub trait Detector {
    /// A single video frame in the detector's native representation.
    type Frame: ?Sized;

    /// Detect (and optionally track) objects in one frame.
    fn detect_and_track(&mut self, frame: &Self::Frame) -> Result<Vec<RawDetection>>;
}

/// One tracked object and its intrusion flags for a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectReport {
    pub object: TrackedObject,

    /// Inside the closed zone. `None` when no zone is configured.
    pub zone_intrusion: Option<bool>,

    /// Crossed a line this frame. `None` when no lines are configured.
    pub line_intrusion: Option<bool>,
}

impl ObjectReport {
    /// Whether any configured detector flagged this object.
    pub fn is_intrusion(&self) -> bool {
        self.zone_intrusion.unwrap_or(false) || self.line_intrusion.unwrap_or(false)
    }
}

/// Result of processing one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// 1-based index of the frame within this pipeline.
    pub frame_index: u64,
    pub objects: Vec<ObjectReport>,
}

impl FrameReport {
    /// Objects flagged by any detector.
    pub fn intrusions(&self) -> impl Iterator<Item = &ObjectReport> {
        self.objects.iter().filter(|r| r.is_intrusion())
    }
}

/// Owns one reconciler and optional zone/line detectors.
///
/// Each instance has its own state, so independent pipelines (one per
/// camera, say) never interfere. Not meant to be shared across threads
/// without external serialization: frames must arrive in order.
pub struct IntrusionPipeline {
    pub reconciler: IdentityReconciler,
    pub zone: Option<ZoneIntrusionDetector>,
    pub lines: Option<LineIntrusionDetector>,
}

impl IntrusionPipeline {
    /// Create a pipeline with only identity reconciliation.
    pub fn new(reconciler: IdentityReconciler) -> Self {
        Self {
            reconciler,
            zone: None,
            lines: None,
        }
    }

    pub fn with_zone(mut self, zone: ZoneIntrusionDetector) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn with_lines(mut self, lines: LineIntrusionDetector) -> Self {
        self.lines = Some(lines);
        self
    }

    /// Mutable access to the zone for pointer-driven editing.
    pub fn zone_mut(&mut self) -> Option<&mut ZoneIntrusionDetector> {
        self.zone.as_mut()
    }

    /// Reconcile one frame of detections and evaluate every configured detector.
    pub fn process(&mut self, detections: Vec<RawDetection>) -> FrameReport {
        let tracked = self.reconciler.reconcile(detections);

        // An expired id may be reused this very frame; its old position must
        // not become the start of a movement segment.
        let expired = self.reconciler.drain_expired();
        if let Some(lines) = self.lines.as_mut() {
            for track_id in expired {
                lines.forget(track_id);
            }
        }

        let zone_flags: Option<Vec<bool>> = self
            .zone
            .as_ref()
            .map(|zone| zone.evaluate(&tracked).into_iter().map(|(_, f)| f).collect());
        let line_flags: Option<Vec<bool>> = self
            .lines
            .as_mut()
            .map(|lines| lines.evaluate(&tracked).into_iter().map(|(_, f)| f).collect());

        let objects: Vec<ObjectReport> = tracked
            .into_iter()
            .enumerate()
            .map(|(i, object)| ObjectReport {
                object,
                zone_intrusion: zone_flags.as_ref().map(|f| f[i]),
                line_intrusion: line_flags.as_ref().map(|f| f[i]),
            })
            .collect();

        let frame_index = self.reconciler.frame_index();
        debug!(
            frame = frame_index,
            objects = objects.len(),
            intrusions = objects.iter().filter(|r| r.is_intrusion()).count(),
            "frame processed"
        );

        FrameReport {
            frame_index,
            objects,
        }
    }

    /// Forget every identity and all line history. The zone is kept.
    pub fn reset(&mut self) {
        self.reconciler.reset();
        if let Some(lines) = self.lines.as_mut() {
            lines.clear_history();
        }
    }

    /// Run the detector on a frame, then [`process`](Self::process) its output.
    ///
    /// # Errors
    /// Propagates detector failures; the engine state is untouched in that case.
    pub fn process_frame<D: Detector>(&mut self, detector: &mut D, frame: &D::Frame) -> Result<FrameReport> {
        let detections = detector.detect_and_track(frame)?;
        Ok(self.process(detections))
    }
}
