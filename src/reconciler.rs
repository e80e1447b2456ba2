//! Identity reconciliation across frames.
//!
//! The upstream tracker's ids are treated as hints. Every detection is first
//! compared against the last known center of each identity seen so far; a
//! close enough center re-binds the detection to that identity even if the
//! upstream id changed, was reassigned, or went missing.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::geometry::{center_of, distance, Point};
use crate::{ClassLabels, Error, IdFactory, RawDetection, Result, TrackId, TrackedObject};

/// Default centroid match threshold in pixels.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 50.0;

/// What to do with a detection that has neither an upstream id nor a
/// registry match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnidentifiedPolicy {
    /// Discard it for this frame.
    #[default]
    Drop,
    /// Give it a freshly minted identity.
    Mint,
}

/// Configuration for the identity reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Centers strictly closer than this (pixels) re-bind to a known identity.
    pub match_threshold: f64,

    /// Handling of detections without any usable identity.
    pub unidentified: UnidentifiedPolicy,

    /// Detections with `confidence <= threshold` are dropped before matching.
    pub confidence_threshold: Option<f64>,

    /// Class ids to emit. `None` or an empty set emits every class.
    pub classes: Option<BTreeSet<u32>>,

    /// Number of consecutive frames an identity may go unseen and still be
    /// re-bound. `None` keeps identities for the reconciler's lifetime.
    pub max_staleness: Option<u64>,
}

impl ReconcilerConfig {
    /// Create a configuration with the given match threshold and defaults
    /// for everything else.
    pub fn new(match_threshold: f64) -> Self {
        Self {
            match_threshold,
            ..Self::default()
        }
    }

    /// Restrict emitted objects to the given class ids.
    pub fn with_classes<I: IntoIterator<Item = u32>>(mut self, classes: I) -> Self {
        self.classes = Some(classes.into_iter().collect());
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.match_threshold.is_finite() || self.match_threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "match_threshold must be positive and finite, got {}",
                self.match_threshold
            )));
        }
        if let Some(threshold) = self.confidence_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(Error::InvalidConfig(format!(
                    "confidence_threshold must be within [0, 1], got {}",
                    threshold
                )));
            }
        }
        Ok(())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            unidentified: UnidentifiedPolicy::Drop,
            confidence_threshold: None,
            classes: None,
            max_staleness: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RegistryEntry {
    center: Point,
    last_seen: u64,
}

/// Assigns stable identities to per-frame detections.
///
/// Owns the identity registry (track id -> last known center). Frames must be
/// fed in arrival order; matching depends on the previous frame's outcome.
pub struct IdentityReconciler {
    /// Reconciler configuration.
    pub config: ReconcilerConfig,

    labels: ClassLabels,

    // BTreeMap so that equidistant matches resolve to the lowest id
    registry: BTreeMap<TrackId, RegistryEntry>,

    ids: IdFactory,

    // Identities evicted by staleness, waiting for `drain_expired`
    expired: Vec<TrackId>,

    frame_index: u64,
}

impl IdentityReconciler {
    /// Create a new reconciler.
    pub fn new(config: ReconcilerConfig, labels: ClassLabels) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            labels,
            registry: BTreeMap::new(),
            ids: IdFactory::new(),
            expired: Vec::new(),
            frame_index: 0,
        })
    }

    /// Reconcile one frame of detections.
    ///
    /// Detections are processed in input order. Each one is bound to the
    /// nearest known identity within the match threshold, falling back to its
    /// upstream id and then to the unidentified policy. Malformed detections
    /// are skipped. The registry is updated for every identified detection,
    /// whether or not its class is emitted.
    ///
    /// # Returns
    /// Tracked objects for identified detections of interesting classes, in
    /// input order.
    pub fn reconcile(&mut self, detections: Vec<RawDetection>) -> Vec<TrackedObject> {
        self.frame_index += 1;
        self.expire_stale();

        let mut claimed: HashSet<TrackId> = HashSet::with_capacity(detections.len());
        let mut tracked = Vec::with_capacity(detections.len());

        for (index, detection) in detections.into_iter().enumerate() {
            if let Err(err) = detection.validate() {
                warn!(frame = self.frame_index, index, error = %err, "skipping malformed detection");
                continue;
            }

            if let Some(threshold) = self.config.confidence_threshold {
                if detection.confidence <= threshold {
                    continue;
                }
            }

            let center = center_of(&detection.bounding_box);

            let upstream = detection.upstream_id();
            if let Some(id) = upstream {
                self.ids.observe(id);
            }
            // An upstream id already bound this frame is not usable again
            let candidate = upstream.filter(|id| !claimed.contains(id));

            let track_id = match self.nearest_identity(&center, &claimed) {
                Some(matched) => {
                    if upstream.is_some_and(|id| id != matched) {
                        debug!(
                            frame = self.frame_index,
                            upstream = ?upstream,
                            track_id = matched,
                            "re-binding detection to known identity"
                        );
                    }
                    matched
                }
                None => match (candidate, self.config.unidentified) {
                    (Some(id), _) => id,
                    (None, UnidentifiedPolicy::Mint) => {
                        let id = self.ids.mint();
                        debug!(frame = self.frame_index, track_id = id, "minted identity");
                        id
                    }
                    (None, UnidentifiedPolicy::Drop) => {
                        debug!(frame = self.frame_index, index, "dropping detection without identity");
                        continue;
                    }
                },
            };

            claimed.insert(track_id);
            self.registry.insert(
                track_id,
                RegistryEntry {
                    center,
                    last_seen: self.frame_index,
                },
            );

            if !self.accepts_class(detection.class_id) {
                continue;
            }

            tracked.push(TrackedObject {
                track_id,
                class_id: detection.class_id,
                class_label: self.labels.label(detection.class_id).to_string(),
                bounding_box: detection.bounding_box,
                confidence: detection.confidence,
            });
        }

        tracked
    }

    /// Number of identities currently in the registry.
    pub fn registry_len(&self) -> usize {
        self.registry.len()
    }

    /// Last known center of an identity.
    pub fn last_center(&self, track_id: TrackId) -> Option<Point> {
        self.registry.get(&track_id).map(|entry| entry.center)
    }

    /// Number of frames reconciled so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Label table used to fill `TrackedObject::class_label`.
    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    /// Take the identities evicted for staleness since the last call.
    ///
    /// Anything else keyed by track id (line history, say) should drop these
    /// before the identity can be handed out again.
    pub fn drain_expired(&mut self) -> Vec<TrackId> {
        std::mem::take(&mut self.expired)
    }

    /// Forget every identity. Ids minted afterwards still never repeat.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.expired.clear();
        self.frame_index = 0;
    }

    // Nearest unclaimed identity strictly within the match threshold. Strict
    // `<` on both comparisons keeps the lowest id on ties.
    fn nearest_identity(&self, center: &Point, claimed: &HashSet<TrackId>) -> Option<TrackId> {
        let mut best: Option<(TrackId, f64)> = None;

        for (&id, entry) in &self.registry {
            if claimed.contains(&id) {
                continue;
            }
            let dist = distance(center, &entry.center);
            if dist >= self.config.match_threshold {
                continue;
            }
            if best.map_or(true, |(_, best_dist)| dist < best_dist) {
                best = Some((id, dist));
            }
        }

        best.map(|(id, _)| id)
    }

    fn accepts_class(&self, class_id: u32) -> bool {
        match &self.config.classes {
            Some(classes) if !classes.is_empty() => classes.contains(&class_id),
            _ => true,
        }
    }

    fn expire_stale(&mut self) {
        let Some(max_staleness) = self.config.max_staleness else {
            return;
        };
        let frame_index = self.frame_index;
        let expired = &mut self.expired;
        self.registry.retain(|&id, entry| {
            let missed = frame_index.saturating_sub(entry.last_seen + 1);
            let keep = missed <= max_staleness;
            if !keep {
                debug!(frame = frame_index, track_id = id, missed, "expiring stale identity");
                expired.push(id);
            }
            keep
        });
    }
}
