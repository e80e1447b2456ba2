//! Engine configuration loaded from JSON.
//!
//! ```json
//! {
//!   "labels": ["person", "bicycle", "car"],
//!   "objects_of_interest": ["person", "car"],
//!   "reconciler": { "match_threshold": 50.0, "confidence_threshold": 0.3 },
//!   "lines": {
//!     "frame_width": 640,
//!     "frame_height": 480,
//!     "lines": [[[50, 350], [450, 450]], [[150, 100], [150, 400]]]
//!   },
//!   "zone": [[0, 0], [100, 0], [50, 100]]
//! }
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    ClassLabels, Error, IdentityReconciler, IntrusionPipeline, LineConfig, LineIntrusionDetector,
    Point, ReconcilerConfig, Result, ZoneIntrusionDetector,
};

/// Everything needed to build an [`IntrusionPipeline`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Detector label table, in class-id order.
    pub labels: Vec<String>,

    /// Class names to emit; overrides `reconciler.classes` when non-empty.
    pub objects_of_interest: Vec<String>,

    pub reconciler: ReconcilerConfig,

    /// Tripwire lines, if line intrusion is enabled.
    pub lines: Option<LineConfig>,

    /// Pre-drawn zone polygon, if zone intrusion is enabled with a fixed zone.
    pub zone: Option<Vec<[i64; 2]>>,
}

impl EngineConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a configuration from a JSON reader.
    ///
    /// # Errors
    /// `IoError` if reading fails, `ConfigParse` if the JSON is malformed.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|err| {
            if err.is_io() {
                Error::IoError(err.into())
            } else {
                Error::ConfigParse(err)
            }
        })
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Label table built from `labels`.
    pub fn class_labels(&self) -> ClassLabels {
        ClassLabels::from_names(self.labels.iter().cloned())
    }

    /// Reconciler config with `objects_of_interest` resolved to class ids.
    ///
    /// # Errors
    /// `InvalidConfig` if names were given and none of them is a known label.
    pub fn resolved_reconciler_config(&self) -> Result<ReconcilerConfig> {
        let mut config = self.reconciler.clone();
        if !self.objects_of_interest.is_empty() {
            let ids = self.class_labels().class_ids_for_names(&self.objects_of_interest);
            if ids.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "none of the objects of interest {:?} is a known label",
                    self.objects_of_interest
                )));
            }
            config.classes = Some(ids);
        }
        Ok(config)
    }

    /// Build a pipeline with every configured detector.
    ///
    /// The zone detector is always present: pre-closed when `zone` is set,
    /// otherwise empty and ready for interactive drawing.
    pub fn build_pipeline(&self) -> Result<IntrusionPipeline> {
        let reconciler = IdentityReconciler::new(self.resolved_reconciler_config()?, self.class_labels())?;

        let zone = match &self.zone {
            Some(vertices) => ZoneIntrusionDetector::with_polygon(
                vertices.iter().map(|&[x, y]| Point::new(x, y)).collect(),
            )?,
            None => ZoneIntrusionDetector::new(),
        };

        let mut pipeline = IntrusionPipeline::new(reconciler).with_zone(zone);
        if let Some(lines) = &self.lines {
            pipeline = pipeline.with_lines(LineIntrusionDetector::from_config(lines)?);
        }

        info!(
            labels = self.labels.len(),
            lines = self.lines.as_ref().map_or(0, |l| l.lines.len()),
            fixed_zone = self.zone.is_some(),
            "pipeline configured"
        );

        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{UnidentifiedPolicy, ZoneState};

    const FULL: &str = r#"{
        "labels": ["person", "bicycle", "car"],
        "objects_of_interest": ["person", "car"],
        "reconciler": {"match_threshold": 40.0, "unidentified": "mint", "confidence_threshold": 0.3},
        "lines": {
            "frame_width": 640,
            "frame_height": 480,
            "lines": [[[50, 350], [450, 450]], [[150, 100], [150, 400]]]
        },
        "zone": [[0, 0], [100, 0], [50, 100]]
    }"#;

    #[test]
    fn test_parse_full_config() {
        let config = EngineConfig::from_json(FULL).unwrap();
        assert_eq!(config.labels.len(), 3);
        assert_eq!(config.reconciler.match_threshold, 40.0);
        assert_eq!(config.reconciler.unidentified, UnidentifiedPolicy::Mint);
        assert_eq!(config.reconciler.confidence_threshold, Some(0.3));
        assert_eq!(config.reconciler.max_staleness, None, "missing fields take defaults");
        assert_eq!(config.lines.as_ref().unwrap().lines.len(), 2);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.reconciler.match_threshold, 50.0);
    }

    #[test]
    fn test_from_reader() {
        let config = EngineConfig::from_reader(FULL.as_bytes()).unwrap();
        assert_eq!(config.objects_of_interest, vec!["person", "car"]);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "camera share went away"))
        }
    }

    #[test]
    fn test_from_reader_io_failure() {
        match EngineConfig::from_reader(FailingReader) {
            Err(Error::IoError(err)) => assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("expected IoError, got {:?}", other),
        }
    }

    #[test]
    fn test_from_file() {
        let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/engine_config.json");
        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.labels.len(), 3);
        assert_eq!(config.reconciler.max_staleness, Some(30));
        assert!(config.build_pipeline().is_ok());

        assert!(matches!(
            EngineConfig::from_file("testdata/does_not_exist.json"),
            Err(Error::IoError(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(EngineConfig::from_json("{not json"), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_objects_of_interest_resolve_to_ids() {
        let config = EngineConfig::from_json(FULL).unwrap();
        let resolved = config.resolved_reconciler_config().unwrap();
        assert_eq!(resolved.classes.unwrap().into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_unknown_objects_of_interest_rejected() {
        let mut config = EngineConfig::from_json(FULL).unwrap();
        config.objects_of_interest = vec!["zebra".to_string()];
        assert!(config.resolved_reconciler_config().is_err());
    }

    #[test]
    fn test_build_pipeline() {
        let pipeline = EngineConfig::from_json(FULL).unwrap().build_pipeline().unwrap();
        assert_eq!(pipeline.zone.as_ref().unwrap().state(), ZoneState::Closed);
        assert_eq!(pipeline.lines.as_ref().unwrap().lines().len(), 2);

        let interactive = EngineConfig::default().build_pipeline().unwrap();
        assert_eq!(interactive.zone.as_ref().unwrap().state(), ZoneState::Empty);
        assert!(interactive.lines.is_none());
    }

    #[test]
    fn test_build_pipeline_rejects_bad_lines() {
        let mut config = EngineConfig::from_json(FULL).unwrap();
        config.lines.as_mut().unwrap().frame_width = 100;
        assert!(matches!(config.build_pipeline(), Err(Error::LineOutOfBounds { .. })));
    }
}
