use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::detection_filter::ConfidenceThresholds;
use crate::detection::domain::object_class::LabelMap;
use crate::shared::constants::{LOSS_FRAMES, MATCH_IOU_THRESHOLD, TRACKER_GRACE_FRAMES};
use crate::tracking::domain::identity_tracker::TrackerConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{name} must be between 0.0 and 1.0, got {value}")]
    OutOfRange { name: String, value: f64 },
}

/// Tunables of the tracking and alert core.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```json
/// { "thresholds": { "per_label": { "person": 0.6 } }, "grace_frames": 15 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub thresholds: ConfidenceThresholds,
    pub labels: LabelMap,
    pub match_iou_threshold: f64,
    pub grace_frames: usize,
    pub loss_frames: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            thresholds: ConfidenceThresholds::default(),
            labels: LabelMap::default(),
            match_iou_threshold: MATCH_IOU_THRESHOLD,
            grace_frames: TRACKER_GRACE_FRAMES,
            loss_frames: LOSS_FRAMES,
        }
    }
}

impl WatchConfig {
    /// Reads a JSON config file and validates it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: WatchConfig =
            serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, value) in &self.thresholds.per_label {
            check_unit_range(&format!("threshold for '{label}'"), *value)?;
        }
        check_unit_range("default threshold", self.thresholds.default)?;
        check_unit_range("match IoU threshold", self.match_iou_threshold)?;
        Ok(())
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            match_iou_threshold: self.match_iou_threshold,
            grace_frames: self.grace_frames,
        }
    }
}

fn check_unit_range(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name: name.to_string(),
            value,
        })
    }
}
