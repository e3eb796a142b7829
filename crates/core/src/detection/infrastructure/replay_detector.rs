use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::object_detector::{ObjectDetector, RawDetection};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("failed to read detections {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One line of a detections file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame: usize,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

/// Plays back pre-computed detections from a JSON-lines file, keyed by
/// frame index:
///
/// ```text
/// {"frame": 0, "detections": [{"label": "person", "confidence": 0.9, "bbox": [0, 0, 50, 50]}]}
/// ```
///
/// Frames without a line yield no detections. Repeated frame numbers
/// append. Useful for offline runs and for testing the tracking core
/// without a model.
#[derive(Debug)]
pub struct ReplayDetector {
    by_frame: HashMap<usize, Vec<RawDetection>>,
}

impl ReplayDetector {
    pub fn new(frames: impl IntoIterator<Item = FrameDetections>) -> Self {
        let mut by_frame: HashMap<usize, Vec<RawDetection>> = HashMap::new();
        for entry in frames {
            by_frame.entry(entry.frame).or_default().extend(entry.detections);
        }
        Self { by_frame }
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let file = File::open(path).map_err(|source| ReplayError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut frames = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| ReplayError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: FrameDetections =
                serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
                    path: path.to_path_buf(),
                    line: i + 1,
                    source,
                })?;
            frames.push(entry);
        }
        log::info!("Loaded detections for {} frames from {}", frames.len(), path.display());
        Ok(Self::new(frames))
    }

    pub fn frame_count(&self) -> usize {
        self.by_frame.len()
    }
}

impl ObjectDetector for ReplayDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
        Ok(self.by_frame.get(&frame.index()).cloned().unwrap_or_default())
    }
}
