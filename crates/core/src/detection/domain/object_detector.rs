use serde::{Deserialize, Serialize};

use crate::shared::frame::Frame;

/// One unvalidated detector output: label, score and `[x1, y1, x2, y2]` box.
///
/// Carries no identity across calls; the box may be malformed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub label: String,
    pub confidence: f64,
    pub bbox: [f64; 4],
}

impl RawDetection {
    pub fn new(label: &str, confidence: f64, bbox: [f64; 4]) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            bbox,
        }
    }
}

/// Domain interface for object detection.
///
/// Implementations may hold per-stream state (e.g. a replay cursor),
/// hence `&mut self`.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>>;
}
