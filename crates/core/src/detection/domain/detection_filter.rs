use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::DEFAULT_CONFIDENCE;

use super::object_class::{normalize_label, LabelMap, ObjectClass};
use super::object_detector::RawDetection;

/// A validated detection that passed its label's confidence threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Per-label minimum confidences.
///
/// Lookup order: exact label, then the label's class name, then `default`.
/// The class fallback lets a `person` detection use the `human` threshold.
///
/// Deserialized `per_label` entries are layered over the class defaults,
/// so `{"per_label": {"person": 0.6}}` keeps `human`, `cart` and `item`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    #[serde(
        default = "class_thresholds",
        deserialize_with = "deserialize_over_class_thresholds"
    )]
    pub per_label: HashMap<String, f64>,
    #[serde(default = "default_threshold")]
    pub default: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_CONFIDENCE
}

fn class_thresholds() -> HashMap<String, f64> {
    ObjectClass::ALL
        .iter()
        .map(|c| (c.canonical_name().to_string(), c.default_confidence()))
        .collect()
}

fn deserialize_over_class_thresholds<'de, D>(deserializer: D) -> Result<HashMap<String, f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let listed = HashMap::<String, f64>::deserialize(deserializer)?;
    let mut per_label = class_thresholds();
    per_label.extend(listed.into_iter().map(|(label, t)| (normalize_label(&label), t)));
    Ok(per_label)
}

impl ConfidenceThresholds {
    pub fn new(default: f64) -> Self {
        Self {
            per_label: HashMap::new(),
            default,
        }
    }

    pub fn with(mut self, label: &str, threshold: f64) -> Self {
        self.set(label, threshold);
        self
    }

    pub fn set(&mut self, label: &str, threshold: f64) {
        self.per_label.insert(normalize_label(label), threshold);
    }

    pub fn threshold_for(&self, label: &str, class: Option<ObjectClass>) -> f64 {
        let key = normalize_label(label);
        self.per_label
            .get(&key)
            .or_else(|| class.and_then(|c| self.per_label.get(c.canonical_name())))
            .copied()
            .unwrap_or(self.default)
    }
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            per_label: class_thresholds(),
            default: DEFAULT_CONFIDENCE,
        }
    }
}

/// One frame's accepted detections, split by class.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilteredDetections {
    pub humans: Vec<Detection>,
    pub carts: Vec<Detection>,
    pub items: Vec<Detection>,
    /// Confident detections whose label maps to no class. Drawn, never tracked.
    pub others: Vec<Detection>,
    /// Malformed detections dropped this frame.
    pub rejected: usize,
}

impl FilteredDetections {
    pub fn human_boxes(&self) -> Vec<BoundingBox> {
        self.humans.iter().map(|d| d.bbox).collect()
    }

    pub fn cart_boxes(&self) -> Vec<BoundingBox> {
        self.carts.iter().map(|d| d.bbox).collect()
    }

    pub fn item_boxes(&self) -> Vec<BoundingBox> {
        self.items.iter().map(|d| d.bbox).collect()
    }
}

/// Validates raw detections, applies confidence thresholds and sorts the
/// survivors into humans, carts and items.
#[derive(Clone, Debug, Default)]
pub struct DetectionFilter {
    thresholds: ConfidenceThresholds,
    labels: LabelMap,
}

impl DetectionFilter {
    pub fn new(thresholds: ConfidenceThresholds, labels: LabelMap) -> Self {
        Self { thresholds, labels }
    }

    pub fn filter(&self, raw: &[RawDetection]) -> FilteredDetections {
        let mut out = FilteredDetections::default();

        for det in raw {
            let Some(bbox) = validate(det) else {
                log::debug!(
                    "Dropping malformed detection '{}' ({:.3}) {:?}",
                    det.label,
                    det.confidence,
                    det.bbox
                );
                out.rejected += 1;
                continue;
            };

            let class = self.labels.classify(&det.label);
            if det.confidence < self.thresholds.threshold_for(&det.label, class) {
                continue;
            }

            let accepted = Detection {
                label: det.label.clone(),
                confidence: det.confidence,
                bbox,
            };
            match class {
                Some(ObjectClass::Human) => out.humans.push(accepted),
                Some(ObjectClass::Cart) => out.carts.push(accepted),
                Some(ObjectClass::Item) => out.items.push(accepted),
                None => out.others.push(accepted),
            }
        }

        out
    }
}

fn validate(det: &RawDetection) -> Option<BoundingBox> {
    if !det.confidence.is_finite() || !(0.0..=1.0).contains(&det.confidence) {
        return None;
    }
    let [x1, y1, x2, y2] = det.bbox;
    BoundingBox::new(x1, y1, x2, y2)
}
