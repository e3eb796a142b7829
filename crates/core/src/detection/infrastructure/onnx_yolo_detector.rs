/// YOLOv8 object detector on ONNX Runtime via `ort`.
///
/// Letterboxes the frame to the model's square input, runs inference and
/// decodes the `[1, 4 + num_classes, N]` output (box center/size followed
/// by one score per class, no objectness). Per-class NMS then removes
/// duplicates. Labels come from the class-name list, COCO-80 by default.
use std::path::Path;

use crate::detection::domain::object_detector::{ObjectDetector, RawDetection};
use crate::shared::bounding_box::{iou, BoundingBox};
use crate::shared::constants::COCO_CLASS_NAMES;
use crate::shared::frame::Frame;

/// Fallback input resolution when the model's input shape is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Scores below this are dropped before NMS. Per-label thresholds are
/// applied later by the detection filter, so this only needs to be low.
pub const DEFAULT_SCORE_FLOOR: f64 = 0.25;

const NMS_IOU_THRESH: f64 = 0.45;

/// YOLO letterbox padding value.
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxYoloDetector {
    session: ort::session::Session,
    class_names: Vec<String>,
    score_floor: f64,
    input_size: u32,
}

fn execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[allow(unused_mut)]
    let mut providers = Vec::new();
    #[cfg(target_os = "macos")]
    providers.push(ort::execution_providers::CoreMLExecutionProvider::default().build());
    #[cfg(target_os = "windows")]
    providers.push(ort::execution_providers::DirectMLExecutionProvider::default().build());
    providers
}

impl OnnxYoloDetector {
    /// Loads the model and reads its input size (NCHW, square).
    pub fn new(model_path: &Path, score_floor: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_execution_providers(execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::info!(
            "Loaded {} (input {input_size}x{input_size})",
            model_path.display()
        );

        Ok(Self {
            session,
            class_names: COCO_CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
            score_floor,
            input_size,
        })
    }

    /// Replaces the COCO class names, for models trained on other classes.
    pub fn with_class_names(mut self, names: Vec<String>) -> Self {
        self.class_names = names;
        self
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
        let (input, letterbox) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let data: Vec<f32> = tensor.iter().copied().collect();

        let candidates = decode(&data, shape[1], shape[2], self.score_floor, &letterbox);
        Ok(nms_per_class(candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(|c| {
                let label = self
                    .class_names
                    .get(c.class_id)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{}", c.class_id));
                RawDetection {
                    label,
                    confidence: c.score,
                    bbox: c.bbox.as_array(),
                }
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Maps letterboxed model coordinates back to the source frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: f64,
    pad_y: f64,
}

impl Letterbox {
    fn unmap(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Nearest-neighbor resize into a `target × target` NCHW tensor, centered,
/// with gray padding.
fn letterbox(frame: &Frame, target: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let (fw, fh) = (frame.width() as f64, frame.height() as f64);
    let scale = (target as f64 / fw).min(target as f64 / fh);
    let new_w = ((fw * scale).round() as u32).min(target);
    let new_h = ((fh * scale).round() as u32).min(target);
    let pad_x = (target - new_w) / 2;
    let pad_y = (target - new_h) / 2;

    let size = target as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), PAD_VALUE);
    let src = frame.as_ndarray();
    let (src_h, src_w) = (frame.height() as usize, frame.width() as usize);

    for y in 0..new_h as usize {
        let sy = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let sx = ((x as f64 / scale) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, pad_y as usize + y, pad_x as usize + x]] =
                    src[[sy, sx, c]] as f32 / 255.0;
            }
        }
    }

    let mapping = Letterbox {
        scale,
        pad_x: pad_x as f64,
        pad_y: pad_y as f64,
    };
    (tensor, mapping)
}

// ---------------------------------------------------------------------------
// Decoding and NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
struct Candidate {
    bbox: BoundingBox,
    class_id: usize,
    score: f64,
}

/// Decodes a `[1, d1, d2]` output. YOLOv8 exports features-first
/// (`d1 = 4 + nc < d2 = N`); the transposed layout is accepted too.
fn decode(data: &[f32], d1: usize, d2: usize, floor: f64, lb: &Letterbox) -> Vec<Candidate> {
    let transposed = d1 < d2;
    let (num_dets, num_feats) = if transposed { (d2, d1) } else { (d1, d2) };
    if num_feats <= 4 || data.len() < num_dets * num_feats {
        return Vec::new();
    }
    let at = |det: usize, feat: usize| -> f64 {
        let idx = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[idx] as f64
    };

    let mut out = Vec::new();
    for i in 0..num_dets {
        let (class_id, score) = (4..num_feats)
            .map(|f| (f - 4, at(i, f)))
            .fold((0, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
        if score < floor {
            continue;
        }
        let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
        let (x1, y1) = lb.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = lb.unmap(cx + w / 2.0, cy + h / 2.0);
        let Some(bbox) = BoundingBox::new(x1, y1, x2, y2) else {
            continue;
        };
        out.push(Candidate {
            bbox,
            class_id,
            score: score.min(1.0),
        });
    }
    out
}

/// Greedy NMS within each class; boxes of different classes never
/// suppress each other, so a person and the item they hold both survive.
fn nms_per_class(mut candidates: Vec<Candidate>, iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    for cand in candidates {
        let duplicate = keep
            .iter()
            .any(|k| k.class_id == cand.class_id && iou(&k.bbox, &cand.bbox) > iou_thresh);
        if !duplicate {
            keep.push(cand);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const IDENTITY: Letterbox = Letterbox {
        scale: 1.0,
        pad_x: 0.0,
        pad_y: 0.0,
    };

    fn candidate(x1: f64, class_id: usize, score: f64) -> Candidate {
        Candidate {
            bbox: BoundingBox::from_corners(x1, 0.0, x1 + 100.0, 100.0),
            class_id,
            score,
        }
    }

    #[test]
    fn test_letterbox_wide_frame_pads_vertically() {
        let frame = Frame::filled(200, 100, [255, 255, 255], 0);
        let (tensor, lb) = letterbox(&frame, 640);
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(lb.scale, 3.2);
        assert_eq!((lb.pad_x, lb.pad_y), (0.0, 160.0));
        assert_relative_eq!(tensor[[0, 0, 0, 0]], PAD_VALUE);
        assert_relative_eq!(tensor[[0, 1, 161, 5]], 1.0);
    }

    #[test]
    fn test_letterbox_unmap_round_trips_frame_corner() {
        let frame = Frame::filled(100, 50, [0, 0, 0], 0);
        let (_, lb) = letterbox(&frame, 640);
        let (x, y) = lb.unmap(640.0, 160.0 + 320.0);
        assert_relative_eq!(x, 100.0);
        assert_relative_eq!(y, 50.0);
    }

    #[test]
    fn test_decode_features_first_layout() {
        // 2 classes, 7 anchors: features-first [6, 7]. Only the first
        // three anchors score above the floor.
        #[rustfmt::skip]
        let data = [
            50.0, 10.0, 200.0, 0.0, 0.0, 0.0, 0.0, // cx
            50.0, 10.0, 200.0, 0.0, 0.0, 0.0, 0.0, // cy
            20.0,  4.0,  40.0, 1.0, 1.0, 1.0, 1.0, // w
            20.0,  4.0,  40.0, 1.0, 1.0, 1.0, 1.0, // h
            0.10, 0.05,  0.90, 0.0, 0.0, 0.0, 0.0, // class 0
            0.80, 0.10,  0.20, 0.0, 0.0, 0.0, 0.0, // class 1
        ];
        let out = decode(&data, 6, 7, 0.25, &IDENTITY);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].class_id, 1);
        assert_relative_eq!(out[0].score, 0.8, epsilon = 1e-6);
        assert_eq!(out[0].bbox, BoundingBox::from_corners(40.0, 40.0, 60.0, 60.0));
        assert_eq!(out[1].class_id, 0);
        assert_eq!(out[1].bbox, BoundingBox::from_corners(180.0, 180.0, 220.0, 220.0));
    }

    #[test]
    fn test_decode_detections_first_layout() {
        // [6 anchors, 5 features] with one class; only the first is confident.
        let mut data = vec![30.0, 30.0, 4.0, 4.0, 0.1].repeat(6);
        data[..5].copy_from_slice(&[10.0, 10.0, 4.0, 4.0, 0.9]);
        let out = decode(&data, 6, 5, 0.25, &IDENTITY);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bbox, BoundingBox::from_corners(8.0, 8.0, 12.0, 12.0));
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        assert!(decode(&[1.0; 4], 6, 3, 0.0, &IDENTITY).is_empty());
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let kept = nms_per_class(vec![candidate(5.0, 0, 0.8), candidate(0.0, 0, 0.9)], 0.45);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_keeps_overlapping_different_classes() {
        let kept = nms_per_class(vec![candidate(0.0, 0, 0.9), candidate(5.0, 39, 0.8)], 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_keeps_disjoint_boxes() {
        let kept = nms_per_class(vec![candidate(0.0, 0, 0.9), candidate(500.0, 0, 0.8)], 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_default_class_names_are_coco() {
        assert_eq!(COCO_CLASS_NAMES.len(), 80);
        assert_eq!(COCO_CLASS_NAMES[0], "person");
    }
}
