use crate::alerting::domain::alert_state_machine::AlertEvent;
use crate::shared::bounding_box::BoundingBox;
use crate::tracking::domain::tracked_item::{AlertState, ItemId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnnotationKind {
    Human,
    Cart,
    Item { id: ItemId, state: AlertState },
    /// Confident detection with no tracked class.
    Other,
}

/// One box to draw on the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub bbox: BoundingBox,
    pub label: String,
    pub confidence: f64,
    pub kind: AnnotationKind,
}

impl Annotation {
    /// Caption in the `label (0.87)` style, with the item id when tracked.
    pub fn caption(&self) -> String {
        match self.kind {
            AnnotationKind::Item { id, state } => {
                format!("{} #{id} [{state}] ({:.2})", self.label, self.confidence)
            }
            _ => format!("{} ({:.2})", self.label, self.confidence),
        }
    }
}

/// Everything the renderers need for one processed frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameResult {
    pub frame_index: usize,
    pub annotations: Vec<Annotation>,
    /// Alerts raised on this frame only.
    pub alerts: Vec<AlertEvent>,
    pub live_items: usize,
    /// Malformed detections dropped on this frame.
    pub rejected: usize,
}

impl FrameResult {
    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(kind: AnnotationKind) -> Annotation {
        Annotation {
            bbox: BoundingBox::from_corners(0.0, 0.0, 1.0, 1.0),
            label: "bottle".to_string(),
            confidence: 0.876,
            kind,
        }
    }

    #[test]
    fn test_caption_for_untracked() {
        assert_eq!(annotation(AnnotationKind::Other).caption(), "bottle (0.88)");
    }

    #[test]
    fn test_caption_for_item_includes_identity() {
        let kind = AnnotationKind::Item {
            id: 4,
            state: AlertState::Carried,
        };
        assert_eq!(annotation(kind).caption(), "bottle #4 [carried] (0.88)");
    }

    #[test]
    fn test_default_has_no_alerts() {
        assert!(!FrameResult::default().has_alerts());
    }
}
