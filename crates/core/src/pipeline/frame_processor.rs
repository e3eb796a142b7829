use crate::alerting::domain::alert_state_machine::{AlertStateMachine, Scene};
use crate::detection::domain::detection_filter::{Detection, DetectionFilter};
use crate::detection::domain::object_detector::RawDetection;
use crate::tracking::domain::identity_tracker::IdentityTracker;

use super::frame_result::{Annotation, AnnotationKind, FrameResult};
use super::watch_config::WatchConfig;

/// Per-frame core: filter, track, advance alert states.
///
/// Holds all state that must survive across frames. One instance per
/// video; frames must be fed in order.
pub struct FrameProcessor {
    filter: DetectionFilter,
    tracker: IdentityTracker,
    alerts: AlertStateMachine,
    frame_index: usize,
}

impl FrameProcessor {
    pub fn new(filter: DetectionFilter, tracker: IdentityTracker, alerts: AlertStateMachine) -> Self {
        Self {
            filter,
            tracker,
            alerts,
            frame_index: 0,
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(
            DetectionFilter::new(config.thresholds.clone(), config.labels.clone()),
            IdentityTracker::new(config.tracker_config()),
            AlertStateMachine::new(config.loss_frames),
        )
    }

    pub fn process(&mut self, detections: &[RawDetection]) -> FrameResult {
        let frame_index = self.frame_index;
        self.frame_index += 1;

        let filtered = self.filter.filter(detections);
        let humans = filtered.human_boxes();
        let carts = filtered.cart_boxes();
        let scene = Scene {
            humans: &humans,
            carts: &carts,
        };

        let mut update = self.tracker.update(&filtered.item_boxes());
        let mut alerts = self
            .alerts
            .advance(self.tracker.items_mut(), &scene, frame_index);
        alerts.extend(
            self.alerts
                .retire(update.evicted.iter_mut(), &scene, frame_index),
        );

        for alert in &alerts {
            log::debug!(
                "Frame {}: item {} {}",
                alert.frame_index,
                alert.item_id,
                alert.reason
            );
        }

        let mut annotations = Vec::with_capacity(
            filtered.humans.len() + filtered.carts.len() + filtered.items.len() + filtered.others.len(),
        );
        annotations.extend(annotate(&filtered.humans, AnnotationKind::Human));
        annotations.extend(annotate(&filtered.carts, AnnotationKind::Cart));
        annotations.extend(annotate(&filtered.others, AnnotationKind::Other));
        for (id, det_index) in &update.assignments {
            let (Some(det), Some(item)) = (filtered.items.get(*det_index), self.tracker.get(*id))
            else {
                continue;
            };
            annotations.push(Annotation {
                bbox: det.bbox,
                label: det.label.clone(),
                confidence: det.confidence,
                kind: AnnotationKind::Item {
                    id: *id,
                    state: item.state,
                },
            });
        }

        FrameResult {
            frame_index,
            annotations,
            alerts,
            live_items: self.tracker.len(),
            rejected: filtered.rejected,
        }
    }

    /// Index the next call to [`FrameProcessor::process`] will use.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn alerts_fired(&self) -> usize {
        self.alerts.alerts_fired()
    }

    pub fn tracker(&self) -> &IdentityTracker {
        &self.tracker
    }
}

impl Default for FrameProcessor {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}

fn annotate(detections: &[Detection], kind: AnnotationKind) -> impl Iterator<Item = Annotation> + '_ {
    detections.iter().map(move |d| Annotation {
        bbox: d.bbox,
        label: d.label.clone(),
        confidence: d.confidence,
        kind,
    })
}
