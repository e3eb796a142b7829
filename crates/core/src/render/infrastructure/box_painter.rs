use crate::pipeline::frame_result::{AnnotationKind, FrameResult};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::{Frame, RGB_CHANNELS};
use crate::tracking::domain::tracked_item::AlertState;

pub const HUMAN_COLOR: [u8; 3] = [0, 200, 0];
pub const CART_COLOR: [u8; 3] = [40, 120, 255];
pub const OTHER_COLOR: [u8; 3] = [150, 150, 150];
pub const ALERT_COLOR: [u8; 3] = [230, 0, 0];

const DEFAULT_THICKNESS: u32 = 2;

/// Rasterizes a [`FrameResult`] onto a frame: box outlines colored by
/// class and alert state, plus a red banner across the top while alerts
/// fire. Labels and captions are not drawn; renderers log them instead.
#[derive(Clone, Debug)]
pub struct BoxPainter {
    thickness: u32,
}

impl BoxPainter {
    pub fn new(thickness: u32) -> Self {
        Self {
            thickness: thickness.max(1),
        }
    }

    pub fn color_for(kind: &AnnotationKind) -> [u8; 3] {
        match kind {
            AnnotationKind::Human => HUMAN_COLOR,
            AnnotationKind::Cart => CART_COLOR,
            AnnotationKind::Other => OTHER_COLOR,
            AnnotationKind::Item { state, .. } => match state {
                AlertState::Unobserved => [240, 220, 0],
                AlertState::Carried => [255, 140, 0],
                AlertState::Alerted => ALERT_COLOR,
                AlertState::Resolved => [0, 200, 200],
            },
        }
    }

    pub fn paint(&self, frame: &mut Frame, result: &FrameResult) {
        for annotation in &result.annotations {
            let thickness = match annotation.kind {
                AnnotationKind::Item {
                    state: AlertState::Alerted,
                    ..
                } => self.thickness * 2,
                _ => self.thickness,
            };
            draw_rect(frame, &annotation.bbox, Self::color_for(&annotation.kind), thickness);
        }
        // Alerted items may have no detection this frame; outline the last
        // known position.
        for alert in &result.alerts {
            draw_rect(frame, &alert.bbox, ALERT_COLOR, self.thickness * 2);
        }
        if result.has_alerts() {
            draw_banner(frame, ALERT_COLOR);
        }
    }
}

impl Default for BoxPainter {
    fn default() -> Self {
        Self::new(DEFAULT_THICKNESS)
    }
}

/// Outline of `bbox`, growing inward by `thickness` pixels.
pub fn draw_rect(frame: &mut Frame, bbox: &BoundingBox, rgb: [u8; 3], thickness: u32) {
    let Some((x1, y1, x2, y2)) = bbox.to_pixel_rect(frame.width(), frame.height()) else {
        return;
    };
    for t in 0..thickness {
        let (left, top) = (x1 + t, y1 + t);
        let (Some(right), Some(bottom)) = (x2.checked_sub(t), y2.checked_sub(t)) else {
            break;
        };
        if left > right || top > bottom {
            break;
        }
        for x in left..=right {
            frame.put_pixel(x, top, rgb);
            frame.put_pixel(x, bottom, rgb);
        }
        for y in top..=bottom {
            frame.put_pixel(left, y, rgb);
            frame.put_pixel(right, y, rgb);
        }
    }
}

/// Solid bar across the top 5% of the frame, at least 4 pixels tall.
pub fn draw_banner(frame: &mut Frame, rgb: [u8; 3]) {
    if frame.width() == 0 {
        return;
    }
    let height = (frame.height() / 20).max(4).min(frame.height());
    let row_bytes = frame.width() as usize * RGB_CHANNELS;
    for row in frame.data_mut().chunks_exact_mut(row_bytes).take(height as usize) {
        for px in row.chunks_exact_mut(RGB_CHANNELS) {
            px.copy_from_slice(&rgb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::domain::alert_state_machine::{AlertEvent, AlertReason};
    use crate::pipeline::frame_result::Annotation;

    const BLACK: [u8; 3] = [0, 0, 0];

    fn annotation(bbox: BoundingBox, kind: AnnotationKind) -> Annotation {
        Annotation {
            bbox,
            label: "x".to_string(),
            confidence: 0.9,
            kind,
        }
    }

    #[test]
    fn test_rect_outline_only() {
        let mut frame = Frame::filled(20, 20, BLACK, 0);
        draw_rect(&mut frame, &BoundingBox::from_corners(2.0, 2.0, 10.0, 10.0), HUMAN_COLOR, 1);
        assert_eq!(frame.pixel(2, 2), Some(HUMAN_COLOR));
        assert_eq!(frame.pixel(10, 6), Some(HUMAN_COLOR));
        assert_eq!(frame.pixel(6, 10), Some(HUMAN_COLOR));
        assert_eq!(frame.pixel(6, 6), Some(BLACK));
        assert_eq!(frame.pixel(11, 11), Some(BLACK));
    }

    #[test]
    fn test_thickness_grows_inward() {
        let mut frame = Frame::filled(20, 20, BLACK, 0);
        draw_rect(&mut frame, &BoundingBox::from_corners(2.0, 2.0, 12.0, 12.0), CART_COLOR, 3);
        assert_eq!(frame.pixel(4, 7), Some(CART_COLOR));
        assert_eq!(frame.pixel(5, 7), Some(BLACK));
        assert_eq!(frame.pixel(1, 7), Some(BLACK));
    }

    #[test]
    fn test_box_outside_frame_is_ignored() {
        let mut frame = Frame::filled(10, 10, BLACK, 0);
        draw_rect(&mut frame, &BoundingBox::from_corners(50.0, 50.0, 60.0, 60.0), ALERT_COLOR, 2);
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_box_clipped_to_frame() {
        let mut frame = Frame::filled(10, 10, BLACK, 0);
        draw_rect(&mut frame, &BoundingBox::from_corners(-5.0, -5.0, 5.0, 5.0), ALERT_COLOR, 1);
        assert_eq!(frame.pixel(0, 0), Some(ALERT_COLOR));
        assert_eq!(frame.pixel(5, 2), Some(ALERT_COLOR));
    }

    #[test]
    fn test_paint_colors_by_state() {
        let mut frame = Frame::filled(40, 40, BLACK, 0);
        let result = FrameResult {
            annotations: vec![annotation(
                BoundingBox::from_corners(10.0, 10.0, 20.0, 20.0),
                AnnotationKind::Item {
                    id: 1,
                    state: AlertState::Carried,
                },
            )],
            ..FrameResult::default()
        };
        BoxPainter::new(1).paint(&mut frame, &result);
        assert_eq!(frame.pixel(10, 15), Some([255, 140, 0]));
        // No alert, no banner.
        assert_eq!(frame.pixel(0, 0), Some(BLACK));
    }

    #[test]
    fn test_alert_draws_banner_and_last_position() {
        let mut frame = Frame::filled(40, 100, BLACK, 0);
        let result = FrameResult {
            alerts: vec![AlertEvent {
                item_id: 1,
                frame_index: 0,
                bbox: BoundingBox::from_corners(10.0, 50.0, 20.0, 60.0),
                reason: AlertReason::Vanished,
            }],
            ..FrameResult::default()
        };
        BoxPainter::new(1).paint(&mut frame, &result);
        assert_eq!(frame.pixel(0, 0), Some(ALERT_COLOR));
        assert_eq!(frame.pixel(39, 4), Some(ALERT_COLOR));
        assert_eq!(frame.pixel(0, 5), Some(BLACK));
        assert_eq!(frame.pixel(10, 55), Some(ALERT_COLOR));
    }
}
