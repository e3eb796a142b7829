use std::path::{Path, PathBuf};

use crate::pipeline::frame_result::FrameResult;
use crate::render::domain::frame_renderer::FrameRenderer;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

use super::box_painter::BoxPainter;

/// Saves a painted PNG of the frame for every alert raised.
pub struct AlertSnapshotRenderer {
    dir: PathBuf,
    painter: BoxPainter,
    saved: Vec<PathBuf>,
}

impl AlertSnapshotRenderer {
    pub fn new(dir: impl Into<PathBuf>, painter: BoxPainter) -> Self {
        Self {
            dir: dir.into(),
            painter,
            saved: Vec::new(),
        }
    }

    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }
}

fn save_png(path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
    let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("Failed to create image from frame data")?;
    img.save(path)?;
    Ok(())
}

impl FrameRenderer for AlertSnapshotRenderer {
    fn name(&self) -> &str {
        "alert-snapshots"
    }

    fn begin(&mut self, _metadata: &VideoMetadata) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn render(
        &mut self,
        frame: &Frame,
        result: &FrameResult,
        _fps: f64,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !result.has_alerts() {
            return Ok(());
        }
        let mut painted = frame.clone();
        self.painter.paint(&mut painted, result);

        for alert in &result.alerts {
            let path = self.dir.join(format!(
                "alert_{:06}_item{}.png",
                alert.frame_index, alert.item_id
            ));
            save_png(&path, &painted)?;
            log::info!("Alert snapshot saved to {}", path.display());
            self.saved.push(path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::domain::alert_state_machine::{AlertEvent, AlertReason};
    use crate::shared::bounding_box::BoundingBox;

    fn alert(item_id: u64, frame_index: usize) -> AlertEvent {
        AlertEvent {
            item_id,
            frame_index,
            bbox: BoundingBox::from_corners(2.0, 2.0, 6.0, 6.0),
            reason: AlertReason::Vanished,
        }
    }

    fn metadata() -> VideoMetadata {
        VideoMetadata {
            width: 16,
            height: 16,
            fps: 0.0,
            total_frames: Some(2),
            location: "test".to_string(),
            live: false,
        }
    }

    #[test]
    fn test_one_png_per_alert() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = dir.path().join("alerts");
        let mut renderer = AlertSnapshotRenderer::new(&snapshots, BoxPainter::default());
        renderer.begin(&metadata()).unwrap();

        let frame = Frame::filled(16, 16, [10, 10, 10], 3);
        renderer.render(&frame, &FrameResult::default(), 0.0).unwrap();
        assert!(renderer.saved().is_empty());

        let result = FrameResult {
            frame_index: 3,
            alerts: vec![alert(4, 3), alert(9, 3)],
            ..FrameResult::default()
        };
        renderer.render(&frame, &result, 0.0).unwrap();

        assert_eq!(renderer.saved().len(), 2);
        let first = snapshots.join("alert_000003_item4.png");
        assert!(first.is_file());
        let img = image::open(&first).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (16, 16));
        assert_eq!(img.get_pixel(0, 0).0, crate::render::infrastructure::box_painter::ALERT_COLOR);
    }

    #[test]
    fn test_begin_fails_when_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, "x").unwrap();
        let mut renderer = AlertSnapshotRenderer::new(&blocker, BoxPainter::default());
        assert!(renderer.begin(&metadata()).is_err());
    }
}
