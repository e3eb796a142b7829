use crate::pipeline::frame_result::FrameResult;
use crate::render::domain::frame_renderer::FrameRenderer;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Console sink: one `warn` line per alert, per-frame captions and the
/// measured FPS at `debug`.
#[derive(Default)]
pub struct LogRenderer {
    alerts_logged: usize,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts_logged(&self) -> usize {
        self.alerts_logged
    }
}

impl FrameRenderer for LogRenderer {
    fn name(&self) -> &str {
        "log"
    }

    fn begin(&mut self, metadata: &VideoMetadata) -> Result<(), Box<dyn std::error::Error>> {
        log::info!(
            "Watching {} ({}x{})",
            metadata.location,
            metadata.width,
            metadata.height
        );
        Ok(())
    }

    fn render(
        &mut self,
        _frame: &Frame,
        result: &FrameResult,
        fps: f64,
    ) -> Result<(), Box<dyn std::error::Error>> {
        for alert in &result.alerts {
            let [x1, y1, x2, y2] = alert.bbox.as_array();
            log::warn!(
                "ALERT frame {}: item #{} {} (last seen at {x1:.0},{y1:.0} {x2:.0},{y2:.0})",
                alert.frame_index,
                alert.item_id,
                alert.reason
            );
            self.alerts_logged += 1;
        }
        if log::log_enabled!(log::Level::Debug) {
            let captions: Vec<String> = result.annotations.iter().map(|a| a.caption()).collect();
            log::debug!(
                "Frame {} | FPS {fps:.1} | {} live | {}",
                result.frame_index,
                result.live_items,
                captions.join(", ")
            );
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.alerts_logged == 0 {
            log::info!("No alerts raised");
        }
        Ok(())
    }
}
