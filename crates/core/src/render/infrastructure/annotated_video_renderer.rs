use std::path::PathBuf;

use crate::pipeline::frame_result::FrameResult;
use crate::render::domain::frame_renderer::FrameRenderer;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

use super::box_painter::BoxPainter;

/// Paints every frame and encodes it to an output video.
pub struct AnnotatedVideoRenderer {
    path: PathBuf,
    writer: Box<dyn VideoWriter>,
    painter: BoxPainter,
}

impl AnnotatedVideoRenderer {
    pub fn new(path: impl Into<PathBuf>, writer: Box<dyn VideoWriter>, painter: BoxPainter) -> Self {
        Self {
            path: path.into(),
            writer,
            painter,
        }
    }
}

impl FrameRenderer for AnnotatedVideoRenderer {
    fn name(&self) -> &str {
        "annotated-video"
    }

    fn begin(&mut self, metadata: &VideoMetadata) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.writer.open(&self.path, metadata)
    }

    fn render(
        &mut self,
        frame: &Frame,
        result: &FrameResult,
        _fps: f64,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut painted = frame.clone();
        self.painter.paint(&mut painted, result);
        self.writer.write(&painted)
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.writer.close()?;
        log::info!("Annotated video written to {}", self.path.display());
        Ok(())
    }
}
