use crate::pipeline::frame_result::FrameResult;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Consumer of processed frames: a display, an encoder, a log sink.
///
/// Failures are reported but never stop the watch loop.
pub trait FrameRenderer: Send {
    fn name(&self) -> &str;

    fn begin(&mut self, _metadata: &VideoMetadata) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }

    /// `fps` is the measured processing rate at this frame.
    fn render(
        &mut self,
        frame: &Frame,
        result: &FrameResult,
        fps: f64,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}
