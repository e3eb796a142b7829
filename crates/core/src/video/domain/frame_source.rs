use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("cannot open {location}: {reason}")]
    Unavailable { location: String, reason: String },
}

impl SourceError {
    pub fn unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        SourceError::Unavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

/// Pull-based source of decoded frames: a recorded file, an image
/// directory or a live capture device.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<VideoMetadata, SourceError>;

    /// Next frame in decode order, `None` at end of stream. A read or
    /// decode failure also ends the stream.
    fn next_frame(&mut self) -> Option<Frame>;

    /// Releases the underlying device or file. Safe to call twice.
    fn close(&mut self);
}
