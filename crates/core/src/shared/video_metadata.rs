/// Stream properties reported by a [`FrameSource`] when opened.
///
/// [`FrameSource`]: crate::video::domain::frame_source::FrameSource
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// 0 when the source has no meaningful rate (still images).
    pub fps: f64,
    /// `None` for live devices and other unbounded sources.
    pub total_frames: Option<usize>,
    /// File path, directory or device the frames come from.
    pub location: String,
    pub live: bool,
}

impl VideoMetadata {
    /// Frame rate to use for output encoding, falling back to 30.
    pub fn output_fps(&self) -> i32 {
        let fps = self.fps.round() as i32;
        if fps <= 0 {
            30
        } else {
            fps
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(fps: f64) -> VideoMetadata {
        VideoMetadata {
            width: 640,
            height: 480,
            fps,
            total_frames: None,
            location: "/dev/video0".to_string(),
            live: true,
        }
    }

    #[test]
    fn test_output_fps_rounds() {
        assert_eq!(metadata(29.97).output_fps(), 30);
        assert_eq!(metadata(24.0).output_fps(), 24);
    }

    #[test]
    fn test_output_fps_falls_back_when_unknown() {
        assert_eq!(metadata(0.0).output_fps(), 30);
    }
}
