use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::{FrameSource, SourceError};

/// Plays a directory of still images, in file-name order, as a recorded
/// clip. A path to a single image yields a one-frame clip.
///
/// Every frame is resized to the first image's dimensions so downstream
/// encoders see a constant frame size.
pub struct ImageSequenceSource {
    path: PathBuf,
    fps: f64,
    files: Vec<PathBuf>,
    cursor: usize,
    size: Option<(u32, u32)>,
}

impl ImageSequenceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fps: 0.0,
            files: Vec::new(),
            cursor: 0,
            size: None,
        }
    }

    /// Nominal playback rate reported in the metadata.
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn is_image_path(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn list_files(&self) -> Result<Vec<PathBuf>, SourceError> {
        let location = self.path.display().to_string();
        if self.path.is_file() {
            return Ok(vec![self.path.clone()]);
        }
        let entries =
            std::fs::read_dir(&self.path).map_err(|e| SourceError::unavailable(&location, e))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && Self::is_image_path(p))
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(SourceError::unavailable(location, "no images found"));
        }
        Ok(files)
    }

    fn load(&self, path: &Path, index: usize) -> Result<Frame, image::ImageError> {
        let mut img = image::open(path)?.to_rgb8();
        if let Some((w, h)) = self.size {
            if img.dimensions() != (w, h) {
                img = image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle);
            }
        }
        let (w, h) = img.dimensions();
        Ok(Frame::new(img.into_raw(), w, h, index))
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<VideoMetadata, SourceError> {
        let location = self.path.display().to_string();
        let files = self.list_files()?;
        let (width, height) = image::image_dimensions(&files[0])
            .map_err(|e| SourceError::unavailable(&location, e))?;

        log::info!("Opened {location}: {} images at {width}x{height}", files.len());
        self.size = Some((width, height));
        self.cursor = 0;
        let metadata = VideoMetadata {
            width,
            height,
            fps: self.fps,
            total_frames: Some(files.len()),
            location,
            live: false,
        };
        self.files = files;
        Ok(metadata)
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let path = self.files.get(self.cursor)?;
        match self.load(path, self.cursor) {
            Ok(frame) => {
                self.cursor += 1;
                Some(frame)
            }
            Err(e) => {
                log::warn!("Stopping at unreadable image {}: {e}", path.display());
                self.cursor = self.files.len();
                None
            }
        }
    }

    fn close(&mut self) {
        self.files.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn save_png(dir: &Path, name: &str, w: u32, h: u32, value: u8) {
        image::RgbImage::from_pixel(w, h, image::Rgb([value, value, value]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_frames_follow_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        save_png(dir.path(), "002.png", 8, 6, 20);
        save_png(dir.path(), "001.png", 8, 6, 10);
        save_png(dir.path(), "003.png", 8, 6, 30);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::new(dir.path()).with_fps(5.0);
        let meta = source.open().unwrap();
        assert_eq!((meta.width, meta.height), (8, 6));
        assert_eq!(meta.total_frames, Some(3));
        assert_eq!(meta.fps, 5.0);

        let mut firsts = Vec::new();
        while let Some(frame) = source.next_frame() {
            assert_eq!(frame.index(), firsts.len());
            firsts.push(frame.data()[0]);
        }
        assert_eq!(firsts, vec![10, 20, 30]);
    }

    #[test]
    fn test_mismatched_sizes_are_resized() {
        let dir = tempfile::tempdir().unwrap();
        save_png(dir.path(), "a.png", 8, 6, 0);
        save_png(dir.path(), "b.png", 16, 12, 0);

        let mut source = ImageSequenceSource::new(dir.path());
        source.open().unwrap();
        source.next_frame().unwrap();
        let second = source.next_frame().unwrap();
        assert_eq!((second.width(), second.height()), (8, 6));
    }

    #[test]
    fn test_single_image_path() {
        let dir = tempfile::tempdir().unwrap();
        save_png(dir.path(), "still.png", 4, 4, 99);

        let mut source = ImageSequenceSource::new(dir.path().join("still.png"));
        assert_eq!(source.open().unwrap().total_frames, Some(1));
        assert!(source.next_frame().is_some());
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_empty_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageSequenceSource::new(dir.path()).open().unwrap_err();
        assert!(err.to_string().contains("no images found"));
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        assert!(ImageSequenceSource::new("/nonexistent/frames").open().is_err());
    }

    #[test]
    fn test_unreadable_image_ends_stream() {
        let dir = tempfile::tempdir().unwrap();
        save_png(dir.path(), "a.png", 4, 4, 0);
        std::fs::write(dir.path().join("b.png"), b"not a png").unwrap();
        save_png(dir.path(), "c.png", 4, 4, 0);

        let mut source = ImageSequenceSource::new(dir.path());
        source.open().unwrap();
        assert!(source.next_frame().is_some());
        assert!(source.next_frame().is_none());
        assert!(source.next_frame().is_none());
    }

    #[rstest]
    #[case("frame.PNG", true)]
    #[case("frame.jpeg", true)]
    #[case("clip.mp4", false)]
    #[case("README", false)]
    fn test_is_image_path(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(ImageSequenceSource::is_image_path(Path::new(name)), expected);
    }
}
