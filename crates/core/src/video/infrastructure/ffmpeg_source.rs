use std::path::PathBuf;

use crate::shared::frame::{Frame, RGB_CHANNELS};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::{FrameSource, SourceError};

/// Where an [`FfmpegFrameSource`] reads from.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceLocation {
    File(PathBuf),
    /// Live capture through an ffmpeg input device, e.g. `v4l2` with
    /// `/dev/video0`, `avfoundation` with `0`, `dshow` with `video=...`.
    Device { format: String, device: String },
}

impl SourceLocation {
    /// Default capture device of the platform's ffmpeg input backend.
    pub fn default_camera() -> Self {
        let (format, device) = if cfg!(target_os = "linux") {
            ("v4l2", "/dev/video0")
        } else if cfg!(target_os = "macos") {
            ("avfoundation", "0")
        } else {
            ("dshow", "video=0")
        };
        SourceLocation::Device {
            format: format.to_string(),
            device: device.to_string(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SourceLocation::File(path) => path.display().to_string(),
            SourceLocation::Device { format, device } => format!("{format}:{device}"),
        }
    }
}

/// Decodes a video file or camera feed via ffmpeg-next, converting each
/// frame to RGB24.
pub struct FfmpegFrameSource {
    location: SourceLocation,
    decoding: Option<Decoding>,
}

struct Decoding {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    next_index: usize,
    flushing: bool,
}

// Safety: FfmpegFrameSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    pub fn new(location: SourceLocation) -> Self {
        Self {
            location,
            decoding: None,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(SourceLocation::File(path.into()))
    }

    fn open_input(&self) -> Result<ffmpeg_next::format::context::Input, ffmpeg_next::Error> {
        match &self.location {
            SourceLocation::File(path) => ffmpeg_next::format::input(path),
            SourceLocation::Device { format, device } => {
                ffmpeg_next::device::register_all();
                let input_format = ffmpeg_next::device::input::video()
                    .find(|f| f.name() == format.as_str())
                    .ok_or(ffmpeg_next::Error::DemuxerNotFound)?;
                match ffmpeg_next::format::open_with(
                    device,
                    &input_format,
                    ffmpeg_next::Dictionary::new(),
                )? {
                    ffmpeg_next::format::context::Context::Input(ictx) => Ok(ictx),
                    ffmpeg_next::format::context::Context::Output(_) => {
                        Err(ffmpeg_next::Error::InvalidData)
                    }
                }
            }
        }
    }

    fn start(&self) -> Result<(Decoding, VideoMetadata), ffmpeg_next::Error> {
        ffmpeg_next::init()?;
        let ictx = self.open_input()?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or(ffmpeg_next::Error::StreamNotFound)?;
        let stream_index = stream.index();
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let rate = stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let live = matches!(self.location, SourceLocation::Device { .. });
        let total_frames = match stream.frames() {
            n if n > 0 && !live => Some(n as usize),
            _ => None,
        };

        let (width, height) = (decoder.width(), decoder.height());
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            location: self.location.describe(),
            live,
        };
        let decoding = Decoding {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            next_index: 0,
            flushing: false,
        };
        Ok((decoding, metadata))
    }
}

impl Decoding {
    fn receive(&mut self) -> Option<Frame> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        self.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb) {
            log::warn!("Pixel conversion failed at frame {}: {e}", self.next_index);
            return None;
        }
        let frame = Frame::new(
            extract_rgb_pixels(&rgb, self.width, self.height),
            self.width,
            self.height,
            self.next_index,
        );
        self.next_index += 1;
        Some(frame)
    }

    fn next(&mut self) -> Option<Frame> {
        if let Some(frame) = self.receive() {
            return Some(frame);
        }
        if self.flushing {
            return None;
        }
        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                return self.receive();
            };
            if stream.index() != self.stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }
            if let Some(frame) = self.receive() {
                return Some(frame);
            }
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&mut self) -> Result<VideoMetadata, SourceError> {
        let location = self.location.describe();
        let (decoding, metadata) = self
            .start()
            .map_err(|e| SourceError::unavailable(&location, e))?;
        log::info!(
            "Opened {location}: {}x{} @ {:.1} fps{}",
            metadata.width,
            metadata.height,
            metadata.fps,
            if metadata.live { " (live)" } else { "" }
        );
        self.decoding = Some(decoding);
        Ok(metadata)
    }

    fn next_frame(&mut self) -> Option<Frame> {
        self.decoding.as_mut()?.next()
    }

    fn close(&mut self) {
        self.decoding = None;
    }
}

/// Copies a possibly row-padded RGB24 ffmpeg frame into a tight buffer.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * RGB_CHANNELS;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::video_writer::VideoWriter;
    use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;
    use std::path::Path;

    fn write_test_video(path: &Path, frames: usize) {
        let metadata = VideoMetadata {
            width: 160,
            height: 120,
            fps: 30.0,
            total_frames: None,
            location: String::new(),
            live: false,
        };
        let mut writer = FfmpegWriter::new();
        writer.open(path, &metadata).unwrap();
        for i in 0..frames {
            writer.write(&Frame::filled(160, 120, [128, 128, 128], i)).unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn test_open_reports_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_test_video(&path, 5);

        let mut source = FfmpegFrameSource::file(&path);
        let meta = source.open().unwrap();
        assert_eq!((meta.width, meta.height), (160, 120));
        assert!(meta.fps > 0.0);
        assert!(!meta.live);
        assert_eq!(meta.location, path.display().to_string());
    }

    #[test]
    fn test_frames_in_order_then_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_test_video(&path, 5);

        let mut source = FfmpegFrameSource::file(&path);
        source.open().unwrap();
        let mut indices = Vec::new();
        while let Some(frame) = source.next_frame() {
            assert_eq!(frame.data().len(), 160 * 120 * 3);
            indices.push(frame.index());
        }
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_decoded_brightness_close_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_test_video(&path, 2);

        let mut source = FfmpegFrameSource::file(&path);
        source.open().unwrap();
        let frame = source.next_frame().unwrap();
        let avg = frame.data().iter().map(|&b| b as f64).sum::<f64>() / frame.data().len() as f64;
        assert!((avg - 128.0).abs() < 40.0, "average {avg} should be near 128");
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let mut source = FfmpegFrameSource::file("/nonexistent/clip.mp4");
        let err = source.open().unwrap_err();
        let SourceError::Unavailable { location, .. } = err;
        assert_eq!(location, "/nonexistent/clip.mp4");
    }

    #[test]
    fn test_unknown_capture_backend_is_unavailable() {
        let mut source = FfmpegFrameSource::new(SourceLocation::Device {
            format: "no-such-backend".to_string(),
            device: "0".to_string(),
        });
        assert!(source.open().is_err());
    }

    #[test]
    fn test_next_frame_before_open_is_none() {
        let mut source = FfmpegFrameSource::file("/nonexistent/clip.mp4");
        assert!(source.next_frame().is_none());
        source.close();
        source.close();
    }

    #[test]
    fn test_describe_device() {
        let loc = SourceLocation::Device {
            format: "v4l2".to_string(),
            device: "/dev/video2".to_string(),
        };
        assert_eq!(loc.describe(), "v4l2:/dev/video2");
    }
}
