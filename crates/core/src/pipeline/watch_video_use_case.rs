use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::alerting::domain::alert_state_machine::AlertEvent;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::render::domain::frame_renderer::FrameRenderer;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::{FrameSource, SourceError};

use super::frame_processor::FrameProcessor;
use super::frame_result::FrameResult;
use super::pipeline_logger::PipelineLogger;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error(transparent)]
    SourceUnavailable(#[from] SourceError),
    #[error("detector failed on frame {frame}: {message}")]
    Detection { frame: usize, message: String },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WatchSummary {
    pub frames_processed: usize,
    pub alerts: Vec<AlertEvent>,
    /// Stopped by the cancel flag rather than end of stream.
    pub cancelled: bool,
}

/// Drives one watch session: pull a frame, detect, track, alert, render.
///
/// Frames are processed strictly in order on the calling thread. The loop
/// ends when the source is exhausted, `max_frames` is reached or the
/// cancel flag is set. Renderer failures are logged and skipped; only a
/// source that cannot be opened or a failing detector stop the session.
pub struct WatchVideoUseCase {
    source: Box<dyn FrameSource>,
    detector: Box<dyn ObjectDetector>,
    processor: FrameProcessor,
    renderers: Vec<Box<dyn FrameRenderer>>,
    logger: Box<dyn PipelineLogger>,
    cancelled: Arc<AtomicBool>,
    max_frames: Option<usize>,
}

impl WatchVideoUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn ObjectDetector>,
        processor: FrameProcessor,
        renderers: Vec<Box<dyn FrameRenderer>>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            detector,
            processor,
            renderers,
            logger,
            cancelled: Arc::new(AtomicBool::new(false)),
            max_frames: None,
        }
    }

    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn execute(&mut self) -> Result<WatchSummary, WatchError> {
        let metadata = self.source.open()?;
        self.logger.info(&format!(
            "Source {}: {}x{}, {}",
            metadata.location,
            metadata.width,
            metadata.height,
            match metadata.total_frames {
                Some(n) => format!("{n} frames"),
                None => "live".to_string(),
            }
        ));

        let mut active = self.begin_renderers(&metadata);
        let mut summary = WatchSummary::default();
        let outcome = self.run_loop(&metadata, &mut active, &mut summary);

        self.finish_renderers(&active);
        self.source.close();
        self.logger.summary();

        outcome.map(|()| summary)
    }

    fn begin_renderers(&mut self, metadata: &VideoMetadata) -> Vec<bool> {
        self.renderers
            .iter_mut()
            .map(|r| match r.begin(metadata) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Renderer '{}' disabled: {e}", r.name());
                    false
                }
            })
            .collect()
    }

    fn finish_renderers(&mut self, active: &[bool]) {
        for (renderer, _) in self.renderers.iter_mut().zip(active).filter(|(_, on)| **on) {
            if let Err(e) = renderer.finish() {
                log::warn!("Renderer '{}' failed to finish: {e}", renderer.name());
            }
        }
    }

    fn run_loop(
        &mut self,
        metadata: &VideoMetadata,
        active: &mut [bool],
        summary: &mut WatchSummary,
    ) -> Result<(), WatchError> {
        // Duration of the previous frame's detect, track and render. Time
        // spent waiting on the source is excluded.
        let mut last_iteration: Option<Duration> = None;

        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                self.logger.info("Stop requested");
                summary.cancelled = true;
                return Ok(());
            }
            if self.max_frames.is_some_and(|max| summary.frames_processed >= max) {
                return Ok(());
            }
            let Some(frame) = self.source.next_frame() else {
                return Ok(());
            };

            let started = Instant::now();
            let result = self.process_frame(&frame)?;
            let fps = processing_fps(last_iteration.unwrap_or_else(|| started.elapsed()));

            let t_render = Instant::now();
            self.render(&frame, &result, fps, active);
            self.logger.timing("render", elapsed_ms(t_render));
            last_iteration = Some(started.elapsed());

            summary.frames_processed += 1;
            self.logger
                .progress(summary.frames_processed, metadata.total_frames);
            summary.alerts.extend(result.alerts);
        }
    }

    fn process_frame(&mut self, frame: &Frame) -> Result<FrameResult, WatchError> {
        let t_detect = Instant::now();
        let detections = self
            .detector
            .detect(frame)
            .map_err(|e| WatchError::Detection {
                frame: frame.index(),
                message: e.to_string(),
            })?;
        self.logger.timing("detect", elapsed_ms(t_detect));

        let t_track = Instant::now();
        let result = self.processor.process(&detections);
        self.logger.timing("track", elapsed_ms(t_track));
        self.logger.metric("live_items", result.live_items as f64);
        if result.rejected > 0 {
            self.logger.metric("rejected", result.rejected as f64);
        }
        for alert in &result.alerts {
            self.logger.alert(alert);
        }
        Ok(result)
    }

    fn render(&mut self, frame: &Frame, result: &FrameResult, fps: f64, active: &[bool]) {
        for (renderer, _) in self.renderers.iter_mut().zip(active).filter(|(_, on)| **on) {
            if let Err(e) = renderer.render(frame, result, fps) {
                log::warn!(
                    "Renderer '{}' failed on frame {}: {e}",
                    renderer.name(),
                    frame.index()
                );
            }
        }
    }
}

fn processing_fps(per_frame: Duration) -> f64 {
    let secs = per_frame.as_secs_f64();
    if secs > 0.0 {
        1.0 / secs
    } else {
        0.0
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
