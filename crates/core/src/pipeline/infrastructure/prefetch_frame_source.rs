use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::{FrameSource, SourceError};

const DEFAULT_CAPACITY: usize = 8;

/// Decodes frames on a reader thread ahead of the pipeline.
///
/// Layout: `reader thread → bounded channel → next_frame()`. The channel
/// is FIFO and fed by one thread, so frames arrive in decode order.
/// `open` runs on the caller's thread so its error is reported directly.
pub struct PrefetchFrameSource {
    inner: Option<Box<dyn FrameSource>>,
    capacity: usize,
    worker: Option<Worker>,
    closed: bool,
}

struct Worker {
    frames: crossbeam_channel::Receiver<Frame>,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Box<dyn FrameSource>>,
}

impl PrefetchFrameSource {
    pub fn new(inner: Box<dyn FrameSource>) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: Box<dyn FrameSource>, capacity: usize) -> Self {
        Self {
            inner: Some(inner),
            capacity: capacity.max(1),
            worker: None,
            closed: false,
        }
    }

    /// Frames decoded but not yet consumed.
    pub fn queue_depth(&self) -> usize {
        self.worker.as_ref().map_or(0, |w| w.frames.len())
    }
}

fn spawn_reader(
    mut source: Box<dyn FrameSource>,
    frame_tx: crossbeam_channel::Sender<Frame>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<Box<dyn FrameSource>> {
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            let Some(frame) = source.next_frame() else {
                break;
            };
            if frame_tx.send(frame).is_err() {
                break;
            }
        }
        source
    })
}

impl FrameSource for PrefetchFrameSource {
    fn open(&mut self) -> Result<VideoMetadata, SourceError> {
        let mut source = self
            .inner
            .take()
            .ok_or_else(|| SourceError::unavailable("prefetch", "source already opened"))?;
        let metadata = match source.open() {
            Ok(metadata) => metadata,
            Err(e) => {
                self.inner = Some(source);
                return Err(e);
            }
        };

        self.closed = false;
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(self.capacity);
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_reader(source, frame_tx, stop.clone());
        self.worker = Some(Worker {
            frames: frame_rx,
            stop,
            handle,
        });
        Ok(metadata)
    }

    fn next_frame(&mut self) -> Option<Frame> {
        self.worker.as_ref()?.frames.recv().ok()
    }

    /// Stops the reader and closes the inner source once; later calls,
    /// including the one from `Drop`, do nothing.
    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::Relaxed);
            // Unblocks a reader waiting on a full channel.
            drop(worker.frames);
            match worker.handle.join() {
                Ok(source) => self.inner = Some(source),
                Err(_) => log::error!("Frame reader thread panicked"),
            }
        }
        if let Some(source) = self.inner.as_mut() {
            source.close();
        }
    }
}

impl Drop for PrefetchFrameSource {
    fn drop(&mut self) {
        self.close();
    }
}
