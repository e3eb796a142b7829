use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use clap::Parser;

use shelfwatch_core::detection::domain::object_detector::ObjectDetector;
use shelfwatch_core::detection::infrastructure::model_resolver;
use shelfwatch_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use shelfwatch_core::detection::infrastructure::replay_detector::ReplayDetector;
use shelfwatch_core::pipeline::frame_processor::FrameProcessor;
use shelfwatch_core::pipeline::infrastructure::prefetch_frame_source::PrefetchFrameSource;
use shelfwatch_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use shelfwatch_core::pipeline::watch_config::WatchConfig;
use shelfwatch_core::pipeline::watch_video_use_case::WatchVideoUseCase;
use shelfwatch_core::render::domain::frame_renderer::FrameRenderer;
use shelfwatch_core::render::infrastructure::annotated_video_renderer::AnnotatedVideoRenderer;
use shelfwatch_core::render::infrastructure::box_painter::BoxPainter;
use shelfwatch_core::render::infrastructure::log_renderer::LogRenderer;
use shelfwatch_core::render::infrastructure::snapshot_renderer::AlertSnapshotRenderer;
use shelfwatch_core::shared::constants::YOLO_MODEL_NAME;
use shelfwatch_core::video::domain::frame_source::FrameSource;
use shelfwatch_core::video::infrastructure::ffmpeg_source::{FfmpegFrameSource, SourceLocation};
use shelfwatch_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use shelfwatch_core::video::infrastructure::image_sequence_source::ImageSequenceSource;

/// Alerts when a shopper picks up an item and it leaves their hand
/// without being placed in a cart.
#[derive(Parser)]
#[command(name = "shelfwatch")]
struct Cli {
    /// Input video file, still image or directory of images.
    input: Option<PathBuf>,

    /// Watch a live camera instead of a file. Takes an optional device
    /// (e.g. /dev/video1); defaults to the platform's first camera.
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    camera: Option<String>,

    /// ffmpeg input device format for --camera (v4l2, avfoundation, dshow).
    #[arg(long, requires = "camera")]
    camera_format: Option<String>,

    /// Replay detections from a JSON-lines file instead of running a model.
    #[arg(long)]
    detections: Option<PathBuf>,

    /// ONNX detection model (defaults to the model cache directory).
    #[arg(long, conflicts_with = "detections")]
    model: Option<PathBuf>,

    /// Write an annotated video to this file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Save an annotated PNG for every alert into this directory.
    #[arg(long)]
    snapshots: Option<PathBuf>,

    /// JSON config file with thresholds, label map and tracker settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum confidence for human detections (0.0-1.0).
    #[arg(long)]
    human_confidence: Option<f64>,

    /// Minimum confidence for cart detections (0.0-1.0).
    #[arg(long)]
    cart_confidence: Option<f64>,

    /// Minimum confidence for item detections (0.0-1.0).
    #[arg(long)]
    item_confidence: Option<f64>,

    /// Minimum confidence for labels without their own threshold (0.0-1.0).
    #[arg(long)]
    default_confidence: Option<f64>,

    /// Minimum IoU for a detection to keep an item's identity (0.0-1.0).
    #[arg(long)]
    iou_threshold: Option<f64>,

    /// Frames an item may go undetected before its identity is dropped.
    #[arg(long)]
    grace_frames: Option<usize>,

    /// Unseen frames after which a carried item counts as vanished.
    #[arg(long)]
    loss_frames: Option<usize>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Decode frames on a background thread.
    #[arg(long)]
    prefetch: bool,

    /// Frame rate reported for image sequences.
    #[arg(long, default_value = "30.0")]
    fps: f64,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli)?;
    let source = build_source(&cli)?;
    let detector = build_detector(&cli, &config)?;
    let renderers = build_renderers(&cli);

    let cancelled = Arc::new(AtomicBool::new(false));
    spawn_quit_listener(cancelled.clone());

    let mut use_case = WatchVideoUseCase::new(
        source,
        detector,
        FrameProcessor::from_config(&config),
        renderers,
        Box::new(StdoutPipelineLogger::default()),
    )
    .with_cancel_flag(cancelled)
    .with_max_frames(cli.max_frames);

    let summary = use_case.execute()?;
    log::info!(
        "Processed {} frames, {} alert(s){}",
        summary.frames_processed,
        summary.alerts.len(),
        if summary.cancelled { " (stopped)" } else { "" }
    );
    if let Some(output) = &cli.output {
        log::info!("Output written to {}", output.display());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<WatchConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => WatchConfig::load(path)?,
        None => WatchConfig::default(),
    };

    let overrides = [
        ("human", cli.human_confidence),
        ("cart", cli.cart_confidence),
        ("item", cli.item_confidence),
    ];
    for (class, value) in overrides {
        if let Some(value) = value {
            config.thresholds.set(class, value);
        }
    }
    if let Some(value) = cli.default_confidence {
        config.thresholds.default = value;
    }
    if let Some(value) = cli.iou_threshold {
        config.match_iou_threshold = value;
    }
    if let Some(value) = cli.grace_frames {
        config.grace_frames = value;
    }
    if let Some(value) = cli.loss_frames {
        config.loss_frames = value;
    }

    config.validate()?;
    Ok(config)
}

fn build_source(cli: &Cli) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    let source: Box<dyn FrameSource> = match (&cli.camera, &cli.input) {
        (Some(device), _) => Box::new(FfmpegFrameSource::new(camera_location(
            device,
            cli.camera_format.as_deref(),
        ))),
        (None, Some(input)) if is_image_input(input) => {
            Box::new(ImageSequenceSource::new(input).with_fps(cli.fps))
        }
        (None, Some(input)) => Box::new(FfmpegFrameSource::file(input)),
        (None, None) => return Err("An input path or --camera is required".into()),
    };

    if cli.prefetch {
        Ok(Box::new(PrefetchFrameSource::new(source)))
    } else {
        Ok(source)
    }
}

fn camera_location(device: &str, format: Option<&str>) -> SourceLocation {
    match SourceLocation::default_camera() {
        SourceLocation::Device {
            format: default_format,
            device: default_device,
        } => SourceLocation::Device {
            format: format.map_or(default_format, str::to_string),
            device: if device.is_empty() {
                default_device
            } else {
                device.to_string()
            },
        },
        other => other,
    }
}

fn build_detector(
    cli: &Cli,
    config: &WatchConfig,
) -> Result<Box<dyn ObjectDetector>, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.detections {
        return Ok(Box::new(ReplayDetector::load(path)?));
    }

    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(YOLO_MODEL_NAME, cli.model.as_deref())?;

    // The filter applies the real thresholds; the model only needs to
    // keep everything that could pass.
    let score_floor = config
        .thresholds
        .per_label
        .values()
        .copied()
        .fold(config.thresholds.default, f64::min);
    Ok(Box::new(OnnxYoloDetector::new(&model_path, score_floor)?))
}

fn build_renderers(cli: &Cli) -> Vec<Box<dyn FrameRenderer>> {
    let mut renderers: Vec<Box<dyn FrameRenderer>> = vec![Box::new(LogRenderer::new())];
    if let Some(output) = &cli.output {
        renderers.push(Box::new(AnnotatedVideoRenderer::new(
            output,
            Box::new(FfmpegWriter::new()),
            BoxPainter::default(),
        )));
    }
    if let Some(dir) = &cli.snapshots {
        renderers.push(Box::new(AlertSnapshotRenderer::new(
            dir,
            BoxPainter::default(),
        )));
    }
    renderers
}

/// Sets `cancelled` when the user enters `q` on stdin.
fn spawn_quit_listener(cancelled: Arc<AtomicBool>) {
    log::info!("Enter q to stop");
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                    cancelled.store(true, Ordering::Relaxed);
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match (&cli.input, &cli.camera) {
        (Some(_), Some(_)) => return Err("Give either an input path or --camera, not both".into()),
        (None, None) => return Err("An input path or --camera is required".into()),
        (Some(input), None) if !input.exists() => {
            return Err(format!("Input not found: {}", input.display()).into());
        }
        _ => {}
    }
    if let Some(path) = &cli.detections {
        if !path.is_file() {
            return Err(format!("Detections file not found: {}", path.display()).into());
        }
    }
    if !cli.fps.is_finite() || cli.fps <= 0.0 {
        return Err(format!("FPS must be positive, got {}", cli.fps).into());
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    Ok(())
}

fn is_image_input(path: &Path) -> bool {
    path.is_dir() || ImageSequenceSource::is_image_path(path)
}
