pub mod annotated_video_renderer;
pub mod box_painter;
pub mod log_renderer;
pub mod snapshot_renderer;
