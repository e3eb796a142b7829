pub mod model_resolver;
pub mod onnx_yolo_detector;
pub mod replay_detector;
