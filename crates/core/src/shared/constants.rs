pub const YOLO_MODEL_NAME: &str = "yolov8n.onnx";

/// Confidence thresholds applied per label before tracking.
pub const HUMAN_CONFIDENCE: f64 = 0.5;
pub const CART_CONFIDENCE: f64 = 0.6;
pub const ITEM_CONFIDENCE: f64 = 0.4;
/// Threshold for any label without an explicit entry.
pub const DEFAULT_CONFIDENCE: f64 = 0.4;

/// Minimum IoU for an item detection to continue an existing identity.
pub const MATCH_IOU_THRESHOLD: f64 = 0.3;

/// Unmatched frames tolerated before an identity is evicted.
pub const TRACKER_GRACE_FRAMES: usize = 10;

/// Unseen frames after which a carried item counts as gone from the hand.
pub const LOSS_FRAMES: usize = 1;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Class names of the COCO-trained YOLOv8 checkpoints, in output order.
pub const COCO_CLASS_NAMES: &[&str] = &[
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];
