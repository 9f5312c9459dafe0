pub const DETECTOR_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const DETECTOR_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://huggingface.co/maze/faceX/resolve/e010b5098c3685fd00b22dd2aec6f37320e3d850/w600k_r50.onnx";

/// Minimum detector score for a face to be handed to the embedder.
pub const DEFAULT_DETECTION_CONFIDENCE: f64 = 0.5;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Edge length of the all-zero face/mask pair returned by runs that match nothing.
pub const PLACEHOLDER_SIZE: u32 = 64;

/// Decode errors tolerated in a row before a video is treated as unreadable.
pub const MAX_CONSECUTIVE_DECODE_ERRORS: usize = 5;

pub const DEFAULT_SUBFOLDER: &str = "extracted_faces";
pub const DEFAULT_PREFIX: &str = "face";
