pub const DETECTOR_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const DETECTOR_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Side length of the square grayscale tensor fed to the emotion model.
pub const TENSOR_SIZE: usize = 64;

pub const SCORE_URI_ENV: &str = "SCOREURI";
pub const DEFAULT_SCORE_URI: &str = "http://localhost:5002/score";

pub const FACE_API_URI_ENV: &str = "FACE_API_URI";
pub const FACE_API_KEY_ENV: &str = "FACE_API_KEY";
pub const DEFAULT_FACE_API_URI: &str =
    "https://westeurope.api.cognitive.microsoft.com/face/v1.0/detect";
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Run inference on every Nth processed frame.
pub const DEFAULT_INFERENCE_INTERVAL: usize = 2;

/// Face size window in pixels (0 = no upper bound).
pub const DEFAULT_MIN_FACE: u32 = 100;
pub const DEFAULT_MAX_FACE: u32 = 300;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
