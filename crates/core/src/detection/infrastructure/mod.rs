pub mod onnx_face_detector;
pub mod size_window_detector;
