use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Locates face rectangles in a frame.
///
/// Regions are returned in the detector's own priority order; the pipeline
/// only consumes the first one. `&mut self` leaves room for detectors that
/// keep per-frame state.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>>;
}
