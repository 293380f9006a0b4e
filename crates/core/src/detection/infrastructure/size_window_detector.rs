use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Decorator that drops regions whose sides fall outside `[min_side, max_side]`.
///
/// `max_side == 0` disables the upper bound. Order of the surviving regions
/// is preserved.
pub struct SizeWindowDetector {
    inner: Box<dyn FaceDetector>,
    min_side: u32,
    max_side: u32,
}

impl SizeWindowDetector {
    pub fn new(
        inner: Box<dyn FaceDetector>,
        min_side: u32,
        max_side: u32,
    ) -> Result<Self, &'static str> {
        if max_side != 0 && max_side < min_side {
            return Err("max face size must be 0 or >= min face size");
        }
        Ok(Self {
            inner,
            min_side,
            max_side,
        })
    }
}

impl FaceDetector for SizeWindowDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        let mut regions = self.inner.detect(frame)?;
        let before = regions.len();
        regions.retain(|r| r.fits_size(self.min_side, self.max_side));
        if regions.len() < before {
            log::trace!(
                "Frame {}: dropped {} region(s) outside {}..{} px",
                frame.index(),
                before - regions.len(),
                self.min_side,
                self.max_side
            );
        }
        Ok(regions)
    }
}
