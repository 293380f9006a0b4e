use std::path::{Path, PathBuf};

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::frame::Frame;

/// Serves a single still image as a one-frame stream.
pub struct ImageSource {
    path: PathBuf,
    frame: Option<Frame>,
}

impl ImageSource {
    /// Decodes the image eagerly so a bad file fails at startup.
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let img = image::open(path).map_err(|e| CaptureError::Open {
            target: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let frame = Frame::new(rgb.into_raw(), width, height, 3, 0);

        Ok(Self {
            path: path.to_path_buf(),
            frame: Some(frame),
        })
    }
}

impl FrameSource for ImageSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        self.frame.take().ok_or(CaptureError::EndOfStream)
    }
}
