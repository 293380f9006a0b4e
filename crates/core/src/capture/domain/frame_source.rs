use crate::shared::frame::Frame;

/// Why a frame could not be captured.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("cannot open {target}: {reason}")]
    Open { target: String, reason: String },
    #[error("capture device {target} failed: {reason}")]
    Device { target: String, reason: String },
    #[error("cannot decode frame from {target}: {reason}")]
    Decode { target: String, reason: String },
    #[error("end of stream")]
    EndOfStream,
}

impl CaptureError {
    /// Device and decode failures end the run; end of stream is a normal stop.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, CaptureError::EndOfStream)
    }
}

/// Produces frames in capture order.
///
/// A source may hand out empty frames (e.g. while a camera warms up); the
/// pipeline skips those. Running out of frames is reported as
/// [`CaptureError::EndOfStream`].
pub trait FrameSource: Send {
    /// Human-readable name of the device or file, for logs.
    fn describe(&self) -> String;

    fn read(&mut self) -> Result<Frame, CaptureError>;
}
