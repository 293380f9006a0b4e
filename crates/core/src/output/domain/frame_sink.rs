use crate::shared::frame::Frame;

/// Receives each annotated frame once rendering is done.
pub trait FrameSink: Send {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}

/// Discards frames.
pub struct NullFrameSink;

impl FrameSink for NullFrameSink {
    fn write(&mut self, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}
