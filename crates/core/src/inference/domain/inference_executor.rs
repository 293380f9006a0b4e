use crate::inference::domain::emotion_classifier::{Classification, InferenceError};
use crate::shared::frame::Frame;

/// A finished classification, tagged with the submission it answers.
#[derive(Debug)]
pub struct InferenceOutcome {
    /// Monotonic submission number, starting at 1.
    pub generation: u64,
    pub result: Result<Classification, InferenceError>,
}

/// Decides where and when classification runs relative to the frame loop.
///
/// The pipeline submits face crops and later collects whatever has
/// completed. Synchronous executors complete during `submit`; threaded ones
/// complete in the background and may skip crops that were superseded
/// before they started.
pub trait InferenceExecutor: Send {
    /// Queues a face crop and returns its generation number.
    fn submit(&mut self, face: Frame) -> u64;

    /// Takes the newest completed outcome not yet collected, if any.
    fn take_completed(&mut self) -> Option<InferenceOutcome>;
}
