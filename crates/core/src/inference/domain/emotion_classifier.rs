use thiserror::Error;

use crate::inference::domain::emotion::Emotion;
use crate::shared::frame::Frame;
use crate::shared::region::RegionError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one successful classification call.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    /// `None` when the winning category has no entry in the label table.
    pub emotion: Option<Emotion>,
    pub score: f64,
    /// Backend-reported inference time, or the round trip when none is reported.
    pub elapsed_secs: f64,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        self.emotion.map_or("", |e| e.label())
    }
}

/// Inference failures. All of them are recoverable at the pipeline level:
/// the caller keeps its last label and carries on with the next frame.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error(transparent)]
    InvalidRegion(#[from] RegionError),
    #[error("failed to encode face image: {0}")]
    Encode(#[source] BoxError),
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: BoxError,
    },
    #[error("{endpoint} answered with HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("unreadable response: {0}")]
    Decode(#[source] BoxError),
    #[error("no face in response")]
    NoFace,
}

/// Turns a cropped face into an emotion.
///
/// Backends differ in what they send over the wire (a normalized tensor or
/// an encoded image), so the contract takes the color crop and leaves the
/// encoding to the implementation.
pub trait EmotionClassifier: Send {
    fn name(&self) -> &str;

    fn classify(&mut self, face: &Frame) -> Result<Classification, InferenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::region::Region;

    #[test]
    fn test_label_of_unmapped_category_is_empty() {
        let c = Classification {
            emotion: None,
            score: 0.9,
            elapsed_secs: 0.01,
        };
        assert_eq!(c.label(), "");
    }

    #[test]
    fn test_label_of_mapped_category() {
        let c = Classification {
            emotion: Some(Emotion::Fear),
            score: 0.9,
            elapsed_secs: 0.01,
        };
        assert_eq!(c.label(), "fear");
    }

    #[test]
    fn test_region_error_converts_transparently() {
        let err: InferenceError = RegionError::invalid(&Region::new(0, 0, 0, 3)).into();
        assert_eq!(err.to_string(), "invalid region 0x3 at (0, 0)");
    }

    #[test]
    fn test_status_error_message() {
        let err = InferenceError::Status {
            endpoint: "http://localhost:5002/score".into(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "http://localhost:5002/score answered with HTTP 503"
        );
    }
}
