use crate::inference::domain::emotion_classifier::EmotionClassifier;
use crate::inference::domain::inference_executor::{InferenceExecutor, InferenceOutcome};
use crate::shared::frame::Frame;

/// Classifies on the calling thread; the frame loop waits for the backend.
pub struct InlineInferenceExecutor {
    classifier: Box<dyn EmotionClassifier>,
    generation: u64,
    completed: Option<InferenceOutcome>,
}

impl InlineInferenceExecutor {
    pub fn new(classifier: Box<dyn EmotionClassifier>) -> Self {
        Self {
            classifier,
            generation: 0,
            completed: None,
        }
    }
}

impl InferenceExecutor for InlineInferenceExecutor {
    fn submit(&mut self, face: Frame) -> u64 {
        self.generation += 1;
        let result = self.classifier.classify(&face);
        self.completed = Some(InferenceOutcome {
            generation: self.generation,
            result,
        });
        self.generation
    }

    fn take_completed(&mut self) -> Option<InferenceOutcome> {
        self.completed.take()
    }
}
