use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::face_detector::FaceDetector;
use crate::inference::domain::emotion_classifier::{Classification, EmotionClassifier};
use crate::shared::region::Region;

/// Outcome of classifying a still image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageClassification {
    /// Face that was classified; `None` when the whole image was sent.
    pub region: Option<Region>,
    pub classification: Classification,
}

/// Single-image pipeline: read → detect → crop first face → classify.
///
/// Without a detector, or when it finds nothing, the whole image is
/// classified; hosted backends locate the face themselves.
pub struct ClassifyImageUseCase {
    source: Box<dyn FrameSource>,
    detector: Option<Box<dyn FaceDetector>>,
    classifier: Box<dyn EmotionClassifier>,
}

impl ClassifyImageUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Option<Box<dyn FaceDetector>>,
        classifier: Box<dyn EmotionClassifier>,
    ) -> Self {
        Self {
            source,
            detector,
            classifier,
        }
    }

    pub fn execute(&mut self) -> Result<ImageClassification, Box<dyn std::error::Error>> {
        let frame = self.source.read()?;
        if frame.is_empty() {
            return Err(format!("{} contains no image data", self.source.describe()).into());
        }

        let region = match self.detector.as_mut().map(|d| d.detect(&frame)) {
            Some(Ok(regions)) => regions.first().copied(),
            Some(Err(e)) => {
                log::warn!("Face detection failed, classifying whole image: {e}");
                None
            }
            None => None,
        };

        let classification = match region {
            Some(r) => {
                log::info!(
                    "Classifying face {}x{} at ({}, {}) with {}",
                    r.width,
                    r.height,
                    r.x,
                    r.y,
                    self.classifier.name()
                );
                self.classifier.classify(&frame.crop(&r)?)?
            }
            None => {
                log::info!("Classifying whole image with {}", self.classifier.name());
                self.classifier.classify(&frame)?
            }
        };

        Ok(ImageClassification {
            region,
            classification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::frame_source::CaptureError;
    use crate::inference::domain::emotion::Emotion;
    use crate::inference::domain::emotion_classifier::InferenceError;
    use crate::shared::frame::Frame;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubSource {
        frame: Option<Frame>,
    }

    impl FrameSource for StubSource {
        fn describe(&self) -> String {
            "stub.png".into()
        }

        fn read(&mut self) -> Result<Frame, CaptureError> {
            self.frame.take().ok_or(CaptureError::EndOfStream)
        }
    }

    struct StubDetector {
        regions: Vec<Region>,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            Ok(self.regions.clone())
        }
    }

    struct RecordingClassifier {
        sizes: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl EmotionClassifier for RecordingClassifier {
        fn name(&self) -> &str {
            "recording"
        }

        fn classify(&mut self, face: &Frame) -> Result<Classification, InferenceError> {
            self.sizes.lock().unwrap().push((face.width(), face.height()));
            Ok(Classification {
                emotion: Some(Emotion::Contempt),
                score: 0.6,
                elapsed_secs: 0.0,
            })
        }
    }

    fn image() -> Frame {
        Frame::new(vec![90u8; 120 * 80 * 3], 120, 80, 3, 0)
    }

    fn use_case(
        frame: Option<Frame>,
        detector: Option<Vec<Region>>,
    ) -> (ClassifyImageUseCase, Arc<Mutex<Vec<(u32, u32)>>>) {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let detector = detector
            .map(|regions| Box::new(StubDetector { regions }) as Box<dyn FaceDetector>);
        let use_case = ClassifyImageUseCase::new(
            Box::new(StubSource { frame }),
            detector,
            Box::new(RecordingClassifier {
                sizes: sizes.clone(),
            }),
        );
        (use_case, sizes)
    }

    #[test]
    fn test_classifies_first_detected_face() {
        let first = Region::new(10, 10, 40, 30);
        let (mut uc, sizes) = use_case(Some(image()), Some(vec![first, Region::new(0, 0, 5, 5)]));

        let result = uc.execute().unwrap();

        assert_eq!(result.region, Some(first));
        assert_eq!(result.classification.label(), "contempt");
        assert_eq!(*sizes.lock().unwrap(), vec![(40, 30)]);
    }

    #[test]
    fn test_no_detection_classifies_whole_image() {
        let (mut uc, sizes) = use_case(Some(image()), Some(vec![]));
        let result = uc.execute().unwrap();
        assert_eq!(result.region, None);
        assert_eq!(*sizes.lock().unwrap(), vec![(120, 80)]);
    }

    #[test]
    fn test_without_detector_classifies_whole_image() {
        let (mut uc, sizes) = use_case(Some(image()), None);
        uc.execute().unwrap();
        assert_eq!(*sizes.lock().unwrap(), vec![(120, 80)]);
    }

    #[test]
    fn test_invalid_face_region_is_error() {
        let (mut uc, sizes) = use_case(Some(image()), Some(vec![Region::new(500, 500, 10, 10)]));
        assert!(uc.execute().is_err());
        assert!(sizes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_frame_is_error() {
        let (mut uc, _) = use_case(None, None);
        assert!(uc.execute().is_err());
    }
}
