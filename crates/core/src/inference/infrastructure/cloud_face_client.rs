use std::collections::BTreeMap;
use std::io::Cursor;
use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::inference::domain::emotion::{strongest, Emotion};
use crate::inference::domain::emotion_classifier::{
    Classification, EmotionClassifier, InferenceError,
};
use crate::shared::constants::{
    DEFAULT_FACE_API_URI, FACE_API_KEY_ENV, FACE_API_URI_ENV, SUBSCRIPTION_KEY_HEADER,
};
use crate::shared::frame::Frame;
use crate::shared::region::{Region, RegionError};

use super::scoring_client::DEFAULT_TIMEOUT;

#[derive(Clone, Debug, PartialEq)]
pub struct CloudFaceConfig {
    pub endpoint: String,
    pub subscription_key: String,
    pub timeout: Duration,
}

impl CloudFaceConfig {
    pub fn new(endpoint: impl Into<String>, subscription_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            subscription_key: subscription_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads `FACE_API_URI` and `FACE_API_KEY`; the URI defaults to the public endpoint.
    pub fn from_env() -> Self {
        let endpoint = std::env::var(FACE_API_URI_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FACE_API_URI.to_string());
        let key = std::env::var(FACE_API_KEY_ENV).unwrap_or_default();
        Self::new(endpoint, key)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRectangle {
    pub top: i32,
    pub left: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct FaceAttributes {
    #[serde(default)]
    pub emotion: BTreeMap<String, f64>,
}

/// One entry of the detect endpoint's response array.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRecord {
    #[serde(default)]
    pub face_id: String,
    #[serde(default)]
    pub face_rectangle: FaceRectangle,
    #[serde(default)]
    pub face_attributes: FaceAttributes,
}

/// Picks the strongest emotion of the first face in the response.
///
/// Scores are scanned in name order, so equal scores resolve the same way
/// on every call.
pub fn decide(faces: &[FaceRecord], elapsed_secs: f64) -> Result<Classification, InferenceError> {
    let first = faces.first().ok_or(InferenceError::NoFace)?;
    let emotions = &first.face_attributes.emotion;
    let winner = strongest(emotions.iter().map(|(name, &score)| (name.as_str(), score)));

    if let Some((name, score)) = winner {
        log::debug!("Face {} strongest emotion {name} ({score})", first.face_id);
    }
    Ok(Classification {
        emotion: winner.and_then(|(name, _)| Emotion::from_name(name)),
        score: winner.map_or(0.0, |(_, score)| score),
        elapsed_secs,
    })
}

/// Client for a hosted face detection API that returns per-face emotion scores.
///
/// Sends the face crop as JPEG bytes with a subscription key header.
pub struct CloudFaceClient {
    config: CloudFaceConfig,
    http: reqwest::blocking::Client,
}

impl CloudFaceClient {
    pub fn new(config: CloudFaceConfig) -> Result<Self, InferenceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InferenceError::Transport {
                endpoint: config.endpoint.clone(),
                source: Box::new(e),
            })?;
        Ok(Self { config, http })
    }

    /// Posts encoded image bytes and returns every face the service found.
    pub fn detect(&self, image_bytes: Vec<u8>) -> Result<Vec<FaceRecord>, InferenceError> {
        let endpoint = &self.config.endpoint;
        let transport = |e: reqwest::Error| InferenceError::Transport {
            endpoint: endpoint.clone(),
            source: Box::new(e),
        };

        let response = self
            .http
            .post(endpoint.as_str())
            .query(&[("returnFaceAttributes", "emotion")])
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.subscription_key)
            .body(image_bytes)
            .send()
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Status {
                endpoint: endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(transport)?;
        serde_json::from_slice(&bytes).map_err(|e| InferenceError::Decode(Box::new(e)))
    }
}

impl EmotionClassifier for CloudFaceClient {
    fn name(&self) -> &str {
        "cloud-face-api"
    }

    fn classify(&mut self, face: &Frame) -> Result<Classification, InferenceError> {
        let started = Instant::now();
        let jpeg = encode_jpeg(face)?;
        let faces = self.detect(jpeg)?;
        decide(&faces, started.elapsed().as_secs_f64())
    }
}

fn encode_jpeg(face: &Frame) -> Result<Vec<u8>, InferenceError> {
    if face.is_empty() {
        let area = Region::new(0, 0, face.width() as i32, face.height() as i32);
        return Err(RegionError::invalid(&area).into());
    }
    let img = image::RgbImage::from_raw(face.width(), face.height(), face.data().to_vec())
        .ok_or_else(|| InferenceError::Encode("frame is not packed RGB".into()))?;

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Jpeg)
        .map_err(|e| InferenceError::Encode(Box::new(e)))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;
    use approx::assert_relative_eq;

    const TWO_FACES: &[u8] = br#"[
        {"faceId": "a1", "faceRectangle": {"top": 10, "left": 20, "width": 50, "height": 60},
         "faceAttributes": {"emotion": {"anger": 0.01, "happiness": 0.93, "neutral": 0.06}}},
        {"faceId": "b2", "faceRectangle": {"top": 0, "left": 0, "width": 10, "height": 10},
         "faceAttributes": {"emotion": {"sadness": 0.99}}}
    ]"#;

    fn face() -> Frame {
        Frame::new(vec![128u8; 32 * 32 * 3], 32, 32, 3, 0)
    }

    fn client_for(server: &StubServer) -> CloudFaceClient {
        CloudFaceClient::new(CloudFaceConfig::new(server.url(), "secret-key")).unwrap()
    }

    #[test]
    fn test_first_face_strongest_emotion_wins() {
        let server = StubServer::respond_once(200, "application/json", TWO_FACES);
        let mut client = client_for(&server);

        let classification = client.classify(&face()).unwrap();
        let request = server.join();

        assert_eq!(classification.emotion, Some(Emotion::Happy));
        assert_relative_eq!(classification.score, 0.93);

        assert!(request
            .request_line
            .contains("?returnFaceAttributes=emotion"));
        assert_eq!(
            request.headers["content-type"],
            "application/octet-stream"
        );
        assert_eq!(
            request.headers["ocp-apim-subscription-key"],
            "secret-key"
        );
        // JPEG SOI marker
        assert_eq!(&request.body[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_empty_face_list_is_no_face() {
        let server = StubServer::respond_once(200, "application/json", b"[]");
        let mut client = client_for(&server);
        let err = client.classify(&face()).unwrap_err();
        server.join();
        assert!(matches!(err, InferenceError::NoFace));
    }

    #[test]
    fn test_error_object_is_decode_error() {
        let server = StubServer::respond_once(
            200,
            "application/json",
            br#"{"error": {"code": "Unspecified"}}"#,
        );
        let mut client = client_for(&server);
        let err = client.classify(&face()).unwrap_err();
        server.join();
        assert!(matches!(err, InferenceError::Decode(_)));
    }

    #[test]
    fn test_unauthorized_is_status_error() {
        let server = StubServer::respond_once(401, "application/json", b"{}");
        let mut client = client_for(&server);
        let err = client.classify(&face()).unwrap_err();
        server.join();
        assert!(matches!(err, InferenceError::Status { status: 401, .. }));
    }

    #[test]
    fn test_decide_ties_resolve_by_name_order() {
        let faces: Vec<FaceRecord> = serde_json::from_str(
            r#"[{"faceAttributes": {"emotion": {"surprise": 0.5, "fear": 0.5}}}]"#,
        )
        .unwrap();
        let classification = decide(&faces, 0.0).unwrap();
        assert_eq!(classification.emotion, Some(Emotion::Fear));
    }

    #[test]
    fn test_decide_unknown_name_has_empty_label() {
        let faces: Vec<FaceRecord> =
            serde_json::from_str(r#"[{"faceAttributes": {"emotion": {"smug": 0.7}}}]"#).unwrap();
        let classification = decide(&faces, 0.0).unwrap();
        assert_eq!(classification.label(), "");
        assert_relative_eq!(classification.score, 0.7);
    }

    #[test]
    fn test_encode_rejects_empty_face() {
        let err = encode_jpeg(&Frame::empty(0)).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidRegion(_)));
    }
}
