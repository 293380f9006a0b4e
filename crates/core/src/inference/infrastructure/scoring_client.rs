use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use crate::inference::domain::emotion::{argmax, Emotion};
use crate::inference::domain::emotion_classifier::{
    Classification, EmotionClassifier, InferenceError,
};
use crate::inference::domain::tensor::NormalizedTensor;
use crate::shared::constants::{DEFAULT_SCORE_URI, SCORE_URI_ENV};
use crate::shared::frame::Frame;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the scoring service lives and how long to wait for it.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoringConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl ScoringConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads `SCOREURI`, falling back to the local service when unset or empty.
    pub fn from_env() -> Self {
        Self::from_override(std::env::var(SCORE_URI_ENV).ok())
    }

    fn from_override(value: Option<String>) -> Self {
        match value {
            Some(uri) if !uri.trim().is_empty() => Self::new(uri.trim()),
            _ => Self::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SCORE_URI)
    }
}

/// Request body: `{"data": [[[[u8; 64]; 64]]]}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub data: NormalizedTensor,
}

/// Response body: one score per category plus server-side inference time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub result: Vec<f64>,
    pub time: f64,
}

impl ScoreResponse {
    pub fn decide(&self) -> Classification {
        let (index, score) = argmax(&self.result);
        log::debug!(
            "Highest score {score} at {index} (inference time: {}s)",
            self.time
        );
        Classification {
            emotion: Emotion::from_index(index),
            score,
            elapsed_secs: self.time,
        }
    }
}

/// Client for the local emotion scoring service (JSON over HTTP, no auth).
pub struct ScoringServiceClient {
    config: ScoringConfig,
    http: reqwest::blocking::Client,
}

impl ScoringServiceClient {
    pub fn new(config: ScoringConfig) -> Result<Self, InferenceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InferenceError::Transport {
                endpoint: config.endpoint.clone(),
                source: Box::new(e),
            })?;
        Ok(Self { config, http })
    }

    /// Posts one tensor and returns the raw scores.
    pub fn score(&self, tensor: &NormalizedTensor) -> Result<ScoreResponse, InferenceError> {
        let endpoint = &self.config.endpoint;
        let transport = |e: reqwest::Error| InferenceError::Transport {
            endpoint: endpoint.clone(),
            source: Box::new(e),
        };

        let body = serde_json::to_vec(&ScoreRequest {
            data: tensor.clone(),
        })
        .map_err(|e| InferenceError::Encode(Box::new(e)))?;

        let response = self
            .http
            .post(endpoint.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
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

impl EmotionClassifier for ScoringServiceClient {
    fn name(&self) -> &str {
        "scoring-service"
    }

    fn classify(&mut self, face: &Frame) -> Result<Classification, InferenceError> {
        let tensor = NormalizedTensor::from_face(face)?;
        Ok(self.score(&tensor)?.decide())
    }
}
