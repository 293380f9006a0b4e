//! YOLO face detector using ONNX Runtime via `ort`.
//!
//! Letterboxes the frame to the model's square input, runs the session,
//! and reduces the raw candidates with greedy NMS. Regions come back in
//! descending confidence order, so the first one is the strongest face.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Fallback input resolution when the model leaves it dynamic.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.25;

const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox padding value (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

#[derive(Error, Debug)]
pub enum DetectorLoadError {
    #[error("detector model not found at {0}")]
    MissingModel(PathBuf),
    #[error("failed to load detector model {path}: {reason}")]
    Session { path: PathBuf, reason: String },
    #[error("confidence threshold must be within 0..=1, got {0}")]
    InvalidConfidence(f64),
}

pub struct OnnxFaceDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxFaceDetector {
    /// Loads the model and reads its input resolution (NCHW).
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, DetectorLoadError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(DetectorLoadError::InvalidConfidence(confidence));
        }
        if !model_path.is_file() {
            return Err(DetectorLoadError::MissingModel(model_path.to_path_buf()));
        }

        let session = build_session(model_path).map_err(|e| DetectorLoadError::Session {
            path: model_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let input_size = input_size_of(&session).unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!(
            "Loaded detector {} (input {input_size}px)",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

fn build_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let session = ort::session::Session::builder()?
        .with_execution_providers(accelerators())?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// Platform accelerator to try before ONNX Runtime's built-in CPU provider.
fn accelerators() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    let providers = vec![ort::execution_providers::CoreMLExecutionProvider::default().build()];
    #[cfg(target_os = "windows")]
    let providers = vec![ort::execution_providers::DirectMLExecutionProvider::default().build()];
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let providers = Vec::new();

    log::debug!("Face detector accelerators requested: {}", providers.len());
    providers
}

fn input_size_of(session: &ort::session::Session) -> Option<u32> {
    let input = session.inputs().first()?;
    match input.dtype() {
        ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
            Some(shape[2] as u32)
        }
        _ => None,
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let (input_tensor, letterbox) = letterbox(frame, self.input_size)?;
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("detector model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut candidates = parse_candidates(self.confidence, data, &shape, &letterbox)?;
        let kept = nms(&mut candidates, NMS_IOU_THRESH);

        Ok(kept
            .iter()
            .map(|c| c.to_region())
            .filter(|r| !r.is_empty())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Mapping between letterboxed model coordinates and frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn unmap_x(&self, x: f64) -> f64 {
        (x - self.pad_x as f64) / self.scale
    }

    fn unmap_y(&self, y: f64) -> f64 {
        (y - self.pad_y as f64) / self.scale
    }
}

/// Letterbox-resize a frame into a `target` × `target` NCHW float tensor.
fn letterbox(
    frame: &Frame,
    target: u32,
) -> Result<(ndarray::Array4<f32>, Letterbox), ndarray::ShapeError> {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let scale = (target as f64 / fw).min(target as f64 / fh);
    let new_w = ((fw * scale).round() as u32).min(target);
    let new_h = ((fh * scale).round() as u32).min(target);
    let pad_x = (target - new_w) / 2;
    let pad_y = (target - new_h) / 2;

    let side = target as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, side, side), PAD_VALUE);

    let src = frame.as_ndarray()?;
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbour sampling.
    for y in 0..new_h as usize {
        let sy = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let sx = ((x as f64 / scale) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, pad_y as usize + y, pad_x as usize + x]] =
                    src[[sy, sx, c]] as f32 / 255.0;
            }
        }
    }

    Ok((tensor, Letterbox { scale, pad_x, pad_y }))
}

/// Reads raw detections above `confidence_threshold` and maps them back
/// to frame coordinates.
fn parse_candidates(
    confidence_threshold: f64,
    data: &[f32],
    shape: &[usize],
    letterbox: &Letterbox,
) -> Result<Vec<Candidate>, Box<dyn std::error::Error>> {
    // Output is [1, features, detections] or [1, detections, features].
    if shape.len() != 3 {
        return Err(format!("Unexpected detector output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 {
        return Ok(Vec::new());
    }

    let at = |det: usize, feat: usize| -> f64 {
        let i = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[i] as f64
    };

    let mut candidates = Vec::new();
    for det in 0..num_dets {
        let confidence = at(det, 4);
        if confidence < confidence_threshold {
            continue;
        }
        let (cx, cy, w, h) = (at(det, 0), at(det, 1), at(det, 2), at(det, 3));
        candidates.push(Candidate {
            x1: letterbox.unmap_x(cx - w / 2.0),
            y1: letterbox.unmap_y(cy - h / 2.0),
            x2: letterbox.unmap_x(cx + w / 2.0),
            y2: letterbox.unmap_y(cy + h / 2.0),
            confidence,
        });
    }
    Ok(candidates)
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Candidate {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
}

impl Candidate {
    fn bbox(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    fn to_region(&self) -> Region {
        let x = self.x1.round() as i32;
        let y = self.y1.round() as i32;
        Region::new(
            x,
            y,
            self.x2.round() as i32 - x,
            self.y2.round() as i32 - y,
        )
    }
}

/// Greedy NMS: highest confidence first, drop anything overlapping a keeper.
fn nms(candidates: &mut [Candidate], iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates.iter() {
        let overlaps = keep
            .iter()
            .any(|k| bbox_iou(&k.bbox(), &candidate.bbox()) > iou_thresh);
        if !overlaps {
            keep.push(candidate.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = inter_w * inter_h;
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}
