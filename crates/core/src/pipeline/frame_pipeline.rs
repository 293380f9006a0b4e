use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::detection::domain::face_detector::FaceDetector;
use crate::inference::domain::inference_executor::{InferenceExecutor, InferenceOutcome};
use crate::output::domain::frame_sink::FrameSink;
use crate::rendering::domain::overlay_renderer::OverlayRenderer;
use crate::shared::constants::DEFAULT_INFERENCE_INTERVAL;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::display_state::DisplayState;
use super::pipeline_logger::{PipelineLogger, Stage};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(&'static str),
}

pub struct PipelineConfig {
    /// Classify on every Nth processed frame (2 = every other frame).
    pub inference_interval: usize,
    /// Stop after this many processed frames.
    pub max_frames: Option<usize>,
    pub cancelled: Arc<AtomicBool>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inference_interval: DEFAULT_INFERENCE_INTERVAL,
            max_frames: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// What a single [`FramePipeline::step`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The source handed out an empty frame; nothing was counted.
    Skipped,
    /// No face in the frame; the overlay was cleared.
    NoFace,
    /// A face was found; `submitted` tells whether it was sent for inference.
    Face { submitted: bool },
    EndOfStream,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: usize,
    pub frames_with_face: usize,
    pub inferences_submitted: usize,
    pub labels_applied: usize,
    pub inference_failures: usize,
}

/// Drives capture → detect → normalize → infer → render → sink.
///
/// Owns the frame-skip counter and the cached [`DisplayState`]. Recoverable
/// failures (detector errors, unusable crops, inference errors, sink
/// errors) are logged and leave the previous label on screen; only capture
/// errors end the run with an error.
pub struct FramePipeline {
    source: Box<dyn FrameSource>,
    detector: Box<dyn FaceDetector>,
    executor: Box<dyn InferenceExecutor>,
    renderer: Box<dyn OverlayRenderer>,
    sink: Box<dyn FrameSink>,
    logger: Box<dyn PipelineLogger>,
    config: PipelineConfig,
    state: DisplayState,
    frame_count: usize,
    last_submitted: u64,
    /// Outcomes up to this generation were superseded by a no-face frame.
    cleared_through: u64,
    summary: RunSummary,
}

impl FramePipeline {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        executor: Box<dyn InferenceExecutor>,
        renderer: Box<dyn OverlayRenderer>,
        sink: Box<dyn FrameSink>,
        logger: Box<dyn PipelineLogger>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        if config.inference_interval < 1 {
            return Err(PipelineError::InvalidConfig(
                "inference interval must be >= 1",
            ));
        }
        Ok(Self {
            source,
            detector,
            executor,
            renderer,
            sink,
            logger,
            config,
            state: DisplayState::default(),
            frame_count: 0,
            last_submitted: 0,
            cleared_through: 0,
            summary: RunSummary::default(),
        })
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Runs until end of stream, the frame cap, or the stop flag.
    pub fn run(&mut self) -> Result<RunSummary, PipelineError> {
        self.logger
            .info(&format!("Reading frames from {}", self.source.describe()));

        let result = loop {
            if self.config.cancelled.load(Ordering::Relaxed) {
                self.logger.info("Stop requested");
                break Ok(());
            }
            if self
                .config
                .max_frames
                .is_some_and(|max| self.frame_count >= max)
            {
                break Ok(());
            }
            match self.step() {
                Ok(StepOutcome::EndOfStream) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(e),
            }
        };

        self.logger.summary();
        result.map(|()| self.summary)
    }

    /// Processes one captured frame.
    pub fn step(&mut self) -> Result<StepOutcome, PipelineError> {
        let t0 = Instant::now();
        let mut frame = match self.source.read() {
            Ok(frame) => frame,
            Err(CaptureError::EndOfStream) => return Ok(StepOutcome::EndOfStream),
            Err(e) => return Err(e.into()),
        };
        self.logger.timing(Stage::Capture, elapsed_ms(t0));

        if frame.is_empty() {
            return Ok(StepOutcome::Skipped);
        }

        let t0 = Instant::now();
        let regions = match self.detector.detect(&frame) {
            Ok(regions) => regions,
            Err(e) => {
                log::warn!("Face detection failed on frame {}: {e}", frame.index());
                self.logger.count("detector_failures");
                Vec::new()
            }
        };
        self.logger.timing(Stage::Detect, elapsed_ms(t0));

        self.frame_count += 1;
        self.summary.frames_processed = self.frame_count;

        let t0 = Instant::now();
        let outcome = match regions.first() {
            None => {
                self.state.clear();
                self.cleared_through = self.last_submitted;
                StepOutcome::NoFace
            }
            Some(&region) => {
                self.summary.frames_with_face += 1;
                self.state.track(region);

                let due = self.frame_count % self.config.inference_interval == 0;
                let submitted = due && self.submit_crop(&frame, region);
                StepOutcome::Face { submitted }
            }
        };
        self.collect_completed();
        self.logger.timing(Stage::Infer, elapsed_ms(t0));

        let t0 = Instant::now();
        self.renderer.render(&mut frame, &self.state);
        if let Err(e) = self.sink.write(&frame) {
            log::warn!("Frame sink failed on frame {}: {e}", frame.index());
            self.logger.count("sink_failures");
        }
        self.logger.timing(Stage::Render, elapsed_ms(t0));

        self.logger.progress(self.frame_count, self.config.max_frames);
        Ok(outcome)
    }

    /// Crops the face and hands it to the executor; false if the crop is unusable.
    fn submit_crop(&mut self, frame: &Frame, region: Region) -> bool {
        match frame.crop(&region) {
            Ok(face) => {
                self.last_submitted = self.executor.submit(face);
                self.summary.inferences_submitted += 1;
                self.logger.count("inferences");
                true
            }
            Err(e) => {
                log::debug!("Skipping inference on frame {}: {e}", frame.index());
                self.logger.count("invalid_regions");
                false
            }
        }
    }

    fn collect_completed(&mut self) {
        let Some(InferenceOutcome { generation, result }) = self.executor.take_completed() else {
            return;
        };
        if generation <= self.cleared_through {
            log::debug!("Ignoring inference #{generation}: face left the frame");
            return;
        }
        match result {
            Ok(classification) => {
                log::debug!(
                    "Inference #{generation}: {:?} ({:.3}, {:.3}s)",
                    classification.label(),
                    classification.score,
                    classification.elapsed_secs
                );
                self.state.set_emotion(classification.emotion);
                self.summary.labels_applied += 1;
            }
            Err(e) => {
                log::warn!("Inference #{generation} failed: {e}");
                self.summary.inference_failures += 1;
                self.logger.count("inference_failures");
            }
        }
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
