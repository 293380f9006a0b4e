use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use facemood_core::capture::domain::frame_source::FrameSource;
use facemood_core::capture::infrastructure::ffmpeg_capture::FfmpegCapture;
use facemood_core::capture::infrastructure::image_source::ImageSource;
use facemood_core::detection::domain::face_detector::FaceDetector;
use facemood_core::detection::infrastructure::onnx_face_detector::{
    OnnxFaceDetector, DEFAULT_CONFIDENCE,
};
use facemood_core::detection::infrastructure::size_window_detector::SizeWindowDetector;
use facemood_core::inference::domain::emotion_classifier::EmotionClassifier;
use facemood_core::inference::domain::inference_executor::InferenceExecutor;
use facemood_core::inference::infrastructure::cloud_face_client::{
    CloudFaceClient, CloudFaceConfig,
};
use facemood_core::inference::infrastructure::inline_inference_executor::InlineInferenceExecutor;
use facemood_core::inference::infrastructure::scoring_client::{
    ScoringConfig, ScoringServiceClient,
};
use facemood_core::inference::infrastructure::threaded_inference_executor::{
    SupersededResults, ThreadedInferenceExecutor,
};
use facemood_core::output::domain::frame_sink::{FrameSink, NullFrameSink};
use facemood_core::output::infrastructure::snapshot_sink::SnapshotSink;
use facemood_core::pipeline::classify_image_use_case::ClassifyImageUseCase;
use facemood_core::pipeline::frame_pipeline::{FramePipeline, PipelineConfig};
use facemood_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facemood_core::rendering::domain::overlay_renderer::{NullOverlayRenderer, OverlayRenderer};
use facemood_core::rendering::infrastructure::cpu_overlay_renderer::CpuOverlayRenderer;
use facemood_core::shared::constants::{
    DEFAULT_INFERENCE_INTERVAL, DEFAULT_MAX_FACE, DEFAULT_MIN_FACE, DETECTOR_MODEL_NAME,
    DETECTOR_MODEL_URL, IMAGE_EXTENSIONS,
};
use facemood_core::shared::model_resolver;

/// Live face emotion overlay: camera → face detection → emotion scoring → overlay.
#[derive(Parser)]
#[command(name = "facemood")]
struct Cli {
    /// Camera device index.
    #[arg(long, default_value = "0")]
    device: u32,

    /// Read frames from a video or image file instead of the camera.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Emotion backend: scoring (local service) or cloud (hosted face API).
    #[arg(long, default_value = "scoring")]
    backend: String,

    /// Scoring service endpoint (default: $SCOREURI or http://localhost:5002/score).
    #[arg(long)]
    score_uri: Option<String>,

    /// Hosted face API detect endpoint (default: $FACE_API_URI).
    #[arg(long)]
    face_api_uri: Option<String>,

    /// Hosted face API subscription key (default: $FACE_API_KEY).
    #[arg(long)]
    face_api_key: Option<String>,

    /// Face detector ONNX model (default: download into the user cache).
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Smallest face side in pixels.
    #[arg(long, default_value_t = DEFAULT_MIN_FACE)]
    min_face: u32,

    /// Largest face side in pixels (0 = no limit).
    #[arg(long, default_value_t = DEFAULT_MAX_FACE)]
    max_face: u32,

    /// Classify every Nth frame (1 = every frame).
    #[arg(long, default_value_t = DEFAULT_INFERENCE_INTERVAL)]
    inference_interval: usize,

    /// Run classification on a background thread instead of blocking the loop.
    #[arg(long)]
    async_inference: bool,

    /// With --async-inference, still show results for crops that a newer
    /// crop superseded while they were being classified.
    #[arg(long)]
    keep_superseded: bool,

    /// Skip drawing the overlay.
    #[arg(long)]
    headless: bool,

    /// Save the annotated frame to this image file.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Save a snapshot every N frames.
    #[arg(long, default_value = "30")]
    snapshot_every: usize,

    /// Stop after N processed frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// HTTP timeout for emotion requests, in seconds.
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

    /// Classify a single image, print the result and exit.
    #[arg(long)]
    classify_image: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    if let Some(image) = cli.classify_image.clone() {
        return run_classify_image(&cli, &image);
    }
    run_live(&cli)
}

fn run_live(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let detector = build_detector(cli)?;
    let classifier = build_classifier(cli)?;
    log::info!("Emotion backend: {}", classifier.name());

    let executor: Box<dyn InferenceExecutor> = if cli.async_inference {
        let policy = if cli.keep_superseded {
            SupersededResults::Publish
        } else {
            SupersededResults::Discard
        };
        Box::new(ThreadedInferenceExecutor::with_policy(classifier, policy))
    } else {
        Box::new(InlineInferenceExecutor::new(classifier))
    };
    let renderer: Box<dyn OverlayRenderer> = if cli.headless {
        Box::new(NullOverlayRenderer)
    } else {
        Box::new(CpuOverlayRenderer::default())
    };
    let sink: Box<dyn FrameSink> = match &cli.snapshot {
        Some(path) => Box::new(SnapshotSink::new(path, cli.snapshot_every)?),
        None => Box::new(NullFrameSink),
    };

    let source = open_source(cli)?;
    let config = PipelineConfig {
        inference_interval: cli.inference_interval,
        max_frames: cli.max_frames,
        cancelled: Arc::new(AtomicBool::new(false)),
    };

    let mut pipeline = FramePipeline::new(
        source,
        detector,
        executor,
        renderer,
        sink,
        Box::new(StdoutPipelineLogger::default()),
        config,
    )?;
    let summary = pipeline.run()?;

    log::info!(
        "Processed {} frames ({} with a face), {} inferences, {} failed",
        summary.frames_processed,
        summary.frames_with_face,
        summary.inferences_submitted,
        summary.inference_failures
    );
    Ok(())
}

fn run_classify_image(cli: &Cli, image: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source: Box<dyn FrameSource> = Box::new(ImageSource::open(image)?);
    // The hosted API finds faces itself and expects the full picture.
    let detector = match cli.backend.as_str() {
        "cloud" => None,
        _ => Some(build_detector(cli)?),
    };
    let classifier = build_classifier(cli)?;

    let mut use_case = ClassifyImageUseCase::new(source, detector, classifier);
    let result = use_case.execute()?;
    log::info!(
        "Score {:.3} (inference time: {:.3}s)",
        result.classification.score,
        result.classification.elapsed_secs
    );
    println!("probably {}", result.classification.label());
    Ok(())
}

fn open_source(cli: &Cli) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    match &cli.input {
        Some(path) if is_image(path) => Ok(Box::new(ImageSource::open(path)?)),
        Some(path) => Ok(Box::new(FfmpegCapture::open_file(path)?)),
        None => {
            log::info!("Start reading camera device: {}", cli.device);
            Ok(Box::new(FfmpegCapture::open_device(cli.device)?))
        }
    }
}

fn build_detector(cli: &Cli) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let model_path = match &cli.detector_model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {DETECTOR_MODEL_NAME}");
            let path = model_resolver::resolve(
                DETECTOR_MODEL_NAME,
                DETECTOR_MODEL_URL,
                None,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };

    let base: Box<dyn FaceDetector> = Box::new(OnnxFaceDetector::new(&model_path, cli.confidence)?);
    Ok(Box::new(SizeWindowDetector::new(
        base,
        cli.min_face,
        cli.max_face,
    )?))
}

fn build_classifier(cli: &Cli) -> Result<Box<dyn EmotionClassifier>, Box<dyn std::error::Error>> {
    let timeout = Duration::from_secs(cli.timeout_secs);
    match cli.backend.as_str() {
        "cloud" => {
            let mut config = CloudFaceConfig::from_env().with_timeout(timeout);
            if let Some(uri) = &cli.face_api_uri {
                config.endpoint = uri.clone();
            }
            if let Some(key) = &cli.face_api_key {
                config.subscription_key = key.clone();
            }
            if config.subscription_key.is_empty() {
                return Err("The cloud backend needs --face-api-key or FACE_API_KEY".into());
            }
            Ok(Box::new(CloudFaceClient::new(config)?))
        }
        _ => {
            let config = match &cli.score_uri {
                Some(uri) => ScoringConfig::new(uri.as_str()),
                None => ScoringConfig::from_env(),
            }
            .with_timeout(timeout);
            log::info!("Scoring endpoint: {}", config.endpoint);
            Ok(Box::new(ScoringServiceClient::new(config)?))
        }
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.backend != "scoring" && cli.backend != "cloud" {
        return Err(format!(
            "Backend must be 'scoring' or 'cloud', got '{}'",
            cli.backend
        )
        .into());
    }
    if let Some(input) = &cli.input {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    if let Some(image) = &cli.classify_image {
        if !image.exists() {
            return Err(format!("Image not found: {}", image.display()).into());
        }
        if cli.input.is_some() {
            return Err("--classify-image and --input are mutually exclusive".into());
        }
    }
    if let Some(model) = &cli.detector_model {
        if !model.is_file() {
            return Err(format!("Detector model not found: {}", model.display()).into());
        }
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if cli.max_face != 0 && cli.max_face < cli.min_face {
        return Err(format!(
            "Max face size ({}) must be 0 or at least min face size ({})",
            cli.max_face, cli.min_face
        )
        .into());
    }
    if cli.keep_superseded && !cli.async_inference {
        return Err("--keep-superseded requires --async-inference".into());
    }
    if cli.inference_interval == 0 {
        return Err("Inference interval must be at least 1".into());
    }
    if cli.snapshot_every == 0 {
        return Err("Snapshot interval must be at least 1".into());
    }
    if cli.max_frames == Some(0) {
        return Err("Max frames must be at least 1".into());
    }
    if cli.timeout_secs == 0 {
        return Err("Timeout must be at least 1 second".into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
