use std::collections::BTreeMap;
use std::time::Instant;

/// Per-frame stages the controller times.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Capture,
    Detect,
    Infer,
    Render,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Capture => "capture",
            Stage::Detect => "detect",
            Stage::Infer => "infer",
            Stage::Render => "render",
        }
    }
}

/// Cross-cutting observer for frame loop events.
///
/// Keeps the controller free of any particular output mechanism; the CLI
/// reports through `log`, tests use the null logger.
pub trait PipelineLogger: Send {
    /// Called after each processed frame. `limit` is the frame cap, if any.
    fn progress(&mut self, processed: usize, limit: Option<usize>);

    /// Record how long a stage took for one frame.
    fn timing(&mut self, stage: Stage, duration_ms: f64);

    /// Bump a named event counter (e.g. `inference_failures`).
    fn count(&mut self, event: &str);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _processed: usize, _limit: Option<usize>) {}
    fn timing(&mut self, _stage: Stage, _duration_ms: f64) {}
    fn count(&mut self, _event: &str) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI logger: accumulates stage timings and event counts, reports progress
/// every `throttle_frames` frames and prints a summary at the end.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<Stage, Vec<f64>>,
    counts: BTreeMap<String, usize>,
    start_time: Instant,
    processed: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            counts: BTreeMap::new(),
            start_time: Instant::now(),
            processed: 0,
        }
    }

    /// Formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.counts.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.processed;
        let mut lines = vec![format!(
            "Run summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {:8}: avg {avg_ms:6.1}ms  max {max_ms:7.1}ms  total {total_ms:7.0}ms",
                stage.name()
            ));
        }

        for (event, count) in &self.counts {
            lines.push(format!("  {event}: {count}"));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: Stage) -> Option<&[f64]> {
        self.timings.get(&stage).map(|v| v.as_slice())
    }

    pub fn count_of(&self, event: &str) -> usize {
        self.counts.get(event).copied().unwrap_or(0)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, processed: usize, limit: Option<usize>) {
        self.processed = processed;
        if processed % self.throttle_frames != 0 && Some(processed) != limit {
            return;
        }
        match limit {
            Some(limit) if limit > 0 => {
                let pct = processed as f64 / limit as f64 * 100.0;
                log::info!("Processed {processed}/{limit} frames ({pct:.1}%)");
            }
            _ => log::info!("Processed {processed} frames"),
        }
    }

    fn timing(&mut self, stage: Stage, duration_ms: f64) {
        self.timings.entry(stage).or_default().push(duration_ms);
    }

    fn count(&mut self, event: &str) {
        *self.counts.entry(event.to_string()).or_default() += 1;
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
