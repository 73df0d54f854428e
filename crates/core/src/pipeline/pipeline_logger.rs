use std::collections::HashMap;
use std::time::Instant;

/// Running aggregate for one timing or metric series.
///
/// Only count, sum and max are kept, so memory stays constant however
/// long the stream runs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
}

impl SeriesStats {
    fn record(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Cross-cutting logger for capture loop events.
///
/// Decouples the loop from specific output mechanisms so callers can
/// observe throughput and per-stage cost without touching orchestration.
pub trait PipelineLogger: Send {
    /// Called once per processed frame with the running total.
    fn progress(&mut self, frames: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. detections per frame).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _frames: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that tracks per-stage timing and metrics and
/// reports a summary when the loop stops.
///
/// Live streams have no known length, so progress is a heartbeat logged
/// every `heartbeat_frames` frames.
pub struct StdoutPipelineLogger {
    heartbeat_frames: usize,
    timings: HashMap<String, SeriesStats>,
    metrics: HashMap<String, SeriesStats>,
    start_time: Instant,
    frames: usize,
}

impl StdoutPipelineLogger {
    pub fn new(heartbeat_frames: usize) -> Self {
        Self {
            heartbeat_frames: heartbeat_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames;
        let mut lines = vec![format!(
            "Capture summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stats = &self.timings[stage];
            let total_ms = stats.sum;
            let avg_ms = stats.mean();
            let max_ms = stats.max;
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:8}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)  n={}",
                stats.count
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            lines.push(format!("  {name}: avg {:.1}", self.metrics[name].mean()));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<SeriesStats> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<SeriesStats> {
        self.metrics.get(name).copied()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, frames: usize) {
        self.frames = frames;
        if frames > 0 && frames % self.heartbeat_frames == 0 {
            let secs = self.start_time.elapsed().as_secs_f64();
            let fps = if secs > 0.0 { frames as f64 / secs } else { 0.0 };
            log::info!("Processed {frames} frames ({fps:.1} fps)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1);
        logger.timing("detect", 5.0);
        logger.metric("detections", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("alert", 5.0);

        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count, 2);
        assert_relative_eq!(detect.sum, 50.0);
        assert_relative_eq!(detect.max, 30.0);
        assert_eq!(logger.timings_for("alert").unwrap().count, 1);
        assert!(logger.timings_for("read").is_none());
    }

    #[test]
    fn test_metric_average_in_summary() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(2);
        logger.metric("detections", 3.0);
        logger.metric("detections", 4.0);

        assert_relative_eq!(logger.metrics_for("detections").unwrap().mean(), 3.5);
        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("detections: avg 3.5"));
    }

    #[test]
    fn test_summary_lists_stages_and_throughput() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(100);
        logger.timing("read", 1.0);
        logger.timing("detect", 10.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Capture summary (100 frames"));
        assert!(summary.contains("read"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_latest_count() {
        let mut logger = StdoutPipelineLogger::new(10);
        for i in 1..=25 {
            logger.progress(i);
        }
        assert_eq!(logger.frames(), 25);
    }

    #[test]
    fn test_long_stream_keeps_constant_state() {
        let mut logger = StdoutPipelineLogger::new(1_000);
        for i in 1..=200_000usize {
            logger.timing("read", 1.0);
            logger.timing("detect", (i % 7) as f64);
            logger.metric("detections", 2.0);
            logger.progress(i);
        }

        assert_eq!(logger.timings.len(), 2);
        assert_eq!(logger.metrics.len(), 1);
        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count, 200_000);
        assert_relative_eq!(detect.max, 6.0);
        assert_relative_eq!(logger.timings_for("read").unwrap().mean(), 1.0);
        assert!(logger.summary_string().unwrap().contains("n=200000"));
    }

    #[test]
    fn test_series_stats_mean_of_empty_is_zero() {
        assert_relative_eq!(SeriesStats::default().mean(), 0.0);
    }

    #[test]
    fn test_zero_heartbeat_clamped() {
        assert_eq!(StdoutPipelineLogger::new(0).heartbeat_frames, 1);
        assert_eq!(StdoutPipelineLogger::default().heartbeat_frames, 100);
    }
}
