use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::alerting::alert_writer::AlertWriter;
use crate::alerting::domain::temporal_confirmer::TemporalConfirmer;
use crate::detection::domain::hit_policy::HitPolicy;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::frame::Frame;
use crate::video::domain::camera_source::CameraSource;
use crate::video::domain::frame_source::{CaptureHints, FrameSource};

use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::preview::{NullPreview, PreviewSink};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("cannot open {camera}: {message}")]
    SourceOpen { camera: String, message: String },
    #[error("capture loop has already run")]
    AlreadyRan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Initializing,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    ReadError,
    StopRequested,
}

/// What happened during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub hits: usize,
    pub confirmations: usize,
    pub alerts_written: usize,
    pub alert_failures: usize,
    pub detector_failures: usize,
    pub stop_reason: StopReason,
}

#[derive(Default)]
struct Tally {
    frames: usize,
    hits: usize,
    confirmations: usize,
    alerts_written: usize,
    alert_failures: usize,
    detector_failures: usize,
}

impl Tally {
    fn finish(self, stop_reason: StopReason) -> RunSummary {
        RunSummary {
            frames: self.frames,
            hits: self.hits,
            confirmations: self.confirmations,
            alerts_written: self.alerts_written,
            alert_failures: self.alert_failures,
            detector_failures: self.detector_failures,
            stop_reason,
        }
    }
}

/// Where to capture from and at what inference size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    pub camera: CameraSource,
    pub hints: CaptureHints,
    pub imgsz: u32,
}

/// Single-threaded read → detect → confirm → alert loop.
///
/// Each frame is processed to completion before the next read. The stop
/// flag is the only state shared with other threads and is polled after
/// every frame. A loop runs once; after it stops it cannot be restarted.
pub struct CaptureLoop {
    settings: CaptureSettings,
    source: Box<dyn FrameSource>,
    detector: Box<dyn ObjectDetector>,
    policy: HitPolicy,
    confirmer: TemporalConfirmer,
    alert_writer: AlertWriter,
    preview: Box<dyn PreviewSink>,
    logger: Box<dyn PipelineLogger>,
    stop: Arc<AtomicBool>,
    state: LoopState,
}

impl CaptureLoop {
    pub fn new(
        settings: CaptureSettings,
        source: Box<dyn FrameSource>,
        detector: Box<dyn ObjectDetector>,
        policy: HitPolicy,
        confirmer: TemporalConfirmer,
        alert_writer: AlertWriter,
    ) -> Self {
        Self {
            settings,
            source,
            detector,
            policy,
            confirmer,
            alert_writer,
            preview: Box::new(NullPreview),
            logger: Box::new(NullPipelineLogger),
            stop: Arc::new(AtomicBool::new(false)),
            state: LoopState::Initializing,
        }
    }

    pub fn with_preview(mut self, preview: Box<dyn PreviewSink>) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Shares an externally owned stop flag (e.g. set by a signal handler).
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Runs until end of stream, a read error or a stop request.
    ///
    /// Only a failure to open the source is returned as an error; per-frame
    /// and per-alert failures are logged and counted in the summary.
    pub fn run(&mut self) -> Result<RunSummary, CaptureError> {
        if self.state != LoopState::Initializing {
            return Err(CaptureError::AlreadyRan);
        }

        let info = match self.source.open(&self.settings.camera, self.settings.hints) {
            Ok(info) => info,
            Err(e) => {
                self.state = LoopState::Stopped;
                return Err(CaptureError::SourceOpen {
                    camera: self.settings.camera.to_string(),
                    message: e.to_string(),
                });
            }
        };
        self.logger.info(&format!("Capturing from {}", info.describe()));
        self.state = LoopState::Running;

        let mut tally = Tally::default();
        let reason = loop {
            let t0 = Instant::now();
            let frame = match self.source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("End of stream after {} frames", tally.frames);
                    break StopReason::EndOfStream;
                }
                Err(e) => {
                    log::warn!("Frame read failed, stopping: {e}");
                    break StopReason::ReadError;
                }
            };
            self.logger.timing("read", elapsed_ms(t0));

            tally.frames += 1;
            self.process_frame(&frame, &mut tally);
            self.logger.progress(tally.frames);

            if self.stop.load(Ordering::Relaxed) {
                log::info!("Stop requested");
                break StopReason::StopRequested;
            }
        };

        self.shutdown();
        let summary = tally.finish(reason);
        log::info!(
            "Stopped ({:?}): {} frames, {} hits, {} confirmations, {} alerts written, {} alert failures, {} detector failures",
            summary.stop_reason,
            summary.frames,
            summary.hits,
            summary.confirmations,
            summary.alerts_written,
            summary.alert_failures,
            summary.detector_failures,
        );
        Ok(summary)
    }

    fn process_frame(&mut self, frame: &Frame, tally: &mut Tally) {
        let t0 = Instant::now();
        let detections = match self.detector.detect(frame, self.settings.imgsz) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("Detection failed on frame {}, skipping: {e}", frame.index());
                tally.detector_failures += 1;
                return;
            }
        };
        self.logger.timing("detect", elapsed_ms(t0));
        self.logger.metric("detections", detections.len() as f64);

        let hit = self.policy.is_hit(&detections);
        if hit {
            tally.hits += 1;
        }

        if self.confirmer.observe(hit) {
            tally.confirmations += 1;
            log::info!("Event confirmed at frame {}", frame.index());
            let t0 = Instant::now();
            match self.alert_writer.maybe_write_alert(frame) {
                Some(_) => tally.alerts_written += 1,
                None => tally.alert_failures += 1,
            }
            self.logger.timing("alert", elapsed_ms(t0));
        }

        if let Err(e) = self.preview.show(frame, &detections) {
            log::warn!("Preview update failed: {e}");
        }
    }

    fn shutdown(&mut self) {
        self.source.close();
        self.preview.close();
        self.logger.summary();
        self.state = LoopState::Stopped;
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::domain::clock::Clock;
    use crate::detection::domain::detection::{BoundingBox, Detection};
    use crate::shared::stream_info::StreamInfo;
    use crate::video::domain::image_writer::ImageWriter;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    // --- Stubs ---

    struct StubSource {
        frames: Vec<Frame>,
        cursor: usize,
        fail_open: bool,
        fail_read_at: Option<usize>,
        closed: Arc<Mutex<bool>>,
    }

    impl StubSource {
        fn with_frames(count: usize) -> Self {
            Self {
                frames: (0..count).map(|i| Frame::filled(32, 24, 10, i)).collect(),
                cursor: 0,
                fail_open: false,
                fail_read_at: None,
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl FrameSource for StubSource {
        fn open(
            &mut self,
            _source: &CameraSource,
            _hints: CaptureHints,
        ) -> Result<StreamInfo, Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err("no such device".into());
            }
            Ok(StreamInfo {
                width: 32,
                height: 24,
                fps: 0.0,
                codec: "raw".into(),
                source: "stub".into(),
            })
        }

        fn read_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            if self.fail_read_at == Some(self.cursor) {
                return Err("device unplugged".into());
            }
            let frame = self.frames.get(self.cursor).cloned();
            self.cursor += 1;
            Ok(frame)
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    /// Returns one confident detection on frames listed in `hits`.
    struct StubDetector {
        hits: HashSet<usize>,
        failing: HashSet<usize>,
        stop_after: Option<(usize, Arc<AtomicBool>)>,
        imgsz_seen: Arc<Mutex<Vec<u32>>>,
    }

    impl StubDetector {
        fn hits_on(frames: &[usize]) -> Self {
            Self {
                hits: frames.iter().copied().collect(),
                failing: HashSet::new(),
                stop_after: None,
                imgsz_seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl ObjectDetector for StubDetector {
        fn detect(
            &mut self,
            frame: &Frame,
            imgsz: u32,
        ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            self.imgsz_seen.lock().unwrap().push(imgsz);
            if let Some((at, flag)) = &self.stop_after {
                if frame.index() == *at {
                    flag.store(true, Ordering::Relaxed);
                }
            }
            if self.failing.contains(&frame.index()) {
                return Err("inference failed".into());
            }
            if self.hits.contains(&frame.index()) {
                return Ok(vec![Detection::new(
                    0,
                    0.9,
                    BoundingBox::new(1.0, 1.0, 10.0, 10.0),
                )]);
            }
            Ok(vec![Detection::new(
                0,
                0.2,
                BoundingBox::new(1.0, 1.0, 10.0, 10.0),
            )])
        }
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn unix_seconds(&self) -> u64 {
            1_000
        }
    }

    #[allow(clippy::type_complexity)]
    struct MemoryImageWriter {
        written: Arc<Mutex<Vec<(PathBuf, Frame)>>>,
        fail: bool,
    }

    impl ImageWriter for MemoryImageWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail {
                return Err("read-only filesystem".into());
            }
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.clone()));
            Ok(())
        }
    }

    #[allow(clippy::type_complexity)]
    struct RecordingPreview {
        shown: Arc<Mutex<Vec<(usize, usize)>>>,
        closed: Arc<Mutex<bool>>,
        fail: bool,
    }

    impl PreviewSink for RecordingPreview {
        fn show(
            &mut self,
            frame: &Frame,
            detections: &[Detection],
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.shown
                .lock()
                .unwrap()
                .push((frame.index(), detections.len()));
            if self.fail {
                return Err("window closed".into());
            }
            Ok(())
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    fn settings() -> CaptureSettings {
        CaptureSettings {
            camera: CameraSource::Device(0),
            hints: CaptureHints::default(),
            imgsz: 320,
        }
    }

    #[allow(clippy::type_complexity)]
    fn build(
        source: StubSource,
        detector: StubDetector,
        window: usize,
        confirm: usize,
    ) -> (CaptureLoop, Arc<Mutex<Vec<(PathBuf, Frame)>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let writer = AlertWriter::new(
            "/alerts",
            Box::new(MemoryImageWriter {
                written: written.clone(),
                fail: false,
            }),
        )
        .with_clock(Box::new(FixedClock));
        let capture = CaptureLoop::new(
            settings(),
            Box::new(source),
            Box::new(detector),
            HitPolicy::new(0.5),
            TemporalConfirmer::new(window, confirm).unwrap(),
            writer,
        );
        (capture, written)
    }

    // --- Tests ---

    #[test]
    fn test_open_failure_is_fatal() {
        let mut source = StubSource::with_frames(3);
        source.fail_open = true;
        let (mut capture, written) = build(source, StubDetector::hits_on(&[]), 5, 3);

        let err = capture.run().unwrap_err();
        assert!(matches!(err, CaptureError::SourceOpen { .. }));
        assert!(err.to_string().contains("camera #0"));
        assert_eq!(capture.state(), LoopState::Stopped);
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_end_of_stream_stops_and_closes() {
        let source = StubSource::with_frames(4);
        let closed = source.closed.clone();
        let shown = Arc::new(Mutex::new(Vec::new()));
        let preview_closed = Arc::new(Mutex::new(false));
        let (capture, _) = build(source, StubDetector::hits_on(&[]), 5, 3);
        let mut capture = capture.with_preview(Box::new(RecordingPreview {
            shown: shown.clone(),
            closed: preview_closed.clone(),
            fail: false,
        }));

        let summary = capture.run().unwrap();
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.hits, 0);
        assert_eq!(summary.confirmations, 0);
        assert_eq!(summary.stop_reason, StopReason::EndOfStream);
        assert_eq!(capture.state(), LoopState::Stopped);
        assert!(*closed.lock().unwrap());
        assert!(*preview_closed.lock().unwrap());
        assert_eq!(
            *shown.lock().unwrap(),
            vec![(0, 1), (1, 1), (2, 1), (3, 1)]
        );
    }

    #[test]
    fn test_confirmation_writes_one_alert_for_the_confirming_frame() {
        // Hits T F T T F over frames 0..5.
        let (mut capture, written) = build(
            StubSource::with_frames(5),
            StubDetector::hits_on(&[0, 2, 3]),
            5,
            3,
        );

        let summary = capture.run().unwrap();
        assert_eq!(summary.hits, 3);
        assert_eq!(summary.confirmations, 1);
        assert_eq!(summary.alerts_written, 1);

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, PathBuf::from("/alerts/alert_1000.jpg"));
        assert_eq!(written[0].1.index(), 3);
    }

    #[test]
    fn test_sustained_hits_alert_once_per_refill() {
        let (mut capture, written) = build(
            StubSource::with_frames(9),
            StubDetector::hits_on(&[0, 1, 2, 3, 4, 5, 6, 7, 8]),
            3,
            3,
        );
        let summary = capture.run().unwrap();
        assert_eq!(summary.confirmations, 3);
        let frames: Vec<usize> = written.lock().unwrap().iter().map(|(_, f)| f.index()).collect();
        assert_eq!(frames, vec![2, 5, 8]);
    }

    #[test]
    fn test_zero_confirm_frames_alerts_every_frame() {
        let (mut capture, _) = build(StubSource::with_frames(4), StubDetector::hits_on(&[]), 2, 0);
        let summary = capture.run().unwrap();
        assert_eq!(summary.confirmations, 4);
        assert_eq!(summary.alerts_written, 4);
    }

    #[test]
    fn test_detector_failure_skips_frame_without_feeding_confirmer() {
        // Frame 1 fails; hits on 0 and 2 become adjacent in a 2-frame window.
        let mut detector = StubDetector::hits_on(&[0, 2]);
        detector.failing.insert(1);
        let (mut capture, written) = build(StubSource::with_frames(4), detector, 2, 2);

        let summary = capture.run().unwrap();
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.detector_failures, 1);
        assert_eq!(summary.confirmations, 1);
        assert_eq!(written.lock().unwrap()[0].1.index(), 2);
    }

    #[test]
    fn test_read_error_stops_loop() {
        let mut source = StubSource::with_frames(5);
        source.fail_read_at = Some(2);
        let closed = source.closed.clone();
        let (mut capture, _) = build(source, StubDetector::hits_on(&[]), 5, 3);

        let summary = capture.run().unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.stop_reason, StopReason::ReadError);
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_stop_flag_checked_after_each_frame() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut detector = StubDetector::hits_on(&[]);
        detector.stop_after = Some((2, stop.clone()));
        let (capture, _) = build(StubSource::with_frames(10), detector, 5, 3);
        let mut capture = capture.with_stop_flag(stop.clone());
        assert!(Arc::ptr_eq(&capture.stop_flag(), &stop));

        let summary = capture.run().unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.stop_reason, StopReason::StopRequested);
    }

    #[test]
    fn test_alert_failure_is_counted_and_loop_continues() {
        let writer = AlertWriter::new(
            "/alerts",
            Box::new(MemoryImageWriter {
                written: Arc::new(Mutex::new(Vec::new())),
                fail: true,
            }),
        );
        let mut capture = CaptureLoop::new(
            settings(),
            Box::new(StubSource::with_frames(6)),
            Box::new(StubDetector::hits_on(&[0, 1, 2, 3, 4, 5])),
            HitPolicy::new(0.5),
            TemporalConfirmer::new(2, 2).unwrap(),
            writer,
        );

        let summary = capture.run().unwrap();
        assert_eq!(summary.frames, 6);
        assert_eq!(summary.confirmations, 3);
        assert_eq!(summary.alert_failures, 3);
        assert_eq!(summary.alerts_written, 0);
    }

    #[test]
    fn test_preview_failure_is_ignored() {
        let shown = Arc::new(Mutex::new(Vec::new()));
        let (capture, _) = build(StubSource::with_frames(3), StubDetector::hits_on(&[]), 5, 3);
        let mut capture = capture.with_preview(Box::new(RecordingPreview {
            shown: shown.clone(),
            closed: Arc::new(Mutex::new(false)),
            fail: true,
        }));
        let summary = capture.run().unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(shown.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_imgsz_forwarded_to_detector() {
        let detector = StubDetector::hits_on(&[]);
        let seen = detector.imgsz_seen.clone();
        let (mut capture, _) = build(StubSource::with_frames(2), detector, 5, 3);
        capture.run().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![320, 320]);
    }

    #[test]
    fn test_cannot_run_twice() {
        let (mut capture, _) = build(StubSource::with_frames(1), StubDetector::hits_on(&[]), 5, 3);
        capture.run().unwrap();
        assert!(matches!(capture.run(), Err(CaptureError::AlreadyRan)));
    }

    #[test]
    fn test_live_frame_is_not_modified_by_alerting() {
        let (mut capture, written) = build(
            StubSource::with_frames(1),
            StubDetector::hits_on(&[0]),
            1,
            1,
        );
        capture.run().unwrap();
        assert_eq!(written.lock().unwrap()[0].1, Frame::filled(32, 24, 10, 0));
    }
}
