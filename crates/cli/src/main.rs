use std::io::BufRead;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use visionguard_core::alerting::alert_namer::AlertNamer;
use visionguard_core::alerting::alert_writer::AlertWriter;
use visionguard_core::alerting::domain::temporal_confirmer::TemporalConfirmer;
use visionguard_core::config::monitor_config::{DetectorConfig, MonitorConfig};
use visionguard_core::config::paths::{prepare_output_dirs, StartupError};
use visionguard_core::detection::domain::object_detector::ObjectDetector;
use visionguard_core::detection::infrastructure::onnx_blazeface_locator::OnnxBlazefaceLocator;
use visionguard_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use visionguard_core::pipeline::capture_loop::{CaptureLoop, CaptureSettings};
use visionguard_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use visionguard_core::pipeline::preview::{NullPreview, PreviewSink, SnapshotPreview};
use visionguard_core::redaction::infrastructure::pixelate_redactor::PixelateRedactor;
use visionguard_core::shared::constants::{DEFAULT_CONFIG_PATH, FACE_MIN_CONFIDENCE};
use visionguard_core::video::domain::camera_source::CameraSource;
use visionguard_core::video::infrastructure::ffmpeg_source::FfmpegSource;
use visionguard_core::video::infrastructure::jpeg_file_writer::JpegFileWriter;

/// Watches a camera, confirms detections over time and saves
/// face-redacted evidence snapshots.
#[derive(Parser, Debug)]
#[command(name = "visionguard")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, env = "VISIONGUARD_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override camera.source (device index, file path or URL).
    #[arg(long)]
    source: Option<String>,

    /// Save snapshots without face redaction.
    #[arg(long)]
    no_face_blur: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    prepare_output_dirs(&config.paths)?;

    let detector = build_detector(&config.detector)?;
    let alert_writer = build_alert_writer(&config)?;
    let confirmer = TemporalConfirmer::new(config.temporal.window, config.temporal.confirm_frames)?;

    let settings = CaptureSettings {
        camera: config.camera.source.clone(),
        hints: config.camera.hints(),
        imgsz: config.detector.imgsz,
    };

    let stop = Arc::new(AtomicBool::new(false));
    install_stop_handlers(&stop)?;

    let mut capture = CaptureLoop::new(
        settings,
        Box::new(FfmpegSource::new()),
        detector,
        config.detector.hit_policy(),
        confirmer,
        alert_writer,
    )
    .with_preview(build_preview(&config))
    .with_logger(Box::new(StdoutPipelineLogger::default()))
    .with_stop_flag(stop);

    log::info!("Press Ctrl-C, or type q and Enter, to stop");
    let summary = capture.run()?;
    log::info!(
        "{} alert(s) saved to {}",
        summary.alerts_written,
        config.paths.alerts_dir.display()
    );
    Ok(())
}

fn load_config(cli: &Cli) -> Result<MonitorConfig, Box<dyn std::error::Error>> {
    log::info!("Loading configuration from {}", cli.config.display());
    let mut config = MonitorConfig::load(&cli.config)?;
    if let Some(source) = &cli.source {
        config = config.with_source(CameraSource::parse(source));
    }
    if cli.no_face_blur {
        config = config.without_face_blur();
    }
    config.validate()?;
    Ok(config)
}

fn build_detector(config: &DetectorConfig) -> Result<Box<dyn ObjectDetector>, StartupError> {
    let model_path = &config.model_path;
    log::info!("Loading detector model: {}", model_path.display());
    let detector = OnnxYoloDetector::new(model_path, config.candidate_floor()).map_err(|e| {
        StartupError::ModelLoad {
            role: "detector",
            path: model_path.to_path_buf(),
            message: e.to_string(),
        }
    })?;
    Ok(Box::new(detector))
}

fn build_alert_writer(config: &MonitorConfig) -> Result<AlertWriter, Box<dyn std::error::Error>> {
    let evidence = &config.evidence;
    let writer = AlertWriter::new(
        config.paths.alerts_dir.clone(),
        Box::new(JpegFileWriter::new(evidence.jpeg_quality)),
    )
    .with_namer(AlertNamer::new(evidence.collision_policy()));

    if !evidence.enable_face_blur {
        log::warn!("Face redaction is disabled; snapshots are saved as captured");
        return Ok(writer);
    }

    let face_model = evidence
        .face_model_path
        .as_deref()
        .ok_or("evidence.face_model_path is required when face blur is enabled")?;
    log::info!("Loading face model: {}", face_model.display());
    let locator = OnnxBlazefaceLocator::new(face_model, FACE_MIN_CONFIDENCE).map_err(|e| {
        StartupError::ModelLoad {
            role: "face",
            path: face_model.to_path_buf(),
            message: e.to_string(),
        }
    })?;
    Ok(writer.with_redaction(Box::new(locator), Box::new(PixelateRedactor::default())))
}

fn build_preview(config: &MonitorConfig) -> Box<dyn PreviewSink> {
    match &config.preview {
        Some(preview) => {
            let sink = SnapshotPreview::in_dir(
                &config.paths.logs_dir,
                preview.every_n_frames,
                Box::new(JpegFileWriter::default()),
            );
            log::info!(
                "Preview snapshot every {} frames at {}",
                preview.every_n_frames,
                sink.path().display()
            );
            Box::new(sink)
        }
        None => Box::new(NullPreview),
    }
}

/// Ctrl-C, or a line reading `q` on stdin, sets the stop flag.
fn install_stop_handlers(stop: &Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    let on_signal = Arc::clone(stop);
    ctrlc::set_handler(move || on_signal.store(true, Ordering::Relaxed))?;

    let on_quit = Arc::clone(stop);
    std::thread::Builder::new()
        .name("stdin-quit".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) if is_quit_command(&line) => {
                        on_quit.store(true, Ordering::Relaxed);
                        break;
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        })?;
    Ok(())
}

fn is_quit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}
