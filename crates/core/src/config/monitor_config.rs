use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::alerting::alert_namer::CollisionPolicy;
use crate::detection::domain::hit_policy::HitPolicy;
use crate::shared::constants::{DEFAULT_JPEG_QUALITY, DEFAULT_MIN_CONFIDENCE};
use crate::video::domain::camera_source::CameraSource;
use crate::video::domain::frame_source::CaptureHints;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Everything the monitor needs, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub temporal: TemporalConfig,
    pub evidence: EvidenceConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub preview: Option<PreviewConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraConfig {
    pub source: CameraSource,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    pub model_path: PathBuf,
    /// Hit threshold.
    pub conf: f32,
    /// Inference resolution.
    pub imgsz: u32,
    /// Class allowlist. Absent means every class counts.
    #[serde(default)]
    pub classes: Option<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemporalConfig {
    pub window: usize,
    pub confirm_frames: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvidenceConfig {
    pub enable_face_blur: bool,
    #[serde(default)]
    pub face_model_path: Option<PathBuf>,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default)]
    pub unique_filenames: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub alerts_dir: PathBuf,
    pub logs_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreviewConfig {
    pub every_n_frames: usize,
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

impl MonitorConfig {
    /// Reads and parses a YAML file. Does not validate; call
    /// [`MonitorConfig::validate`] once overrides are applied.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn with_source(mut self, source: CameraSource) -> Self {
        self.camera.source = source;
        self
    }

    pub fn without_face_blur(mut self) -> Self {
        self.evidence.enable_face_blur = false;
        self
    }

    /// Checks cross-field constraints. Any error here is fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.source.is_empty() {
            return Err(invalid("camera.source", "must not be empty"));
        }

        let conf = self.detector.conf;
        if !(0.0..=1.0).contains(&conf) {
            return Err(invalid("detector.conf", format!("{conf} is outside [0, 1]")));
        }
        let imgsz = self.detector.imgsz;
        if imgsz == 0 || imgsz % 32 != 0 {
            return Err(invalid(
                "detector.imgsz",
                format!("{imgsz} must be a positive multiple of 32"),
            ));
        }

        let TemporalConfig {
            window,
            confirm_frames,
        } = self.temporal;
        if window == 0 {
            return Err(invalid("temporal.window", "must be at least 1"));
        }
        if confirm_frames > window {
            return Err(invalid(
                "temporal.confirm_frames",
                format!("{confirm_frames} exceeds window {window}"),
            ));
        }

        let quality = self.evidence.jpeg_quality;
        if !(1..=100).contains(&quality) {
            return Err(invalid(
                "evidence.jpeg_quality",
                format!("{quality} is outside 1..=100"),
            ));
        }
        if self.evidence.enable_face_blur && self.evidence.face_model_path.is_none() {
            return Err(invalid(
                "evidence.face_model_path",
                "required when enable_face_blur is true",
            ));
        }

        if let Some(preview) = &self.preview {
            if preview.every_n_frames == 0 {
                return Err(invalid("preview.every_n_frames", "must be at least 1"));
            }
        }

        Ok(())
    }
}

impl CameraConfig {
    pub fn hints(&self) -> CaptureHints {
        CaptureHints {
            width: self.width,
            height: self.height,
        }
    }
}

impl DetectorConfig {
    pub fn hit_policy(&self) -> HitPolicy {
        let policy = HitPolicy::new(self.conf);
        match &self.classes {
            Some(classes) => policy.with_classes(classes.iter().copied()),
            None => policy,
        }
    }

    /// Score below which the detector drops candidates before NMS.
    ///
    /// Never above the hit threshold, so every detection that could be a
    /// hit reaches the policy.
    pub fn candidate_floor(&self) -> f32 {
        self.conf.min(DEFAULT_MIN_CONFIDENCE)
    }
}

impl EvidenceConfig {
    pub fn collision_policy(&self) -> CollisionPolicy {
        if self.unique_filenames {
            CollisionPolicy::Unique
        } else {
            CollisionPolicy::Overwrite
        }
    }
}
