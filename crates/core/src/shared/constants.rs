/// Side length of the mosaic grid a face region is reduced to before upscaling.
pub const PIXELATE_GRID: u32 = 16;

/// Evidence filenames are `alert_<unix_seconds>.jpg`.
pub const ALERT_FILE_PREFIX: &str = "alert_";
pub const ALERT_FILE_EXTENSION: &str = "jpg";

/// Default JPEG quality for evidence snapshots.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Detector candidates below this score are dropped before NMS, unless
/// the configured hit threshold is lower.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.1;

/// Minimum score for a face to be redacted.
pub const FACE_MIN_CONFIDENCE: f64 = 0.5;

pub const DEFAULT_CONFIG_PATH: &str = "config/dev.yaml";
pub const PREVIEW_FILE_NAME: &str = "preview.jpg";
