use std::path::Path;

use crate::shared::frame::Frame;

/// Encodes a single frame to an image file.
pub trait ImageWriter: Send {
    /// Writes `frame` to `path`, replacing any existing file. The parent
    /// directory must already exist.
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
