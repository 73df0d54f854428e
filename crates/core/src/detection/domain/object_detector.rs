use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for per-frame object detection.
///
/// `imgsz` is the inference resolution hint (square side in pixels);
/// implementations with a fixed input size may ignore it.
pub trait ObjectDetector: Send {
    fn detect(
        &mut self,
        frame: &Frame,
        imgsz: u32,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
