use crate::shared::frame::Frame;
use crate::shared::stream_info::StreamInfo;
use crate::video::domain::camera_source::CameraSource;

/// Requested capture resolution. Sources apply it when the device or
/// stream supports it and otherwise ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureHints {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A live or recorded stream of frames.
pub trait FrameSource: Send {
    /// Opens the source and reports what it actually delivers.
    fn open(
        &mut self,
        source: &CameraSource,
        hints: CaptureHints,
    ) -> Result<StreamInfo, Box<dyn std::error::Error>>;

    /// Returns the next frame, or `Ok(None)` at end of stream.
    fn read_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the device or stream. Safe to call more than once.
    fn close(&mut self);
}
