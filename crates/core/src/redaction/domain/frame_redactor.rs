use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for irreversibly obscuring regions of a frame.
///
/// Implementations modify the frame in place and must leave every pixel
/// outside `regions` untouched. Empty regions are skipped, not errors.
pub trait FrameRedactor: Send {
    fn redact(&self, frame: &mut Frame, regions: &[Region])
        -> Result<(), Box<dyn std::error::Error>>;
}
