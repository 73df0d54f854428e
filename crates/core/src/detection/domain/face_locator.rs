use crate::shared::frame::Frame;
use crate::shared::region::RelativeBox;

/// Domain interface for finding faces to redact.
///
/// Boxes are fractions of the frame size; conversion to pixels (and
/// clamping) is the caller's job via [`crate::shared::region::Region::from_relative`].
pub trait FaceLocator: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<RelativeBox>, Box<dyn std::error::Error>>;
}
