/// What a frame source reports once it is open.
///
/// `width`/`height` are what the source actually delivers, which may differ
/// from the capture hints it was given.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Zero when the source does not advertise a rate (most live devices).
    pub fps: f64,
    pub codec: String,
    pub source: String,
}

impl StreamInfo {
    pub fn describe(&self) -> String {
        if self.fps > 0.0 {
            format!(
                "{} ({}x{} @ {:.1} fps, {})",
                self.source, self.width, self.height, self.fps, self.codec
            )
        } else {
            format!(
                "{} ({}x{}, {})",
                self.source, self.width, self.height, self.codec
            )
        }
    }
}
