use std::path::{Path, PathBuf};

use crate::alerting::alert_namer::AlertNamer;
use crate::alerting::domain::clock::Clock;
use crate::alerting::infrastructure::system_clock::SystemClock;
use crate::detection::domain::face_locator::FaceLocator;
use crate::redaction::domain::frame_redactor::FrameRedactor;
use crate::shared::frame::Frame;
use crate::shared::region::Region;
use crate::video::domain::image_writer::ImageWriter;

/// Face location and redaction applied to a snapshot before it is saved.
struct FaceRedaction {
    locator: Box<dyn FaceLocator>,
    redactor: Box<dyn FrameRedactor>,
}

impl FaceRedaction {
    fn apply(&mut self, snapshot: &mut Frame) -> Result<usize, Box<dyn std::error::Error>> {
        let boxes = self.locator.locate(snapshot)?;
        let regions: Vec<Region> = boxes
            .iter()
            .filter_map(|b| Region::from_relative(b, snapshot.width(), snapshot.height()))
            .collect();
        if !regions.is_empty() {
            self.redactor.redact(snapshot, &regions)?;
        }
        Ok(regions.len())
    }
}

/// Persists evidence snapshots for confirmed events.
///
/// Every alert works on a deep copy of the frame, so the caller's frame is
/// never modified. When redaction is configured, faces found on the copy
/// are pixelated before encoding; if that step fails the alert is dropped
/// rather than written unredacted. The output directory must already exist.
pub struct AlertWriter {
    output_dir: PathBuf,
    image_writer: Box<dyn ImageWriter>,
    redaction: Option<FaceRedaction>,
    namer: AlertNamer,
    clock: Box<dyn Clock>,
}

impl AlertWriter {
    pub fn new(output_dir: impl Into<PathBuf>, image_writer: Box<dyn ImageWriter>) -> Self {
        Self {
            output_dir: output_dir.into(),
            image_writer,
            redaction: None,
            namer: AlertNamer::default(),
            clock: Box::new(SystemClock),
        }
    }

    /// Enables face redaction on every snapshot.
    pub fn with_redaction(
        mut self,
        locator: Box<dyn FaceLocator>,
        redactor: Box<dyn FrameRedactor>,
    ) -> Self {
        self.redaction = Some(FaceRedaction { locator, redactor });
        self
    }

    pub fn with_namer(mut self, namer: AlertNamer) -> Self {
        self.namer = namer;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn redacts_faces(&self) -> bool {
        self.redaction.is_some()
    }

    /// Saves one snapshot of `frame`. Returns the written path, or `None`
    /// when any step failed (the failure is logged).
    pub fn maybe_write_alert(&mut self, frame: &Frame) -> Option<PathBuf> {
        let mut snapshot = frame.clone();

        if let Some(redaction) = self.redaction.as_mut() {
            match redaction.apply(&mut snapshot) {
                Ok(faces) => log::debug!("Redacted {faces} face(s) on frame {}", frame.index()),
                Err(e) => {
                    log::error!(
                        "Face redaction failed on frame {}, alert dropped: {e}",
                        frame.index()
                    );
                    return None;
                }
            }
        }

        let path = self
            .namer
            .path_for(&self.output_dir, self.clock.unix_seconds());
        match self.image_writer.write(&path, &snapshot) {
            Ok(()) => {
                log::info!("Alert saved: {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::error!("Failed to write alert {}: {e}", path.display());
                None
            }
        }
    }
}
