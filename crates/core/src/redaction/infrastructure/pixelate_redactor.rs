use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};
use thiserror::Error;

use crate::redaction::domain::frame_redactor::FrameRedactor;
use crate::shared::constants::PIXELATE_GRID;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RedactorError {
    #[error("pixelation grid must be at least 1x1")]
    EmptyGrid,
    #[error("pixelation needs 3-channel frames, got {0} channels")]
    UnsupportedChannels(u8),
}

/// Mosaic redaction: each region is shrunk to a `grid × grid` thumbnail with
/// a smoothing (triangle) filter and blown back up with nearest-neighbour.
///
/// Detail finer than one mosaic cell is gone after the shrink, whatever the
/// region size, so the result cannot be inverted.
#[derive(Debug)]
pub struct PixelateRedactor {
    grid: u32,
}

impl PixelateRedactor {
    pub fn new(grid: u32) -> Result<Self, RedactorError> {
        if grid == 0 {
            return Err(RedactorError::EmptyGrid);
        }
        Ok(Self { grid })
    }

    pub fn grid(&self) -> u32 {
        self.grid
    }

    fn pixelate(
        &self,
        roi: Vec<u8>,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(width, height, roi)
            .ok_or("ROI buffer does not match region size")?;
        let small = imageops::resize(&img, self.grid, self.grid, FilterType::Triangle);
        Ok(imageops::resize(&small, width, height, FilterType::Nearest).into_raw())
    }
}

impl Default for PixelateRedactor {
    fn default() -> Self {
        Self { grid: PIXELATE_GRID }
    }
}

impl FrameRedactor for PixelateRedactor {
    fn redact(
        &self,
        frame: &mut Frame,
        regions: &[Region],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(Box::new(RedactorError::UnsupportedChannels(frame.channels())));
        }

        for region in regions {
            let Some(r) = region.clipped_to(frame.width(), frame.height()) else {
                continue;
            };
            let roi = frame.copy_region(&r);
            let mosaic = self.pixelate(roi, r.width, r.height)?;
            frame.write_region(&r, &mosaic);
        }

        Ok(())
    }
}
