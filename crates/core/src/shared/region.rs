/// A face box as reported by a face locator: fractions of the frame size.
///
/// Values are nominally in `[0, 1]` but locators are allowed to overshoot
/// at frame edges; conversion to pixels clamps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelativeBox {
    pub xmin: f64,
    pub ymin: f64,
    pub width: f64,
    pub height: f64,
}

impl RelativeBox {
    pub fn new(xmin: f64, ymin: f64, width: f64, height: f64) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
        }
    }
}

/// A pixel rectangle that lies fully inside a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Converts a fractional box to pixels for a `frame_width × frame_height`
    /// frame, clamping both corners to the frame.
    ///
    /// `x1 = clamp(round(xmin * w), 0, w)`, `x2 = clamp(x1 + round(width * w), 0, w)`,
    /// and the same for y. Returns `None` when the clamped box has no area.
    pub fn from_relative(rel: &RelativeBox, frame_width: u32, frame_height: u32) -> Option<Self> {
        let (x1, x2) = clamp_span(rel.xmin, rel.width, frame_width);
        let (y1, y2) = clamp_span(rel.ymin, rel.height, frame_height);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self::new(x1, y1, x2 - x1, y2 - y1))
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    /// Whether the region fits inside a frame of the given size.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.x as u64 + self.width as u64 <= frame_width as u64
            && self.y as u64 + self.height as u64 <= frame_height as u64
    }

    /// The part of this region that lies inside a `frame_width × frame_height`
    /// frame, or `None` when nothing does.
    pub fn clipped_to(&self, frame_width: u32, frame_height: u32) -> Option<Self> {
        let x2 = (self.x as u64 + self.width as u64).min(frame_width as u64) as u32;
        let y2 = (self.y as u64 + self.height as u64).min(frame_height as u64) as u32;
        if x2 <= self.x || y2 <= self.y {
            return None;
        }
        Some(Self::new(self.x, self.y, x2 - self.x, y2 - self.y))
    }

    pub(crate) fn as_usize(&self) -> (usize, usize, usize, usize) {
        (
            self.x as usize,
            self.y as usize,
            self.width as usize,
            self.height as usize,
        )
    }
}

fn clamp_span(start: f64, extent: f64, size: u32) -> (u32, u32) {
    let limit = size as f64;
    let lo = (start * limit).round().clamp(0.0, limit);
    let hi = (lo + (extent * limit).round()).clamp(0.0, limit);
    // NaN survives clamp; the saturating cast maps it to 0.
    (lo as u32, hi as u32)
}
