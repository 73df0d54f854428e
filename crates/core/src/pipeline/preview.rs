use std::path::{Path, PathBuf};

use crate::detection::domain::detection::Detection;
use crate::shared::constants::PREVIEW_FILE_NAME;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

const BOX_COLOR: [u8; 3] = [0, 255, 0];
const BOX_THICKNESS: u32 = 2;

/// Label glyphs are 3x5 cells drawn at this scale.
const GLYPH_SCALE: u32 = 2;
const GLYPH_ADVANCE: u32 = 4 * GLYPH_SCALE;
const LABEL_HEIGHT: u32 = 5 * GLYPH_SCALE;
const LABEL_GAP: u32 = 2;

/// Presentation-only view of the live stream. Nothing it does feeds back
/// into detection or alerting.
pub trait PreviewSink: Send {
    fn show(&mut self, frame: &Frame, detections: &[Detection])
        -> Result<(), Box<dyn std::error::Error>>;

    fn close(&mut self) {}
}

/// Preview that shows nothing.
pub struct NullPreview;

impl PreviewSink for NullPreview {
    fn show(
        &mut self,
        _frame: &Frame,
        _detections: &[Detection],
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}

/// Overwrites a single image with an annotated copy of every Nth frame.
pub struct SnapshotPreview {
    path: PathBuf,
    every_n_frames: usize,
    writer: Box<dyn ImageWriter>,
    shown: usize,
}

impl SnapshotPreview {
    pub fn new(path: impl Into<PathBuf>, every_n_frames: usize, writer: Box<dyn ImageWriter>) -> Self {
        Self {
            path: path.into(),
            every_n_frames: every_n_frames.max(1),
            writer,
            shown: 0,
        }
    }

    /// Preview written to `<logs_dir>/preview.jpg`.
    pub fn in_dir(logs_dir: &Path, every_n_frames: usize, writer: Box<dyn ImageWriter>) -> Self {
        Self::new(logs_dir.join(PREVIEW_FILE_NAME), every_n_frames, writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreviewSink for SnapshotPreview {
    fn show(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let due = self.shown % self.every_n_frames == 0;
        self.shown += 1;
        if !due {
            return Ok(());
        }

        let mut annotated = frame.clone();
        draw_detections(&mut annotated, detections);
        self.writer.write(&self.path, &annotated)
    }
}

/// Draws each detection's box outline and `class:conf` label onto an RGB
/// frame.
pub fn draw_detections(frame: &mut Frame, detections: &[Detection]) {
    if frame.channels() != 3 || frame.width() == 0 || frame.height() == 0 {
        return;
    }
    for det in detections {
        let b = det.bbox.clamped(frame.width(), frame.height());
        if b.width() <= 0.0 || b.height() <= 0.0 {
            continue;
        }
        let max_x = frame.width() - 1;
        let max_y = frame.height() - 1;
        let x1 = (b.x1 as u32).min(max_x);
        let y1 = (b.y1 as u32).min(max_y);
        let x2 = (b.x2.ceil() as u32).saturating_sub(1).min(max_x).max(x1);
        let y2 = (b.y2.ceil() as u32).saturating_sub(1).min(max_y).max(y1);
        draw_rect(frame, x1, y1, x2, y2);
        draw_label(frame, x1, y1.saturating_sub(LABEL_HEIGHT + LABEL_GAP), &detection_label(det));
    }
}

/// Text drawn above a detection's box.
pub fn detection_label(det: &Detection) -> String {
    format!("{}:{:.2}", det.class_id, det.confidence)
}

fn draw_label(frame: &mut Frame, x: u32, y: u32, text: &str) {
    let (width, height) = (frame.width(), frame.height());
    let mut pixels = frame.as_ndarray_mut();
    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let left = x + i as u32 * GLYPH_ADVANCE;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..3u32 {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                for dy in 0..GLYPH_SCALE {
                    for dx in 0..GLYPH_SCALE {
                        let px = left + col * GLYPH_SCALE + dx;
                        let py = y + row as u32 * GLYPH_SCALE + dy;
                        if px >= width || py >= height {
                            continue;
                        }
                        for (ch, v) in BOX_COLOR.iter().enumerate() {
                            pixels[[py as usize, px as usize, ch]] = *v;
                        }
                    }
                }
            }
        }
    }
}

/// 3x5 bitmaps, one row per entry, high bit on the left.
fn glyph(c: char) -> Option<[u8; 5]> {
    let rows = match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        _ => return None,
    };
    Some(rows)
}

fn draw_rect(frame: &mut Frame, x1: u32, y1: u32, x2: u32, y2: u32) {
    let mut pixels = frame.as_ndarray_mut();
    let mut paint = |x: u32, y: u32| {
        for (c, v) in BOX_COLOR.iter().enumerate() {
            pixels[[y as usize, x as usize, c]] = *v;
        }
    };
    for t in 0..BOX_THICKNESS {
        let top = (y1 + t).min(y2);
        let bottom = y2.saturating_sub(t).max(y1);
        for x in x1..=x2 {
            paint(x, top);
            paint(x, bottom);
        }
        let left = (x1 + t).min(x2);
        let right = x2.saturating_sub(t).max(x1);
        for y in y1..=y2 {
            paint(left, y);
            paint(right, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection::BoundingBox;
    use std::sync::{Arc, Mutex};

    struct MemoryImageWriter {
        written: Arc<Mutex<Vec<(PathBuf, Frame)>>>,
    }

    impl ImageWriter for MemoryImageWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.clone()));
            Ok(())
        }
    }

    fn pixel(frame: &Frame, x: usize, y: usize) -> [u8; 3] {
        let a = frame.as_ndarray();
        [a[[y, x, 0]], a[[y, x, 1]], a[[y, x, 2]]]
    }

    fn person(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new(0, 0.9, BoundingBox::new(x1, y1, x2, y2))
    }

    #[test]
    fn test_draws_outline_only() {
        let mut frame = Frame::filled(40, 40, 0, 0);
        draw_detections(&mut frame, &[person(10.0, 10.0, 30.0, 30.0)]);

        assert_eq!(pixel(&frame, 10, 10), BOX_COLOR);
        assert_eq!(pixel(&frame, 29, 20), BOX_COLOR);
        assert_eq!(pixel(&frame, 20, 11), BOX_COLOR);
        assert_eq!(pixel(&frame, 20, 20), [0, 0, 0], "interior untouched");
        assert_eq!(pixel(&frame, 5, 5), [0, 0, 0], "outside untouched");
    }

    #[test]
    fn test_label_text_matches_class_and_confidence() {
        let det = Detection::new(24, 0.876, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(detection_label(&det), "24:0.88");
        assert_eq!(detection_label(&person(0.0, 0.0, 1.0, 1.0)), "0:0.90");
    }

    #[test]
    fn test_label_drawn_above_box() {
        let mut frame = Frame::filled(60, 40, 0, 0);
        draw_detections(&mut frame, &[person(4.0, 20.0, 30.0, 36.0)]);

        // Label top sits LABEL_HEIGHT + LABEL_GAP above the box: y = 8.
        // First glyph is '0', a ring with a hollow centre column.
        assert_eq!(pixel(&frame, 4, 8), BOX_COLOR);
        assert_eq!(pixel(&frame, 9, 9), BOX_COLOR);
        assert_eq!(pixel(&frame, 6, 10), [0, 0, 0]);
        assert_eq!(pixel(&frame, 4, 7), [0, 0, 0], "nothing above the label");
    }

    #[test]
    fn test_unknown_glyphs_skipped() {
        assert!(glyph('x').is_none());
        assert!(glyph('7').is_some());
    }

    #[test]
    fn test_box_past_edge_is_clamped() {
        let mut frame = Frame::filled(20, 20, 0, 0);
        draw_detections(&mut frame, &[person(-5.0, -5.0, 50.0, 50.0)]);
        assert_eq!(pixel(&frame, 0, 0), BOX_COLOR);
        assert_eq!(pixel(&frame, 19, 19), BOX_COLOR);
    }

    #[test]
    fn test_degenerate_box_ignored() {
        let mut frame = Frame::filled(20, 20, 0, 0);
        let original = frame.clone();
        draw_detections(&mut frame, &[person(25.0, 25.0, 30.0, 30.0)]);
        assert_eq!(frame, original);
    }

    #[test]
    fn test_snapshot_preview_writes_every_nth_frame() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let mut preview = SnapshotPreview::in_dir(
            Path::new("/logs"),
            3,
            Box::new(MemoryImageWriter {
                written: written.clone(),
            }),
        );
        assert_eq!(preview.path(), Path::new("/logs/preview.jpg"));

        for i in 0..7 {
            preview.show(&Frame::filled(8, 8, 0, i), &[]).unwrap();
        }
        let indices: Vec<usize> = written.lock().unwrap().iter().map(|(_, f)| f.index()).collect();
        assert_eq!(indices, vec![0, 3, 6]);
    }

    #[test]
    fn test_snapshot_preview_leaves_source_frame_alone() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let mut preview = SnapshotPreview::new(
            "/logs/p.jpg",
            1,
            Box::new(MemoryImageWriter {
                written: written.clone(),
            }),
        );
        let frame = Frame::filled(16, 16, 0, 0);
        preview
            .show(&frame, &[person(2.0, 2.0, 12.0, 12.0)])
            .unwrap();

        assert!(frame.data().iter().all(|&v| v == 0));
        assert_eq!(pixel(&written.lock().unwrap()[0].1, 2, 2), BOX_COLOR);
    }
}
