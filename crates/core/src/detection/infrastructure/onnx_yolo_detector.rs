/// Ultralytics-style YOLO object detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, best-class decoding and
/// per-class NMS. The hit threshold is not applied here; the detector only
/// drops candidates below a low floor so the output stays small.
use std::path::Path;

use crate::detection::domain::detection::{BoundingBox, Detection};
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::frame::Frame;

use super::execution_provider::{load_session, static_input_size};
use super::math::{argmax, nms};

const NMS_IOU_THRESH: f32 = 0.45;

/// Letterbox fill value, YOLO convention.
const PAD_VALUE: f32 = 114.0 / 255.0;

/// YOLO detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    min_confidence: f32,
    /// Set when the model was exported with a fixed input size.
    static_size: Option<u32>,
    warned_size_mismatch: bool,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model.
    ///
    /// Models exported with a static NCHW input ignore the per-call `imgsz`
    /// hint; dynamic models are letterboxed to whatever `imgsz` asks for.
    pub fn new(model_path: &Path, min_confidence: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        let static_size = static_input_size(&session);
        if let Some(size) = static_size {
            log::info!("Detector model has a fixed {size}x{size} input");
        }
        Ok(Self {
            session,
            min_confidence,
            static_size,
            warned_size_mismatch: false,
        })
    }

    fn input_size(&mut self, imgsz: u32) -> u32 {
        match self.static_size {
            Some(fixed) => {
                if fixed != imgsz && !self.warned_size_mismatch {
                    log::warn!(
                        "Requested inference size {imgsz} but the model is fixed at {fixed}; using {fixed}"
                    );
                    self.warned_size_mismatch = true;
                }
                fixed
            }
            None => imgsz,
        }
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        imgsz: u32,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let size = self.input_size(imgsz);
        let (input_tensor, lb) = letterbox(frame, size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let candidates = decode_output(data, &shape, &lb, self.min_confidence)?;
        let kept = nms(candidates, NMS_IOU_THRESH);

        Ok(kept
            .into_iter()
            .map(|mut d| {
                d.bbox = d.bbox.clamped(frame.width(), frame.height());
                d
            })
            .filter(|d| d.bbox.width() > 0.0 && d.bbox.height() > 0.0)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Mapping from letterboxed model coordinates back to the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_frame(self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target × target`, returning an NCHW
/// float32 tensor in `[0, 1]` and the inverse mapping.
fn letterbox(frame: &Frame, target: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f32;
    let fh = frame.height() as f32;
    let t = target as f32;

    let scale = (t / fw).min(t / fh);
    let new_w = ((fw * scale).round() as u32).min(target);
    let new_h = ((fh * scale).round() as u32).min(target);
    let pad_x = (target - new_w) / 2;
    let pad_y = (target - new_h) / 2;

    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target as usize, target as usize), PAD_VALUE);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f32 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f32 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Output decoding
// ---------------------------------------------------------------------------

/// Decodes a `[1, 4 + classes, anchors]` (or `[1, anchors, 4 + classes]`)
/// output into frame-space detections, keeping the best class per anchor.
fn decode_output(
    data: &[f32],
    shape: &[usize],
    lb: &Letterbox,
    min_confidence: f32,
) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    // Anchors vastly outnumber features in every export we handle.
    let transposed = shape[1] < shape[2];
    let (num_anchors, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats <= 4 {
        return Err(format!("YOLO output has no class scores: {shape:?}").into());
    }
    if data.len() < num_anchors * num_feats {
        return Err(format!(
            "YOLO output holds {} values, shape {shape:?} needs {}",
            data.len(),
            num_anchors * num_feats
        )
        .into());
    }

    let feature = |anchor: usize, f: usize| -> f32 {
        if transposed {
            data[f * num_anchors + anchor]
        } else {
            data[anchor * num_feats + f]
        }
    };

    let mut scores = vec![0.0f32; num_feats - 4];
    let mut dets = Vec::new();
    for i in 0..num_anchors {
        for (c, s) in scores.iter_mut().enumerate() {
            *s = feature(i, 4 + c);
        }
        let Some((class_id, confidence)) = argmax(&scores) else {
            continue;
        };
        if confidence < min_confidence {
            continue;
        }

        let cx = feature(i, 0);
        let cy = feature(i, 1);
        let w = feature(i, 2);
        let h = feature(i, 3);
        let (x1, y1) = lb.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = lb.to_frame(cx + w / 2.0, cy + h / 2.0);

        dets.push(Detection::new(
            class_id as u32,
            confidence.clamp(0.0, 1.0),
            BoundingBox::new(x1, y1, x2, y2),
        ));
    }
    Ok(dets)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
