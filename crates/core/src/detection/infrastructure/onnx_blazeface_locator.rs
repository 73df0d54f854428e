/// BlazeFace face locator using ONNX Runtime via `ort`.
///
/// Short-range model: 128×128 input, 896 anchors. Produces fractional boxes
/// only; no tracking, no landmarks.
use std::path::Path;

use crate::detection::domain::detection::{BoundingBox, Detection};
use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::frame::Frame;
use crate::shared::region::RelativeBox;

use super::execution_provider::load_session;
use super::math::{nms, sigmoid};

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

const NMS_IOU_THRESH: f32 = 0.3;

const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: box (4) + 6 keypoints (12).
const REGRESSOR_STRIDE: usize = 16;

pub struct OnnxBlazefaceLocator {
    session: ort::session::Session,
    confidence: f32,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceLocator {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        Ok(Self {
            session,
            confidence: confidence as f32,
            anchors: generate_anchors(),
        })
    }
}

impl FaceLocator for OnnxBlazefaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<RelativeBox>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }
        let input_tensor = preprocess(frame, INPUT_SIZE);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // Two outputs: regressors [1, 896, 16] and classificators [1, 896, 1].
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }
        let first = outputs[0].try_extract_array::<f32>()?;
        let second = outputs[1].try_extract_array::<f32>()?;
        let first = first.as_slice().ok_or("Cannot get BlazeFace output slice")?;
        let second = second.as_slice().ok_or("Cannot get BlazeFace output slice")?;
        // Export order varies; the score tensor is always the smaller one.
        let (reg_data, score_data) = if first.len() >= second.len() {
            (first, second)
        } else {
            (second, first)
        };

        Ok(decode(reg_data, score_data, &self.anchors, self.confidence))
    }
}

/// Decodes raw BlazeFace outputs into fractional face boxes after NMS.
fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
) -> Vec<RelativeBox> {
    let size = INPUT_SIZE as f32;
    let mut candidates = Vec::new();

    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }
        let offset = i * REGRESSOR_STRIDE;
        if offset + 4 > reg_data.len() {
            break;
        }

        let anchor = anchors[i];
        let cx = anchor[0] + reg_data[offset] / size;
        let cy = anchor[1] + reg_data[offset + 1] / size;
        let w = reg_data[offset + 2] / size;
        let h = reg_data[offset + 3] / size;

        candidates.push(Detection::new(
            0,
            score,
            BoundingBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0),
        ));
    }

    nms(candidates, NMS_IOU_THRESH)
        .into_iter()
        .map(|d| {
            let b = d.bbox.clamped(1, 1);
            RelativeBox::new(
                b.x1 as f64,
                b.y1 as f64,
                b.width() as f64,
                b.height() as f64,
            )
        })
        .filter(|r| r.width > 0.0 && r.height > 0.0)
        .collect()
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// Anchors for the short-range model: a 16×16 grid with 2 anchors per cell
/// and an 8×8 grid with 6 per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)];
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}
