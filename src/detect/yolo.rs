//! Post-processing for YOLOv8-style detection heads.
//!
//! The raw output is `[1, 4 + C, N]` (channels first, as exported by
//! ultralytics) or `[1, N, 4 + C]`. Each anchor carries `cx, cy, w, h` in model
//! input pixels followed by C class scores.

use anyhow::{anyhow, Result};

use crate::detect::labels::label_for;
use crate::detect::result::{BoundingBox, Detection};

/// Upper bound on detections kept per frame after NMS.
pub const MAX_DETECTIONS: usize = 300;

#[derive(Clone, Copy, Debug)]
pub struct DecodeParams {
    pub input_width: u32,
    pub input_height: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    class_id: usize,
    score: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// Decode a raw output tensor into frame-space detections.
pub fn decode(
    output: &[f32],
    shape: &[usize],
    params: &DecodeParams,
    labels: &[&str],
) -> Result<Vec<Detection>> {
    let (rows, cols) = match shape {
        [1, a, b] => (*a, *b),
        [a, b] => (*a, *b),
        other => return Err(anyhow!("unexpected detection output shape {:?}", other)),
    };
    if output.len() != rows * cols {
        return Err(anyhow!(
            "detection output length {} does not match shape {:?}",
            output.len(),
            shape
        ));
    }
    // Exported models are `[1, 4 + C, N]`. When neither axis matches the
    // label table, assume the attribute axis is the short one.
    let attrs_expected = 4 + labels.len();
    let channels_first = if rows == attrs_expected {
        true
    } else if cols == attrs_expected {
        false
    } else {
        rows <= cols
    };
    let (attrs, anchors) = if channels_first {
        (rows, cols)
    } else {
        (cols, rows)
    };
    if attrs < 5 {
        return Err(anyhow!(
            "detection output needs at least 5 attributes, got {}",
            attrs
        ));
    }
    let at = |anchor: usize, attr: usize| -> f32 {
        if channels_first {
            output[attr * anchors + anchor]
        } else {
            output[anchor * attrs + attr]
        }
    };

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let mut best = (0usize, f32::NEG_INFINITY);
        for class_id in 0..attrs - 4 {
            let score = at(anchor, 4 + class_id);
            if score > best.1 {
                best = (class_id, score);
            }
        }
        let (class_id, score) = best;
        if !(score >= params.confidence_threshold) {
            continue;
        }
        let (cx, cy, w, h) = (at(anchor, 0), at(anchor, 1), at(anchor, 2), at(anchor, 3));
        candidates.push(Candidate {
            class_id,
            score,
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        });
    }

    let kept = non_max_suppression(candidates, params.nms_threshold);
    Ok(kept
        .into_iter()
        .filter_map(|c| to_detection(&c, params, labels))
        .collect())
}

/// Greedy class-wise NMS. Output is ordered by descending score.
fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
            if kept.len() == MAX_DETECTIONS {
                break;
            }
        }
    }
    kept
}

fn to_detection(c: &Candidate, params: &DecodeParams, labels: &[&str]) -> Option<Detection> {
    let sx = params.frame_width as f32 / params.input_width.max(1) as f32;
    let sy = params.frame_height as f32 / params.input_height.max(1) as f32;
    let fw = params.frame_width as f32;
    let fh = params.frame_height as f32;
    let bbox = BoundingBox::new(
        (c.x1 * sx).clamp(0.0, fw) as i32,
        (c.y1 * sy).clamp(0.0, fh) as i32,
        (c.x2 * sx).clamp(0.0, fw) as i32,
        (c.y2 * sy).clamp(0.0, fh) as i32,
    )?;
    Some(Detection::new(label_for(labels, c.class_id), c.score, bbox))
}
