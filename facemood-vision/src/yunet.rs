//! YuNet output decoding.
//!
//! YuNet is anchor-free. For each stride (8, 16, 32) the network emits, per
//! grid cell of a square `input_size` canvas:
//! - `cls_{s}`: [1, H*W, 1] class score
//! - `obj_{s}`: [1, H*W, 1] objectness
//! - `bbox_{s}`: [1, H*W, 4] (dx, dy, log w, log h) in stride units
//! - `kps_{s}`: [1, H*W, 10] landmarks (unused here)
//!
//! Boxes decode as:
//! cx = (col + dx) * stride, cy = (row + dy) * stride,
//! w = exp(log w) * stride, h = exp(log h) * stride

use crate::error::{PipelineError, Result};

pub const STRIDES: [usize; 3] = [8, 16, 32];

/// One named output tensor copied out of the session.
#[derive(Debug, Clone)]
pub struct RawTensor {
    pub name: String,
    pub shape: Vec<i64>,
    pub data: Vec<f32>,
}

/// Candidate in canvas pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
}

struct Head<'a> {
    stride: usize,
    cls: &'a [f32],
    obj: &'a [f32],
    bbox: &'a [f32],
}

/// Find `{kind}_{stride}` by name, falling back to the exported output order
/// (cls_8, cls_16, cls_32, obj_8, ..., bbox_8, ..., kps_8, ...).
fn find<'a>(
    outputs: &'a [RawTensor],
    kind: &str,
    kind_idx: usize,
    scale_idx: usize,
    width: i64,
    cells: usize,
) -> Result<&'a [f32]> {
    let name = format!("{}_{}", kind, STRIDES[scale_idx]);
    let tensor = outputs
        .iter()
        .find(|t| t.name == name)
        .or_else(|| outputs.get(kind_idx * STRIDES.len() + scale_idx))
        .ok_or_else(|| PipelineError::MalformedOutput(format!("missing {name}")))?;

    let shape = &tensor.shape;
    if shape.len() != 3 || shape[0] != 1 || shape[1] as usize != cells || shape[2] != width {
        return Err(PipelineError::MalformedOutput(format!(
            "{} has shape {:?}, expected [1, {}, {}]",
            tensor.name, shape, cells, width
        )));
    }
    if tensor.data.len() != cells * width as usize {
        return Err(PipelineError::MalformedOutput(format!(
            "{} holds {} values for shape {:?}",
            tensor.name,
            tensor.data.len(),
            shape
        )));
    }
    Ok(&tensor.data)
}

fn heads(outputs: &[RawTensor], input_size: usize) -> Result<Vec<Head<'_>>> {
    STRIDES
        .iter()
        .enumerate()
        .map(|(scale_idx, &stride)| {
            let side = input_size / stride;
            let cells = side * side;
            Ok(Head {
                stride,
                cls: find(outputs, "cls", 0, scale_idx, 1, cells)?,
                obj: find(outputs, "obj", 1, scale_idx, 1, cells)?,
                bbox: find(outputs, "bbox", 2, scale_idx, 4, cells)?,
            })
        })
        .collect()
}

/// Decode every grid cell scoring at least `score_threshold`.
pub fn decode_detections(
    outputs: &[RawTensor],
    input_size: usize,
    score_threshold: f32,
) -> Result<Vec<RawDetection>> {
    let mut detections = Vec::new();

    for head in heads(outputs, input_size)? {
        let side = input_size / head.stride;
        let stride = head.stride as f32;

        for row in 0..side {
            for col in 0..side {
                let idx = row * side + col;
                let cls = head.cls[idx].clamp(0.0, 1.0);
                let obj = head.obj[idx].clamp(0.0, 1.0);
                let score = (cls * obj).sqrt();
                if score < score_threshold {
                    continue;
                }

                let delta = &head.bbox[idx * 4..idx * 4 + 4];
                let cx = (col as f32 + delta[0]) * stride;
                let cy = (row as f32 + delta[1]) * stride;
                let w = delta[2].exp() * stride;
                let h = delta[3].exp() * stride;

                detections.push(RawDetection {
                    bbox: [cx - w / 2.0, cy - h / 2.0, w, h],
                    score,
                });
            }
        }
    }

    Ok(detections)
}

/// Greedy non-maximum suppression. Output is ordered by descending score.
pub fn nms(detections: &[RawDetection], iou_threshold: f32) -> Vec<RawDetection> {
    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<RawDetection> = Vec::new();
    for candidate in sorted {
        if keep
            .iter()
            .all(|kept| compute_iou(&kept.bbox, &candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = (x2 - x1) * (y2 - y1);
    let area_a = a[2] * a[3];
    let area_b = b[2] * b[3];
    inter / (area_a + area_b - inter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_outputs(input_size: usize) -> Vec<RawTensor> {
        let mut outputs = Vec::new();
        for (kind, width) in [("cls", 1), ("obj", 1), ("bbox", 4), ("kps", 10)] {
            for stride in STRIDES {
                let side = input_size / stride;
                let cells = side * side;
                outputs.push(RawTensor {
                    name: format!("{kind}_{stride}"),
                    shape: vec![1, cells as i64, width],
                    data: vec![0.0; cells * width as usize],
                });
            }
        }
        outputs
    }

    #[test]
    fn test_decode_grid_based() {
        let input_size = 640;
        let mut outputs = empty_outputs(input_size);

        // One hit on the stride 32 grid (20x20) at row 10, col 10.
        let idx = 10 * 20 + 10;
        outputs[2].data[idx] = 0.9; // cls_32
        outputs[5].data[idx] = 0.9; // obj_32
        let bbox = &mut outputs[8].data; // bbox_32
        bbox[idx * 4] = 0.5;
        bbox[idx * 4 + 1] = 0.25;
        bbox[idx * 4 + 2] = 4.0f32.ln();
        bbox[idx * 4 + 3] = 4.0f32.ln();

        let detections = decode_detections(&outputs, input_size, 0.5).unwrap();
        assert_eq!(detections.len(), 1);
        let det = &detections[0];

        // cx = 10.5 * 32 = 336, cy = 10.25 * 32 = 328, w = h = 4 * 32 = 128
        assert!((det.bbox[0] - 272.0).abs() < 1e-3);
        assert!((det.bbox[1] - 264.0).abs() < 1e-3);
        assert!((det.bbox[2] - 128.0).abs() < 1e-3);
        assert!((det.bbox[3] - 128.0).abs() < 1e-3);
        assert!((det.score - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_positional_fallback() {
        let input_size = 160;
        let mut outputs = empty_outputs(input_size);
        for (i, t) in outputs.iter_mut().enumerate() {
            t.name = format!("output{i}");
        }
        outputs[0].data[0] = 1.0;
        outputs[3].data[0] = 1.0;
        let detections = decode_detections(&outputs, input_size, 0.5).unwrap();
        assert_eq!(detections.len(), 1);
        assert!((detections[0].bbox[2] - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let mut outputs = empty_outputs(640);
        outputs[6].shape = vec![1, 6400, 5];
        assert!(matches!(
            decode_detections(&outputs, 640, 0.5),
            Err(PipelineError::MalformedOutput(_))
        ));

        outputs.truncate(2);
        assert!(decode_detections(&outputs, 640, 0.5).is_err());
    }

    #[test]
    fn test_iou() {
        let a = [10.0, 10.0, 20.0, 20.0];
        let b = [15.0, 15.0, 20.0, 20.0];
        let iou = compute_iou(&a, &b);
        assert!(iou > 0.0 && iou < 1.0);

        let c = [100.0, 100.0, 10.0, 10.0];
        assert_eq!(compute_iou(&a, &c), 0.0);
    }

    #[test]
    fn test_nms() {
        let detections = vec![
            RawDetection {
                bbox: [10.0, 10.0, 20.0, 20.0],
                score: 0.8,
            },
            RawDetection {
                bbox: [12.0, 12.0, 20.0, 20.0],
                score: 0.9,
            },
            RawDetection {
                bbox: [100.0, 100.0, 20.0, 20.0],
                score: 0.85,
            },
        ];

        let result = nms(&detections, 0.3);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].score, 0.9);
        assert_eq!(result[1].score, 0.85);
    }
}
