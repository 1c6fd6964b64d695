/// YOLO object detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, NMS post-processing, and
/// ByteTrack tracking. Class ids are mapped to COCO labels so the domain
/// layer can run definite classification checks.
use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::{FrameDetections, ObjectDetector};
use crate::shared::frame::Frame;

use super::bytetrack_tracker::{BoxObservation, ByteTracker};
use super::coco_labels::class_label;
use super::math::bbox_iou;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// YOLO detector backed by an ONNX Runtime session.
pub struct OnnxPersonDetector {
    session: ort::session::Session,
    tracker: ByteTracker,
    confidence: f64,
    input_size: u32,
}

impl OnnxPersonDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting
    /// NCHW). Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(
        model_path: &Path,
        tracker: ByteTracker,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    // shape is [N, C, H, W] — use H (square input expected)
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            tracker,
            confidence,
            input_size,
        })
    }
}

impl ObjectDetector for OnnxPersonDetector {
    fn detect(&mut self, frame: &Frame) -> Result<FrameDetections, Box<dyn std::error::Error>> {
        // 1. Preprocess: letterbox + normalize → NCHW float32
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape();

        // YOLO output is [1, num_features, num_detections] (transposed) or
        // [1, num_detections, num_features]. Handle both.
        let (num_dets, num_feats) = if shape.len() == 3 {
            if shape[1] < shape[2] {
                (shape[2], shape[1])
            } else {
                (shape[1], shape[2])
            }
        } else {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        };
        let transposed = shape[1] < shape[2];
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        // 3. Parse rows, map letterbox coords back, threshold by confidence
        let mut raw_dets = decode_rows(
            data,
            num_dets,
            num_feats,
            transposed,
            self.confidence,
            scale,
            pad_x,
            pad_y,
        );

        // 4. NMS
        let filtered = nms(&mut raw_dets, NMS_IOU_THRESH);

        // 5. Track
        let observations: Vec<BoxObservation> = filtered
            .iter()
            .map(|d| BoxObservation {
                bbox: [d.x1, d.y1, d.x2, d.y2],
                score: d.confidence,
            })
            .collect();
        let update = self.tracker.update(&observations);

        // 6. Label tracks from their matched observation's class
        let detections = update
            .active
            .iter()
            .map(|track| {
                let matched = track.det_index.and_then(|i| filtered.get(i));
                match matched {
                    Some(det) => match class_label(det.class_id) {
                        Some(label) => {
                            Detection::new(label, det.confidence, track.bbox, track.id)
                        }
                        None => Detection::unclassified(det.confidence, track.bbox, track.id),
                    },
                    None => Detection::unclassified(0.0, track.bbox, track.id),
                }
            })
            .collect();

        Ok(FrameDetections {
            detections,
            expired: update.removed,
        })
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Pad with 114/255 gray, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize + copy into padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// Output decoding
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
    class_id: usize,
}

/// Decode YOLO output rows `[cx, cy, w, h, class0..classN]`.
///
/// The best class score is the detection confidence; rows below the
/// threshold are dropped. Box coords are mapped from letterbox space back
/// to original frame space.
#[allow(clippy::too_many_arguments)]
fn decode_rows(
    data: &[f32],
    num_dets: usize,
    num_feats: usize,
    transposed: bool,
    confidence: f64,
    scale: f64,
    pad_x: u32,
    pad_y: u32,
) -> Vec<RawDetection> {
    let mut raw_dets = Vec::new();
    if num_feats < 5 {
        return raw_dets;
    }

    for i in 0..num_dets {
        let row: Vec<f32> = if transposed {
            (0..num_feats).map(|f| data[f * num_dets + i]).collect()
        } else {
            data[i * num_feats..(i + 1) * num_feats].to_vec()
        };

        let (class_id, best_score) = row[4..]
            .iter()
            .enumerate()
            .fold((0usize, f32::MIN), |(bi, bs), (ci, &s)| {
                if s > bs {
                    (ci, s)
                } else {
                    (bi, bs)
                }
            });
        let conf = best_score as f64;
        if conf < confidence {
            continue;
        }

        let cx = row[0] as f64;
        let cy = row[1] as f64;
        let w = row[2] as f64;
        let h = row[3] as f64;

        raw_dets.push(RawDetection {
            x1: ((cx - w / 2.0) - pad_x as f64) / scale,
            y1: ((cy - h / 2.0) - pad_y as f64) / scale,
            x2: ((cx + w / 2.0) - pad_x as f64) / scale,
            y2: ((cy + h / 2.0) - pad_y as f64) / scale,
            confidence: conf,
            class_id,
        });
    }
    raw_dets
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] {
                continue;
            }
            let iou = bbox_iou(
                &[dets[i].x1, dets[i].y1, dets[i].x2, dets[i].y2],
                &[dets[j].x1, dets[j].y1, dets[j].x2, dets[j].y2],
            );
            if iou > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 frame → letterbox to 640x640
        // Scale = min(640/200, 640/100) = 3.2, new = 640x320, pad_y = 160
        let data = vec![128u8; 200 * 100 * 3];
        let frame = Frame::new(data, 200, 100, 3, 0);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((scale - 3.2).abs() < 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
    }

    #[test]
    fn test_letterbox_square_frame() {
        let data = vec![128u8; 100 * 100 * 3];
        let frame = Frame::new(data, 100, 100, 3, 0);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((scale - 6.4).abs() < 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 0);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let data = vec![255u8; 100 * 50 * 3];
        let frame = Frame::new(data, 100, 50, 3, 0);
        let (tensor, _, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(pad_x, 0);
        assert!(pad_y > 0);

        // Pixel inside the image region is ~1.0
        let y = pad_y as usize + 1;
        assert!((tensor[[0, 0, y, 1]] - 1.0).abs() < 0.01);

        // Pad pixel is ~114/255
        let pad_val = 114.0 / 255.0;
        assert!((tensor[[0, 0, 0, 0]] - pad_val).abs() < 0.01);
    }

    /// Builds flat `[1, num_feats, num_dets]`-style transposed data from rows.
    fn transpose_rows(rows: &[Vec<f32>]) -> Vec<f32> {
        let num_dets = rows.len();
        let num_feats = rows[0].len();
        let mut data = vec![0.0f32; num_dets * num_feats];
        for (i, row) in rows.iter().enumerate() {
            for (f, &v) in row.iter().enumerate() {
                data[f * num_dets + i] = v;
            }
        }
        data
    }

    #[test]
    fn test_decode_rows_picks_best_class() {
        // One detection, 3 classes, class 1 wins.
        let row = vec![100.0, 100.0, 40.0, 80.0, 0.1, 0.9, 0.2];
        let dets = decode_rows(&row, 1, 7, false, 0.25, 1.0, 0, 0);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
        assert!((dets[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_decode_rows_threshold_filters() {
        let rows = [
            vec![100.0, 100.0, 40.0, 80.0, 0.9, 0.0],
            vec![300.0, 300.0, 40.0, 80.0, 0.1, 0.0],
        ];
        let data: Vec<f32> = rows.iter().flatten().copied().collect();
        let dets = decode_rows(&data, 2, 6, false, 0.25, 1.0, 0, 0);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 0);
    }

    #[test]
    fn test_decode_rows_transposed_layout() {
        let rows = [
            vec![100.0, 100.0, 40.0, 80.0, 0.9, 0.0],
            vec![300.0, 300.0, 40.0, 80.0, 0.0, 0.8],
        ];
        let data = transpose_rows(&rows);
        let dets = decode_rows(&data, 2, 6, true, 0.25, 1.0, 0, 0);
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class_id, 0);
        assert_eq!(dets[1].class_id, 1);
    }

    #[test]
    fn test_decode_rows_maps_letterbox_coords() {
        // cx=320, cy=320, w=64, h=64 at scale 2.0 with pad (0, 160):
        // x1 = (320-32)/2 = 144, y1 = (320-32-160)/2 = 64
        let row = vec![320.0, 320.0, 64.0, 64.0, 0.9];
        let dets = decode_rows(&row, 1, 5, false, 0.25, 2.0, 0, 160);
        assert_eq!(dets.len(), 1);
        assert!((dets[0].x1 - 144.0).abs() < 1e-6);
        assert!((dets[0].y1 - 64.0).abs() < 1e-6);
        assert!((dets[0].x2 - 176.0).abs() < 1e-6);
        assert!((dets[0].y2 - 96.0).abs() < 1e-6);
    }

    fn raw(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> RawDetection {
        RawDetection {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id: 0,
        }
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut dets = vec![
            raw(0.0, 0.0, 100.0, 100.0, 0.9),
            raw(5.0, 5.0, 105.0, 105.0, 0.8),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_nms_keeps_non_overlapping() {
        let mut dets = vec![
            raw(0.0, 0.0, 50.0, 50.0, 0.9),
            raw(200.0, 200.0, 250.0, 250.0, 0.8),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_empty_input() {
        let mut dets: Vec<RawDetection> = Vec::new();
        let kept = nms(&mut dets, 0.3);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_nms_confidence_ordering() {
        let mut dets = vec![
            raw(0.0, 0.0, 100.0, 100.0, 0.5),
            raw(2.0, 2.0, 102.0, 102.0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-9);
    }
}
