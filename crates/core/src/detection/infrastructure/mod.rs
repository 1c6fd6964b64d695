pub mod bytetrack_tracker;
pub mod coco_labels;
mod math;
pub mod onnx_person_detector;
