use std::collections::HashMap;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::{FrameDetections, ObjectDetector};
use crate::shared::frame::Frame;

/// Callback invoked for a detection entering or leaving the scene.
pub type DetectionCallback = Box<dyn FnMut(&Detection) + Send>;

/// Converts per-frame tracked detections into entered/expired events.
///
/// This is the registration point for the two presence callbacks. Both fire
/// synchronously inside [`process_frame`](Self::process_frame), on the
/// caller's thread: `on_entered` the first time a track id is seen,
/// `on_expired` when the detector reports the track gone — with the last
/// observed detection, so the label survives the object leaving the frame.
pub struct DetectionMonitor {
    detector: Box<dyn ObjectDetector>,
    on_entered: Option<DetectionCallback>,
    on_expired: Option<DetectionCallback>,
    live: HashMap<u32, Detection>,
}

impl DetectionMonitor {
    pub fn new(detector: Box<dyn ObjectDetector>) -> Self {
        Self {
            detector,
            on_entered: None,
            on_expired: None,
            live: HashMap::new(),
        }
    }

    pub fn set_callbacks(&mut self, on_entered: DetectionCallback, on_expired: DetectionCallback) {
        self.on_entered = Some(on_entered);
        self.on_expired = Some(on_expired);
    }

    /// Runs detection on one frame and fires entered/expired callbacks.
    ///
    /// Returns the detections visible in this frame. Detector errors
    /// propagate without touching the live-track table.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let FrameDetections {
            detections,
            expired,
        } = self.detector.detect(frame)?;

        for det in &detections {
            let is_new = !self.live.contains_key(&det.track_id());
            self.live.insert(det.track_id(), det.clone());
            if is_new {
                if let Some(cb) = self.on_entered.as_mut() {
                    cb(det);
                }
            }
        }

        for id in expired {
            if let Some(det) = self.live.remove(&id) {
                if let Some(cb) = self.on_expired.as_mut() {
                    cb(&det);
                }
            }
        }

        Ok(detections)
    }

    /// Number of objects currently considered in frame.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
