use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// One frame's worth of detector output.
#[derive(Clone, Debug, Default)]
pub struct FrameDetections {
    /// Objects visible in this frame, with stable track ids.
    pub detections: Vec<Detection>,
    /// Track ids whose objects have left the scene as of this frame.
    pub expired: Vec<u32>,
}

/// Domain interface for object detection with tracking.
///
/// Implementations are stateful (track identity persists across frames),
/// hence `&mut self`. Expiry is reported by the implementation so that a
/// momentarily-missed object does not flap between entered and expired.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<FrameDetections, Box<dyn std::error::Error>>;
}
