use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::detection::domain::detection_monitor::DetectionMonitor;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::frame::Frame;
use crate::shared::presence::PresenceFlag;
use crate::shared::stream_info::StreamInfo;
use crate::video::domain::frame_source::FrameSource;

/// Foreground loop: pulls frames from the source and drives detection.
///
/// All presence writes happen here, inside the monitor callbacks installed
/// at construction: a person entering sets the flag, a person expiring
/// clears it. Other labels are logged and ignored. Presence is a single
/// bit, not a count — the loop answers "is anyone at the door", not
/// "how many".
pub struct IngestionLoop {
    source: Box<dyn FrameSource>,
    monitor: DetectionMonitor,
    stop: Arc<AtomicBool>,
    last_frame: Option<Frame>,
}

impl IngestionLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn ObjectDetector>,
        presence: PresenceFlag,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let mut monitor = DetectionMonitor::new(detector);
        let entered_flag = presence.clone();
        monitor.set_callbacks(
            Box::new(move |det| {
                log::info!("{} detected", det.label());
                if det.is_person() {
                    entered_flag.set(true);
                }
            }),
            Box::new(move |det| {
                log::info!("{} expired", det.label());
                if det.is_person() {
                    presence.set(false);
                }
            }),
        );

        Self {
            source,
            monitor,
            stop,
            last_frame: None,
        }
    }

    /// Opens the underlying stream.
    pub fn open(&mut self, url: &str) -> Result<StreamInfo, Box<dyn std::error::Error>> {
        self.source.open(url)
    }

    /// Runs until the stop flag is raised or the source fails.
    ///
    /// Empty frames are skipped without delay — the source is the natural
    /// rate limiter. A detection failure on one frame is logged and the
    /// loop continues with the next; a source failure is fatal and
    /// propagates.
    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        while !self.stop.load(Ordering::Relaxed) {
            let frame = self.source.next_frame()?;
            if frame.is_empty() {
                continue;
            }
            if let Err(e) = self.monitor.process_frame(&frame) {
                log::warn!("detection failed for frame {}: {e}", frame.index());
            }
            self.last_frame = Some(frame);
        }
        Ok(())
    }

    /// Most recent non-empty frame, retained for external inspection only.
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    /// Releases the frame source.
    pub fn close(&mut self) {
        self.source.close();
    }
}
