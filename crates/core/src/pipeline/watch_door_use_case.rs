use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use crate::alerting::domain::alert_actuator::AlertActuator;
use crate::alerting::domain::alert_config::AlertConfig;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::presence::PresenceFlag;
use crate::video::domain::frame_source::FrameSource;

use super::alert_loop::AlertLoop;
use super::ingestion_loop::IngestionLoop;

/// Orchestrates one watch session: wires the ingestion loop, the alert
/// loop, and the presence flag they share, and supervises the alert thread.
///
/// The alert thread is spawned once at startup and stopped
/// deterministically when ingestion ends — signalled through its shutdown
/// channel and joined before `run` returns, whatever the exit path.
/// This is a single-use struct: `run` consumes it.
pub struct WatchDoorUseCase {
    source: Box<dyn FrameSource>,
    detector: Box<dyn ObjectDetector>,
    actuator: Box<dyn AlertActuator>,
    config: AlertConfig,
    stop: Arc<AtomicBool>,
}

impl WatchDoorUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn ObjectDetector>,
        actuator: Box<dyn AlertActuator>,
        config: AlertConfig,
    ) -> Self {
        Self {
            source,
            detector,
            actuator,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for requesting shutdown from another context (e.g. a signal
    /// handler). Raising it makes ingestion exit at its next iteration.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Watches the stream at `url` until the source fails or the stop
    /// handle is raised.
    pub fn run(self, url: &str) -> Result<(), Box<dyn std::error::Error>> {
        let presence = PresenceFlag::new();

        let mut ingestion =
            IngestionLoop::new(self.source, self.detector, presence.clone(), self.stop);
        let info = ingestion.open(url)?;
        log::info!(
            "watching {} ({}x{} @ {:.1} fps, {})",
            info.source,
            info.width,
            info.height,
            info.fps,
            info.codec
        );

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let alert = AlertLoop::new(presence, self.actuator, self.config, shutdown_rx);
        let alert_thread = thread::Builder::new()
            .name("alert-loop".to_string())
            .spawn(move || alert.run())?;

        let result = ingestion.run();

        // Stop the alert loop deterministically, even mid-cooldown.
        let _ = shutdown_tx.send(());
        if alert_thread.join().is_err() {
            log::error!("alert loop panicked");
        }
        ingestion.close();

        result
    }
}
