use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::alerting::domain::alert_actuator::AlertActuator;
use crate::alerting::domain::alert_config::{AlertConfig, CycleAction};
use crate::shared::presence::PresenceFlag;

/// Background loop: samples the presence flag at the start of each cycle
/// and converts sustained presence into rate-limited chimes.
///
/// Presence is not re-checked mid-cooldown, so the actuator fires at most
/// once per cooldown window while presence stays true, and an in-flight
/// cycle completes even if presence clears during it. Actuator failures are
/// logged and paced exactly like successes — a persistently broken player
/// must not turn into an alert storm.
pub struct AlertLoop {
    presence: PresenceFlag,
    actuator: Box<dyn AlertActuator>,
    config: AlertConfig,
    shutdown: Receiver<()>,
}

impl AlertLoop {
    pub fn new(
        presence: PresenceFlag,
        actuator: Box<dyn AlertActuator>,
        config: AlertConfig,
        shutdown: Receiver<()>,
    ) -> Self {
        Self {
            presence,
            actuator,
            config,
            shutdown,
        }
    }

    /// Runs until a shutdown message arrives (or the sender is dropped).
    pub fn run(mut self) {
        loop {
            let wait = match self.config.decide(self.presence.get()) {
                CycleAction::Trigger { hold } => {
                    log::info!("person at the door, playing chime");
                    if let Err(e) = self.actuator.trigger() {
                        log::error!("chime failed: {e}");
                    }
                    hold
                }
                CycleAction::Sleep(interval) => interval,
            };

            // The cycle sleep doubles as the shutdown wait, so the loop
            // stops promptly even mid-cooldown.
            match self.shutdown.recv_timeout(wait) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
}
