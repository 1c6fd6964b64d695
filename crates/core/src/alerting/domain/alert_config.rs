use std::time::Duration;

use crate::shared::constants::{DEFAULT_COOLDOWN, DEFAULT_POLL_INTERVAL};

/// Timing policy for the alert loop.
///
/// `cooldown` is the minimum interval between two chimes while presence
/// stays true; `poll_interval` is how often presence is re-checked while
/// idle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertConfig {
    pub cooldown: Duration,
    pub poll_interval: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What the alert loop should do with one sampled presence value.
///
/// Presence is sampled only at the start of each cycle; the decision covers
/// the whole cycle, including the sleep that follows. This is what debounces
/// the alert: while presence stays true the actuator fires at most once per
/// cooldown window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleAction {
    /// Fire the actuator, then hold for the cooldown.
    Trigger { hold: Duration },
    /// Stay idle and re-check after the poll interval.
    Sleep(Duration),
}

impl AlertConfig {
    pub fn new(cooldown: Duration, poll_interval: Duration) -> Self {
        Self {
            cooldown,
            poll_interval,
        }
    }

    /// Decide one alert cycle from the sampled presence value.
    pub fn decide(&self, present: bool) -> CycleAction {
        if present {
            CycleAction::Trigger {
                hold: self.cooldown,
            }
        } else {
            CycleAction::Sleep(self.poll_interval)
        }
    }
}
