//! Device occupancy timer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounds on how long an admitted session may hold the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Seconds from admission until the session is force-released.
    #[serde(default = "default_occupancy_timeout")]
    pub occupancy_timeout_seconds: u64,
    /// Refresh cadence of the user-visible countdown, in milliseconds.
    #[serde(default = "default_countdown_tick")]
    pub countdown_tick_ms: u64,
}

impl LifecycleConfig {
    /// Occupancy timeout as a [`Duration`].
    pub fn occupancy_timeout(&self) -> Duration {
        Duration::from_secs(self.occupancy_timeout_seconds)
    }

    /// Countdown tick as a [`Duration`].
    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            occupancy_timeout_seconds: default_occupancy_timeout(),
            countdown_tick_ms: default_countdown_tick(),
        }
    }
}

fn default_occupancy_timeout() -> u64 {
    120
}

fn default_countdown_tick() -> u64 {
    1000
}
