//! Admission (queue watch) configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the queue admission watch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Interval between queue status polls while queued, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Minutes of estimated wait per queue position shown to the user.
    #[serde(default = "default_minutes_per_position")]
    pub minutes_per_position: u32,
}

impl AdmissionConfig {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            minutes_per_position: default_minutes_per_position(),
        }
    }
}

fn default_poll_interval() -> u64 {
    5
}

fn default_minutes_per_position() -> u32 {
    2
}
