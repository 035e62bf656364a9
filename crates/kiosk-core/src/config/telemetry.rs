//! Telemetry channel configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the live push channel carrying device readings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// WebSocket endpoint of the push channel.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// First reconnect delay after a drop, in milliseconds.
    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial_delay_ms: u64,
    /// Upper bound for the exponential reconnect delay, in milliseconds.
    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_delay_ms: u64,
    /// A connection that delivers no frame for this long counts as dropped.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Buffer size of the signal queue between transport and session.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Drop `healthData` payloads that carry no `userId`.
    #[serde(default)]
    pub require_session_tag: bool,
}

impl TelemetryConfig {
    /// Initial reconnect delay.
    pub fn reconnect_initial_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_delay_ms)
    }

    /// Maximum reconnect delay.
    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }

    /// Idle timeout.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            reconnect_initial_delay_ms: default_reconnect_initial(),
            reconnect_max_delay_ms: default_reconnect_max(),
            idle_timeout_seconds: default_idle_timeout(),
            channel_buffer_size: default_channel_buffer(),
            require_session_tag: false,
        }
    }
}

fn default_ws_url() -> String {
    "ws://localhost:3000/ws".to_string()
}

fn default_reconnect_initial() -> u64 {
    500
}

fn default_reconnect_max() -> u64 {
    10_000
}

fn default_idle_timeout() -> u64 {
    30
}

fn default_channel_buffer() -> usize {
    256
}
