//! Session lifecycle events.

use serde::{Deserialize, Serialize};

use crate::types::{AdmissionState, ChannelState, Metric, ReleaseReason};

/// Which signal granted admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionSource {
    /// The status check right after registration.
    Immediate,
    /// A periodic status poll.
    Poll,
    /// A `queueUpdate` push.
    Push,
}

/// Events related to one kiosk visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// The admission state changed.
    StateChanged {
        /// Previous state.
        from: AdmissionState,
        /// New state.
        to: AdmissionState,
    },
    /// The queue position was refreshed.
    QueueUpdated {
        /// 1-based position.
        position: u32,
        /// Sessions waiting.
        total: u32,
        /// Estimated wait shown to the user.
        estimated_wait_minutes: u32,
    },
    /// The session was granted the device.
    Admitted {
        /// Which signal won.
        source: AdmissionSource,
    },
    /// The telemetry channel changed liveness.
    ChannelChanged {
        /// New channel state.
        state: ChannelState,
    },
    /// A metric value was accepted.
    ReadingUpdated {
        /// Metric.
        metric: Metric,
        /// New value.
        value: f64,
    },
    /// A commit attempt was issued.
    CommitStarted {
        /// 1-based attempt number within the current cycle.
        attempt: u32,
    },
    /// The registry persisted the reading set.
    CommitSucceeded,
    /// The submission failed; retry or cancel is required.
    CommitFailed {
        /// Failure description.
        reason: String,
    },
    /// The visit ended and the device was released.
    Released {
        /// Why.
        reason: ReleaseReason,
    },
}
