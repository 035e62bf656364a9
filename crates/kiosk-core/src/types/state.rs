//! Session state enums shared by the state machine, its events, and views.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a visit is in the admission / capture / commit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionState {
    /// Registration request in flight.
    ///
    /// Only the in-memory session record passes through this state. A visit,
    /// its view, and its events exist once registration returns, so
    /// observers first see [`Queued`](Self::Queued).
    Registering,
    /// Waiting in the device queue.
    Queued,
    /// Granted the device; telemetry not flowing yet.
    Admitted,
    /// Telemetry channel up, collecting readings.
    Capturing,
    /// Reading set submitted, awaiting acknowledgement.
    Committing,
    /// Reading set persisted.
    Committed,
    /// Last submission failed; waiting for retry or cancel.
    Failed,
    /// Visit over; device released.
    Released,
}

impl AdmissionState {
    /// States in which the telemetry channel may be open.
    pub fn allows_channel(&self) -> bool {
        matches!(self, Self::Admitted | Self::Capturing | Self::Committing)
    }

    /// Whether the visit is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released)
    }
}

impl fmt::Display for AdmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Registering => "registering",
            Self::Queued => "queued",
            Self::Admitted => "admitted",
            Self::Capturing => "capturing",
            Self::Committing => "committing",
            Self::Committed => "committed",
            Self::Failed => "failed",
            Self::Released => "released",
        };
        f.write_str(name)
    }
}

/// Liveness of the telemetry channel, independent of [`AdmissionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    /// No live transport.
    Disconnected,
    /// Transport (re)connecting.
    Connecting,
    /// Transport up.
    Connected,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// State of the submission of one reading set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    /// Nothing submitted this cycle.
    NotStarted,
    /// Submission awaiting the registry.
    InFlight,
    /// Registry acknowledged persistence.
    Succeeded,
    /// Last submission failed.
    Failed,
}

/// Why a visit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    /// User pressed leave / back.
    UserLeft,
    /// User reset the kiosk after a successful commit.
    Reset,
    /// Occupancy timer expired.
    TimerExpired,
    /// The station is shutting down.
    Shutdown,
}

impl fmt::Display for ReleaseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserLeft => write!(f, "user_left"),
            Self::Reset => write!(f, "reset"),
            Self::TimerExpired => write!(f, "timer_expired"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_only_while_capturing_states() {
        let open: Vec<AdmissionState> = [
            AdmissionState::Registering,
            AdmissionState::Queued,
            AdmissionState::Admitted,
            AdmissionState::Capturing,
            AdmissionState::Committing,
            AdmissionState::Committed,
            AdmissionState::Failed,
            AdmissionState::Released,
        ]
        .into_iter()
        .filter(AdmissionState::allows_channel)
        .collect();
        assert_eq!(
            open,
            vec![
                AdmissionState::Admitted,
                AdmissionState::Capturing,
                AdmissionState::Committing
            ]
        );
    }
}
