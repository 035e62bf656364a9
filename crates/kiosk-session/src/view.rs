//! Read-only snapshot of a visit for the presentation layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use kiosk_core::types::{AdmissionState, AttemptState, ChannelState, Metric, SessionId};

use crate::reading::ReadingSet;

/// Queue position as shown to a waiting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueView {
    /// 1-based position.
    pub position: u32,
    /// Sessions waiting.
    pub total: u32,
    /// Estimated wait.
    pub estimated_wait_minutes: u32,
}

/// Current metric values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReadingsView {
    pub heart_rate: Option<f64>,
    pub spo2: Option<f64>,
    pub weight: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl From<&ReadingSet> for ReadingsView {
    fn from(set: &ReadingSet) -> Self {
        let value = |metric| set.get(metric).map(|r| r.value);
        Self {
            heart_rate: value(Metric::HeartRate),
            spo2: value(Metric::Spo2),
            weight: value(Metric::Weight),
            last_updated: set.last_updated(),
        }
    }
}

/// Everything a screen needs to render a visit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub session_id: Option<SessionId>,
    pub state: AdmissionState,
    pub channel_state: ChannelState,
    /// Whether any reading arrived this cycle.
    pub receiving: bool,
    pub queue: Option<QueueView>,
    pub readings: ReadingsView,
    pub attempt: AttemptState,
    pub last_error: Option<String>,
    /// Whole seconds left on the occupancy timer.
    pub remaining_seconds: Option<u64>,
    /// The last queue check failed; the position shown may be stale.
    pub degraded: bool,
}

impl SessionView {
    /// View of a visit that has just been registered.
    pub fn queued(session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
            state: AdmissionState::Queued,
            channel_state: ChannelState::Disconnected,
            receiving: false,
            queue: None,
            readings: ReadingsView::default(),
            attempt: AttemptState::NotStarted,
            last_error: None,
            remaining_seconds: None,
            degraded: false,
        }
    }

    /// Whether the user can retry or cancel right now.
    pub fn awaiting_decision(&self) -> bool {
        self.state == AdmissionState::Failed
    }
}
