//! The local record of one visit and its legal state transitions.

use kiosk_core::error::AppError;
use kiosk_core::result::AppResult;
use kiosk_core::types::{AdmissionState, ChannelState, SessionId};

/// One user's visit as seen by the kiosk.
///
/// Enforces two invariants on every write: admission state only moves
/// along [`allowed`] edges, and the telemetry channel is `Disconnected`
/// whenever the admission state does not allow a channel.
#[derive(Debug, Clone)]
pub struct Session {
    session_id: Option<SessionId>,
    state: AdmissionState,
    queue_position: u32,
    queue_total: u32,
    channel_state: ChannelState,
    receiving: bool,
}

/// Whether `from -> to` is a legal admission transition.
pub fn allowed(from: AdmissionState, to: AdmissionState) -> bool {
    use AdmissionState::*;

    matches!(
        (from, to),
        (Registering, Queued)
            | (Queued, Admitted)
            | (Admitted, Capturing)
            | (Admitted, Committing)
            | (Capturing, Committing)
            | (Committing, Committed)
            | (Committing, Failed)
            | (Failed, Committing)
            | (Failed, Capturing)
            | (Registering | Queued | Admitted | Capturing | Committing | Committed | Failed, Released)
    )
}

impl Session {
    /// A visit whose registration is in flight.
    pub fn new() -> Self {
        Self {
            session_id: None,
            state: AdmissionState::Registering,
            queue_position: 0,
            queue_total: 0,
            channel_state: ChannelState::Disconnected,
            receiving: false,
        }
    }

    /// A registered visit waiting in the queue.
    pub fn registered(session_id: SessionId) -> Self {
        let mut session = Self::new();
        session.session_id = Some(session_id);
        session.state = AdmissionState::Queued;
        session
    }

    /// Identifier issued by the registry.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Current admission state.
    pub fn state(&self) -> AdmissionState {
        self.state
    }

    /// Current telemetry channel liveness.
    pub fn channel_state(&self) -> ChannelState {
        self.channel_state
    }

    /// Whether at least one reading has arrived this visit.
    pub fn receiving(&self) -> bool {
        self.receiving
    }

    /// Queue position and total; meaningful only while queued.
    pub fn queue_slot(&self) -> Option<(u32, u32)> {
        (self.state == AdmissionState::Queued).then_some((self.queue_position, self.queue_total))
    }

    /// Move to `to`, returning the previous state.
    pub fn transition(&mut self, to: AdmissionState) -> AppResult<AdmissionState> {
        let from = self.state;
        if !allowed(from, to) {
            return Err(AppError::invalid_state(format!(
                "session cannot move from {from} to {to}"
            )));
        }

        self.state = to;
        if !to.allows_channel() {
            self.channel_state = ChannelState::Disconnected;
        }
        if to != AdmissionState::Queued {
            self.queue_position = 0;
            self.queue_total = 0;
        }
        Ok(from)
    }

    /// Record a queue position. Ignored unless queued.
    pub fn set_queue_slot(&mut self, position: u32, total: u32) -> bool {
        if self.state != AdmissionState::Queued {
            return false;
        }
        let total = total.max(position);
        let changed = (self.queue_position, self.queue_total) != (position, total);
        self.queue_position = position;
        self.queue_total = total;
        changed
    }

    /// Record channel liveness. Returns whether the stored state changed;
    /// anything but `Disconnected` is refused outside channel states.
    pub fn set_channel_state(&mut self, state: ChannelState) -> bool {
        if state != ChannelState::Disconnected && !self.state.allows_channel() {
            return false;
        }
        let changed = self.channel_state != state;
        self.channel_state = state;
        changed
    }

    /// Note that telemetry is flowing.
    pub fn mark_receiving(&mut self) {
        self.receiving = true;
    }

    /// Forget that telemetry was flowing (new capture cycle).
    pub fn clear_receiving(&mut self) {
        self.receiving = false;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
