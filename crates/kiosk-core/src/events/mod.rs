//! Domain events emitted by the session state machine.
//!
//! Events are published on a broadcast channel and consumed by the
//! presentation layer, the station console, and audit logging.

pub mod session;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use session::{AdmissionSource, SessionEvent};

use crate::types::SessionId;

/// Wrapper for session events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KioskEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Session the event belongs to, once one has been issued.
    pub session_id: Option<SessionId>,
    /// The event payload.
    pub payload: SessionEvent,
}

impl KioskEvent {
    /// Create a new event stamped now.
    pub fn new(session_id: Option<SessionId>, payload: SessionEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            session_id,
            payload,
        }
    }
}
