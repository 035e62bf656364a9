//! Queue status as reported by the registry.

use serde::{Deserialize, Serialize};

/// Result of `POST queue/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionStatus {
    /// Whether this session may use the device now.
    pub can_proceed: bool,
    /// 1-based position in the queue; absent once admitted.
    #[serde(default)]
    pub position: Option<u32>,
    /// Number of sessions waiting.
    #[serde(default)]
    pub total_in_queue: u32,
    /// Session currently holding the device, if the registry reports it.
    #[serde(default)]
    pub current_user: Option<serde_json::Value>,
}

impl AdmissionStatus {
    /// Position and total with `position <= total` enforced.
    pub fn queue_slot(&self) -> (u32, u32) {
        let position = self.position.unwrap_or(0);
        (position, self.total_in_queue.max(position))
    }

    /// Estimated wait shown to a queued user.
    pub fn estimated_wait_minutes(&self, minutes_per_position: u32) -> u32 {
        let (position, _) = self.queue_slot();
        position.max(1) * minutes_per_position
    }
}
