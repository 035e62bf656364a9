//! Admission client: registration, queue status, and leaving the queue.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use kiosk_core::config::AdmissionConfig;
use kiosk_core::result::AppResult;
use kiosk_core::traits::RegistryClient;
use kiosk_core::types::{AdmissionStatus, Profile, SessionId};

/// Talks to the registry on behalf of queued sessions.
#[derive(Debug, Clone)]
pub struct AdmissionClient {
    registry: Arc<dyn RegistryClient>,
    config: AdmissionConfig,
}

impl AdmissionClient {
    /// Create an admission client.
    pub fn new(registry: Arc<dyn RegistryClient>, config: AdmissionConfig) -> Self {
        Self { registry, config }
    }

    /// Validate the profile locally, then register it.
    ///
    /// Nothing is created on failure; the caller sees the error.
    #[instrument(skip(self, profile), fields(email = %profile.email))]
    pub async fn register(&self, profile: &Profile) -> AppResult<SessionId> {
        profile.check()?;
        let session_id = self.registry.register(profile).await.inspect_err(|e| {
            warn!(error = %e, "Registration failed");
        })?;
        info!(session_id = %session_id, "Visitor registered");
        Ok(session_id)
    }

    /// One idempotent admission check.
    pub async fn poll_admission(&self, session_id: &SessionId) -> AppResult<AdmissionStatus> {
        let status = self.registry.queue_status(session_id).await?;
        debug!(
            session_id = %session_id,
            can_proceed = status.can_proceed,
            position = ?status.position,
            total = status.total_in_queue,
            "Queue status"
        );
        Ok(status)
    }

    /// Best-effort queue departure. Failures are logged, never surfaced.
    pub async fn leave_queue(&self, session_id: &SessionId) {
        match self.registry.leave(session_id).await {
            Ok(()) => info!(session_id = %session_id, "Left queue"),
            Err(e) => warn!(session_id = %session_id, error = %e, "Leave queue failed"),
        }
    }

    /// Estimated wait for a given status.
    pub fn estimated_wait_minutes(&self, status: &AdmissionStatus) -> u32 {
        status.estimated_wait_minutes(self.config.minutes_per_position)
    }
}
