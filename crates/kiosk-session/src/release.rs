//! Release notification: tell the registry the device is free, once.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use kiosk_core::traits::RegistryClient;
use kiosk_core::types::SessionId;

use crate::admission::AdmissionClient;

/// Which release call was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    /// `queue/complete` after a successful commit.
    Complete,
    /// `queue/leave` without one.
    Leave,
}

/// Sends at most one release notification per visit.
#[derive(Debug)]
pub struct ReleaseNotifier {
    registry: Arc<dyn RegistryClient>,
    admission: AdmissionClient,
    session_id: SessionId,
    sent: Option<ReleaseKind>,
    tasks: Vec<JoinHandle<()>>,
}

impl ReleaseNotifier {
    /// Create a notifier for one session.
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        admission: AdmissionClient,
        session_id: SessionId,
    ) -> Self {
        Self {
            registry,
            admission,
            session_id,
            sent: None,
            tasks: Vec::new(),
        }
    }

    /// The notification already sent, if any.
    pub fn sent(&self) -> Option<ReleaseKind> {
        self.sent
    }

    /// Send `kind` in the background unless a notification already went out.
    /// Returns whether this call sent it.
    pub fn notify(&mut self, kind: ReleaseKind) -> bool {
        if self.sent.is_some() {
            return false;
        }
        self.sent = Some(kind);

        let session_id = self.session_id.clone();
        let task = match kind {
            ReleaseKind::Complete => {
                let registry = Arc::clone(&self.registry);
                tokio::spawn(async move {
                    match registry.complete(&session_id).await {
                        Ok(()) => info!(session_id = %session_id, "Device released after commit"),
                        Err(e) => {
                            warn!(session_id = %session_id, error = %e, "Release notification failed")
                        }
                    }
                })
            }
            ReleaseKind::Leave => {
                let admission = self.admission.clone();
                tokio::spawn(async move { admission.leave_queue(&session_id).await })
            }
        };
        self.tasks.push(task);
        true
    }

    /// Wait for outstanding notifications.
    pub async fn drain(&mut self) {
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "Release task ended abnormally");
            }
        }
    }
}
