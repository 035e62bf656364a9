//! Session registry contract.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{AdmissionStatus, Profile, ReadingSubmission, SessionId};

/// Server-side owner of the queue and user records.
///
/// Implementations map transport failures to `Network` errors, rejected
/// registrations to `Validation`, and rejected submissions to
/// `CommitFailed`.
#[async_trait]
pub trait RegistryClient: Send + Sync + std::fmt::Debug + 'static {
    /// `POST register`: create the visit and return its id.
    async fn register(&self, profile: &Profile) -> AppResult<SessionId>;

    /// `POST queue/status`: idempotent admission check.
    async fn queue_status(&self, session_id: &SessionId) -> AppResult<AdmissionStatus>;

    /// `POST queue/complete`: release after a successful commit.
    async fn complete(&self, session_id: &SessionId) -> AppResult<()>;

    /// `POST queue/leave`: release without a commit.
    async fn leave(&self, session_id: &SessionId) -> AppResult<()>;

    /// `POST users`: persist the reading set. Safe to repeat per session.
    async fn submit_readings(&self, submission: &ReadingSubmission) -> AppResult<()>;
}
