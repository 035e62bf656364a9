//! Commit controller: at most one submission in flight per reading set.

use tracing::{debug, warn};

use kiosk_core::error::AppError;
use kiosk_core::result::AppResult;
use kiosk_core::types::{AttemptState, ReadingSubmission, SessionId};

use crate::reading::ReadingSnapshot;

/// Tracks the submission of one frozen reading set.
///
/// A retry always resubmits the snapshot frozen by [`begin`](Self::begin);
/// newer telemetry only reaches the registry after [`cancel`](Self::cancel)
/// starts a new capture cycle.
#[derive(Debug, Clone)]
pub struct CommitController {
    session_id: SessionId,
    state: AttemptState,
    snapshot: Option<ReadingSnapshot>,
    attempts: u32,
    last_error: Option<String>,
}

impl CommitController {
    /// A controller with nothing submitted.
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            state: AttemptState::NotStarted,
            snapshot: None,
            attempts: 0,
            last_error: None,
        }
    }

    /// Current attempt state.
    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Submissions issued for the current snapshot.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The frozen snapshot, if one was taken.
    pub fn snapshot(&self) -> Option<&ReadingSnapshot> {
        self.snapshot.as_ref()
    }

    /// Reason of the last failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Freeze `snapshot` and issue the first submission.
    pub fn begin(&mut self, snapshot: ReadingSnapshot) -> AppResult<ReadingSubmission> {
        if self.state != AttemptState::NotStarted {
            return Err(AppError::invalid_state(format!(
                "commit cannot start while {:?}",
                self.state
            )));
        }
        self.snapshot = Some(snapshot);
        self.attempts = 0;
        self.issue()
    }

    /// Resubmit the frozen snapshot after a failure.
    pub fn retry(&mut self) -> AppResult<ReadingSubmission> {
        if self.state != AttemptState::Failed {
            return Err(AppError::invalid_state("retry is only possible after a failed commit"));
        }
        self.issue()
    }

    fn issue(&mut self) -> AppResult<ReadingSubmission> {
        let snapshot = self
            .snapshot
            .ok_or_else(|| AppError::internal("commit issued without a snapshot"))?;
        self.state = AttemptState::InFlight;
        self.attempts += 1;
        self.last_error = None;
        debug!(session_id = %self.session_id, attempt = self.attempts, "Commit issued");
        Ok(snapshot.to_submission(&self.session_id))
    }

    /// Record the registry's acknowledgement.
    pub fn on_success(&mut self) -> AppResult<()> {
        if self.state != AttemptState::InFlight {
            return Err(AppError::invalid_state("no commit in flight"));
        }
        self.state = AttemptState::Succeeded;
        Ok(())
    }

    /// Record a failed submission.
    pub fn on_failure(&mut self, error: &AppError) -> AppResult<()> {
        if self.state != AttemptState::InFlight {
            return Err(AppError::invalid_state("no commit in flight"));
        }
        warn!(
            session_id = %self.session_id,
            attempt = self.attempts,
            error = %error,
            "Commit failed"
        );
        self.state = AttemptState::Failed;
        self.last_error = Some(error.message.clone());
        Ok(())
    }

    /// Abandon the failed snapshot so a fresh cycle can begin.
    pub fn cancel(&mut self) -> AppResult<()> {
        if self.state != AttemptState::Failed {
            return Err(AppError::invalid_state("cancel is only possible after a failed commit"));
        }
        self.state = AttemptState::NotStarted;
        self.snapshot = None;
        self.attempts = 0;
        self.last_error = None;
        Ok(())
    }

    /// Forget everything, whatever the state. Used on teardown.
    pub fn discard(&mut self) {
        self.state = AttemptState::NotStarted;
        self.snapshot = None;
        self.attempts = 0;
        self.last_error = None;
    }
}
