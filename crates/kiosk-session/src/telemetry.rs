//! Telemetry aggregator: one session-scoped channel and the reading merge.

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use kiosk_core::result::AppResult;
use kiosk_core::traits::{ChannelHandle, ChannelSignal, PushChannel, Subscription};
use kiosk_core::types::{SessionId, TelemetryEvent};

use crate::reading::{ApplyOutcome, ReadingSet, ReadingSnapshot};

/// What [`TelemetryAggregator::ingest`] did with an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingested {
    /// Filtered out (foreign session, implausible, stale, or a replay).
    Ignored,
    /// Merged into the reading set.
    Updated,
    /// Merged, and the set just became complete for this cycle.
    Complete(ReadingSnapshot),
}

/// Owns the telemetry channel and the reading set of one session.
#[derive(Debug)]
pub struct TelemetryAggregator {
    channels: Arc<dyn PushChannel>,
    session_id: SessionId,
    require_session_tag: bool,
    handle: Option<ChannelHandle>,
    readings: ReadingSet,
    handed_off: bool,
}

impl TelemetryAggregator {
    /// Create an aggregator with no channel open.
    pub fn new(
        channels: Arc<dyn PushChannel>,
        session_id: SessionId,
        require_session_tag: bool,
    ) -> Self {
        Self {
            channels,
            session_id,
            require_session_tag,
            handle: None,
            readings: ReadingSet::new(),
            handed_off: false,
        }
    }

    /// Open the channel unless one is already open.
    pub async fn open(&mut self) -> AppResult<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        let handle = self
            .channels
            .open(&self.session_id, Subscription::Telemetry)
            .await?;
        info!(session_id = %self.session_id, "Telemetry channel opened");
        self.handle = Some(handle);
        Ok(())
    }

    /// Close the channel. Idempotent.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
            info!(session_id = %self.session_id, "Telemetry channel closed");
        }
    }

    /// Whether a channel is open.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Next channel signal. Pending while no channel is open.
    ///
    /// Returns `None` when the transport task behind the channel ended;
    /// the handle is discarded so the caller can reopen.
    pub async fn next_signal(&mut self) -> Option<ChannelSignal> {
        let Some(handle) = self.handle.as_mut() else {
            return std::future::pending().await;
        };
        let signal = handle.recv().await;
        if signal.is_none() {
            warn!(
                session_id = %handle.session_id(),
                subscription = %handle.subscription(),
                "Push channel ended"
            );
            self.handle = None;
        }
        signal
    }

    /// Merge one event.
    pub fn ingest(&mut self, event: &TelemetryEvent) -> Ingested {
        match &event.session_id {
            Some(tag) if *tag != self.session_id => {
                debug!(
                    session_id = %self.session_id,
                    tagged = %tag,
                    "Telemetry for another session discarded"
                );
                return Ingested::Ignored;
            }
            None if self.require_session_tag => {
                debug!(session_id = %self.session_id, "Untagged telemetry discarded");
                return Ingested::Ignored;
            }
            _ => {}
        }
        if !event.is_plausible() {
            trace!(metric = %event.metric, value = event.value, "Implausible reading dropped");
            return Ingested::Ignored;
        }

        match self.readings.apply(event) {
            ApplyOutcome::Stale | ApplyOutcome::Duplicate => Ingested::Ignored,
            ApplyOutcome::Applied => {
                if self.handed_off {
                    return Ingested::Updated;
                }
                match self.readings.snapshot() {
                    Some(snapshot) => {
                        self.handed_off = true;
                        Ingested::Complete(snapshot)
                    }
                    None => Ingested::Updated,
                }
            }
        }
    }

    /// Current readings.
    pub fn readings(&self) -> &ReadingSet {
        &self.readings
    }

    /// Whether this cycle's snapshot has been handed off.
    pub fn handed_off(&self) -> bool {
        self.handed_off
    }

    /// Start a new capture cycle: drop the readings and allow another hand-off.
    pub fn reset_cycle(&mut self) {
        self.readings.clear();
        self.handed_off = false;
    }
}
