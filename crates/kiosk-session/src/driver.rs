//! The per-visit event loop.
//!
//! One task owns every piece of session state. Network calls run as
//! spawned tasks whose results come back through the loop, so the
//! occupancy timer, the push channels, and user commands stay live while
//! a poll or commit is outstanding.

use std::future::pending;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use kiosk_core::config::AppConfig;
use kiosk_core::error::AppError;
use kiosk_core::events::{AdmissionSource, KioskEvent, SessionEvent};
use kiosk_core::result::AppResult;
use kiosk_core::traits::{ChannelHandle, ChannelSignal, PushChannel, RegistryClient, Subscription};
use kiosk_core::types::{
    AdmissionState, AdmissionStatus, AttemptState, ChannelState, ReleaseReason, SessionId,
    TelemetryEvent,
};

use crate::admission::AdmissionClient;
use crate::commit::CommitController;
use crate::lifecycle::LifecycleTimer;
use crate::reading::ReadingSnapshot;
use crate::release::{ReleaseKind, ReleaseNotifier};
use crate::session::Session;
use crate::telemetry::{Ingested, TelemetryAggregator};
use crate::view::{QueueView, ReadingsView, SessionView};

/// User actions delivered to a running visit.
#[derive(Debug)]
pub enum Command {
    /// Resubmit the frozen reading set after a failed commit.
    Retry(oneshot::Sender<AppResult<()>>),
    /// Drop the failed reading set and capture again.
    Cancel(oneshot::Sender<AppResult<()>>),
    /// Leave the queue or the device.
    Leave,
    /// Reset the kiosk for the next visitor.
    Reset,
    /// The station is stopping.
    Shutdown,
}

/// How a visit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitOutcome {
    pub session_id: SessionId,
    pub reason: ReleaseReason,
    /// Whether the registry acknowledged the reading set.
    pub committed: bool,
}

/// Collaborators and outlets handed to a new driver.
#[derive(Debug)]
pub struct DriverContext {
    pub config: AppConfig,
    pub registry: Arc<dyn RegistryClient>,
    pub channels: Arc<dyn PushChannel>,
    pub commands: mpsc::Receiver<Command>,
    pub events: broadcast::Sender<KioskEvent>,
    pub view: watch::Sender<SessionView>,
}

/// State and tasks of one visit.
#[derive(Debug)]
pub struct Driver {
    session_id: SessionId,
    session: Session,
    admission: AdmissionClient,
    registry: Arc<dyn RegistryClient>,
    channels: Arc<dyn PushChannel>,
    telemetry: TelemetryAggregator,
    commit: CommitController,
    timer: LifecycleTimer,
    release: ReleaseNotifier,

    queue_watch: Option<ChannelHandle>,
    poll_interval: Option<Interval>,
    poll_task: Option<JoinHandle<AppResult<AdmissionStatus>>>,
    poll_source: AdmissionSource,
    commit_task: Option<JoinHandle<AppResult<()>>>,
    countdown: Interval,

    queue_view: Option<QueueView>,
    degraded: bool,
    committed: bool,
    reason: Option<ReleaseReason>,

    commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<KioskEvent>,
    view: watch::Sender<SessionView>,
}

impl Driver {
    /// Build the driver for a freshly registered session.
    pub fn new(session_id: SessionId, ctx: DriverContext) -> Self {
        let DriverContext {
            config,
            registry,
            channels,
            commands,
            events,
            view,
        } = ctx;

        let admission = AdmissionClient::new(Arc::clone(&registry), config.admission.clone());
        let telemetry = TelemetryAggregator::new(
            Arc::clone(&channels),
            session_id.clone(),
            config.telemetry.require_session_tag,
        );
        let release = ReleaseNotifier::new(
            Arc::clone(&registry),
            admission.clone(),
            session_id.clone(),
        );

        let mut poll_interval = tokio::time::interval(config.admission.poll_interval());
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut countdown = tokio::time::interval(config.lifecycle.countdown_tick());
        countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            session: Session::registered(session_id.clone()),
            commit: CommitController::new(session_id.clone()),
            timer: LifecycleTimer::new(config.lifecycle.occupancy_timeout()),
            session_id,
            admission,
            registry,
            channels,
            telemetry,
            release,
            queue_watch: None,
            poll_interval: Some(poll_interval),
            poll_task: None,
            poll_source: AdmissionSource::Immediate,
            commit_task: None,
            countdown,
            queue_view: None,
            degraded: false,
            committed: false,
            reason: None,
            commands,
            events,
            view,
        }
    }

    /// Run the visit until it is released.
    pub async fn run(mut self) -> VisitOutcome {
        info!(session_id = %self.session_id, "Visit started");
        self.open_queue_watch().await;
        self.publish();

        while !self.session.state().is_terminal() {
            tokio::select! {
                command = self.commands.recv() => self.on_command(command).await,
                _ = self.timer.expired() => {
                    info!(session_id = %self.session_id, "Occupancy timer expired");
                    self.teardown(ReleaseReason::TimerExpired);
                }
                _ = tick_opt(&mut self.poll_interval) => self.start_poll(),
                result = join_opt(&mut self.poll_task) => {
                    self.poll_task = None;
                    self.on_poll(result).await;
                }
                signal = recv_opt(&mut self.queue_watch) => self.on_queue_signal(signal).await,
                signal = self.telemetry.next_signal() => self.on_channel_signal(signal),
                result = join_opt(&mut self.commit_task) => {
                    self.commit_task = None;
                    self.on_commit_result(result);
                }
                _ = self.countdown.tick() => self.on_tick().await,
            }
        }

        self.release.drain().await;
        let outcome = VisitOutcome {
            session_id: self.session_id.clone(),
            reason: self.reason.unwrap_or(ReleaseReason::Shutdown),
            committed: self.committed,
        };
        info!(
            session_id = %outcome.session_id,
            reason = %outcome.reason,
            committed = outcome.committed,
            "Visit ended"
        );
        outcome
    }

    async fn on_command(&mut self, command: Option<Command>) {
        match command {
            Some(Command::Retry(reply)) => {
                let _ = reply.send(self.retry());
            }
            Some(Command::Cancel(reply)) => {
                let result = self.cancel().await;
                let _ = reply.send(result);
            }
            Some(Command::Leave) => self.teardown(ReleaseReason::UserLeft),
            Some(Command::Reset) => self.teardown(ReleaseReason::Reset),
            Some(Command::Shutdown) | None => self.teardown(ReleaseReason::Shutdown),
        }
    }

    // --- admission ---------------------------------------------------------

    async fn open_queue_watch(&mut self) {
        if self.queue_watch.is_some() || self.session.state() != AdmissionState::Queued {
            return;
        }
        match self.channels.open(&self.session_id, Subscription::Queue).await {
            Ok(handle) => self.queue_watch = Some(handle),
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Queue watch unavailable, polling only")
            }
        }
    }

    fn start_poll(&mut self) {
        if self.poll_task.is_some() || self.session.state() != AdmissionState::Queued {
            return;
        }
        let admission = self.admission.clone();
        let session_id = self.session_id.clone();
        self.poll_task = Some(tokio::spawn(async move {
            admission.poll_admission(&session_id).await
        }));
    }

    async fn on_poll(&mut self, result: Result<AppResult<AdmissionStatus>, JoinError>) {
        let source = self.poll_source;
        self.poll_source = AdmissionSource::Poll;
        if self.session.state() != AdmissionState::Queued {
            return;
        }

        let status = match result {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                warn!(session_id = %self.session_id, error = %e, "Queue status check failed");
                self.degraded = true;
                self.publish();
                return;
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Queue status task failed");
                return;
            }
        };

        self.degraded = false;
        if status.can_proceed {
            self.admit(source).await;
            return;
        }

        let (position, total) = status.queue_slot();
        let estimated_wait_minutes = self.admission.estimated_wait_minutes(&status);
        let changed = self.session.set_queue_slot(position, total);
        self.queue_view = Some(QueueView {
            position,
            total,
            estimated_wait_minutes,
        });
        if changed {
            self.emit(SessionEvent::QueueUpdated {
                position,
                total,
                estimated_wait_minutes,
            });
        }
        self.publish();
    }

    async fn on_queue_signal(&mut self, signal: Option<ChannelSignal>) {
        match signal {
            Some(ChannelSignal::QueueUpdate {
                session_id,
                can_proceed,
            }) => {
                if can_proceed && session_id == self.session_id {
                    // The push won the race; any poll still in flight is moot.
                    if let Some(task) = self.poll_task.take() {
                        task.abort();
                    }
                    self.admit(AdmissionSource::Push).await;
                } else {
                    self.start_poll();
                }
            }
            Some(other) => debug!(session_id = %self.session_id, signal = ?other, "Queue watch"),
            None => {
                if let Some(watch) = self.queue_watch.take() {
                    warn!(
                        session_id = %watch.session_id(),
                        subscription = %watch.subscription(),
                        "Push channel ended, polling only until it reopens"
                    );
                }
            }
        }
    }

    /// Queued -> Admitted. Applying it again is a no-op, so a poll and a
    /// push that race both converge here.
    async fn admit(&mut self, source: AdmissionSource) {
        if self.session.state() != AdmissionState::Queued {
            return;
        }
        if let Err(e) = self.transition(AdmissionState::Admitted) {
            warn!(session_id = %self.session_id, error = %e, "Admission rejected");
            return;
        }
        info!(session_id = %self.session_id, source = ?source, "Visitor admitted");
        self.emit(SessionEvent::Admitted { source });

        self.poll_interval = None;
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        if let Some(watch) = self.queue_watch.take() {
            watch.close();
        }
        self.queue_view = None;

        self.timer.start();
        self.open_telemetry().await;
        self.publish();
    }

    // --- telemetry ---------------------------------------------------------

    async fn open_telemetry(&mut self) {
        if let Err(e) = self.telemetry.open().await {
            warn!(session_id = %self.session_id, error = %e, "Telemetry channel unavailable, will retry");
            self.degraded = true;
        }
    }

    fn on_channel_signal(&mut self, signal: Option<ChannelSignal>) {
        match signal {
            Some(ChannelSignal::Connecting) => self.set_channel(ChannelState::Connecting),
            Some(ChannelSignal::Connected) => {
                self.degraded = false;
                self.set_channel(ChannelState::Connected);
                if self.session.state() == AdmissionState::Admitted {
                    self.try_transition(AdmissionState::Capturing);
                }
            }
            Some(ChannelSignal::Disconnected { reason }) => {
                let error = AppError::channel_dropped(reason);
                warn!(session_id = %self.session_id, error = %error, "Telemetry degraded");
                self.degraded = true;
                self.set_channel(ChannelState::Disconnected);
            }
            Some(ChannelSignal::Telemetry(event)) => self.on_telemetry(&event),
            Some(ChannelSignal::QueueUpdate { .. }) => {}
            None => {
                self.degraded = true;
                self.set_channel(ChannelState::Disconnected);
            }
        }
        self.publish();
    }

    fn on_telemetry(&mut self, event: &TelemetryEvent) {
        let ingested = self.telemetry.ingest(event);
        if ingested == Ingested::Ignored {
            return;
        }

        self.session.mark_receiving();
        self.emit(SessionEvent::ReadingUpdated {
            metric: event.metric,
            value: event.value,
        });
        if self.session.state() == AdmissionState::Admitted {
            self.try_transition(AdmissionState::Capturing);
        }
        if let Ingested::Complete(snapshot) = ingested {
            self.begin_commit(snapshot);
        }
    }

    // --- commit ------------------------------------------------------------

    fn begin_commit(&mut self, snapshot: ReadingSnapshot) {
        if !matches!(
            self.session.state(),
            AdmissionState::Admitted | AdmissionState::Capturing
        ) {
            return;
        }
        match self.commit.begin(snapshot) {
            Ok(submission) => {
                self.try_transition(AdmissionState::Committing);
                self.emit(SessionEvent::CommitStarted {
                    attempt: self.commit.attempts(),
                });
                let registry = Arc::clone(&self.registry);
                self.commit_task = Some(tokio::spawn(async move {
                    registry.submit_readings(&submission).await
                }));
            }
            Err(e) => warn!(session_id = %self.session_id, error = %e, "Commit not started"),
        }
    }

    fn on_commit_result(&mut self, result: Result<AppResult<()>, JoinError>) {
        if self.commit.state() != AttemptState::InFlight {
            return;
        }
        let result = result
            .map_err(|e| AppError::internal(format!("commit task failed: {e}")))
            .and_then(|inner| inner);

        match result {
            Ok(()) => {
                if self.commit.on_success().is_err() {
                    return;
                }
                info!(
                    session_id = %self.session_id,
                    attempt = self.commit.attempts(),
                    "Readings committed"
                );
                self.committed = true;
                self.telemetry.close();
                self.try_transition(AdmissionState::Committed);
                self.emit(SessionEvent::CommitSucceeded);
                self.release.notify(ReleaseKind::Complete);
            }
            Err(e) => {
                if self.commit.on_failure(&e).is_err() {
                    return;
                }
                self.telemetry.close();
                self.try_transition(AdmissionState::Failed);
                self.emit(SessionEvent::CommitFailed { reason: e.message });
            }
        }
        self.publish();
    }

    fn retry(&mut self) -> AppResult<()> {
        if self.session.state() != AdmissionState::Failed {
            return Err(AppError::invalid_state(format!(
                "retry is not available while {}",
                self.session.state()
            )));
        }
        let submission = self.commit.retry()?;
        self.transition(AdmissionState::Committing)?;
        self.emit(SessionEvent::CommitStarted {
            attempt: self.commit.attempts(),
        });
        let registry = Arc::clone(&self.registry);
        self.commit_task = Some(tokio::spawn(async move {
            registry.submit_readings(&submission).await
        }));
        self.publish();
        Ok(())
    }

    async fn cancel(&mut self) -> AppResult<()> {
        if self.session.state() != AdmissionState::Failed {
            return Err(AppError::invalid_state(format!(
                "cancel is not available while {}",
                self.session.state()
            )));
        }
        self.commit.cancel()?;
        self.telemetry.reset_cycle();
        self.session.clear_receiving();
        self.transition(AdmissionState::Capturing)?;
        info!(session_id = %self.session_id, "Commit cancelled, capturing again");
        self.open_telemetry().await;
        self.publish();
        Ok(())
    }

    // --- lifecycle ---------------------------------------------------------

    async fn on_tick(&mut self) {
        match self.session.state() {
            AdmissionState::Queued => self.open_queue_watch().await,
            AdmissionState::Admitted | AdmissionState::Capturing if !self.telemetry.is_open() => {
                self.open_telemetry().await
            }
            _ => {}
        }
        self.publish();
    }

    /// Release the device. Safe to call any number of times.
    fn teardown(&mut self, reason: ReleaseReason) {
        if self.session.state().is_terminal() {
            return;
        }

        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        if let Some(task) = self.commit_task.take() {
            task.abort();
        }
        self.poll_interval = None;
        if let Some(watch) = self.queue_watch.take() {
            watch.close();
        }
        self.telemetry.close();
        self.telemetry.reset_cycle();
        self.commit.discard();
        self.timer.cancel();
        self.queue_view = None;

        self.try_transition(AdmissionState::Released);
        self.reason = Some(reason);
        self.release.notify(ReleaseKind::Leave);
        info!(
            session_id = %self.session_id,
            reason = %reason,
            notified = ?self.release.sent(),
            "Visit released"
        );
        self.emit(SessionEvent::Released { reason });
        self.publish();
    }

    // --- plumbing ----------------------------------------------------------

    fn transition(&mut self, to: AdmissionState) -> AppResult<()> {
        let channel_before = self.session.channel_state();
        let from = self.session.transition(to)?;
        info!(session_id = %self.session_id, %from, %to, "Session state changed");
        self.emit(SessionEvent::StateChanged { from, to });

        let channel_after = self.session.channel_state();
        if channel_after != channel_before {
            self.emit(SessionEvent::ChannelChanged {
                state: channel_after,
            });
        }
        Ok(())
    }

    fn try_transition(&mut self, to: AdmissionState) {
        if let Err(e) = self.transition(to) {
            warn!(session_id = %self.session_id, error = %e, "Transition skipped");
        }
    }

    fn set_channel(&mut self, state: ChannelState) {
        if self.session.set_channel_state(state) {
            self.emit(SessionEvent::ChannelChanged { state });
        }
    }

    fn emit(&self, payload: SessionEvent) {
        // No subscribers is fine.
        let _ = self
            .events
            .send(KioskEvent::new(Some(self.session_id.clone()), payload));
    }

    fn snapshot_view(&self) -> SessionView {
        let state = self.session.state();
        SessionView {
            session_id: Some(self.session_id.clone()),
            state,
            channel_state: self.session.channel_state(),
            receiving: self.session.receiving(),
            queue: self.queue_view.filter(|_| state == AdmissionState::Queued),
            readings: ReadingsView::from(self.telemetry.readings()),
            attempt: self.commit.state(),
            last_error: self.commit.last_error().map(str::to_owned),
            remaining_seconds: self
                .timer
                .remaining()
                .map(|left| left.as_millis().div_ceil(1000) as u64),
            degraded: self.degraded,
        }
    }

    fn publish(&self) {
        self.view.send_replace(self.snapshot_view());
    }
}

async fn tick_opt(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn join_opt<T>(task: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match task {
        Some(task) => task.await,
        None => pending().await,
    }
}

async fn recv_opt(handle: &mut Option<ChannelHandle>) -> Option<ChannelSignal> {
    match handle {
        Some(handle) => handle.recv().await,
        None => pending().await,
    }
}
