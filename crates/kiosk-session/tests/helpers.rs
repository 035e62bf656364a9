//! Scripted collaborators for driving visits under a paused clock.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use kiosk_core::config::AppConfig;
use kiosk_core::error::AppError;
use kiosk_core::result::AppResult;
use kiosk_core::traits::{ChannelHandle, ChannelSignal, PushChannel, RegistryClient, Subscription};
use kiosk_core::types::{
    AdmissionStatus, Gender, Metric, Profile, ReadingSubmission, SessionId, TelemetryEvent,
};
use kiosk_session::{Kiosk, SessionView, VisitHandle};

pub const SESSION: &str = "u-1";

/// A registry call, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Register,
    Status,
    Complete,
    Leave,
    Submit(ReadingSubmission),
}

/// Registry whose answers are queued up front.
#[derive(Debug, Default)]
pub struct FakeRegistry {
    register_error: Mutex<Option<AppError>>,
    statuses: Mutex<VecDeque<AppResult<AdmissionStatus>>>,
    submits: Mutex<VecDeque<(Duration, AppResult<()>)>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_register(&self, error: AppError) {
        *self.register_error.lock().unwrap() = Some(error);
    }

    /// Queue answers for `queue/status`. Once drained, every check says
    /// "position 2 of 3".
    pub fn script_statuses(&self, statuses: Vec<AppResult<AdmissionStatus>>) {
        self.statuses.lock().unwrap().extend(statuses);
    }

    /// Queue answers for `users`. Once drained, submissions succeed at once.
    pub fn script_submits(&self, submits: Vec<(Duration, AppResult<()>)>) {
        self.submits.lock().unwrap().extend(submits);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    pub fn submissions(&self) -> Vec<ReadingSubmission> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Submit(body) => Some(body),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn register(&self, _profile: &Profile) -> AppResult<SessionId> {
        self.record(Call::Register);
        match self.register_error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(SessionId::from(SESSION)),
        }
    }

    async fn queue_status(&self, _session_id: &SessionId) -> AppResult<AdmissionStatus> {
        self.record(Call::Status);
        let next = self.statuses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(waiting(2, 3)))
    }

    async fn complete(&self, _session_id: &SessionId) -> AppResult<()> {
        self.record(Call::Complete);
        Ok(())
    }

    async fn leave(&self, _session_id: &SessionId) -> AppResult<()> {
        self.record(Call::Leave);
        Ok(())
    }

    async fn submit_readings(&self, submission: &ReadingSubmission) -> AppResult<()> {
        self.record(Call::Submit(submission.clone()));
        let next = self.submits.lock().unwrap().pop_front();
        let (delay, result) = next.unwrap_or((Duration::ZERO, Ok(())));
        tokio::time::sleep(delay).await;
        result
    }
}

/// Push channels the test feeds by hand.
#[derive(Debug, Default)]
pub struct FakeChannels {
    senders: Mutex<HashMap<Subscription, mpsc::Sender<ChannelSignal>>>,
    opened: Mutex<HashMap<Subscription, usize>>,
}

impl FakeChannels {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opened(&self, subscription: Subscription) -> usize {
        self.opened
            .lock()
            .unwrap()
            .get(&subscription)
            .copied()
            .unwrap_or(0)
    }

    /// Whether the session has closed the latest channel of this kind.
    pub fn is_closed(&self, subscription: Subscription) -> bool {
        self.senders
            .lock()
            .unwrap()
            .get(&subscription)
            .is_none_or(|tx| tx.is_closed())
    }

    pub async fn push(&self, subscription: Subscription, signal: ChannelSignal) {
        let tx = self
            .senders
            .lock()
            .unwrap()
            .get(&subscription)
            .cloned()
            .expect("channel opened");
        tx.send(signal).await.expect("session listening");
    }
}

#[async_trait]
impl PushChannel for FakeChannels {
    async fn open(
        &self,
        session_id: &SessionId,
        subscription: Subscription,
    ) -> AppResult<ChannelHandle> {
        let (tx, rx) = mpsc::channel(64);
        self.senders.lock().unwrap().insert(subscription, tx);
        *self.opened.lock().unwrap().entry(subscription).or_default() += 1;
        Ok(ChannelHandle::new(
            session_id.clone(),
            subscription,
            rx,
            CancellationToken::new(),
        ))
    }
}

pub struct TestKiosk {
    pub kiosk: Kiosk,
    pub registry: Arc<FakeRegistry>,
    pub channels: Arc<FakeChannels>,
}

impl TestKiosk {
    pub fn new() -> Self {
        let registry = FakeRegistry::new();
        let channels = FakeChannels::new();
        let kiosk = Kiosk::new(AppConfig::default(), registry.clone(), channels.clone());
        Self {
            kiosk,
            registry,
            channels,
        }
    }

    /// Register and wait for the first queue check to land.
    pub async fn start(&self) -> VisitHandle {
        let handle = self.kiosk.start_visit(&profile()).await.expect("start visit");
        wait_for(&handle, |v| v.queue.is_some() || v.state != kiosk_core::types::AdmissionState::Queued).await;
        handle
    }

    /// Push a telemetry signal.
    pub async fn telemetry(&self, signal: ChannelSignal) {
        self.channels.push(Subscription::Telemetry, signal).await;
    }

    /// Push the three metrics with increasing timestamps.
    pub async fn full_set(&self, heart_rate: f64, spo2: f64, weight: f64, base_secs: i64) {
        for (offset, (metric, value)) in [
            (Metric::HeartRate, heart_rate),
            (Metric::Spo2, spo2),
            (Metric::Weight, weight),
        ]
        .into_iter()
        .enumerate()
        {
            self.telemetry(reading(Some(SESSION), metric, value, base_secs + offset as i64))
                .await;
        }
    }
}

pub fn profile() -> Profile {
    Profile {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        age: 36,
        contact_number: "+44 20 7946 0000".to_string(),
        gender: Gender::Female,
    }
}

pub fn waiting(position: u32, total: u32) -> AdmissionStatus {
    AdmissionStatus {
        can_proceed: false,
        position: Some(position),
        total_in_queue: total,
        current_user: None,
    }
}

pub fn admitted() -> AdmissionStatus {
    AdmissionStatus {
        can_proceed: true,
        position: None,
        total_in_queue: 0,
        current_user: None,
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .expect("timestamp")
}

pub fn reading(session: Option<&str>, metric: Metric, value: f64, secs: i64) -> ChannelSignal {
    ChannelSignal::Telemetry(TelemetryEvent {
        session_id: session.map(SessionId::from),
        metric,
        value,
        timestamp: at(secs),
    })
}

/// Wait (in virtual time) until the published view satisfies `pred`.
pub async fn wait_for(handle: &VisitHandle, pred: impl Fn(&SessionView) -> bool) -> SessionView {
    let mut views = handle.watch();
    let view = tokio::time::timeout(Duration::from_secs(600), views.wait_for(|v| pred(v)))
        .await
        .expect("view reached in time")
        .expect("visit still publishing");
    view.clone()
}
