//! Telemetry capture and the commit cycle.

mod helpers;

use std::time::Duration;

use kiosk_core::error::{AppError, ErrorKind};
use kiosk_core::traits::{ChannelSignal, Subscription};
use kiosk_core::types::{AdmissionState, AttemptState, ChannelState, Metric, ReleaseReason};

use helpers::{Call, SESSION, TestKiosk, admitted, reading, wait_for};

async fn admitted_kiosk() -> (TestKiosk, kiosk_session::VisitHandle) {
    let kiosk = TestKiosk::new();
    kiosk.registry.script_statuses(vec![Ok(admitted())]);
    let handle = kiosk.start().await;
    wait_for(&handle, |v| v.state == AdmissionState::Admitted).await;
    kiosk.telemetry(ChannelSignal::Connecting).await;
    kiosk.telemetry(ChannelSignal::Connected).await;
    wait_for(&handle, |v| v.state == AdmissionState::Capturing).await;
    (kiosk, handle)
}

#[tokio::test(start_paused = true)]
async fn test_complete_set_commits_once() {
    let (kiosk, handle) = admitted_kiosk().await;
    assert_eq!(handle.view().channel_state, ChannelState::Connected);

    kiosk.full_set(72.0, 97.0, 68.0, 0).await;
    let view = wait_for(&handle, |v| v.state == AdmissionState::Committed).await;
    assert_eq!(view.attempt, AttemptState::Succeeded);
    assert_eq!(view.channel_state, ChannelState::Disconnected);
    assert!(view.receiving);

    let submissions = kiosk.registry.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].heart_rate, 72.0);
    assert_eq!(submissions[0].spo2, 97.0);
    assert_eq!(submissions[0].weight, 68.0);
    assert_eq!(submissions[0].session_id.as_str(), SESSION);
    assert!(kiosk.channels.is_closed(Subscription::Telemetry));

    handle.reset().await;
    let outcome = handle.finished().await.expect("finished");
    assert_eq!(outcome.reason, ReleaseReason::Reset);
    assert!(outcome.committed);
    assert_eq!(kiosk.registry.count(|c| *c == Call::Complete), 1);
    assert_eq!(kiosk.registry.count(|c| *c == Call::Leave), 0);
}

#[tokio::test(start_paused = true)]
async fn test_partial_set_waits() {
    let (kiosk, handle) = admitted_kiosk().await;

    kiosk
        .telemetry(reading(Some(SESSION), Metric::HeartRate, 72.0, 0))
        .await;
    kiosk
        .telemetry(reading(Some(SESSION), Metric::Weight, 68.0, 1))
        .await;
    let view = wait_for(&handle, |v| v.readings.weight.is_some()).await;

    assert_eq!(view.state, AdmissionState::Capturing);
    assert_eq!(view.readings.heart_rate, Some(72.0));
    assert_eq!(view.readings.spo2, None);
    assert!(kiosk.registry.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_last_writer_wins_per_metric() {
    let (kiosk, handle) = admitted_kiosk().await;

    kiosk
        .telemetry(reading(Some(SESSION), Metric::HeartRate, 80.0, 10))
        .await;
    // Arrives late with an older timestamp.
    kiosk
        .telemetry(reading(Some(SESSION), Metric::HeartRate, 60.0, 5))
        .await;
    kiosk
        .telemetry(reading(Some(SESSION), Metric::Spo2, 95.0, 6))
        .await;
    kiosk
        .telemetry(reading(Some(SESSION), Metric::Weight, 70.0, 7))
        .await;

    wait_for(&handle, |v| v.state == AdmissionState::Committed).await;
    let submissions = kiosk.registry.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].heart_rate, 80.0);
}

#[tokio::test(start_paused = true)]
async fn test_foreign_session_reading_discarded() {
    let (kiosk, handle) = admitted_kiosk().await;

    kiosk
        .telemetry(reading(Some("u-2"), Metric::HeartRate, 72.0, 0))
        .await;
    kiosk
        .telemetry(reading(Some(SESSION), Metric::Spo2, 97.0, 1))
        .await;
    let view = wait_for(&handle, |v| v.readings.spo2.is_some()).await;

    assert_eq!(view.readings.heart_rate, None);
}

#[tokio::test(start_paused = true)]
async fn test_channel_drop_keeps_partial_readings() {
    let (kiosk, handle) = admitted_kiosk().await;

    kiosk
        .telemetry(reading(Some(SESSION), Metric::HeartRate, 72.0, 0))
        .await;
    kiosk
        .telemetry(ChannelSignal::Disconnected {
            reason: "stream ended".to_string(),
        })
        .await;
    let view = wait_for(&handle, |v| v.channel_state == ChannelState::Disconnected).await;
    assert!(view.degraded);
    assert_eq!(view.state, AdmissionState::Capturing);
    assert_eq!(view.readings.heart_rate, Some(72.0));

    kiosk.telemetry(ChannelSignal::Connected).await;
    kiosk
        .telemetry(reading(Some(SESSION), Metric::Spo2, 97.0, 1))
        .await;
    kiosk
        .telemetry(reading(Some(SESSION), Metric::Weight, 68.0, 2))
        .await;
    let view = wait_for(&handle, |v| v.state == AdmissionState::Committed).await;
    assert!(!view.degraded);
    assert_eq!(kiosk.registry.submissions()[0].heart_rate, 72.0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_commit_then_retry() {
    let kiosk = TestKiosk::new();
    kiosk.registry.script_statuses(vec![Ok(admitted())]);
    kiosk.registry.script_submits(vec![(
        Duration::from_secs(1),
        Err(AppError::commit_failed("503 Service Unavailable")),
    )]);
    let handle = kiosk.start().await;
    wait_for(&handle, |v| v.state == AdmissionState::Admitted).await;
    kiosk.telemetry(ChannelSignal::Connected).await;

    kiosk.full_set(72.0, 97.0, 68.0, 0).await;
    let view = wait_for(&handle, |v| v.state == AdmissionState::Failed).await;
    assert_eq!(view.attempt, AttemptState::Failed);
    assert!(view.last_error.as_deref().is_some_and(|e| e.contains("503")));
    assert_eq!(view.readings.heart_rate, Some(72.0));
    assert_eq!(view.channel_state, ChannelState::Disconnected);
    assert!(view.awaiting_decision());

    handle.retry().await.expect("retry");
    wait_for(&handle, |v| v.state == AdmissionState::Committed).await;

    let submissions = kiosk.registry.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0], submissions[1]);
    assert_eq!(kiosk.registry.count(|c| *c == Call::Complete), 1);

    let err = handle.retry().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);

    handle.reset().await;
    handle.finished().await.expect("finished");
    assert_eq!(kiosk.registry.count(|c| *c == Call::Leave), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_resubmits_frozen_snapshot() {
    let (kiosk, handle) = admitted_kiosk().await;
    kiosk.registry.script_submits(vec![(
        Duration::from_secs(10),
        Err(AppError::network("timeout")),
    )]);

    kiosk.full_set(72.0, 97.0, 68.0, 0).await;
    wait_for(&handle, |v| v.state == AdmissionState::Committing).await;

    // Newer data and a full replay arrive while the first attempt is out.
    kiosk
        .telemetry(reading(Some(SESSION), Metric::HeartRate, 90.0, 50))
        .await;
    kiosk.full_set(72.0, 97.0, 68.0, 0).await;
    let view = wait_for(&handle, |v| v.readings.heart_rate == Some(90.0)).await;
    assert_eq!(view.state, AdmissionState::Committing);

    wait_for(&handle, |v| v.state == AdmissionState::Failed).await;
    assert_eq!(kiosk.registry.submissions().len(), 1);

    handle.retry().await.expect("retry");
    wait_for(&handle, |v| v.state == AdmissionState::Committed).await;
    let submissions = kiosk.registry.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[1].heart_rate, 72.0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_captures_fresh_readings() {
    let (kiosk, handle) = admitted_kiosk().await;
    kiosk.registry.script_submits(vec![(
        Duration::ZERO,
        Err(AppError::commit_failed("rejected")),
    )]);

    kiosk.full_set(72.0, 97.0, 68.0, 0).await;
    wait_for(&handle, |v| v.state == AdmissionState::Failed).await;
    handle.cancel().await.expect("cancel");

    let view = wait_for(&handle, |v| v.state == AdmissionState::Capturing).await;
    assert_eq!(view.attempt, AttemptState::NotStarted);
    assert_eq!(view.readings.heart_rate, None);
    assert!(!view.receiving);
    assert_eq!(kiosk.channels.opened(Subscription::Telemetry), 2);

    kiosk.telemetry(ChannelSignal::Connected).await;
    kiosk.full_set(75.0, 98.0, 69.0, 100).await;
    wait_for(&handle, |v| v.state == AdmissionState::Committed).await;

    let submissions = kiosk.registry.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[1].heart_rate, 75.0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_and_cancel_need_failed_commit() {
    let (_kiosk, handle) = admitted_kiosk().await;

    let err = handle.retry().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
    let err = handle.cancel().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
    assert_eq!(handle.view().state, AdmissionState::Capturing);
}
