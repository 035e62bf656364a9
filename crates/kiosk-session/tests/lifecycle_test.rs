//! Occupancy timer and teardown.

mod helpers;

use std::time::Duration;

use tokio::time::Instant;

use kiosk_core::events::SessionEvent;
use kiosk_core::traits::{ChannelSignal, Subscription};
use kiosk_core::types::{AdmissionState, AttemptState, ReleaseReason};

use helpers::{Call, TestKiosk, admitted, wait_for};

#[tokio::test(start_paused = true)]
async fn test_timer_releases_idle_session() {
    let kiosk = TestKiosk::new();
    kiosk.registry.script_statuses(vec![Ok(admitted())]);
    let handle = kiosk.start().await;
    wait_for(&handle, |v| v.state == AdmissionState::Admitted).await;
    let admitted_at = Instant::now();

    let outcome = handle.finished().await.expect("finished");
    assert_eq!(outcome.reason, ReleaseReason::TimerExpired);
    assert!(!outcome.committed);

    let elapsed = admitted_at.elapsed();
    assert!(elapsed >= Duration::from_secs(119), "released after {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(121), "released after {elapsed:?}");
    assert_eq!(kiosk.registry.count(|c| *c == Call::Leave), 1);
    assert!(kiosk.channels.is_closed(Subscription::Telemetry));
}

#[tokio::test(start_paused = true)]
async fn test_timer_preempts_commit_in_flight() {
    let kiosk = TestKiosk::new();
    let mut events = kiosk.kiosk.subscribe();
    kiosk.registry.script_statuses(vec![Ok(admitted())]);
    kiosk
        .registry
        .script_submits(vec![(Duration::from_secs(1000), Ok(()))]);
    let handle = kiosk.start().await;
    wait_for(&handle, |v| v.state == AdmissionState::Admitted).await;

    kiosk.telemetry(ChannelSignal::Connected).await;
    kiosk.full_set(72.0, 97.0, 68.0, 0).await;
    wait_for(&handle, |v| v.state == AdmissionState::Committing).await;

    let view = wait_for(&handle, |v| v.state == AdmissionState::Released).await;
    assert_eq!(view.attempt, AttemptState::NotStarted);
    assert_eq!(view.readings.heart_rate, None);
    assert_eq!(view.remaining_seconds, None);

    // A leave racing the expiry is harmless.
    handle.leave().await;
    let outcome = handle.finished().await.expect("finished");
    assert_eq!(outcome.reason, ReleaseReason::TimerExpired);
    assert!(!outcome.committed);
    assert_eq!(kiosk.registry.count(|c| *c == Call::Leave), 1);
    assert_eq!(kiosk.registry.count(|c| *c == Call::Complete), 0);

    let mut released = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event.payload, SessionEvent::Released { .. }) {
            released += 1;
        }
    }
    assert_eq!(released, 1);
}

#[tokio::test(start_paused = true)]
async fn test_leave_cancels_timer() {
    let kiosk = TestKiosk::new();
    kiosk.registry.script_statuses(vec![Ok(admitted())]);
    let handle = kiosk.start().await;
    wait_for(&handle, |v| v.state == AdmissionState::Admitted).await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    handle.leave().await;
    let view = wait_for(&handle, |v| v.state == AdmissionState::Released).await;
    assert_eq!(view.remaining_seconds, None);

    let outcome = handle.finished().await.expect("finished");
    assert_eq!(outcome.reason, ReleaseReason::UserLeft);
    assert_eq!(kiosk.registry.count(|c| *c == Call::Leave), 1);
}

#[tokio::test(start_paused = true)]
async fn test_leave_at_timer_expiry_releases_once() {
    let kiosk = TestKiosk::new();
    let mut events = kiosk.kiosk.subscribe();
    kiosk.registry.script_statuses(vec![Ok(admitted())]);
    let handle = kiosk.start().await;
    wait_for(&handle, |v| v.state == AdmissionState::Admitted).await;

    // The leave arrives on the occupancy deadline itself.
    tokio::time::sleep(Duration::from_secs(120)).await;
    handle.leave().await;

    let outcome = handle.finished().await.expect("finished");
    assert!(matches!(
        outcome.reason,
        ReleaseReason::UserLeft | ReleaseReason::TimerExpired
    ));
    assert!(!outcome.committed);
    assert_eq!(kiosk.registry.count(|c| *c == Call::Leave), 1);
    assert_eq!(kiosk.registry.count(|c| *c == Call::Complete), 0);

    let mut released = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event.payload, SessionEvent::Released { .. }) {
            released += 1;
        }
    }
    assert_eq!(released, 1);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_is_published() {
    let kiosk = TestKiosk::new();
    kiosk.registry.script_statuses(vec![Ok(admitted())]);
    let handle = kiosk.start().await;
    wait_for(&handle, |v| v.state == AdmissionState::Admitted).await;

    let view = wait_for(&handle, |v| v.remaining_seconds.is_some_and(|s| s <= 60)).await;
    assert!(view.remaining_seconds.is_some_and(|s| s >= 59));
    assert_eq!(view.state, AdmissionState::Admitted);
}

#[tokio::test(start_paused = true)]
async fn test_committed_session_still_times_out() {
    let kiosk = TestKiosk::new();
    kiosk.registry.script_statuses(vec![Ok(admitted())]);
    let handle = kiosk.start().await;
    wait_for(&handle, |v| v.state == AdmissionState::Admitted).await;

    kiosk.telemetry(ChannelSignal::Connected).await;
    kiosk.full_set(72.0, 97.0, 68.0, 0).await;
    wait_for(&handle, |v| v.state == AdmissionState::Committed).await;

    let outcome = handle.finished().await.expect("finished");
    assert_eq!(outcome.reason, ReleaseReason::TimerExpired);
    assert!(outcome.committed);
    assert_eq!(kiosk.registry.count(|c| *c == Call::Complete), 1);
    // Complete already released the device.
    assert_eq!(kiosk.registry.count(|c| *c == Call::Leave), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_handle_shuts_visit_down() {
    let kiosk = TestKiosk::new();
    let handle = kiosk.start().await;
    let mut views = handle.watch();
    drop(handle);

    let view = tokio::time::timeout(
        Duration::from_secs(60),
        views.wait_for(|v| v.state == AdmissionState::Released),
    )
    .await
    .expect("released in time")
    .expect("final view published")
    .clone();
    assert_eq!(view.state, AdmissionState::Released);

    // Release notifications are drained before the visit task ends.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(kiosk.registry.count(|c| *c == Call::Leave), 1);
}
