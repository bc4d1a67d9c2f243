use std::{sync::Arc, time::Duration};

use spirit_companion_lib::{
    demo::{self, SyntheticCamera},
    models::EndReason,
    sensing::{MonitorPhase, StartOutcome, StopOutcome},
    settings::{AppSettings, SettingsStore},
    summary::Verdict,
    timer::TimerConfig,
    Database, FocusError, FocusService,
};
use tempfile::TempDir;

fn service(dir: &TempDir, camera: SyntheticCamera) -> FocusService {
    service_with(dir, camera, |_| {})
}

fn service_with(
    dir: &TempDir,
    camera: SyntheticCamera,
    tweak: impl FnOnce(&mut AppSettings),
) -> FocusService {
    let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
    settings
        .update(|s| {
            s.device_ids = vec!["synthetic".into()];
            s.tick_interval_ms = 5;
            tweak(s);
        })
        .unwrap();
    let current = settings.current();
    let db = Database::new(dir.path().join("spirit.sqlite3")).unwrap();
    FocusService::new(
        db,
        settings,
        Arc::new(camera),
        Box::new(demo::classifier(&current)),
    )
}

async fn run_session(service: &FocusService, for_ms: u64) {
    let starter = service.clone();
    let started = tokio::task::spawn_blocking(move || starter.start())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(started.monitor, StartOutcome::Started { .. }));

    tokio::time::sleep(Duration::from_millis(for_ms)).await;

    let stopper = service.clone();
    let stopped = tokio::task::spawn_blocking(move || stopper.stop()).await.unwrap();
    assert!(matches!(stopped.monitor, StopOutcome::Stopped { record: Some(_) }));
}

#[tokio::test(flavor = "multi_thread")]
async fn configure_rejects_zero_durations() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, SyntheticCamera::default());

    match service.configure(0, 300, 600) {
        Err(FocusError::InvalidConfig(message)) => assert!(message.contains("focus_total")),
        other => panic!("unexpected {other:?}"),
    }
    assert!(service.get_state().timer_config.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn configured_timer_runs_alongside_monitor() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, SyntheticCamera::default());
    service.configure(1500, 300, 600).unwrap();

    let starter = service.clone();
    let started = tokio::task::spawn_blocking(move || starter.start())
        .await
        .unwrap()
        .unwrap();
    let timer = started.timer.expect("timer started with the monitor");
    assert!(timer.running);
    assert_eq!(timer.total_chunks, 3);

    let state = service.get_state();
    assert!(state.timer.running);
    assert!(state.monitor.session_id.is_some());

    let stopper = service.clone();
    let stopped = tokio::task::spawn_blocking(move || stopper.stop()).await.unwrap();
    assert!(stopped.timer_stopped);
    assert!(!service.get_state().timer.running);
}

#[tokio::test(flavor = "multi_thread")]
async fn history_summary_and_trends_follow_sessions() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, SyntheticCamera::default());

    assert!(service.latest_summary().await.unwrap().is_none());

    for _ in 0..3 {
        run_session(&service, 40).await;
    }

    let history = service.get_history(10).await.unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.windows(2).all(|pair| pair[0].sequence_id > pair[1].sequence_id));
    assert!(history.iter().all(|record| record.end_reason == EndReason::Stopped));

    let summary = service.latest_summary().await.unwrap().unwrap();
    assert_eq!(summary.sequence_id, history[0].sequence_id);
    assert_ne!(summary.verdict, Verdict::NoBaseline);

    let trends = service.trends().await.unwrap();
    assert_eq!(trends.sessions, 3);
    assert_eq!(trends.distraction_series.len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn unplugged_camera_is_reported_in_state() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, SyntheticCamera { fail_after: Some(3) });

    let starter = service.clone();
    tokio::task::spawn_blocking(move || starter.start())
        .await
        .unwrap()
        .unwrap();

    let mut ended = None;
    for _ in 0..200 {
        ended = service.get_state().monitor.last_end_reason;
        if ended.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(ended, Some(EndReason::DeviceLost));
    assert_eq!(service.get_history(5).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn timer_ends_with_an_unplugged_session() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, SyntheticCamera { fail_after: Some(3) });
    service.configure(1500, 300, 600).unwrap();

    let starter = service.clone();
    tokio::task::spawn_blocking(move || starter.start())
        .await
        .unwrap()
        .unwrap();

    let mut ended = None;
    for _ in 0..200 {
        ended = service.get_state().monitor.last_end_reason;
        if ended.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(ended, Some(EndReason::DeviceLost));

    let state = service.get_state();
    assert!(!state.timer.running);
    assert!(state.timer_config.is_some());

    let stopper = service.clone();
    let stopped = tokio::task::spawn_blocking(move || stopper.stop()).await.unwrap();
    assert_eq!(stopped.monitor, StopOutcome::NotRunning);
    assert!(!stopped.timer_stopped);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_stored_plan_starts_nothing() {
    let dir = TempDir::new().unwrap();
    let service = service_with(&dir, SyntheticCamera::default(), |s| {
        s.timer = Some(TimerConfig {
            focus_total: 0,
            rest_duration: 10,
            check_interval: 60,
        });
    });

    let starter = service.clone();
    let result = tokio::task::spawn_blocking(move || starter.start()).await.unwrap();
    assert!(matches!(result, Err(FocusError::InvalidConfig(_))));

    let state = service.get_state();
    assert_eq!(state.monitor.phase, MonitorPhase::Idle);
    assert!(state.monitor.session_id.is_none());
    assert!(!state.timer.running);
    assert!(service.get_history(5).await.unwrap().is_empty());
}
