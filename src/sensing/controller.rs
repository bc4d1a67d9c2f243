use std::{
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
};

use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    bridge::EventBridge,
    classify::Classifier,
    error::FocusError,
    history::HistoryStore,
    models::{EndReason, HistoryRecord},
    utils::pacing::lock,
};

use super::{
    device::{self, CaptureSource},
    loop_worker::MonitorWorker,
    session::{MonitorConfig, MonitorPhase, MonitorSnapshot, SessionState},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StartOutcome {
    Started {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    AlreadyRunning,
    /// A stop is still releasing the previous session.
    Busy,
    DeviceUnavailable { tried: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StopOutcome {
    /// `record` is `None` only when persisting the session failed.
    Stopped { record: Option<HistoryRecord> },
    NotRunning,
}

/// Runs on the monitor thread once a session has been persisted, whatever
/// ended it.
pub type SessionEndHook = Arc<dyn Fn(EndReason) + Send + Sync>;

struct ActiveMonitor {
    token: CancellationToken,
    handle: JoinHandle<Option<HistoryRecord>>,
}

/// Starts and stops monitoring sessions. Clones share the same session.
#[derive(Clone)]
pub struct MonitorController {
    run: Arc<Mutex<Option<ActiveMonitor>>>,
    state: Arc<Mutex<SessionState>>,
    source: Arc<dyn CaptureSource>,
    classifier: Arc<Mutex<Box<dyn Classifier>>>,
    history: HistoryStore,
    bridge: EventBridge,
    config: MonitorConfig,
    on_end: Option<SessionEndHook>,
}

impl MonitorController {
    pub fn new(
        source: Arc<dyn CaptureSource>,
        classifier: Box<dyn Classifier>,
        history: HistoryStore,
        bridge: EventBridge,
        config: MonitorConfig,
    ) -> Self {
        Self {
            run: Arc::new(Mutex::new(None)),
            state: Arc::new(Mutex::new(SessionState::default())),
            source,
            classifier: Arc::new(Mutex::new(classifier)),
            history,
            bridge,
            config,
            on_end: None,
        }
    }

    pub fn on_session_end(mut self, hook: impl Fn(EndReason) + Send + Sync + 'static) -> Self {
        self.on_end = Some(Arc::new(hook));
        self
    }

    /// Acquires a device and spawns the capture loop. Blocks while devices
    /// are probed, so async callers go through `spawn_blocking`.
    pub fn start(&self) -> Result<StartOutcome, FocusError> {
        let mut run = lock(&self.run);

        if let Some(active) = run.as_ref() {
            if !active.handle.is_finished() {
                return Ok(StartOutcome::AlreadyRunning);
            }
        }
        if let Some(finished) = run.take() {
            // The loop ended on its own (device lost or fault); its cleanup
            // already ran.
            reap(finished);
        }
        if lock(&self.state).phase == MonitorPhase::Stopping {
            return Ok(StartOutcome::Busy);
        }

        let lease = match device::acquire(self.source.as_ref(), &self.config.device_ids) {
            Ok(lease) => lease,
            Err(FocusError::DeviceUnavailable { tried }) => {
                warn!("monitor not started: no capture device among {tried:?}");
                return Ok(StartOutcome::DeviceUnavailable { tried });
            }
            Err(err) => return Err(err),
        };

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        lock(&self.state).begin(session_id.clone(), started_at);

        let token = CancellationToken::new();
        let worker = MonitorWorker::new(
            session_id.clone(),
            started_at,
            lease,
            self.classifier.clone(),
            self.state.clone(),
            self.bridge.clone(),
            self.history.clone(),
            token.clone(),
            self.config.clone(),
            self.on_end.clone(),
        );

        let handle = thread::Builder::new()
            .name("spirit-monitor".into())
            .spawn(move || worker.run())
            .map_err(|err| {
                // The closure, and with it the lease, was dropped: the device
                // is already released.
                lock(&self.state).phase = MonitorPhase::Idle;
                FocusError::Internal(format!("failed to spawn monitor thread: {err}"))
            })?;

        info!("monitor session {session_id} started");
        *run = Some(ActiveMonitor { token, handle });
        Ok(StartOutcome::Started { session_id })
    }

    /// Cancels the loop and waits until the device is released and the
    /// session is persisted. Calling it again, or while idle, is a no-op.
    pub fn stop(&self) -> StopOutcome {
        let active = {
            let mut run = lock(&self.run);
            let active = run.take();
            if active.is_some() {
                let mut state = lock(&self.state);
                if state.phase == MonitorPhase::Running {
                    state.phase = MonitorPhase::Stopping;
                } else {
                    // Ended on its own before we got here.
                    drop(state);
                    if let Some(finished) = active {
                        reap(finished);
                    }
                    return StopOutcome::NotRunning;
                }
            }
            active
        };

        let Some(active) = active else {
            return StopOutcome::NotRunning;
        };

        active.token.cancel();
        let record = match active.handle.join() {
            Ok(record) => record,
            Err(_) => {
                error!("monitor thread panicked during cleanup");
                lock(&self.state).phase = MonitorPhase::Idle;
                None
            }
        };

        info!("monitor stopped");
        StopOutcome::Stopped { record }
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        lock(&self.state).snapshot()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).phase == MonitorPhase::Running
    }

    /// The record written when the most recent session ended, however it ended.
    pub fn last_record(&self) -> Option<HistoryRecord> {
        lock(&self.state).last_record.clone()
    }
}

fn reap(finished: ActiveMonitor) {
    finished.token.cancel();
    if finished.handle.join().is_err() {
        error!("monitor thread panicked during cleanup");
    }
}
