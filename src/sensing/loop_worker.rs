use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::{
    bridge::{EventBridge, FrameUpdate, OutboundMessage},
    classify::{overlay, Classifier, Frame},
    history::HistoryStore,
    models::{Category, Emotion, EndReason, HistoryDraft, HistoryRecord},
    utils::pacing::{lock, sleep_unless_cancelled},
};

use super::{
    controller::SessionEndHook,
    device::DeviceLease,
    distraction::DistractionTimer,
    session::{MonitorConfig, MonitorPhase, SessionState},
    smoother::LabelSmoother,
};

// Set to false to silence this module's logs
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

enum Tick {
    Continue,
    Cancelled,
    DeviceLost,
}

enum Read {
    Frame(Frame),
    Cancelled,
    DeviceLost,
}

/// The per-session capture loop. Runs on its own thread and is the only
/// owner of the device lease, the smoother and the detector.
pub(crate) struct MonitorWorker {
    session_id: String,
    started_at: DateTime<Utc>,
    lease: DeviceLease,
    classifier: Arc<Mutex<Box<dyn Classifier>>>,
    smoother: LabelSmoother<Emotion>,
    detector: DistractionTimer,
    state: Arc<Mutex<SessionState>>,
    bridge: EventBridge,
    history: HistoryStore,
    token: CancellationToken,
    config: MonitorConfig,
    on_end: Option<SessionEndHook>,
}

impl MonitorWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: String,
        started_at: DateTime<Utc>,
        lease: DeviceLease,
        classifier: Arc<Mutex<Box<dyn Classifier>>>,
        state: Arc<Mutex<SessionState>>,
        bridge: EventBridge,
        history: HistoryStore,
        token: CancellationToken,
        config: MonitorConfig,
        on_end: Option<SessionEndHook>,
    ) -> Self {
        Self {
            session_id,
            started_at,
            lease,
            classifier,
            smoother: LabelSmoother::new(config.smoothing_window),
            detector: DistractionTimer::new(config.distraction_threshold, config.repeat_policy),
            state,
            bridge,
            history,
            token,
            config,
            on_end,
        }
    }

    /// Ticks until cancelled, the device is lost, or a tick panics. Cleanup
    /// runs in every case.
    pub fn run(mut self) -> Option<HistoryRecord> {
        log_info!(
            "monitor loop started for session {} on device {}",
            self.session_id,
            self.lease.device_id()
        );

        let reason = loop {
            if self.token.is_cancelled() {
                break EndReason::Stopped;
            }

            let tick_started = Instant::now();
            match panic::catch_unwind(AssertUnwindSafe(|| self.tick())) {
                Ok(Tick::Continue) => {}
                Ok(Tick::Cancelled) => break EndReason::Stopped,
                Ok(Tick::DeviceLost) => break EndReason::DeviceLost,
                Err(payload) => {
                    log_error!(
                        "monitor tick panicked in session {}: {}",
                        self.session_id,
                        panic_message(payload.as_ref())
                    );
                    break EndReason::Fault;
                }
            }

            let rest = self.config.tick_interval.saturating_sub(tick_started.elapsed());
            if !sleep_unless_cancelled(rest, &self.token) {
                break EndReason::Stopped;
            }
        };

        self.finish(reason)
    }

    fn tick(&mut self) -> Tick {
        let mut frame = match self.read_with_retry() {
            Read::Frame(frame) => frame,
            Read::Cancelled => return Tick::Cancelled,
            Read::DeviceLost => return Tick::DeviceLost,
        };

        let observation = lock(&self.classifier).classify(&mut frame);
        let now = Instant::now();

        let pushed = observation.emotion.map(|emotion| self.smoother.push(emotion));
        let fired = self.detector.update(observation.phone_detected, now);
        if fired {
            log_info!("sustained phone use in session {}", self.session_id);
        }

        let stable = pushed.or_else(|| self.smoother.stable());
        overlay::annotate(&mut frame, &observation, stable);

        let update = {
            let mut state = lock(&self.state);
            if let Some(label) = pushed {
                state.counters.bump(label);
            }
            if fired {
                state.counters.bump(Category::Distraction);
            }
            state.ticks += 1;
            state.stable_label = stable;
            state.phone_detected = observation.phone_detected;

            FrameUpdate {
                session_id: self.session_id.clone(),
                tick: state.ticks,
                stable_label: state.stable_label,
                raw_label: observation.raw_emotion_label,
                phone_detected: observation.phone_detected,
                distraction_fired: fired,
                counters: state.counters,
                timestamp: Utc::now(),
            }
        };

        let outcome = self.bridge.publish(OutboundMessage::FrameUpdate(update));
        log_debug!("frame update {:?}", outcome);
        Tick::Continue
    }

    fn read_with_retry(&mut self) -> Read {
        let limit = self.config.read_retry_limit;
        let mut attempt = 0;
        loop {
            match self.lease.read_frame() {
                Ok(frame) => return Read::Frame(frame),
                Err(err) if attempt < limit => {
                    attempt += 1;
                    log_warn!(
                        "frame read failed on {} (attempt {attempt}/{limit}): {err:#}",
                        self.lease.device_id()
                    );
                    if !sleep_unless_cancelled(self.config.read_retry_backoff, &self.token) {
                        return Read::Cancelled;
                    }
                }
                Err(err) => {
                    log_error!(
                        "capture device {} lost after {} retries: {err:#}",
                        self.lease.device_id(),
                        limit
                    );
                    return Read::DeviceLost;
                }
            }
        }
    }

    /// Releases the device, persists the final tallies and returns to idle.
    fn finish(mut self, reason: EndReason) -> Option<HistoryRecord> {
        self.lease.release();

        let counters = lock(&self.state).counters;
        let draft = HistoryDraft {
            session_id: self.session_id.clone(),
            started_at: self.started_at,
            ended_at: Utc::now(),
            end_reason: reason,
            counters,
        };

        let record = match self.history.append_blocking(draft) {
            Ok(record) => Some(record),
            Err(err) => {
                log_error!("failed to persist session {}: {err:#}", self.session_id);
                None
            }
        };

        // Before going idle, so nothing tied to this session outlives it.
        if let Some(hook) = &self.on_end {
            if panic::catch_unwind(AssertUnwindSafe(|| hook(reason))).is_err() {
                log_error!("session end hook panicked for session {}", self.session_id);
            }
        }

        let mut state = lock(&self.state);
        state.phase = MonitorPhase::Idle;
        state.phone_detected = false;
        state.last_end_reason = Some(reason);
        state.last_record = record.clone();

        log_info!(
            "monitor loop for session {} ended ({}) after {} ticks",
            self.session_id,
            reason.as_str(),
            state.ticks
        );
        record
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
