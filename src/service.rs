use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::{
    bridge::EventBridge,
    classify::Classifier,
    db::Database,
    error::FocusError,
    history::HistoryStore,
    models::HistoryRecord,
    sensing::{CaptureSource, MonitorController, MonitorSnapshot, StartOutcome, StopOutcome},
    settings::SettingsStore,
    summary::{SessionSummary, TrendReport},
    timer::{IntervalScheduler, TimerConfig, TimerSnapshot},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStart {
    pub monitor: StartOutcome,
    /// Present when a timer plan was configured and the monitor started.
    pub timer: Option<TimerSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStop {
    pub monitor: StopOutcome,
    pub timer_stopped: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceState {
    pub monitor: MonitorSnapshot,
    pub timer: TimerSnapshot,
    pub timer_config: Option<TimerConfig>,
    pub consumer_attached: bool,
    pub dropped_messages: u64,
}

/// The inbound interface: one value, cloned into every handler.
#[derive(Clone)]
pub struct FocusService {
    monitor: MonitorController,
    timer: IntervalScheduler,
    history: HistoryStore,
    settings: Arc<SettingsStore>,
    bridge: EventBridge,
}

impl FocusService {
    pub fn new(
        db: Database,
        settings: Arc<SettingsStore>,
        source: Arc<dyn CaptureSource>,
        classifier: Box<dyn Classifier>,
    ) -> Self {
        let current = settings.current();
        let bridge = EventBridge::new(current.bridge_capacity);
        let history = HistoryStore::new(db, current.history_capacity);
        let timer = IntervalScheduler::new(bridge.clone(), current.timer_tick());

        let session_timer = timer.clone();
        let monitor = MonitorController::new(
            source,
            classifier,
            history.clone(),
            bridge.clone(),
            current.monitor_config(),
        )
        .on_session_end(move |reason| {
            if session_timer.stop() {
                info!("focus timer stopped with the session ({})", reason.as_str());
            }
        });

        Self {
            monitor,
            timer,
            history,
            settings,
            bridge,
        }
    }

    pub fn bridge(&self) -> &EventBridge {
        &self.bridge
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Starts monitoring, and the focus timer if a plan is configured. The
    /// timer ends with the session, including when the session ends on its
    /// own. Blocking; see [`MonitorController::start`].
    pub fn start(&self) -> Result<ServiceStart, FocusError> {
        let plan = self.settings.timer();
        if let Some(config) = &plan {
            config.validate()?;
        }

        let monitor = self.monitor.start()?;
        let timer = match (&monitor, plan) {
            (StartOutcome::Started { .. }, Some(config)) => match self.timer.start(config) {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    warn!("focus timer failed to start, stopping the monitor: {err}");
                    self.monitor.stop();
                    return Err(err);
                }
            },
            _ => None,
        };

        // The session can end before the timer is up, in which case its end
        // hook found nothing to stop.
        let timer = match timer {
            Some(_) if !self.monitor.is_running() => {
                self.timer.stop();
                Some(self.timer.snapshot())
            }
            other => other,
        };

        Ok(ServiceStart { monitor, timer })
    }

    /// Stops both workers. Returns once the session is persisted.
    pub fn stop(&self) -> ServiceStop {
        let timer_stopped = self.timer.stop();
        let monitor = self.monitor.stop();
        ServiceStop {
            monitor,
            timer_stopped,
        }
    }

    /// Validates and stores the timer plan. It takes effect on the next start.
    pub fn configure(
        &self,
        focus_total: u64,
        rest_duration: u64,
        check_interval: u64,
    ) -> Result<TimerConfig, FocusError> {
        let config = TimerConfig::new(focus_total, rest_duration, check_interval)?;
        self.settings.update_timer(config)?;
        info!(
            "timer configured: {}s focus, {}s rest, {}s interval",
            focus_total, rest_duration, check_interval
        );
        Ok(config)
    }

    pub fn get_state(&self) -> ServiceState {
        ServiceState {
            monitor: self.monitor.snapshot(),
            timer: self.timer.snapshot(),
            timer_config: self.settings.timer(),
            consumer_attached: self.bridge.is_attached(),
            dropped_messages: self.bridge.dropped_count(),
        }
    }

    pub async fn get_history(&self, n: usize) -> Result<Vec<HistoryRecord>, FocusError> {
        Ok(self.history.list_recent(n).await?)
    }

    /// Summary of the newest stored session against the ones before it.
    pub async fn latest_summary(&self) -> Result<Option<SessionSummary>, FocusError> {
        let records = self.history.list_recent(self.history.capacity()).await?;
        Ok(records
            .split_first()
            .map(|(latest, prior)| SessionSummary::build(latest, prior)))
    }

    pub async fn trends(&self) -> Result<TrendReport, FocusError> {
        let records = self.history.list_recent(self.history.capacity()).await?;
        Ok(TrendReport::build(&records))
    }
}
