use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Emotion, EndReason, HistoryRecord, SessionCounters};

use super::distraction::{RepeatPolicy, DEFAULT_THRESHOLD};
use super::smoother::DEFAULT_WINDOW;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MonitorPhase {
    #[default]
    Idle,
    Running,
    Stopping,
}

/// Knobs for one monitor. Copied into each session's worker at start.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Tried in order; the first live device wins.
    pub device_ids: Vec<String>,
    pub smoothing_window: usize,
    pub distraction_threshold: Duration,
    pub repeat_policy: RepeatPolicy,
    pub tick_interval: Duration,
    pub read_retry_limit: u32,
    pub read_retry_backoff: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device_ids: vec!["0".into(), "1".into()],
            smoothing_window: DEFAULT_WINDOW,
            distraction_threshold: DEFAULT_THRESHOLD,
            repeat_policy: RepeatPolicy::default(),
            tick_interval: Duration::from_millis(200),
            read_retry_limit: 3,
            read_retry_backoff: Duration::from_millis(100),
        }
    }
}

/// Everything about the current (or last) session that other threads may read.
/// Lives behind one mutex so a snapshot is never a partial view.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionState {
    pub phase: MonitorPhase,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub counters: SessionCounters,
    pub stable_label: Option<Emotion>,
    pub phone_detected: bool,
    pub ticks: u64,
    pub last_end_reason: Option<EndReason>,
    pub last_record: Option<HistoryRecord>,
}

impl SessionState {
    pub fn begin(&mut self, session_id: String, started_at: DateTime<Utc>) {
        self.phase = MonitorPhase::Running;
        self.session_id = Some(session_id);
        self.started_at = Some(started_at);
        self.counters.reset();
        self.stable_label = None;
        self.phone_detected = false;
        self.ticks = 0;
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            phase: self.phase,
            session_id: self.session_id.clone(),
            started_at: self.started_at,
            stable_label: self.stable_label,
            phone_detected: self.phone_detected,
            counters: self.counters,
            ticks: self.ticks,
            last_end_reason: self.last_end_reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub phase: MonitorPhase,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub stable_label: Option<Emotion>,
    pub phone_detected: bool,
    pub counters: SessionCounters,
    pub ticks: u64,
    pub last_end_reason: Option<EndReason>,
}
