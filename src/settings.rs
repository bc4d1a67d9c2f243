use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use crate::bridge::DEFAULT_CAPACITY;
use crate::classify::{DEFAULT_PHONE_CONFIDENCE, PHONE_LABEL};
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::sensing::{MonitorConfig, RepeatPolicy};
use crate::timer::TimerConfig;

pub const DATA_DIR_ENV: &str = "SPIRIT_DATA_DIR";
pub const BIND_ENV: &str = "SPIRIT_BIND";
pub const DEBUG_ENV: &str = "SPIRIT_DEBUG";

/// Timer step used when `SPIRIT_DEBUG` is set, so a full run can be watched
/// in a few minutes.
const DEBUG_TIMER_TICK_MS: u64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub bind_addr: String,
    pub device_ids: Vec<String>,
    pub smoothing_window: usize,
    pub distraction_threshold_ms: u64,
    pub repeat_policy: RepeatPolicy,
    pub history_capacity: usize,
    pub tick_interval_ms: u64,
    pub read_retry_limit: u32,
    pub read_retry_backoff_ms: u64,
    pub bridge_capacity: usize,
    pub timer_tick_ms: u64,
    pub phone_label: String,
    pub min_phone_confidence: f32,
    /// Last plan sent to `configure`; started alongside the monitor.
    pub timer: Option<TimerConfig>,
}

impl Default for AppSettings {
    fn default() -> Self {
        let monitor = MonitorConfig::default();
        Self {
            bind_addr: "127.0.0.1:8765".into(),
            device_ids: monitor.device_ids,
            smoothing_window: monitor.smoothing_window,
            distraction_threshold_ms: monitor.distraction_threshold.as_millis() as u64,
            repeat_policy: monitor.repeat_policy,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            tick_interval_ms: monitor.tick_interval.as_millis() as u64,
            read_retry_limit: monitor.read_retry_limit,
            read_retry_backoff_ms: monitor.read_retry_backoff.as_millis() as u64,
            bridge_capacity: DEFAULT_CAPACITY,
            timer_tick_ms: 1000,
            phone_label: PHONE_LABEL.into(),
            min_phone_confidence: DEFAULT_PHONE_CONFIDENCE,
            timer: None,
        }
    }
}

impl AppSettings {
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            device_ids: self.device_ids.clone(),
            smoothing_window: self.smoothing_window,
            distraction_threshold: Duration::from_millis(self.distraction_threshold_ms),
            repeat_policy: self.repeat_policy,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            read_retry_limit: self.read_retry_limit,
            read_retry_backoff: Duration::from_millis(self.read_retry_backoff_ms),
        }
    }

    pub fn timer_tick(&self) -> Duration {
        Duration::from_millis(self.timer_tick_ms.max(1))
    }

    /// Environment wins over the file, but is never written back to it.
    fn apply_env(&mut self) {
        if let Ok(bind) = std::env::var(BIND_ENV) {
            if !bind.trim().is_empty() {
                self.bind_addr = bind.trim().to_string();
            }
        }
        if debug_mode() {
            self.timer_tick_ms = DEBUG_TIMER_TICK_MS;
        }
    }
}

pub fn debug_mode() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// `SPIRIT_DATA_DIR`, else `~/.spirit-companion`, else `./spirit-data`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    match std::env::var_os("HOME") {
        Some(home) => Path::new(&home).join(".spirit-companion"),
        None => PathBuf::from("spirit-data"),
    }
}

pub struct SettingsStore {
    path: PathBuf,
    /// What is on disk; env overrides are layered on read.
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut data: AppSettings = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("ignoring unreadable settings at {}: {err}", path.display());
                AppSettings::default()
            })
        } else {
            AppSettings::default()
        };

        if let Some(plan) = data.timer {
            if let Err(err) = plan.validate() {
                warn!("dropping stored timer plan from {}: {err}", path.display());
                data.timer = None;
            }
        }

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Effective settings: the file plus environment overrides.
    pub fn current(&self) -> AppSettings {
        let mut settings = match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        settings.apply_env();
        settings
    }

    pub fn timer(&self) -> Option<TimerConfig> {
        self.current().timer
    }

    pub fn update_timer(&self, config: TimerConfig) -> Result<()> {
        self.update(|settings| settings.timer = Some(config))
    }

    pub fn update(&self, apply: impl FnOnce(&mut AppSettings)) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next = guard.clone();
        apply(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory {}", parent.display())
                })?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = store.current();

        assert_eq!(settings.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(settings.smoothing_window, 5);
        assert_eq!(settings.repeat_policy, RepeatPolicy::Accrue);
        assert!(settings.timer.is_none());
    }

    #[test]
    fn timer_update_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store.update_timer(TimerConfig::new(1500, 300, 600).unwrap()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.timer(), Some(TimerConfig::new(1500, 300, 600).unwrap()));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"deviceIds": ["/dev/video2"], "repeatPolicy": "requireClear"}"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().current();
        assert_eq!(settings.device_ids, vec!["/dev/video2".to_string()]);
        assert_eq!(settings.repeat_policy, RepeatPolicy::RequireClear);
        assert_eq!(settings.bridge_capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.current().history_capacity, DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn invalid_stored_timer_plan_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"historyCapacity": 3, "timer": {"focus_total": 0, "rest_duration": 10, "check_interval": 60}}"#,
        )
        .unwrap();

        let settings = SettingsStore::new(path).unwrap().current();
        assert!(settings.timer.is_none());
        assert_eq!(settings.history_capacity, 3);
    }

    #[test]
    fn monitor_config_converts_units() {
        let settings = AppSettings {
            distraction_threshold_ms: 2500,
            tick_interval_ms: 50,
            ..AppSettings::default()
        };
        let config = settings.monitor_config();
        assert_eq!(config.distraction_threshold, Duration::from_millis(2500));
        assert_eq!(config.tick_interval, Duration::from_millis(50));
    }
}
