use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(3);

/// What happens after a sustained condition has fired.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RepeatPolicy {
    /// The next true tick starts a fresh interval, so a condition held without
    /// a break fires once per threshold.
    #[default]
    Accrue,
    /// Nothing accrues again until the condition has cleared at least once.
    RequireClear,
}

/// Fires once each time a boolean condition has held continuously for
/// `threshold`. Any false tick discards accrued time.
#[derive(Debug, Clone)]
pub struct DistractionTimer {
    threshold: Duration,
    policy: RepeatPolicy,
    active_since: Option<Instant>,
    latched: bool,
}

impl DistractionTimer {
    pub fn new(threshold: Duration, policy: RepeatPolicy) -> Self {
        Self {
            threshold,
            policy,
            active_since: None,
            latched: false,
        }
    }

    pub fn update(&mut self, condition_now: bool, now: Instant) -> bool {
        if !condition_now {
            self.active_since = None;
            self.latched = false;
            return false;
        }

        if self.latched {
            return false;
        }

        let Some(since) = self.active_since else {
            self.active_since = Some(now);
            return false;
        };

        if now.saturating_duration_since(since) >= self.threshold {
            self.active_since = None;
            self.latched = self.policy == RepeatPolicy::RequireClear;
            return true;
        }

        false
    }

    pub fn is_accruing(&self) -> bool {
        self.active_since.is_some()
    }
}
