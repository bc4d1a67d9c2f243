use serde::{Deserialize, Serialize};

use crate::error::FocusError;

/// Focus/rest plan, all values in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerConfig {
    #[serde(alias = "focusTotal")]
    pub focus_total: u64,
    #[serde(alias = "restDuration")]
    pub rest_duration: u64,
    #[serde(alias = "checkInterval")]
    pub check_interval: u64,
}

impl TimerConfig {
    pub fn new(focus_total: u64, rest_duration: u64, check_interval: u64) -> Result<Self, FocusError> {
        let config = Self {
            focus_total,
            rest_duration,
            check_interval,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FocusError> {
        let mut missing = Vec::new();
        if self.focus_total == 0 {
            missing.push("focus_total");
        }
        if self.rest_duration == 0 {
            missing.push("rest_duration");
        }
        if self.check_interval == 0 {
            missing.push("check_interval");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(FocusError::InvalidConfig(format!(
                "{} must be greater than zero",
                missing.join(", ")
            )))
        }
    }

    /// Focus chunk lengths in order. Every chunk but the last is followed by a
    /// rest of `rest_duration`.
    pub fn chunk_plan(&self) -> Vec<u64> {
        if self.check_interval == 0 {
            return Vec::new();
        }
        let mut left = self.focus_total;
        let mut chunks = Vec::new();
        while left > 0 {
            let chunk = left.min(self.check_interval);
            chunks.push(chunk);
            left -= chunk;
        }
        chunks
    }

    pub fn total_chunks(&self) -> u32 {
        if self.check_interval == 0 {
            return 0;
        }
        self.focus_total.div_ceil(self.check_interval) as u32
    }

    /// Wall-clock length of the whole run: every chunk plus the rests between them.
    pub fn total_seconds(&self) -> u64 {
        let rests = u64::from(self.total_chunks().saturating_sub(1));
        self.focus_total + rests * self.rest_duration
    }
}
