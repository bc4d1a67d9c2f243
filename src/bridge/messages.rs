use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Emotion, SessionCounters};
use crate::timer::TimerEvent;

/// Everything that crosses from the worker threads to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    FrameUpdate(FrameUpdate),
    Notification(Notification),
}

impl OutboundMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Per-tick telemetry. Each update stands alone; a client that misses one
/// simply renders the next.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameUpdate {
    pub session_id: String,
    pub tick: u64,
    pub stable_label: Option<Emotion>,
    pub raw_label: Option<String>,
    pub phone_detected: bool,
    pub distraction_fired: bool,
    pub counters: SessionCounters,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: TimerEvent,
    pub title: String,
    pub body: String,
    pub tag: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// `remaining` is what is left of the phase the timer is in once `event`
    /// has fired, in seconds.
    pub fn for_event(event: TimerEvent, remaining: u64, timestamp: DateTime<Utc>) -> Self {
        let (title, body) = match event {
            TimerEvent::TimerStarted => {
                ("Focus timer started", "Time to focus. You've got this!".to_string())
            }
            TimerEvent::BreakStartingSoon => (
                "Break coming up",
                format!("Your break starts in {}.", seconds(remaining)),
            ),
            TimerEvent::BreakStarted => {
                ("Break time", "Step away from the screen and rest.".to_string())
            }
            TimerEvent::BreakEndingSoon => (
                "Break ending",
                format!("Your break ends in {}.", seconds(remaining)),
            ),
            TimerEvent::BreakEnded => {
                ("Back to focus", "Break is over. Let's get back to it.".to_string())
            }
            TimerEvent::TimerComplete => (
                "Session complete",
                "You finished your focus session. Great work!".to_string(),
            ),
        };

        Self {
            kind: event,
            title: title.to_string(),
            body,
            tag: format!("{}-{}", event.as_str(), timestamp.timestamp_millis()),
            timestamp,
        }
    }
}

fn seconds(n: u64) -> String {
    if n == 1 {
        "1 second".to_string()
    } else {
        format!("{n} seconds")
    }
}
