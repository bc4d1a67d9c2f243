use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionCounters;

/// Why a monitoring session ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Stopped,
    DeviceLost,
    Fault,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Stopped => "Stopped",
            EndReason::DeviceLost => "DeviceLost",
            EndReason::Fault => "Fault",
        }
    }
}

/// Final tallies of a finished session, before the store assigns a sequence id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDraft {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub end_reason: EndReason,
    pub counters: SessionCounters,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub sequence_id: i64,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub end_reason: EndReason,
    pub counters: SessionCounters,
}

impl HistoryRecord {
    pub fn from_draft(sequence_id: i64, draft: HistoryDraft) -> Self {
        Self {
            sequence_id,
            session_id: draft.session_id,
            started_at: draft.started_at,
            ended_at: draft.ended_at,
            end_reason: draft.end_reason,
            counters: draft.counters,
        }
    }
}
