use anyhow::Result;

use crate::db::Database;
use crate::models::{HistoryDraft, HistoryRecord};

pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

/// Append-only log of finished sessions, capped to the newest `capacity` records.
#[derive(Clone)]
pub struct HistoryStore {
    db: Database,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(db: Database, capacity: usize) -> Self {
        Self {
            db,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn append(&self, draft: HistoryDraft) -> Result<HistoryRecord> {
        self.db.append_history(draft, self.capacity).await
    }

    /// Used from the monitor worker thread, which lives outside the runtime.
    pub fn append_blocking(&self, draft: HistoryDraft) -> Result<HistoryRecord> {
        self.db.append_history_blocking(draft, self.capacity)
    }

    pub async fn list_recent(&self, n: usize) -> Result<Vec<HistoryRecord>> {
        self.db.list_recent_history(n).await
    }

    pub fn list_recent_blocking(&self, n: usize) -> Result<Vec<HistoryRecord>> {
        self.db.list_recent_history_blocking(n)
    }

    pub async fn count(&self) -> Result<usize> {
        self.db.count_history().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EndReason, SessionCounters};
    use chrono::Utc;
    use tempfile::TempDir;

    fn draft(n: u64) -> HistoryDraft {
        let now = Utc::now();
        HistoryDraft {
            session_id: format!("session-{n}"),
            started_at: now,
            ended_at: now,
            end_reason: EndReason::Stopped,
            counters: SessionCounters {
                focused: n,
                distraction: n % 3,
                ..SessionCounters::default()
            },
        }
    }

    fn store(dir: &TempDir, capacity: usize) -> HistoryStore {
        let db = Database::new(dir.path().join("history.sqlite3")).expect("open db");
        HistoryStore::new(db, capacity)
    }

    #[tokio::test]
    async fn keeps_only_newest_records_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 5);

        for n in 1..=8 {
            store.append(draft(n)).await.unwrap();
        }

        assert_eq!(store.count().await.unwrap(), 5);

        let recent = store.list_recent(5).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|r| r.session_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["session-8", "session-7", "session-6", "session-5", "session-4"]
        );
        assert!(recent
            .windows(2)
            .all(|pair| pair[0].sequence_id > pair[1].sequence_id));
    }

    #[tokio::test]
    async fn list_recent_truncates_and_tolerates_large_n() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 5);

        for n in 1..=3 {
            store.append(draft(n)).await.unwrap();
        }

        assert_eq!(store.list_recent(2).await.unwrap().len(), 2);
        assert_eq!(store.list_recent(50).await.unwrap().len(), 3);
        assert!(store.list_recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sequence_ids_are_not_reused_after_eviction() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 2);

        let mut last = 0;
        for n in 1..=5 {
            let record = store.append(draft(n)).await.unwrap();
            assert!(record.sequence_id > last);
            last = record.sequence_id;
        }
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = store(&dir, 5);
            store.append_blocking(draft(1)).unwrap();
            store.append_blocking(draft(2)).unwrap();
        }

        let reopened = store(&dir, 5);
        let recent = reopened.list_recent_blocking(5).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].session_id, "session-2");
        assert_eq!(recent[0].counters.focused, 2);
    }
}
