use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::connection::Database;
use crate::models::{EndReason, HistoryDraft, HistoryRecord, SessionCounters};

fn count_param(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("count {value} does not fit in a SQLite INTEGER"))
}

fn count_column(row: &Row, column: &str) -> Result<u64> {
    let value: i64 = row.get(column)?;
    u64::try_from(value).map_err(|_| anyhow!("column {column} holds negative count {value}"))
}

fn timestamp_column(row: &Row, column: &str) -> Result<DateTime<Utc>> {
    let value: String = row.get(column)?;
    Ok(DateTime::parse_from_rfc3339(&value)
        .with_context(|| format!("column {column} holds a malformed timestamp"))?
        .with_timezone(&Utc))
}

fn end_reason_column(row: &Row) -> Result<EndReason> {
    let value: String = row.get("end_reason")?;
    [EndReason::Stopped, EndReason::DeviceLost, EndReason::Fault]
        .into_iter()
        .find(|reason| reason.as_str() == value)
        .ok_or_else(|| anyhow!("unknown end reason {value}"))
}

fn row_to_record(row: &Row) -> Result<HistoryRecord> {
    Ok(HistoryRecord {
        sequence_id: row.get("seq")?,
        session_id: row.get("session_id")?,
        started_at: timestamp_column(row, "started_at")?,
        ended_at: timestamp_column(row, "ended_at")?,
        end_reason: end_reason_column(row)?,
        counters: SessionCounters {
            angry: count_column(row, "angry")?,
            stressed: count_column(row, "stressed")?,
            happy: count_column(row, "happy")?,
            sad: count_column(row, "sad")?,
            focused: count_column(row, "focused")?,
            distraction: count_column(row, "distraction")?,
        },
    })
}

/// Inserts the record and trims the table to the newest `capacity` rows in one
/// transaction, so readers never observe more than `capacity` rows.
fn insert_bounded(
    conn: &mut Connection,
    draft: HistoryDraft,
    capacity: usize,
) -> Result<HistoryRecord> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO session_history
             (session_id, started_at, ended_at, end_reason, angry, stressed, happy, sad, focused, distraction)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            draft.session_id,
            draft.started_at.to_rfc3339(),
            draft.ended_at.to_rfc3339(),
            draft.end_reason.as_str(),
            count_param(draft.counters.angry)?,
            count_param(draft.counters.stressed)?,
            count_param(draft.counters.happy)?,
            count_param(draft.counters.sad)?,
            count_param(draft.counters.focused)?,
            count_param(draft.counters.distraction)?,
        ],
    )
    .context("failed to insert history record")?;
    let sequence_id = tx.last_insert_rowid();

    tx.execute(
        "DELETE FROM session_history
         WHERE seq NOT IN (
             SELECT seq FROM session_history ORDER BY seq DESC LIMIT ?1
         )",
        params![count_param(capacity as u64)?],
    )
    .context("failed to evict old history records")?;

    tx.commit()?;
    Ok(HistoryRecord::from_draft(sequence_id, draft))
}

fn select_recent(conn: &Connection, limit: usize) -> Result<Vec<HistoryRecord>> {
    let mut stmt = conn.prepare(
        "SELECT seq, session_id, started_at, ended_at, end_reason,
                angry, stressed, happy, sad, focused, distraction
         FROM session_history
         ORDER BY seq DESC
         LIMIT ?1",
    )?;

    let mut rows = stmt.query(params![count_param(limit as u64)?])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(row_to_record(row)?);
    }
    Ok(records)
}

impl Database {
    pub async fn append_history(&self, draft: HistoryDraft, capacity: usize) -> Result<HistoryRecord> {
        self.execute(move |conn| insert_bounded(conn, draft, capacity))
            .await
    }

    pub fn append_history_blocking(
        &self,
        draft: HistoryDraft,
        capacity: usize,
    ) -> Result<HistoryRecord> {
        self.execute_blocking(move |conn| insert_bounded(conn, draft, capacity))
    }

    /// Newest first.
    pub async fn list_recent_history(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        self.execute(move |conn| select_recent(conn, limit)).await
    }

    pub fn list_recent_history_blocking(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        self.execute_blocking(move |conn| select_recent(conn, limit))
    }

    pub async fn count_history(&self) -> Result<usize> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM session_history", [], |row| row.get(0))?;
            Ok(usize::try_from(count)?)
        })
        .await
    }
}
