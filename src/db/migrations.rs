use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema steps in order. Entry `i` takes the database to version `i + 1`.
const STEPS: &[(&str, &str)] = &[("schema_v1.sql", include_str!("schemas/schema_v1.sql"))];

/// Brings the schema up to date, tracked through `PRAGMA user_version`. All
/// pending steps commit together or not at all.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let latest = STEPS.len();
    let found: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read schema version")?;
    let found = usize::try_from(found).context("negative schema version")?;

    if found > latest {
        bail!("database schema v{found} is newer than this build understands (v{latest})");
    }
    if found == latest {
        return Ok(());
    }

    let tx = conn.transaction().context("failed to begin schema upgrade")?;
    for (name, sql) in &STEPS[found..] {
        tx.execute_batch(sql)
            .with_context(|| format!("failed to apply {name}"))?;
    }
    tx.pragma_update(None, "user_version", latest as i64)
        .context("failed to record schema version")?;
    tx.commit().context("failed to commit schema upgrade")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(conn: &Connection) -> i64 {
        conn.pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn fresh_database_reaches_latest_and_reruns_cleanly() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        assert_eq!(version(&conn), STEPS.len() as i64);

        run_migrations(&mut conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'session_history'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn newer_schema_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();
        assert!(run_migrations(&mut conn).is_err());
    }
}
