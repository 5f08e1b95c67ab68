//! # Activity Repository
//!
//! Append-only audit trail of floor actions, plus the occupancy report.
//!
//! Rows are written inside the transaction of the operation they describe
//! via [`append`]; triggers in the schema reject UPDATE and DELETE.

use std::collections::BTreeMap;

use chrono::{DateTime, Timelike, Utc};
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::new_id;
use floor_core::{ActivityAction, ActivityLogEntry, ActivityReport};

/// An entry about to be appended.
///
/// ## Example
/// ```rust,ignore
/// let entry = NewActivity::new(&table.store_id, ActivityAction::TableClosed)
///     .table(&table.id)
///     .command(&command.id)
///     .revenue(4_250)
///     .duration(95);
/// ```
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub store_id: String,
    pub action: ActivityAction,
    pub table_id: Option<String>,
    pub command_id: Option<String>,
    pub details: Value,
    pub revenue_cents: Option<i64>,
    pub duration_minutes: Option<i64>,
    pub employee_id: Option<String>,
}

impl NewActivity {
    pub fn new(store_id: &str, action: ActivityAction) -> Self {
        NewActivity {
            store_id: store_id.to_string(),
            action,
            table_id: None,
            command_id: None,
            details: Value::Object(Default::default()),
            revenue_cents: None,
            duration_minutes: None,
            employee_id: None,
        }
    }

    pub fn table(mut self, table_id: &str) -> Self {
        self.table_id = Some(table_id.to_string());
        self
    }

    /// Sets the table when there is one.
    pub fn maybe_table(mut self, table_id: Option<&str>) -> Self {
        self.table_id = table_id.map(str::to_string);
        self
    }

    pub fn command(mut self, command_id: &str) -> Self {
        self.command_id = Some(command_id.to_string());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn revenue(mut self, cents: i64) -> Self {
        self.revenue_cents = Some(cents);
        self
    }

    /// Negative durations (clock skew) are clamped to zero.
    pub fn duration(mut self, minutes: i64) -> Self {
        self.duration_minutes = Some(minutes.max(0));
        self
    }

    pub fn employee(mut self, employee_id: Option<&str>) -> Self {
        self.employee_id = employee_id.map(str::to_string);
        self
    }
}

/// Appends an entry on the caller's transaction.
pub(crate) async fn append(
    conn: &mut SqliteConnection,
    entry: NewActivity,
) -> DbResult<ActivityLogEntry> {
    let row = ActivityLogEntry {
        id: new_id(),
        store_id: entry.store_id,
        table_id: entry.table_id,
        command_id: entry.command_id,
        action: entry.action,
        details: serde_json::to_string(&entry.details)?,
        revenue_cents: entry.revenue_cents,
        duration_minutes: entry.duration_minutes,
        employee_id: entry.employee_id,
        created_at: Utc::now(),
    };

    debug!(id = %row.id, action = %row.action, "Appending activity");

    sqlx::query(
        r#"
        INSERT INTO activity_log (
            id, store_id, table_id, command_id, action, details,
            revenue_cents, duration_minutes, employee_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&row.id)
    .bind(&row.store_id)
    .bind(&row.table_id)
    .bind(&row.command_id)
    .bind(row.action)
    .bind(&row.details)
    .bind(row.revenue_cents)
    .bind(row.duration_minutes)
    .bind(&row.employee_id)
    .bind(row.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(row)
}

/// Repository for the activity log.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
    report_limit: i64,
}

impl ActivityRepository {
    pub fn new(pool: SqlitePool, report_limit: i64) -> Self {
        ActivityRepository { pool, report_limit }
    }

    /// Appends an entry outside any floor operation (manual notes, imports).
    pub async fn record(&self, entry: NewActivity) -> DbResult<ActivityLogEntry> {
        let mut conn = self.pool.acquire().await?;
        append(&mut conn, entry).await
    }

    /// Most recent entries of a store, newest first.
    pub async fn recent(&self, store_id: &str, limit: i64) -> DbResult<Vec<ActivityLogEntry>> {
        let entries = sqlx::query_as::<_, ActivityLogEntry>(
            r#"
            SELECT * FROM activity_log
            WHERE store_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(store_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Full history of one table, oldest first.
    pub async fn for_table(&self, table_id: &str) -> DbResult<Vec<ActivityLogEntry>> {
        let entries = sqlx::query_as::<_, ActivityLogEntry>(
            "SELECT * FROM activity_log WHERE table_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(table_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// History of one command, oldest first.
    pub async fn for_command(&self, command_id: &str) -> DbResult<Vec<ActivityLogEntry>> {
        let entries = sqlx::query_as::<_, ActivityLogEntry>(
            "SELECT * FROM activity_log WHERE command_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(command_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Recent entries plus occupancy figures.
    ///
    /// ## Returns
    /// * `entries` - newest entries, capped by the configured report limit
    /// * `average_occupation_minutes` - mean duration of `table_closed` entries
    /// * `busiest_hour` - UTC hour with the most `table_opened` entries
    ///   (earliest hour wins a tie)
    pub async fn report(&self, store_id: &str) -> DbResult<ActivityReport> {
        let entries = self.recent(store_id, self.report_limit).await?;

        let average_occupation_minutes: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT AVG(duration_minutes) FROM activity_log
            WHERE store_id = ?1 AND action = ?2 AND duration_minutes IS NOT NULL
            "#,
        )
        .bind(store_id)
        .bind(ActivityAction::TableClosed)
        .fetch_one(&self.pool)
        .await?;

        let opened_at: Vec<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT created_at FROM activity_log WHERE store_id = ?1 AND action = ?2",
        )
        .bind(store_id)
        .bind(ActivityAction::TableOpened)
        .fetch_all(&self.pool)
        .await?;

        Ok(ActivityReport {
            entries,
            average_occupation_minutes,
            busiest_hour: busiest_hour(&opened_at),
        })
    }
}

fn busiest_hour(timestamps: &[DateTime<Utc>]) -> Option<u32> {
    let mut per_hour: BTreeMap<u32, usize> = BTreeMap::new();
    for ts in timestamps {
        *per_hour.entry(ts.hour()).or_default() += 1;
    }

    // max_by_key keeps the last maximum; iterate in reverse so the
    // earliest hour wins ties.
    per_hour
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(hour, _)| hour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_busiest_hour_prefers_earliest_on_tie() {
        let at = |h| Utc.with_ymd_and_hms(2026, 3, 1, h, 15, 0).unwrap();
        assert_eq!(busiest_hour(&[]), None);
        assert_eq!(busiest_hour(&[at(20), at(12), at(20), at(12)]), Some(12));
        assert_eq!(busiest_hour(&[at(9), at(20), at(20)]), Some(20));
    }

    #[test]
    fn test_duration_is_clamped() {
        let entry = NewActivity::new("s", ActivityAction::TableClosed).duration(-3);
        assert_eq!(entry.duration_minutes, Some(0));
    }

    #[tokio::test]
    async fn test_record_and_report() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let activity = db.activity();

        activity
            .record(NewActivity::new("s", ActivityAction::TableOpened).table("t-1"))
            .await
            .unwrap();
        activity
            .record(
                NewActivity::new("s", ActivityAction::TableClosed)
                    .table("t-1")
                    .revenue(1_000)
                    .duration(30)
                    .details(json!({ "order_count": 2 })),
            )
            .await
            .unwrap();
        activity
            .record(
                NewActivity::new("s", ActivityAction::TableClosed)
                    .table("t-2")
                    .duration(60),
            )
            .await
            .unwrap();

        let report = activity.report("s").await.unwrap();
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.average_occupation_minutes, Some(45.0));
        assert!(report.busiest_hour.is_some());

        let history = activity.for_table("t-1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].details_json()["order_count"], 2);

        let empty = activity.report("other-store").await.unwrap();
        assert!(empty.entries.is_empty());
        assert_eq!(empty.average_occupation_minutes, None);
        assert_eq!(empty.busiest_hour, None);
    }

    #[tokio::test]
    async fn test_log_is_append_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let entry = db
            .activity()
            .record(NewActivity::new("s", ActivityAction::TableOpened))
            .await
            .unwrap();

        let update = sqlx::query("UPDATE activity_log SET action = 'x' WHERE id = ?1")
            .bind(&entry.id)
            .execute(db.pool())
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM activity_log WHERE id = ?1")
            .bind(&entry.id)
            .execute(db.pool())
            .await;
        assert!(delete.is_err());
    }

    #[tokio::test]
    async fn test_report_limit_from_settings() {
        let settings = crate::config::FloorSettings {
            activity_report_limit: 2,
            ..Default::default()
        };
        let db = Database::with_settings(DbConfig::in_memory(), settings)
            .await
            .unwrap();

        for _ in 0..5 {
            db.activity()
                .record(NewActivity::new("s", ActivityAction::TableOpened))
                .await
                .unwrap();
        }

        let report = db.activity().report("s").await.unwrap();
        assert_eq!(report.entries.len(), 2);
    }
}
