//! # Table Repository
//!
//! Dining tables: registry, operator status changes, employee assignment
//! and the floor dashboard.
//!
//! ## Status Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AVAILABLE ──open command──► OCCUPIED ──close/cancel/merge──► AVAILABLE│
//! │      ▲                         (CommandRepository only)                 │
//! │      │                                                                  │
//! │      └──── update() ────► RESERVED / MAINTENANCE / CLEANING            │
//! │                                                                         │
//! │  update() never sets OCCUPIED and never touches an OCCUPIED table.     │
//! │  status_color is rewritten with every status write.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::events::{EventHub, FloorEvent, PendingEffects};
use crate::repository::activity::{self, NewActivity};
use crate::repository::{employee, new_id, saloon};
use floor_core::validation::{validate_capacity, validate_location, validate_table_name};
use floor_core::{
    ActivityAction, CoreError, FloorDashboard, NewTable, SaloonOccupancy, Table, TableStatus,
    TableUpdate,
};

/// Repository for dining tables.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
    hub: EventHub,
}

impl TableRepository {
    pub fn new(pool: SqlitePool, hub: EventHub) -> Self {
        TableRepository { pool, hub }
    }

    /// Creates an AVAILABLE table in an active saloon of `store_id`.
    ///
    /// ## Errors
    /// * `NotFound` - saloon missing, disabled or in another store
    /// * `DuplicateName` - a live table in the saloon has this name
    pub async fn create(&self, store_id: &str, input: NewTable) -> DbResult<Table> {
        validate_table_name(&input.name)?;
        validate_capacity(input.max_capacity)?;
        validate_location(input.location_description.as_deref())?;

        let name = input.name.trim().to_string();
        let mut tx = self.pool.begin().await?;

        saloon::lock_active(&mut tx, &input.saloon_id, store_id).await?;
        ensure_name_free(&mut tx, &input.saloon_id, &name, None).await?;

        let now = Utc::now();
        let status = TableStatus::Available;
        let table = Table {
            id: new_id(),
            store_id: store_id.to_string(),
            saloon_id: input.saloon_id,
            name,
            status,
            status_color: status.color().to_string(),
            max_capacity: input.max_capacity,
            current_capacity: 0,
            location_description: input.location_description,
            assigned_employee_id: None,
            opened_at: None,
            closed_at: None,
            revenue_today_cents: 0,
            orders_today: 0,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %table.id, name = %table.name, "Creating table");

        sqlx::query(
            r#"
            INSERT INTO dining_tables (
                id, store_id, saloon_id, name, status, status_color,
                max_capacity, current_capacity, location_description,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10)
            "#,
        )
        .bind(&table.id)
        .bind(&table.store_id)
        .bind(&table.saloon_id)
        .bind(&table.name)
        .bind(table.status)
        .bind(&table.status_color)
        .bind(table.max_capacity)
        .bind(&table.location_description)
        .bind(table.created_at)
        .bind(table.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| duplicate_name(e, &table.saloon_id, &table.name))?;

        let mut effects = PendingEffects::new();
        effects.event(FloorEvent::table(&table.store_id, &table.id, table.status));

        tx.commit().await?;
        self.hub.dispatch(effects);

        Ok(table)
    }

    /// Live table by id. Soft-deleted tables are `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Table> {
        let mut conn = self.pool.acquire().await?;
        fetch_live(&mut conn, id).await
    }

    pub async fn list_by_saloon(&self, saloon_id: &str) -> DbResult<Vec<Table>> {
        let tables = sqlx::query_as::<_, Table>(
            "SELECT * FROM dining_tables WHERE saloon_id = ?1 AND is_deleted = 0 ORDER BY name",
        )
        .bind(saloon_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    pub async fn list_by_store(&self, store_id: &str) -> DbResult<Vec<Table>> {
        let tables = sqlx::query_as::<_, Table>(
            r#"
            SELECT t.* FROM dining_tables t
            JOIN saloons s ON s.id = t.saloon_id
            WHERE t.store_id = ?1 AND t.is_deleted = 0
            ORDER BY s.display_order, s.name, t.name
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    /// Applies a partial update.
    ///
    /// ## Errors
    /// * `InvalidState` - requested OCCUPIED, or the table is OCCUPIED and
    ///   the status would change
    /// * `DuplicateName` - renamed onto another live table of the saloon
    pub async fn update(&self, id: &str, update: TableUpdate) -> DbResult<Table> {
        if let Some(name) = &update.name {
            validate_table_name(name)?;
        }
        if let Some(capacity) = update.max_capacity {
            validate_capacity(capacity)?;
        }
        validate_location(update.location_description.as_deref())?;

        let mut tx = self.pool.begin().await?;
        let current = touch(&mut tx, id).await?;

        if let Some(status) = update.status {
            if status == TableStatus::Occupied && current.status != TableStatus::Occupied {
                return Err(CoreError::invalid_state(
                    "Table",
                    id,
                    current.status,
                    "be set OCCUPIED without opening a command",
                )
                .into());
            }
            if current.status == TableStatus::Occupied && status != TableStatus::Occupied {
                return Err(CoreError::invalid_state(
                    "Table",
                    id,
                    current.status,
                    "change status while a command is open",
                )
                .into());
            }
        }

        let name = update
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.name)
            .to_string();
        if name != current.name {
            ensure_name_free(&mut tx, &current.saloon_id, &name, Some(id)).await?;
        }

        let status = update.status.unwrap_or(current.status);
        let table = sqlx::query_as::<_, Table>(
            r#"
            UPDATE dining_tables SET
                name = ?2,
                max_capacity = ?3,
                location_description = ?4,
                status = ?5,
                status_color = ?6
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(update.max_capacity.unwrap_or(current.max_capacity))
        .bind(
            update
                .location_description
                .as_ref()
                .or(current.location_description.as_ref()),
        )
        .bind(status)
        .bind(status.color())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| duplicate_name(e, &current.saloon_id, &name))?;

        let mut effects = PendingEffects::new();
        if status != current.status {
            activity::append(
                &mut tx,
                NewActivity::new(&table.store_id, ActivityAction::TableStatusChanged)
                    .table(&table.id)
                    .details(json!({ "from": current.status, "to": status })),
            )
            .await?;
            effects.event(FloorEvent::table(&table.store_id, &table.id, status));
        }

        tx.commit().await?;
        self.hub.dispatch(effects);

        Ok(table)
    }

    /// Moves a table to another active saloon of the same store.
    pub async fn move_to_saloon(&self, id: &str, saloon_id: &str) -> DbResult<Table> {
        let mut tx = self.pool.begin().await?;
        let current = touch(&mut tx, id).await?;

        saloon::lock_active(&mut tx, saloon_id, &current.store_id).await?;
        ensure_name_free(&mut tx, saloon_id, &current.name, Some(id)).await?;

        let table = sqlx::query_as::<_, Table>(
            "UPDATE dining_tables SET saloon_id = ?2 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(saloon_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| duplicate_name(e, saloon_id, &current.name))?;

        tx.commit().await?;
        Ok(table)
    }

    /// Soft-deletes an AVAILABLE table. Its history stays in place.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let current = touch(&mut tx, id).await?;

        if current.status != TableStatus::Available {
            return Err(CoreError::in_use(
                "Table",
                id,
                format!("status is {}", current.status),
            )
            .into());
        }

        sqlx::query("UPDATE dining_tables SET is_deleted = 1 WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %id, "Table deleted");
        Ok(())
    }

    /// Assigns a waiter with access to the table's store.
    ///
    /// ## Errors
    /// * `NotFound` - table or employee missing
    /// * `AccessDenied` - employee cannot work in this store
    pub async fn assign_employee(&self, table_id: &str, employee_id: &str) -> DbResult<Table> {
        let mut tx = self.pool.begin().await?;
        let current = touch(&mut tx, table_id).await?;

        employee::ensure_store_access(&mut tx, employee_id, &current.store_id).await?;

        let table = sqlx::query_as::<_, Table>(
            "UPDATE dining_tables SET assigned_employee_id = ?2 WHERE id = ?1 RETURNING *",
        )
        .bind(table_id)
        .bind(employee_id)
        .fetch_one(&mut *tx)
        .await?;

        activity::append(
            &mut tx,
            NewActivity::new(&table.store_id, ActivityAction::EmployeeAssigned)
                .table(table_id)
                .employee(Some(employee_id))
                .details(json!({ "previous_employee_id": current.assigned_employee_id })),
        )
        .await?;

        let mut effects = PendingEffects::new();
        effects.event(FloorEvent::table(&table.store_id, &table.id, table.status));

        tx.commit().await?;
        self.hub.dispatch(effects);

        Ok(table)
    }

    pub async fn unassign_employee(&self, table_id: &str) -> DbResult<Table> {
        let mut tx = self.pool.begin().await?;
        let current = touch(&mut tx, table_id).await?;

        let table = sqlx::query_as::<_, Table>(
            "UPDATE dining_tables SET assigned_employee_id = NULL WHERE id = ?1 RETURNING *",
        )
        .bind(table_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut effects = PendingEffects::new();
        if current.assigned_employee_id.is_some() {
            activity::append(
                &mut tx,
                NewActivity::new(&table.store_id, ActivityAction::EmployeeUnassigned)
                    .table(table_id)
                    .employee(current.assigned_employee_id.as_deref()),
            )
            .await?;
            effects.event(FloorEvent::table(&table.store_id, &table.id, table.status));
        }

        tx.commit().await?;
        self.hub.dispatch(effects);

        Ok(table)
    }

    /// Occupancy and today's totals for a store.
    pub async fn dashboard(&self, store_id: &str) -> DbResult<FloorDashboard> {
        let counts: Vec<(TableStatus, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*) FROM dining_tables
            WHERE store_id = ?1 AND is_deleted = 0
            GROUP BY status
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        let mut dashboard = FloorDashboard::default();
        for (status, count) in counts {
            dashboard.total_tables += count;
            match status {
                TableStatus::Available => dashboard.available = count,
                TableStatus::Occupied => dashboard.occupied = count,
                TableStatus::Reserved => dashboard.reserved = count,
                TableStatus::Maintenance => dashboard.maintenance = count,
                TableStatus::Cleaning => dashboard.cleaning = count,
            }
        }

        let (revenue, orders): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(revenue_today_cents), 0), COALESCE(SUM(orders_today), 0)
            FROM dining_tables
            WHERE store_id = ?1 AND is_deleted = 0
            "#,
        )
        .bind(store_id)
        .fetch_one(&self.pool)
        .await?;
        dashboard.revenue_today_cents = revenue;
        dashboard.orders_today = orders;

        dashboard.saloons = sqlx::query_as::<_, (String, String, i64, i64)>(
            r#"
            SELECT s.id, s.name,
                   COUNT(t.id),
                   COALESCE(SUM(CASE WHEN t.status = ?2 THEN 1 ELSE 0 END), 0)
            FROM saloons s
            LEFT JOIN dining_tables t ON t.saloon_id = s.id AND t.is_deleted = 0
            WHERE s.store_id = ?1 AND s.is_active = 1
            GROUP BY s.id, s.name
            ORDER BY s.display_order, s.name
            "#,
        )
        .bind(store_id)
        .bind(TableStatus::Occupied)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(saloon_id, name, total_tables, occupied_tables)| SaloonOccupancy {
            saloon_id,
            name,
            total_tables,
            occupied_tables,
        })
        .collect();

        Ok(dashboard)
    }

    /// Zeroes the daily counters of every table in a store.
    pub async fn reset_daily_totals(&self, store_id: &str) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE dining_tables
            SET revenue_today_cents = 0, orders_today = 0, updated_at = ?2
            WHERE store_id = ?1
            "#,
        )
        .bind(store_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        info!(store_id = %store_id, tables = result.rows_affected(), "Daily totals reset");
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

pub(crate) async fn fetch_live(conn: &mut SqliteConnection, id: &str) -> DbResult<Table> {
    sqlx::query_as::<_, Table>("SELECT * FROM dining_tables WHERE id = ?1 AND is_deleted = 0")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Table", id))
}

/// Bumps `updated_at` on a live table, taking the write lock.
async fn touch(conn: &mut SqliteConnection, id: &str) -> DbResult<Table> {
    sqlx::query_as::<_, Table>(
        "UPDATE dining_tables SET updated_at = ?2 WHERE id = ?1 AND is_deleted = 0 RETURNING *",
    )
    .bind(id)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Table", id))
}

/// Flips AVAILABLE → OCCUPIED in one conditional write.
///
/// ## Errors
/// * `NotFound` - no live table with this id in `store_id`
/// * `TableUnavailable` - the table is in any other status
/// * `Validation` - more guests than seats (the caller's tx rolls back)
pub(crate) async fn occupy(
    conn: &mut SqliteConnection,
    table_id: &str,
    store_id: &str,
    guests: i64,
    now: DateTime<Utc>,
) -> DbResult<Table> {
    let occupied = sqlx::query_as::<_, Table>(
        r#"
        UPDATE dining_tables SET
            status = ?3,
            status_color = ?4,
            current_capacity = ?5,
            opened_at = ?6,
            closed_at = NULL,
            updated_at = ?6
        WHERE id = ?1 AND store_id = ?2 AND is_deleted = 0 AND status = ?7
        RETURNING *
        "#,
    )
    .bind(table_id)
    .bind(store_id)
    .bind(TableStatus::Occupied)
    .bind(TableStatus::Occupied.color())
    .bind(guests)
    .bind(now)
    .bind(TableStatus::Available)
    .fetch_optional(&mut *conn)
    .await?;

    match occupied {
        Some(table) => {
            floor_core::validation::validate_guest_count(guests, table.max_capacity)?;
            Ok(table)
        }
        None => {
            let table = fetch_live(conn, table_id).await?;
            if table.store_id != store_id {
                return Err(DbError::not_found("Table", table_id));
            }
            Err(CoreError::TableUnavailable {
                table_id: table_id.to_string(),
                status: table.status,
            }
            .into())
        }
    }
}

/// Returns an occupied table to AVAILABLE, folding a settled command's
/// revenue and order count into the daily counters.
pub(crate) async fn release(
    conn: &mut SqliteConnection,
    table_id: &str,
    revenue_cents: i64,
    order_count: i64,
    now: DateTime<Utc>,
) -> DbResult<Table> {
    sqlx::query_as::<_, Table>(
        r#"
        UPDATE dining_tables SET
            status = ?2,
            status_color = ?3,
            current_capacity = 0,
            closed_at = ?4,
            revenue_today_cents = revenue_today_cents + ?5,
            orders_today = orders_today + ?6,
            updated_at = ?4
        WHERE id = ?1
        RETURNING *
        "#,
    )
    .bind(table_id)
    .bind(TableStatus::Available)
    .bind(TableStatus::Available.color())
    .bind(now)
    .bind(revenue_cents)
    .bind(order_count)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Table", table_id))
}

async fn ensure_name_free(
    conn: &mut SqliteConnection,
    saloon_id: &str,
    name: &str,
    except_id: Option<&str>,
) -> DbResult<()> {
    let taken: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM dining_tables
        WHERE saloon_id = ?1 AND name = ?2 AND is_deleted = 0 AND id <> COALESCE(?3, '')
        "#,
    )
    .bind(saloon_id)
    .bind(name)
    .bind(except_id)
    .fetch_one(&mut *conn)
    .await?;

    if taken > 0 {
        return Err(CoreError::DuplicateName {
            saloon_id: saloon_id.to_string(),
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}

/// The partial unique index backs up the pre-check under concurrency.
fn duplicate_name(err: sqlx::Error, saloon_id: &str, name: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => CoreError::DuplicateName {
            saloon_id: saloon_id.to_string(),
            name: name.to_string(),
        }
        .into(),
        other => other,
    }
}
