//! # Saloon Repository
//!
//! Named seating areas of a store. A saloon can only be disabled while
//! every live table in it is AVAILABLE.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use floor_core::validation::{validate_display_order, validate_saloon_name};
use floor_core::{CoreError, NewSaloon, Saloon, SaloonUpdate, TableStatus};

/// Repository for saloons.
#[derive(Debug, Clone)]
pub struct SaloonRepository {
    pool: SqlitePool,
}

impl SaloonRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaloonRepository { pool }
    }

    pub async fn create(&self, store_id: &str, input: NewSaloon) -> DbResult<Saloon> {
        validate_saloon_name(&input.name)?;
        validate_display_order(input.display_order)?;

        let now = Utc::now();
        let saloon = Saloon {
            id: new_id(),
            store_id: store_id.to_string(),
            name: input.name.trim().to_string(),
            display_order: input.display_order,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %saloon.id, name = %saloon.name, "Creating saloon");

        sqlx::query(
            r#"
            INSERT INTO saloons (
                id, store_id, name, display_order, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&saloon.id)
        .bind(&saloon.store_id)
        .bind(&saloon.name)
        .bind(saloon.display_order)
        .bind(saloon.is_active)
        .bind(saloon.created_at)
        .bind(saloon.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(saloon)
    }

    pub async fn get(&self, id: &str) -> DbResult<Saloon> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Saloons of a store in display order, disabled ones included.
    pub async fn list(&self, store_id: &str) -> DbResult<Vec<Saloon>> {
        let saloons = sqlx::query_as::<_, Saloon>(
            "SELECT * FROM saloons WHERE store_id = ?1 ORDER BY display_order, name",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(saloons)
    }

    /// Applies a partial update.
    ///
    /// Setting `is_active = false` goes through the same occupancy check
    /// as [`SaloonRepository::disable`].
    pub async fn update(&self, id: &str, update: SaloonUpdate) -> DbResult<Saloon> {
        if let Some(name) = &update.name {
            validate_saloon_name(name)?;
        }
        if let Some(order) = update.display_order {
            validate_display_order(order)?;
        }

        let mut tx = self.pool.begin().await?;

        // Write first so the check below runs under the write lock
        let current = touch(&mut tx, id).await?;

        if update.is_active == Some(false) && current.is_active {
            ensure_all_available(&mut tx, id).await?;
        }

        let saloon = sqlx::query_as::<_, Saloon>(
            r#"
            UPDATE saloons SET
                name = ?2,
                display_order = ?3,
                is_active = ?4
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim).unwrap_or(&current.name))
        .bind(update.display_order.unwrap_or(current.display_order))
        .bind(update.is_active.unwrap_or(current.is_active))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saloon)
    }

    /// Disables a saloon.
    ///
    /// ## Errors
    /// * `NotFound` - no such saloon
    /// * `ResourceInUse` - a live table in it is not AVAILABLE
    pub async fn disable(&self, id: &str) -> DbResult<Saloon> {
        let mut tx = self.pool.begin().await?;

        touch(&mut tx, id).await?;
        ensure_all_available(&mut tx, id).await?;

        let saloon = sqlx::query_as::<_, Saloon>(
            "UPDATE saloons SET is_active = 0 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %id, "Saloon disabled");
        Ok(saloon)
    }
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Saloon> {
    sqlx::query_as::<_, Saloon>("SELECT * FROM saloons WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Saloon", id))
}

/// Write-locks an active saloon of the given store; anything else is
/// `NotFound`. Safe as the first statement of a transaction.
pub(crate) async fn lock_active(
    conn: &mut SqliteConnection,
    id: &str,
    store_id: &str,
) -> DbResult<Saloon> {
    sqlx::query_as::<_, Saloon>(
        r#"
        UPDATE saloons SET updated_at = ?3
        WHERE id = ?1 AND store_id = ?2 AND is_active = 1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(store_id)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Saloon", id))
}

async fn touch(conn: &mut SqliteConnection, id: &str) -> DbResult<Saloon> {
    sqlx::query_as::<_, Saloon>("UPDATE saloons SET updated_at = ?2 WHERE id = ?1 RETURNING *")
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Saloon", id))
}

async fn ensure_all_available(conn: &mut SqliteConnection, saloon_id: &str) -> DbResult<()> {
    let busy: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM dining_tables
        WHERE saloon_id = ?1 AND is_deleted = 0 AND status <> ?2
        "#,
    )
    .bind(saloon_id)
    .bind(TableStatus::Available)
    .fetch_one(&mut *conn)
    .await?;

    if busy > 0 {
        return Err(CoreError::in_use(
            "Saloon",
            saloon_id,
            format!("{busy} table(s) not AVAILABLE"),
        )
        .into());
    }
    Ok(())
}
