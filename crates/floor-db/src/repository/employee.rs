//! # Employee Repository
//!
//! Minimal access directory: who exists and which stores they may work in.
//! Table assignment consults it through [`ensure_store_access`].

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use floor_core::{CoreError, Employee};

/// Repository for employees and their store access.
#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    pub async fn create(&self, name: &str) -> DbResult<Employee> {
        let employee = Employee {
            id: new_id(),
            name: name.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %employee.id, "Creating employee");

        sqlx::query(
            "INSERT INTO employees (id, name, is_active, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&employee.id)
        .bind(&employee.name)
        .bind(employee.is_active)
        .bind(employee.created_at)
        .execute(&self.pool)
        .await?;

        Ok(employee)
    }

    pub async fn get(&self, id: &str) -> DbResult<Employee> {
        sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))
    }

    /// Grants access to a store. Granting twice is a no-op.
    pub async fn grant_access(&self, employee_id: &str, store_id: &str) -> DbResult<()> {
        sqlx::query("INSERT OR IGNORE INTO store_access (employee_id, store_id) VALUES (?1, ?2)")
            .bind(employee_id)
            .bind(store_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn revoke_access(&self, employee_id: &str, store_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM store_access WHERE employee_id = ?1 AND store_id = ?2")
            .bind(employee_id)
            .bind(store_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn has_store_access(&self, employee_id: &str, store_id: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        has_access(&mut conn, employee_id, store_id).await
    }
}

async fn has_access(
    conn: &mut SqliteConnection,
    employee_id: &str,
    store_id: &str,
) -> DbResult<bool> {
    let granted: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM store_access WHERE employee_id = ?1 AND store_id = ?2",
    )
    .bind(employee_id)
    .bind(store_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(granted > 0)
}

/// Resolves an employee who may work in `store_id`.
///
/// ## Errors
/// * `NotFound` - unknown or deactivated employee
/// * `AccessDenied` - employee exists but lacks access to the store
pub(crate) async fn ensure_store_access(
    conn: &mut SqliteConnection,
    employee_id: &str,
    store_id: &str,
) -> DbResult<Employee> {
    let employee =
        sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?1 AND is_active = 1")
            .bind(employee_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", employee_id))?;

    if !has_access(conn, employee_id, store_id).await? {
        return Err(CoreError::AccessDenied {
            employee_id: employee_id.to_string(),
            store_id: store_id.to_string(),
        }
        .into());
    }

    Ok(employee)
}
