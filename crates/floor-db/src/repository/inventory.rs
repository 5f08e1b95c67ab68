//! # Inventory Ledger
//!
//! Applies stock movements for orders and keeps availability in step with
//! stock.
//!
//! ## Flow (inside the caller's transaction)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  order lines                                                            │
//! │     │  resolve: product gone? ── error! + skip line                     │
//! │     ▼                                                                   │
//! │  LineDemand per line (kit → components, individual → self + options)   │
//! │     │                                                                   │
//! │     ▼  plan_adjustments (floor-core): aggregate, tracked rows only      │
//! │  [Product a, Product b, ..., VariantOption x, ...]   (lock order)       │
//! │     │                                                                   │
//! │     ▼  per row: UPDATE ... stock_quantity + delta RETURNING             │
//! │  before/after ── crossed the zero boundary?                            │
//! │     ├── after ≤ 0 < before  → item + links unavailable                 │
//! │     └── before ≤ 0 < after  → item + links available again             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Over-selling is allowed: stock may go negative and is logged with
//! `warn!`. Rows are always updated in [`StockRef`] order, so two
//! concurrent ledgers touching the same items never wait on each other in
//! opposite orders.

use chrono::Utc;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::order;
use floor_core::inventory::{
    plan_adjustments, ComponentLink, LineDemand, OptionPick, StockHolder,
};
use floor_core::{
    AvailabilityChange, CoreError, ProductKind, StockDirection, StockMovement, StockRef,
};

/// Current stock of one item.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StockLevel {
    pub stock_quantity: i64,
    pub tracks_inventory: bool,
    pub is_available: bool,
}

/// Repository entry points for the ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Consumes stock for every line of an order. Does not touch the order
    /// status.
    ///
    /// Shares the per-order stock flag with the status pipeline, so stock
    /// is taken at most once whichever path gets there first.
    ///
    /// ## Errors
    /// * `NotFound` - no such order
    /// * `InvalidState` - the order's stock is already consumed
    pub async fn decrement_order(&self, order_id: &str) -> DbResult<Vec<StockMovement>> {
        self.apply(order_id, StockDirection::Decrement).await
    }

    /// Returns stock for every line of an order whose stock was consumed.
    ///
    /// ## Errors
    /// * `NotFound` - no such order
    /// * `InvalidState` - the order holds no consumed stock
    pub async fn restock_order(&self, order_id: &str) -> DbResult<Vec<StockMovement>> {
        self.apply(order_id, StockDirection::Restock).await
    }

    async fn apply(
        &self,
        order_id: &str,
        direction: StockDirection,
    ) -> DbResult<Vec<StockMovement>> {
        let mut tx = self.pool.begin().await?;

        if let Some(movements) = apply_order(&mut tx, order_id, direction).await? {
            tx.commit().await?;
            return Ok(movements);
        }

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM orders WHERE id = ?1")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Order", order_id));
        }

        let (held, operation) = match direction {
            StockDirection::Decrement => ("stock consumed", "decrement stock"),
            StockDirection::Restock => ("no stock consumed", "restock"),
        };
        Err(CoreError::invalid_state("Order", order_id, held, operation).into())
    }

    pub async fn stock_level(&self, item: &StockRef) -> DbResult<StockLevel> {
        let sql = match item {
            StockRef::Product(_) => {
                r#"
                SELECT stock_quantity, tracks_inventory, is_available
                FROM products WHERE id = ?1
                "#
            }
            StockRef::VariantOption(_) => {
                r#"
                SELECT stock_quantity, tracks_inventory, is_available
                FROM variant_options WHERE id = ?1
                "#
            }
        };

        sqlx::query_as::<_, StockLevel>(sql)
            .bind(item.id())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(item.entity(), item.id()))
    }

    /// Manual correction (delivery received, breakage). Crossing the zero
    /// boundary flips availability exactly like an order would.
    pub async fn adjust_stock(&self, item: &StockRef, delta: i64) -> DbResult<StockMovement> {
        let mut tx = self.pool.begin().await?;

        let movement = adjust(&mut tx, item, delta)
            .await?
            .ok_or_else(|| DbError::not_found(item.entity(), item.id()))?;

        tx.commit().await?;

        info!(
            item = %item.id(),
            before = movement.before,
            after = movement.after,
            "Stock adjusted manually"
        );
        Ok(movement)
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Flips the order's stock flag and applies the ledger to every line.
///
/// `None` when the flag already matches `direction` (or the order does not
/// exist): nothing moved. The flag write comes first, so this is safe as
/// the first statement of a transaction.
pub(crate) async fn apply_order(
    conn: &mut SqliteConnection,
    order_id: &str,
    direction: StockDirection,
) -> DbResult<Option<Vec<StockMovement>>> {
    let consumed = direction == StockDirection::Decrement;
    let flipped = sqlx::query(
        r#"
        UPDATE orders SET stock_applied = ?2, updated_at = ?3
        WHERE id = ?1 AND stock_applied <> ?2
        "#,
    )
    .bind(order_id)
    .bind(consumed)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if flipped.rows_affected() == 0 {
        return Ok(None);
    }

    let lines = order::line_quantities(conn, order_id).await?;
    apply_lines(conn, order_id, &lines, direction).await.map(Some)
}

/// Applies the ledger to the given `(line_id, product_id, quantity)` lines.
pub(crate) async fn apply_lines(
    conn: &mut SqliteConnection,
    order_id: &str,
    lines: &[order::LineQuantity],
    direction: StockDirection,
) -> DbResult<Vec<StockMovement>> {
    let mut demands = Vec::with_capacity(lines.len());
    for line in lines {
        match resolve_line(conn, line).await? {
            Some(demand) => demands.push(demand),
            None => error!(
                order_id = %order_id,
                line_id = %line.id,
                product_id = %line.product_id,
                "Product no longer exists; line skipped by inventory ledger"
            ),
        }
    }

    let plan = plan_adjustments(&demands, direction);
    debug!(order_id = %order_id, rows = plan.len(), ?direction, "Applying stock plan");

    let mut movements = Vec::with_capacity(plan.len());
    for step in plan {
        match adjust(conn, &step.item, step.delta).await? {
            Some(movement) => movements.push(movement),
            None => error!(
                order_id = %order_id,
                item = %step.item.id(),
                "Stock row vanished during adjustment; skipped"
            ),
        }
    }

    Ok(movements)
}

#[derive(Debug, FromRow)]
struct ProductStock {
    kind: ProductKind,
    tracks_inventory: bool,
}

#[derive(Debug, FromRow)]
struct ComponentRow {
    component_product_id: String,
    quantity: i64,
    tracks_inventory: bool,
}

#[derive(Debug, FromRow)]
struct OptionRow {
    variant_option_id: String,
    quantity: i64,
    tracks_inventory: Option<bool>,
}

async fn resolve_line(
    conn: &mut SqliteConnection,
    line: &order::LineQuantity,
) -> DbResult<Option<LineDemand>> {
    let product = sqlx::query_as::<_, ProductStock>(
        "SELECT kind, tracks_inventory FROM products WHERE id = ?1",
    )
    .bind(&line.product_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(product) = product else {
        return Ok(None);
    };

    let holder = match product.kind {
        ProductKind::Kit => {
            let components = sqlx::query_as::<_, ComponentRow>(
                r#"
                SELECT kc.component_product_id, kc.quantity, p.tracks_inventory
                FROM kit_components kc
                JOIN products p ON p.id = kc.component_product_id
                WHERE kc.kit_product_id = ?1
                "#,
            )
            .bind(&line.product_id)
            .fetch_all(&mut *conn)
            .await?;

            StockHolder::Kit {
                components: components
                    .into_iter()
                    .map(|c| ComponentLink {
                        product_id: c.component_product_id,
                        per_kit: c.quantity,
                        tracks_inventory: c.tracks_inventory,
                    })
                    .collect(),
            }
        }
        ProductKind::Individual => {
            let rows = sqlx::query_as::<_, OptionRow>(
                r#"
                SELECT oio.variant_option_id, oio.quantity, vo.tracks_inventory
                FROM order_item_options oio
                JOIN order_item_variants oiv ON oiv.id = oio.order_item_variant_id
                LEFT JOIN variant_options vo ON vo.id = oio.variant_option_id
                WHERE oiv.order_item_id = ?1
                "#,
            )
            .bind(&line.id)
            .fetch_all(&mut *conn)
            .await?;

            let mut options = Vec::with_capacity(rows.len());
            for row in rows {
                match row.tracks_inventory {
                    Some(tracks_inventory) => options.push(OptionPick {
                        option_id: row.variant_option_id,
                        quantity: row.quantity,
                        tracks_inventory,
                    }),
                    None => error!(
                        line_id = %line.id,
                        option_id = %row.variant_option_id,
                        "Variant option no longer exists; skipped"
                    ),
                }
            }

            StockHolder::Individual {
                product_id: line.product_id.clone(),
                tracks_inventory: product.tracks_inventory,
                options,
            }
        }
    };

    Ok(Some(LineDemand {
        quantity: line.quantity,
        holder,
    }))
}

#[derive(Debug, FromRow)]
struct AdjustedRow {
    stock_quantity: i64,
    tracks_inventory: bool,
}

/// Adds `delta` to one stock row and, for tracked rows, applies the
/// boundary rule. `None` when the row does not exist.
async fn adjust(
    conn: &mut SqliteConnection,
    item: &StockRef,
    delta: i64,
) -> DbResult<Option<StockMovement>> {
    let row = match item {
        StockRef::Product(id) => {
            sqlx::query_as::<_, AdjustedRow>(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity + ?2, updated_at = ?3
                WHERE id = ?1
                RETURNING stock_quantity, tracks_inventory
                "#,
            )
            .bind(id)
            .bind(delta)
            .bind(Utc::now())
            .fetch_optional(&mut *conn)
            .await?
        }
        StockRef::VariantOption(id) => {
            sqlx::query_as::<_, AdjustedRow>(
                r#"
                UPDATE variant_options
                SET stock_quantity = stock_quantity + ?2
                WHERE id = ?1
                RETURNING stock_quantity, tracks_inventory
                "#,
            )
            .bind(id)
            .bind(delta)
            .fetch_optional(&mut *conn)
            .await?
        }
    };

    let Some(row) = row else {
        return Ok(None);
    };

    let after = row.stock_quantity;
    let mut movement = StockMovement::new(item.clone(), after - delta, after);

    // Untracked items keep their counter but never pause
    if !row.tracks_inventory {
        movement.availability = None;
        return Ok(Some(movement));
    }

    if movement.is_oversold() {
        warn!(
            item = %item.id(),
            kind = item.entity(),
            stock = after,
            "Stock below zero after adjustment"
        );
    }

    if let Some(change) = movement.availability {
        set_availability(conn, item, change).await?;
    }

    Ok(Some(movement))
}

async fn set_availability(
    conn: &mut SqliteConnection,
    item: &StockRef,
    change: AvailabilityChange,
) -> DbResult<()> {
    let available = change == AvailabilityChange::Reactivated;

    let (item_sql, links_sql) = match item {
        StockRef::Product(_) => (
            "UPDATE products SET is_available = ?2 WHERE id = ?1",
            r#"
            UPDATE availability_links SET is_available = ?2
            WHERE product_id = ?1 AND is_available <> ?2
            "#,
        ),
        StockRef::VariantOption(_) => (
            "UPDATE variant_options SET is_available = ?2 WHERE id = ?1",
            r#"
            UPDATE availability_links SET is_available = ?2
            WHERE variant_option_id = ?1 AND is_available <> ?2
            "#,
        ),
    };

    sqlx::query(item_sql)
        .bind(item.id())
        .bind(available)
        .execute(&mut *conn)
        .await?;

    let links = sqlx::query(links_sql)
        .bind(item.id())
        .bind(available)
        .execute(&mut *conn)
        .await?;

    info!(
        item = %item.id(),
        kind = item.entity(),
        ?change,
        links = links.rows_affected(),
        "Availability changed at stock boundary"
    );

    Ok(())
}
