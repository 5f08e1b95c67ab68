//! # Order Repository
//!
//! Order tickets inside a command and their status pipeline.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. ADD ITEMS (command ACTIVE)                                          │
//! │     └── add_items() → Order { status: preparing } + kitchen print job  │
//! │         lines snapshot name, unit price (base + options), list price   │
//! │                                                                         │
//! │  2. KITCHEN PIPELINE                                                   │
//! │     └── update_status(): preparing → ready → on_route → delivered      │
//! │         entering delivered decrements stock                            │
//! │                                                                         │
//! │  3. SETTLE                                                             │
//! │     └── command close drives open orders to delivered (paid)           │
//! │     └── finalize(): delivered → finalized (idempotent)                 │
//! │                                                                         │
//! │  4. (OPTIONAL) CANCEL                                                  │
//! │     └── delivered → canceled restocks                                  │
//! │     └── removing the last line cancels the order with zero totals      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::events::{EventHub, FloorEvent, PendingEffects};
use crate::repository::{command, inventory, new_id};
use floor_core::validation::{validate_notes, validate_quantity};
use floor_core::{
    CoreError, LineSelection, Money, NewLineItem, Order, OrderLineItem, OrderLineOption,
    OrderLineVariant, OrderStatus, OrderTicket, OrderTransition, PaymentStatus, Product,
    StockDirection, TicketLine, ValidationError, Variant, VariantOption,
};

/// What the ledger needs from a line.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct LineQuantity {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
}

/// Repository for orders and their lines.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    hub: EventHub,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool, hub: EventHub) -> Self {
        OrderRepository { pool, hub }
    }

    /// Rings items into an ACTIVE command as one new order.
    ///
    /// The order is created directly in `preparing` and a ticket is handed
    /// to the kitchen printer after commit.
    ///
    /// ## Errors
    /// * `NotFound` - command, product, variant or option missing
    /// * `InvalidState` - command is not ACTIVE
    /// * `Validation` - empty list, bad quantity, note too long
    pub async fn add_items(
        &self,
        command_id: &str,
        items: &[NewLineItem],
    ) -> DbResult<OrderTicket> {
        if items.is_empty() {
            return Err(ValidationError::Empty {
                field: "items".into(),
            }
            .into());
        }
        for item in items {
            validate_quantity(item.quantity)?;
            validate_notes(item.note.as_deref())?;
            for variant in &item.variants {
                for option in &variant.options {
                    validate_quantity(option.quantity)?;
                }
            }
        }

        let mut tx = self.pool.begin().await?;
        let command = command::lock_active(&mut tx, command_id, "add items").await?;

        let mut priced = Vec::with_capacity(items.len());
        for item in items {
            priced.push(price_line(&mut tx, &command.store_id, item).await?);
        }

        let now = Utc::now();
        let order_id = new_id();
        let subtotal: Money = priced
            .iter()
            .map(|line| line.unit.multiply_quantity(line.quantity))
            .sum();

        let order = Order {
            id: order_id.clone(),
            store_id: command.store_id.clone(),
            command_id: Some(command.id.clone()),
            table_id: command.table_id.clone(),
            status: OrderStatus::Preparing,
            subtotal_cents: subtotal.cents(),
            discount_cents: 0,
            delivery_fee_cents: 0,
            total_cents: subtotal.cents(),
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        insert_order(&mut tx, &order).await?;

        let mut lines = Vec::with_capacity(priced.len());
        for line in priced {
            lines.push(insert_line(&mut tx, &order_id, line, now).await?);
        }

        let mut effects = PendingEffects::new();
        effects.event(FloorEvent::order(&order.store_id, &order.id, order.status));
        effects.print(self.hub.kitchen_job(&order.store_id, &order.id));

        tx.commit().await?;
        self.hub.dispatch(effects);

        info!(
            order_id = %order.id,
            command_id = %command_id,
            lines = lines.len(),
            total = %order.total(),
            "Order created"
        );

        Ok(OrderTicket { order, lines })
    }

    /// Removes one line from an order of an ACTIVE command.
    ///
    /// A delivered line is restocked first. Removing the last line cancels
    /// the order with zero totals.
    pub async fn remove_item(&self, command_id: &str, line_item_id: &str) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;
        command::lock_active(&mut tx, command_id, "remove items").await?;

        let line = sqlx::query_as::<_, LineQuantity>(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, oi.quantity
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE oi.id = ?1 AND o.command_id = ?2
            "#,
        )
        .bind(line_item_id)
        .bind(command_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("OrderLineItem", line_item_id))?;

        let order = fetch(&mut tx, &line.order_id).await?;
        if order.status.is_terminal() {
            return Err(
                CoreError::invalid_state("Order", &order.id, order.status, "remove items").into(),
            );
        }

        if order.status == OrderStatus::Delivered {
            inventory::apply_lines(
                &mut tx,
                &order.id,
                std::slice::from_ref(&line),
                StockDirection::Restock,
            )
            .await?;
        }

        sqlx::query("DELETE FROM order_items WHERE id = ?1")
            .bind(line_item_id)
            .execute(&mut *tx)
            .await?;

        let (remaining_cents, remaining_lines): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(unit_price_cents * quantity), 0), COUNT(*)
            FROM order_items WHERE order_id = ?1
            "#,
        )
        .bind(&order.id)
        .fetch_one(&mut *tx)
        .await?;

        let mut effects = PendingEffects::new();
        let order = if remaining_lines == 0 {
            let emptied = set_totals(&mut tx, &order.id, 0, true).await?;
            transition(&mut tx, &emptied, OrderStatus::Canceled, &self.hub, &mut effects).await?
        } else {
            set_totals(&mut tx, &order.id, remaining_cents, false).await?
        };

        tx.commit().await?;
        self.hub.dispatch(effects);

        debug!(order_id = %order.id, line_id = %line_item_id, "Line removed");
        Ok(order)
    }

    /// Moves an order along the kitchen pipeline.
    ///
    /// ## Errors
    /// * `NotFound` - no such order
    /// * `InvalidState` - illegal move (backwards, out of a terminal state,
    ///   or `finalized` from anything but `delivered`)
    pub async fn update_status(&self, order_id: &str, to: OrderStatus) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;
        let order = touch(&mut tx, order_id).await?;

        let mut effects = PendingEffects::new();
        let order = transition(&mut tx, &order, to, &self.hub, &mut effects).await?;

        tx.commit().await?;
        self.hub.dispatch(effects);

        Ok(order)
    }

    /// Housekeeping close of a delivered order. Finalizing twice is a no-op.
    pub async fn finalize(&self, order_id: &str) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;
        let order = touch(&mut tx, order_id).await?;

        if order.status == OrderStatus::Finalized {
            return Ok(order);
        }

        let mut effects = PendingEffects::new();
        let order =
            transition(&mut tx, &order, OrderStatus::Finalized, &self.hub, &mut effects).await?;

        tx.commit().await?;
        self.hub.dispatch(effects);

        Ok(order)
    }

    pub async fn get(&self, order_id: &str) -> DbResult<Order> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, order_id).await
    }

    /// Order with its lines, variants and options.
    pub async fn get_ticket(&self, order_id: &str) -> DbResult<OrderTicket> {
        let mut conn = self.pool.acquire().await?;
        let order = fetch(&mut conn, order_id).await?;
        load_ticket(&mut conn, order).await
    }

    /// Orders of a command, oldest first.
    pub async fn list_for_command(&self, command_id: &str) -> DbResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        for_command(&mut conn, command_id).await
    }
}

// =============================================================================
// Pricing
// =============================================================================

struct PricedLine {
    product: Product,
    quantity: i64,
    note: Option<String>,
    unit: Money,
    selections: Vec<(Variant, Vec<(VariantOption, i64)>)>,
}

/// Resolves a line against the catalog and prices it:
/// `unit = product price + Σ option price × option quantity`.
async fn price_line(
    conn: &mut SqliteConnection,
    store_id: &str,
    item: &NewLineItem,
) -> DbResult<PricedLine> {
    let product =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1 AND store_id = ?2")
            .bind(&item.product_id)
            .bind(store_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &item.product_id))?;

    let mut unit = Money::from_cents(product.price_cents);
    let mut selections = Vec::with_capacity(item.variants.len());

    for selected in &item.variants {
        let variant =
            sqlx::query_as::<_, Variant>("SELECT * FROM variants WHERE id = ?1 AND product_id = ?2")
                .bind(&selected.variant_id)
                .bind(&product.id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| DbError::not_found("Variant", &selected.variant_id))?;

        let mut options = Vec::with_capacity(selected.options.len());
        for picked in &selected.options {
            let option = sqlx::query_as::<_, VariantOption>(
                "SELECT * FROM variant_options WHERE id = ?1 AND variant_id = ?2",
            )
            .bind(&picked.variant_option_id)
            .bind(&variant.id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("VariantOption", &picked.variant_option_id))?;

            unit += Money::from_cents(option.price_cents).multiply_quantity(picked.quantity);
            options.push((option, picked.quantity));
        }

        selections.push((variant, options));
    }

    Ok(PricedLine {
        product,
        quantity: item.quantity,
        note: item.note.clone(),
        unit,
        selections,
    })
}

async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, store_id, command_id, table_id, status,
            subtotal_cents, discount_cents, delivery_fee_cents, total_cents,
            payment_status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&order.id)
    .bind(&order.store_id)
    .bind(&order.command_id)
    .bind(&order.table_id)
    .bind(order.status)
    .bind(order.subtotal_cents)
    .bind(order.discount_cents)
    .bind(order.delivery_fee_cents)
    .bind(order.total_cents)
    .bind(order.payment_status)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_line(
    conn: &mut SqliteConnection,
    order_id: &str,
    line: PricedLine,
    now: chrono::DateTime<Utc>,
) -> DbResult<TicketLine> {
    let item = OrderLineItem {
        id: new_id(),
        order_id: order_id.to_string(),
        product_id: line.product.id,
        product_name: line.product.name,
        quantity: line.quantity,
        unit_price_cents: line.unit.cents(),
        original_price_cents: line.product.price_cents,
        note: line.note,
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_id, product_name, quantity,
            unit_price_cents, original_price_cents, note, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.original_price_cents)
    .bind(&item.note)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    let mut selections = Vec::with_capacity(line.selections.len());
    for (variant, options) in line.selections {
        let snapshot = OrderLineVariant {
            id: new_id(),
            order_item_id: item.id.clone(),
            variant_id: variant.id,
            variant_name: variant.name,
        };

        sqlx::query(
            r#"
            INSERT INTO order_item_variants (id, order_item_id, variant_id, variant_name)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&snapshot.id)
        .bind(&snapshot.order_item_id)
        .bind(&snapshot.variant_id)
        .bind(&snapshot.variant_name)
        .execute(&mut *conn)
        .await?;

        let mut picked = Vec::with_capacity(options.len());
        for (option, quantity) in options {
            let row = OrderLineOption {
                id: new_id(),
                order_item_variant_id: snapshot.id.clone(),
                variant_option_id: option.id,
                option_name: option.name,
                quantity,
                unit_price_cents: option.price_cents,
            };

            sqlx::query(
                r#"
                INSERT INTO order_item_options (
                    id, order_item_variant_id, variant_option_id, option_name,
                    quantity, unit_price_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&row.id)
            .bind(&row.order_item_variant_id)
            .bind(&row.variant_option_id)
            .bind(&row.option_name)
            .bind(row.quantity)
            .bind(row.unit_price_cents)
            .execute(&mut *conn)
            .await?;

            picked.push(row);
        }

        selections.push(LineSelection {
            variant: snapshot,
            options: picked,
        });
    }

    Ok(TicketLine { item, selections })
}

// =============================================================================
// Transaction Helpers
// =============================================================================

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Order> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Order", id))
}

async fn touch(conn: &mut SqliteConnection, id: &str) -> DbResult<Order> {
    sqlx::query_as::<_, Order>("UPDATE orders SET updated_at = ?2 WHERE id = ?1 RETURNING *")
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Order", id))
}

pub(crate) async fn for_command(
    conn: &mut SqliteConnection,
    command_id: &str,
) -> DbResult<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE command_id = ?1 ORDER BY created_at, rowid",
    )
    .bind(command_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(orders)
}

pub(crate) async fn line_quantities(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<LineQuantity>> {
    let lines = sqlx::query_as::<_, LineQuantity>(
        r#"
        SELECT id, order_id, product_id, quantity
        FROM order_items WHERE order_id = ?1 ORDER BY rowid
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(lines)
}

/// Applies a status change: conditional write, ledger effect, events.
///
/// The write is gated on the status the caller read, so a concurrent
/// change surfaces as `InvalidState` instead of a second stock movement.
pub(crate) async fn transition(
    conn: &mut SqliteConnection,
    order: &Order,
    to: OrderStatus,
    hub: &EventHub,
    effects: &mut PendingEffects,
) -> DbResult<Order> {
    let step = OrderTransition::new(&order.id, order.status, to)?;

    let updated = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders SET status = ?3, updated_at = ?4
        WHERE id = ?1 AND status = ?2
        RETURNING *
        "#,
    )
    .bind(&order.id)
    .bind(step.from)
    .bind(step.to)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(updated) = updated else {
        let current = fetch(conn, &order.id).await?;
        return Err(
            CoreError::invalid_state("Order", &order.id, current.status, format!("move to {to}"))
                .into(),
        );
    };

    if let Some(direction) = step.inventory_effect() {
        match inventory::apply_order(conn, &order.id, direction).await? {
            Some(movements) => {
                debug!(order_id = %order.id, rows = movements.len(), ?direction, "Ledger applied")
            }
            None => warn!(
                order_id = %order.id,
                ?direction,
                "Stock already in the target state; ledger skipped"
            ),
        }
    }

    effects.event(FloorEvent::order(&updated.store_id, &updated.id, to));
    if to == OrderStatus::Preparing {
        effects.print(hub.kitchen_job(&updated.store_id, &updated.id));
    }

    info!(order_id = %order.id, from = %step.from, to = %to, "Order status changed");
    Ok(updated)
}

/// Marks an order paid.
pub(crate) async fn mark_paid(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Order> {
    sqlx::query_as::<_, Order>("UPDATE orders SET payment_status = ?2 WHERE id = ?1 RETURNING *")
        .bind(order_id)
        .bind(PaymentStatus::Paid)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Order", order_id))
}

async fn set_totals(
    conn: &mut SqliteConnection,
    order_id: &str,
    subtotal_cents: i64,
    clear_adjustments: bool,
) -> DbResult<Order> {
    let sql = if clear_adjustments {
        r#"
        UPDATE orders SET
            subtotal_cents = ?2,
            discount_cents = 0,
            delivery_fee_cents = 0,
            total_cents = ?2,
            updated_at = ?3
        WHERE id = ?1
        RETURNING *
        "#
    } else {
        r#"
        UPDATE orders SET
            subtotal_cents = ?2,
            total_cents = ?2 - discount_cents + delivery_fee_cents,
            updated_at = ?3
        WHERE id = ?1
        RETURNING *
        "#
    };

    sqlx::query_as::<_, Order>(sql)
        .bind(order_id)
        .bind(subtotal_cents)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Order", order_id))
}

pub(crate) async fn load_ticket(
    conn: &mut SqliteConnection,
    order: Order,
) -> DbResult<OrderTicket> {
    let items = sqlx::query_as::<_, OrderLineItem>(
        "SELECT * FROM order_items WHERE order_id = ?1 ORDER BY created_at, rowid",
    )
    .bind(&order.id)
    .fetch_all(&mut *conn)
    .await?;

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let variants = sqlx::query_as::<_, OrderLineVariant>(
            "SELECT * FROM order_item_variants WHERE order_item_id = ?1 ORDER BY rowid",
        )
        .bind(&item.id)
        .fetch_all(&mut *conn)
        .await?;

        let mut selections = Vec::with_capacity(variants.len());
        for variant in variants {
            let options = sqlx::query_as::<_, OrderLineOption>(
                "SELECT * FROM order_item_options WHERE order_item_variant_id = ?1 ORDER BY rowid",
            )
            .bind(&variant.id)
            .fetch_all(&mut *conn)
            .await?;
            selections.push(LineSelection { variant, options });
        }

        lines.push(TicketLine { item, selections });
    }

    Ok(OrderTicket { order, lines })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChannelPrintQueue;
    use crate::testing;
    use floor_core::{SelectedOption, SelectedVariant, StockRef};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_items_snapshots_prices() {
        let floor = testing::floor().await;
        let db = &floor.db;
        let burger = testing::tracked_product(db, "Burger", 1_000, 10).await;
        let extras = db.catalog().create_variant(&burger.id, "Extras").await.unwrap();
        let cheese = testing::option(db, &extras.id, "Cheese", 150, None).await;
        let command = testing::open_command(&floor).await;

        let ticket = db
            .orders()
            .add_items(
                &command.id,
                &[NewLineItem {
                    product_id: burger.id.clone(),
                    quantity: 2,
                    note: Some("no onions".into()),
                    variants: vec![SelectedVariant {
                        variant_id: extras.id.clone(),
                        options: vec![SelectedOption {
                            variant_option_id: cheese.id.clone(),
                            quantity: 2,
                        }],
                    }],
                }],
            )
            .await
            .unwrap();

        assert_eq!(ticket.order.status, OrderStatus::Preparing);
        assert_eq!(ticket.order.table_id.as_deref(), Some(floor.table.id.as_str()));
        let line = &ticket.lines[0].item;
        assert_eq!(line.unit_price_cents, 1_300);
        assert_eq!(line.original_price_cents, 1_000);
        assert_eq!(ticket.order.total_cents, 2_600);
        assert_eq!(ticket.lines[0].selections[0].options[0].option_name, "Cheese");

        // Later price changes don't touch the snapshot
        sqlx::query("UPDATE products SET price_cents = 5000, name = 'Mega' WHERE id = ?1")
            .bind(&burger.id)
            .execute(db.pool())
            .await
            .unwrap();
        let reloaded = db.orders().get_ticket(&ticket.order.id).await.unwrap();
        assert_eq!(reloaded.lines[0].item.product_name, "Burger");
        assert_eq!(reloaded.lines[0].item.unit_price_cents, 1_300);
    }

    #[tokio::test]
    async fn test_add_items_sends_kitchen_ticket() {
        let floor = testing::floor().await;
        let (queue, mut jobs) = ChannelPrintQueue::channel();
        let db = floor.db.clone().with_print_queue(Arc::new(queue));
        let soda = testing::tracked_product(&db, "Soda", 250, 10).await;
        let command = testing::open_command(&floor).await;

        let ticket = db
            .orders()
            .add_items(&command.id, &[NewLineItem::plain(&soda.id, 1)])
            .await
            .unwrap();

        let job = jobs.recv().await.unwrap();
        assert_eq!(job.order_id, ticket.order.id);
        assert_eq!(job.destination, "kitchen");
    }

    #[tokio::test]
    async fn test_add_items_rejections() {
        let floor = testing::floor().await;
        let db = &floor.db;
        let soda = testing::tracked_product(db, "Soda", 250, 10).await;
        let command = testing::open_command(&floor).await;
        let orders = db.orders();

        let err = orders.add_items(&command.id, &[]).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));

        let err = orders
            .add_items(&command.id, &[NewLineItem::plain(&soda.id, 0)])
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));

        let err = orders
            .add_items(&command.id, &[NewLineItem::plain(&soda.id, 1_000)])
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));

        let err = orders
            .add_items(&command.id, &[NewLineItem::plain("ghost", 1)])
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = orders
            .add_items("ghost", &[NewLineItem::plain(&soda.id, 1)])
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        db.commands().close(&command.id, None).await.unwrap();
        let err = orders
            .add_items(&command.id, &[NewLineItem::plain(&soda.id, 1)])
            .await
            .unwrap_err();
        assert!(err.is_invalid_state());

        // Nothing was written by the failed attempts
        assert!(orders.list_for_command(&command.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_decrements_on_delivery_and_restocks_on_cancel() {
        let floor = testing::floor().await;
        let db = &floor.db;
        let fries = testing::tracked_product(db, "Fries", 300, 5).await;
        let command = testing::open_command(&floor).await;
        let item = StockRef::Product(fries.id.clone());

        let ticket = db
            .orders()
            .add_items(&command.id, &[NewLineItem::plain(&fries.id, 2)])
            .await
            .unwrap();
        let order_id = ticket.order.id;

        db.orders().update_status(&order_id, OrderStatus::Ready).await.unwrap();
        assert_eq!(db.inventory().stock_level(&item).await.unwrap().stock_quantity, 5);

        db.orders().update_status(&order_id, OrderStatus::Delivered).await.unwrap();
        assert_eq!(db.inventory().stock_level(&item).await.unwrap().stock_quantity, 3);

        let err = db
            .orders()
            .update_status(&order_id, OrderStatus::Ready)
            .await
            .unwrap_err();
        assert!(err.is_invalid_state());

        db.orders().update_status(&order_id, OrderStatus::Canceled).await.unwrap();
        assert_eq!(db.inventory().stock_level(&item).await.unwrap().stock_quantity, 5);

        let err = db
            .orders()
            .update_status(&order_id, OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(db.inventory().stock_level(&item).await.unwrap().stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_cancel_before_delivery_keeps_stock() {
        let floor = testing::floor().await;
        let db = &floor.db;
        let fries = testing::tracked_product(db, "Fries", 300, 5).await;
        let command = testing::open_command(&floor).await;

        let ticket = db
            .orders()
            .add_items(&command.id, &[NewLineItem::plain(&fries.id, 2)])
            .await
            .unwrap();
        db.orders()
            .update_status(&ticket.order.id, OrderStatus::Canceled)
            .await
            .unwrap();

        let level = db
            .inventory()
            .stock_level(&StockRef::Product(fries.id.clone()))
            .await
            .unwrap();
        assert_eq!(level.stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_finalize_only_after_delivery_and_idempotent() {
        let floor = testing::floor().await;
        let db = &floor.db;
        let soda = testing::tracked_product(db, "Soda", 250, 10).await;
        let command = testing::open_command(&floor).await;

        let ticket = db
            .orders()
            .add_items(&command.id, &[NewLineItem::plain(&soda.id, 1)])
            .await
            .unwrap();

        let err = db.orders().finalize(&ticket.order.id).await.unwrap_err();
        assert!(err.is_invalid_state());

        db.orders()
            .update_status(&ticket.order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        let first = db.orders().finalize(&ticket.order.id).await.unwrap();
        let second = db.orders().finalize(&ticket.order.id).await.unwrap();
        assert_eq!(first.status, OrderStatus::Finalized);
        assert_eq!(second.status, OrderStatus::Finalized);
    }

    #[tokio::test]
    async fn test_remove_item_recomputes_and_cancels_empty_order() {
        let floor = testing::floor().await;
        let db = &floor.db;
        let soda = testing::tracked_product(db, "Soda", 250, 10).await;
        let fries = testing::tracked_product(db, "Fries", 300, 10).await;
        let command = testing::open_command(&floor).await;

        let ticket = db
            .orders()
            .add_items(
                &command.id,
                &[NewLineItem::plain(&soda.id, 2), NewLineItem::plain(&fries.id, 1)],
            )
            .await
            .unwrap();
        assert_eq!(ticket.order.total_cents, 800);

        db.orders()
            .update_status(&ticket.order.id, OrderStatus::Delivered)
            .await
            .unwrap();

        let order = db
            .orders()
            .remove_item(&command.id, &ticket.lines[0].item.id)
            .await
            .unwrap();
        assert_eq!(order.total_cents, 300);
        assert_eq!(order.status, OrderStatus::Delivered);

        let soda_level = db
            .inventory()
            .stock_level(&StockRef::Product(soda.id.clone()))
            .await
            .unwrap();
        assert_eq!(soda_level.stock_quantity, 10);

        let order = db
            .orders()
            .remove_item(&command.id, &ticket.lines[1].item.id)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);
        assert_eq!(order.total_cents, 0);

        let fries_level = db
            .inventory()
            .stock_level(&StockRef::Product(fries.id.clone()))
            .await
            .unwrap();
        assert_eq!(fries_level.stock_quantity, 10);

        let err = db
            .orders()
            .remove_item(&command.id, &ticket.lines[1].item.id)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
