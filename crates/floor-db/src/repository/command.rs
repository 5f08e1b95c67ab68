//! # Command Repository
//!
//! Commands (tabs) and the table turnover they drive.
//!
//! ## Command Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Command Lifecycle                                  │
//! │                                                                         │
//! │  open()    table AVAILABLE → OCCUPIED (one conditional write),         │
//! │            command ACTIVE, activity table_opened                       │
//! │                                                                         │
//! │  while ACTIVE:                                                          │
//! │    orders().add_items() / remove_item()                                 │
//! │    transfer_items()  parent orders of the lines → target command        │
//! │    split()           same, into a newly opened command                  │
//! │    merge()           every order → target; source CLOSED, table freed   │
//! │                                                                         │
//! │  close()   open orders → delivered (stock decremented) + paid,         │
//! │            table AVAILABLE with revenue folded in,                     │
//! │            exactly one table_closed / command_closed entry             │
//! │                                                                         │
//! │  cancel()  open orders → canceled (delivered ones restocked),          │
//! │            table AVAILABLE, activity command_canceled                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Every operation starts with a write gated on the status it needs
//! (`... WHERE status = 'AVAILABLE'` for open, `... WHERE status =
//! 'ACTIVE'` otherwise). Of two racing operators exactly one write lands;
//! the other sees zero rows and reports `TableUnavailable` or
//! `InvalidState`.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::events::{EventHub, FloorEvent, PendingEffects};
use crate::repository::activity::{self, NewActivity};
use crate::repository::{new_id, order, table};
use floor_core::validation::{validate_customer_contact, validate_customer_name, validate_notes};
use floor_core::{
    ActivityAction, CloseSummary, Command, CommandStatus, CoreError, OpenCommand, Order,
    OrderStatus, TableStatus, ValidationError,
};

/// Repository for commands.
#[derive(Debug, Clone)]
pub struct CommandRepository {
    pool: SqlitePool,
    hub: EventHub,
}

impl CommandRepository {
    pub fn new(pool: SqlitePool, hub: EventHub) -> Self {
        CommandRepository { pool, hub }
    }

    /// Opens a command, occupying its table when one is given.
    ///
    /// ## Arguments
    /// * `input.table_id` - `None` for counter service
    /// * `input.guest_count` - seats taken, at most the table's capacity
    ///
    /// ## Errors
    /// * `NotFound` - table missing, deleted or in another store
    /// * `TableUnavailable` - the table is not AVAILABLE
    /// * `Validation` - field limits, guest count over capacity
    pub async fn open(&self, input: OpenCommand) -> DbResult<Command> {
        let mut tx = self.pool.begin().await?;
        let mut effects = PendingEffects::new();

        let command = open_in_tx(&mut tx, &input, &mut effects).await?;

        tx.commit().await?;
        self.hub.dispatch(effects);

        Ok(command)
    }

    pub async fn get(&self, id: &str) -> DbResult<Command> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// ACTIVE commands of a store, oldest first.
    pub async fn list_active(&self, store_id: &str) -> DbResult<Vec<Command>> {
        let commands = sqlx::query_as::<_, Command>(
            "SELECT * FROM commands WHERE store_id = ?1 AND status = ?2 ORDER BY opened_at, rowid",
        )
        .bind(store_id)
        .bind(CommandStatus::Active)
        .fetch_all(&self.pool)
        .await?;
        Ok(commands)
    }

    /// The ACTIVE command seated at a table, if any.
    pub async fn active_for_table(&self, table_id: &str) -> DbResult<Option<Command>> {
        let command = sqlx::query_as::<_, Command>(
            "SELECT * FROM commands WHERE table_id = ?1 AND status = ?2",
        )
        .bind(table_id)
        .bind(CommandStatus::Active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(command)
    }

    /// Settles and closes a command.
    ///
    /// ## What This Does
    /// 1. Gates ACTIVE → CLOSED (a second close sees `InvalidState`)
    /// 2. Drives every non-canceled order to delivered (stock decremented
    ///    once per order) and marks it paid
    /// 3. Frees the table and folds revenue and order count into it
    /// 4. Writes exactly one `table_closed` (or `command_closed`) entry
    ///
    /// ## Arguments
    /// * `table_id` - when given, must be the command's table (`NotFound`
    ///   otherwise)
    pub async fn close(&self, command_id: &str, table_id: Option<&str>) -> DbResult<CloseSummary> {
        let mut tx = self.pool.begin().await?;
        let command = lock_active(&mut tx, command_id, "close").await?;

        if let Some(expected) = table_id {
            if command.table_id.as_deref() != Some(expected) {
                return Err(DbError::not_found("Table", expected));
            }
        }

        let mut effects = PendingEffects::new();
        let mut revenue_cents = 0;
        let mut order_count = 0;

        for open in order::for_command(&mut tx, &command.id).await? {
            if open.status == OrderStatus::Canceled {
                continue;
            }

            let delivered = match open.status {
                OrderStatus::Delivered | OrderStatus::Finalized => open,
                _ => {
                    let to = OrderStatus::Delivered;
                    order::transition(&mut tx, &open, to, &self.hub, &mut effects).await?
                }
            };
            let paid = order::mark_paid(&mut tx, &delivered.id).await?;

            revenue_cents += paid.total_cents;
            order_count += 1;
        }

        let now = Utc::now();
        let closed = finish(&mut tx, &command.id, CommandStatus::Closed, now).await?;
        effects.event(FloorEvent::command(&closed.store_id, &closed.id, closed.status));

        let (action, occupied_since) = match &command.table_id {
            Some(table_id) => {
                let table =
                    table::release(&mut tx, table_id, revenue_cents, order_count, now).await?;
                effects.event(FloorEvent::table(&table.store_id, &table.id, table.status));
                (ActivityAction::TableClosed, table.opened_at.unwrap_or(command.opened_at))
            }
            None => (ActivityAction::CommandClosed, command.opened_at),
        };
        let duration_minutes = minutes_between(occupied_since, now);

        activity::append(
            &mut tx,
            NewActivity::new(&command.store_id, action)
                .maybe_table(command.table_id.as_deref())
                .command(&command.id)
                .employee(command.attendant_id.as_deref())
                .revenue(revenue_cents)
                .duration(duration_minutes)
                .details(json!({
                    "order_count": order_count,
                    "customer_name": command.customer_name,
                })),
        )
        .await?;

        tx.commit().await?;
        self.hub.dispatch(effects);

        info!(
            command_id = %command_id,
            revenue_cents,
            order_count,
            duration_minutes,
            "Command closed"
        );

        Ok(CloseSummary {
            command: closed,
            revenue_cents,
            order_count,
            duration_minutes,
        })
    }

    /// Cancels an ACTIVE command and frees its table.
    ///
    /// Open orders are canceled; delivered ones are restocked. No revenue
    /// is recorded.
    pub async fn cancel(&self, command_id: &str) -> DbResult<Command> {
        let mut tx = self.pool.begin().await?;
        let command = lock_active(&mut tx, command_id, "cancel").await?;
        let mut effects = PendingEffects::new();

        for open in order::for_command(&mut tx, &command.id).await? {
            if !open.status.is_terminal() {
                order::transition(&mut tx, &open, OrderStatus::Canceled, &self.hub, &mut effects)
                    .await?;
            }
        }

        let now = Utc::now();
        let canceled = finish(&mut tx, &command.id, CommandStatus::Canceled, now).await?;
        effects.event(FloorEvent::command(&canceled.store_id, &canceled.id, canceled.status));

        if let Some(table_id) = &command.table_id {
            let table = table::release(&mut tx, table_id, 0, 0, now).await?;
            effects.event(FloorEvent::table(&table.store_id, &table.id, table.status));
        }

        activity::append(
            &mut tx,
            NewActivity::new(&command.store_id, ActivityAction::CommandCanceled)
                .maybe_table(command.table_id.as_deref())
                .command(&command.id)
                .duration(minutes_between(command.opened_at, now)),
        )
        .await?;

        tx.commit().await?;
        self.hub.dispatch(effects);

        info!(command_id = %command_id, "Command canceled");
        Ok(canceled)
    }

    /// Moves the orders holding `line_item_ids` to another ACTIVE command.
    ///
    /// Whole orders move: a line never leaves its parent order.
    ///
    /// ## Returns
    /// The moved orders, re-pointed at the target command and table.
    pub async fn transfer_items(
        &self,
        source_id: &str,
        target_id: &str,
        line_item_ids: &[String],
    ) -> DbResult<Vec<Order>> {
        require_lines(line_item_ids)?;
        if source_id == target_id {
            return Err(CoreError::invalid_state(
                "Command",
                source_id,
                CommandStatus::Active,
                "transfer items to itself",
            )
            .into());
        }

        let mut tx = self.pool.begin().await?;
        let source = lock_active(&mut tx, source_id, "transfer items").await?;
        let target = lock_active(&mut tx, target_id, "receive items").await?;

        let order_ids = orders_of_lines(&mut tx, &source.id, line_item_ids).await?;
        let mut effects = PendingEffects::new();
        let moved = move_orders(&mut tx, &order_ids, &target, &mut effects).await?;

        activity::append(
            &mut tx,
            NewActivity::new(&source.store_id, ActivityAction::ItemsTransferred)
                .maybe_table(source.table_id.as_deref())
                .command(&source.id)
                .details(json!({
                    "target_command_id": target.id,
                    "target_table_id": target.table_id,
                    "order_ids": order_ids,
                    "line_item_ids": line_item_ids,
                })),
        )
        .await?;

        tx.commit().await?;
        self.hub.dispatch(effects);

        debug!(source = %source_id, target = %target_id, orders = moved.len(), "Items transferred");
        Ok(moved)
    }

    /// Opens a new command and moves the orders holding `line_item_ids`
    /// into it. The new command belongs to the source's store.
    pub async fn split(
        &self,
        source_id: &str,
        line_item_ids: &[String],
        mut input: OpenCommand,
    ) -> DbResult<Command> {
        require_lines(line_item_ids)?;

        let mut tx = self.pool.begin().await?;
        let source = lock_active(&mut tx, source_id, "split").await?;
        let mut effects = PendingEffects::new();

        input.store_id = source.store_id.clone();
        let created = open_in_tx(&mut tx, &input, &mut effects).await?;

        let order_ids = orders_of_lines(&mut tx, &source.id, line_item_ids).await?;
        move_orders(&mut tx, &order_ids, &created, &mut effects).await?;

        activity::append(
            &mut tx,
            NewActivity::new(&source.store_id, ActivityAction::CommandSplit)
                .maybe_table(source.table_id.as_deref())
                .command(&source.id)
                .details(json!({
                    "new_command_id": created.id,
                    "new_table_id": created.table_id,
                    "order_ids": order_ids,
                })),
        )
        .await?;

        tx.commit().await?;
        self.hub.dispatch(effects);

        info!(source = %source_id, new_command = %created.id, "Command split");
        Ok(created)
    }

    /// Folds `source` into `target`: every order moves, the source closes
    /// without revenue and its table (if different) is freed.
    pub async fn merge(&self, source_id: &str, target_id: &str) -> DbResult<Command> {
        if source_id == target_id {
            return Err(CoreError::invalid_state(
                "Command",
                source_id,
                CommandStatus::Active,
                "merge into itself",
            )
            .into());
        }

        let mut tx = self.pool.begin().await?;
        let source = lock_active(&mut tx, source_id, "merge").await?;
        let target = lock_active(&mut tx, target_id, "receive a merge").await?;
        let mut effects = PendingEffects::new();

        let order_ids: Vec<String> = order::for_command(&mut tx, &source.id)
            .await?
            .into_iter()
            .map(|o| o.id)
            .collect();
        move_orders(&mut tx, &order_ids, &target, &mut effects).await?;

        let now = Utc::now();
        let closed = finish(&mut tx, &source.id, CommandStatus::Closed, now).await?;
        effects.event(FloorEvent::command(&closed.store_id, &closed.id, closed.status));

        if let Some(table_id) = &source.table_id {
            if source.table_id != target.table_id {
                let table = table::release(&mut tx, table_id, 0, 0, now).await?;
                effects.event(FloorEvent::table(&table.store_id, &table.id, table.status));
            }
        }

        activity::append(
            &mut tx,
            NewActivity::new(&source.store_id, ActivityAction::CommandsMerged)
                .maybe_table(source.table_id.as_deref())
                .command(&source.id)
                .details(json!({
                    "target_command_id": target.id,
                    "target_table_id": target.table_id,
                    "order_ids": order_ids,
                })),
        )
        .await?;

        tx.commit().await?;
        self.hub.dispatch(effects);

        info!(source = %source_id, target = %target_id, "Commands merged");
        Ok(target)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Validates and inserts an ACTIVE command, occupying its table.
pub(crate) async fn open_in_tx(
    conn: &mut SqliteConnection,
    input: &OpenCommand,
    effects: &mut PendingEffects,
) -> DbResult<Command> {
    validate_customer_name(input.customer_name.as_deref())?;
    validate_customer_contact(input.customer_contact.as_deref())?;
    validate_notes(input.notes.as_deref())?;
    let guests = input.guest_count.unwrap_or(0);
    if guests < 0 {
        return Err(ValidationError::MustBePositive {
            field: "guest_count".into(),
        }
        .into());
    }

    let now = Utc::now();

    let table = match &input.table_id {
        Some(table_id) => Some(table::occupy(conn, table_id, &input.store_id, guests, now).await?),
        None => None,
    };

    let command = Command {
        id: new_id(),
        store_id: input.store_id.clone(),
        table_id: input.table_id.clone(),
        customer_name: input.customer_name.clone(),
        customer_contact: input.customer_contact.clone(),
        attendant_id: input.attendant_id.clone(),
        status: CommandStatus::Active,
        notes: input.notes.clone(),
        split_strategy: None,
        opened_at: now,
        closed_at: None,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO commands (
            id, store_id, table_id, customer_name, customer_contact,
            attendant_id, status, notes, opened_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&command.id)
    .bind(&command.store_id)
    .bind(&command.table_id)
    .bind(&command.customer_name)
    .bind(&command.customer_contact)
    .bind(&command.attendant_id)
    .bind(command.status)
    .bind(&command.notes)
    .bind(command.opened_at)
    .bind(command.updated_at)
    .execute(&mut *conn)
    .await?;

    effects.event(FloorEvent::command(&command.store_id, &command.id, command.status));

    if let Some(table) = table {
        activity::append(
            conn,
            NewActivity::new(&table.store_id, ActivityAction::TableOpened)
                .table(&table.id)
                .command(&command.id)
                .employee(command.attendant_id.as_deref())
                .details(json!({
                    "guest_count": guests,
                    "customer_name": command.customer_name,
                })),
        )
        .await?;
        effects.event(FloorEvent::table(&table.store_id, &table.id, TableStatus::Occupied));

        info!(command_id = %command.id, table_id = %table.id, guests, "Table opened");
    } else {
        info!(command_id = %command.id, "Counter command opened");
    }

    Ok(command)
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Command> {
    sqlx::query_as::<_, Command>("SELECT * FROM commands WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Command", id))
}

/// Takes the write lock on an ACTIVE command.
///
/// ## Errors
/// * `NotFound` - no such command
/// * `InvalidState` - command exists but is CLOSED or CANCELED
pub(crate) async fn lock_active(
    conn: &mut SqliteConnection,
    id: &str,
    operation: &str,
) -> DbResult<Command> {
    let locked = sqlx::query_as::<_, Command>(
        "UPDATE commands SET updated_at = ?3 WHERE id = ?1 AND status = ?2 RETURNING *",
    )
    .bind(id)
    .bind(CommandStatus::Active)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    match locked {
        Some(command) => Ok(command),
        None => {
            let current = fetch(conn, id).await?;
            Err(CoreError::invalid_state("Command", id, current.status, operation).into())
        }
    }
}

async fn finish(
    conn: &mut SqliteConnection,
    id: &str,
    status: CommandStatus,
    now: DateTime<Utc>,
) -> DbResult<Command> {
    sqlx::query_as::<_, Command>(
        r#"
        UPDATE commands SET status = ?2, closed_at = ?3, updated_at = ?3
        WHERE id = ?1 AND status = ?4
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(now)
    .bind(CommandStatus::Active)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Command", id))
}

fn require_lines(line_item_ids: &[String]) -> DbResult<()> {
    if line_item_ids.is_empty() {
        return Err(ValidationError::Empty {
            field: "line_item_ids".into(),
        }
        .into());
    }
    Ok(())
}

/// Distinct parent orders of the given lines, all of which must belong to
/// `command_id`.
async fn orders_of_lines(
    conn: &mut SqliteConnection,
    command_id: &str,
    line_item_ids: &[String],
) -> DbResult<Vec<String>> {
    let mut order_ids: Vec<String> = Vec::new();

    for line_id in line_item_ids {
        let order_id: String = sqlx::query_scalar(
            r#"
            SELECT o.id FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE oi.id = ?1 AND o.command_id = ?2
            "#,
        )
        .bind(line_id)
        .bind(command_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("OrderLineItem", line_id))?;

        if !order_ids.contains(&order_id) {
            order_ids.push(order_id);
        }
    }

    Ok(order_ids)
}

async fn move_orders(
    conn: &mut SqliteConnection,
    order_ids: &[String],
    target: &Command,
    effects: &mut PendingEffects,
) -> DbResult<Vec<Order>> {
    let now = Utc::now();
    let mut moved = Vec::with_capacity(order_ids.len());

    for order_id in order_ids {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET command_id = ?2, table_id = ?3, updated_at = ?4
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(&target.id)
        .bind(&target.table_id)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Order", order_id))?;

        effects.event(FloorEvent::order(&order.store_id, &order.id, order.status));
        moved.push(order);
    }

    Ok(moved)
}

fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_minutes().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use floor_core::{NewLineItem, StockRef};

    #[tokio::test]
    async fn test_open_occupies_table() {
        let floor = testing::floor().await;
        let mut events = floor.db.subscribe();

        let command = floor
            .db
            .commands()
            .open(OpenCommand {
                store_id: floor.store_id.clone(),
                table_id: Some(floor.table.id.clone()),
                customer_name: Some("Alice".into()),
                guest_count: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(command.status, CommandStatus::Active);

        let table = floor.db.tables().get(&floor.table.id).await.unwrap();
        assert_eq!(table.status, TableStatus::Occupied);
        assert_eq!(table.status_color, "#dc3545");
        assert_eq!(table.current_capacity, 3);
        assert!(table.opened_at.is_some());

        let active = floor.db.commands().active_for_table(&floor.table.id).await.unwrap();
        assert_eq!(active.map(|c| c.id), Some(command.id.clone()));

        let first = events.recv().await.unwrap();
        assert_eq!(first.entity_id, command.id);
        let second = events.recv().await.unwrap();
        assert_eq!(second.entity_id, floor.table.id);
        assert_eq!(second.new_state, "OCCUPIED");

        let history = floor.db.activity().for_table(&floor.table.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, ActivityAction::TableOpened);
    }

    #[tokio::test]
    async fn test_open_rejections() {
        let floor = testing::floor().await;
        let commands = floor.db.commands();
        let seat = |guests| OpenCommand {
            store_id: floor.store_id.clone(),
            table_id: Some(floor.table.id.clone()),
            guest_count: Some(guests),
            ..Default::default()
        };

        let err = commands.open(seat(5)).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));
        // Rolled back: the table is still free
        let table = floor.db.tables().get(&floor.table.id).await.unwrap();
        assert_eq!(table.status, TableStatus::Available);

        commands.open(seat(2)).await.unwrap();
        let err = commands.open(seat(2)).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::TableUnavailable { status: TableStatus::Occupied, .. })
        ));

        let err = commands
            .open(OpenCommand {
                store_id: floor.store_id.clone(),
                table_id: Some("ghost".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = commands
            .open(OpenCommand {
                store_id: floor.store_id.clone(),
                customer_name: Some("x".repeat(101)),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_open_on_reserved_table() {
        let floor = testing::floor().await;
        floor
            .db
            .tables()
            .update(
                &floor.table.id,
                floor_core::TableUpdate {
                    status: Some(TableStatus::Reserved),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = testing::try_open_command(&floor).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::TableUnavailable { status: TableStatus::Reserved, .. })
        ));
    }

    #[tokio::test]
    async fn test_close_settles_orders_and_frees_table() {
        let floor = testing::floor().await;
        let db = &floor.db;
        let fries = testing::tracked_product(db, "Fries", 300, 10).await;
        let soda = testing::tracked_product(db, "Soda", 200, 10).await;
        let command = testing::open_command(&floor).await;

        let first = db
            .orders()
            .add_items(&command.id, &[NewLineItem::plain(&fries.id, 2)])
            .await
            .unwrap();
        db.orders()
            .update_status(&first.order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        db.orders()
            .add_items(&command.id, &[NewLineItem::plain(&soda.id, 1)])
            .await
            .unwrap();
        let dropped = db
            .orders()
            .add_items(&command.id, &[NewLineItem::plain(&soda.id, 3)])
            .await
            .unwrap();
        db.orders()
            .update_status(&dropped.order.id, OrderStatus::Canceled)
            .await
            .unwrap();

        let summary = db
            .commands()
            .close(&command.id, Some(&floor.table.id))
            .await
            .unwrap();
        assert_eq!(summary.command.status, CommandStatus::Closed);
        assert_eq!(summary.revenue_cents, 800);
        assert_eq!(summary.order_count, 2);
        assert!(summary.duration_minutes >= 0);

        // Decremented exactly once per delivered order
        let fries_ref = StockRef::Product(fries.id.clone());
        let soda_ref = StockRef::Product(soda.id.clone());
        let fries_level = db.inventory().stock_level(&fries_ref).await.unwrap();
        let soda_level = db.inventory().stock_level(&soda_ref).await.unwrap();
        assert_eq!(fries_level.stock_quantity, 8);
        assert_eq!(soda_level.stock_quantity, 9);

        let table = db.tables().get(&floor.table.id).await.unwrap();
        assert_eq!(table.status, TableStatus::Available);
        assert_eq!(table.current_capacity, 0);
        assert_eq!(table.revenue_today_cents, 800);
        assert_eq!(table.orders_today, 2);
        assert!(table.closed_at.is_some());

        for order in db.orders().list_for_command(&command.id).await.unwrap() {
            if order.status != OrderStatus::Canceled {
                assert_eq!(order.status, OrderStatus::Delivered);
                assert_eq!(order.payment_status, floor_core::PaymentStatus::Paid);
            }
        }

        let closes: Vec<_> = db
            .activity()
            .for_table(&floor.table.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.action == ActivityAction::TableClosed)
            .collect();
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].revenue_cents, Some(800));

        // Second close loses
        let err = db.commands().close(&command.id, None).await.unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[tokio::test]
    async fn test_close_with_wrong_table() {
        let floor = testing::floor().await;
        let command = testing::open_command(&floor).await;

        let err = floor
            .db
            .commands()
            .close(&command.id, Some("other-table"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let still = floor.db.commands().get(&command.id).await.unwrap();
        assert_eq!(still.status, CommandStatus::Active);
    }

    #[tokio::test]
    async fn test_close_counter_command() {
        let db = testing::db().await;
        let command = db
            .commands()
            .open(OpenCommand {
                store_id: "s".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let summary = db.commands().close(&command.id, None).await.unwrap();
        assert_eq!(summary.revenue_cents, 0);

        let entries = db.activity().for_command(&command.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ActivityAction::CommandClosed);
    }

    #[tokio::test]
    async fn test_cancel_restocks_and_frees_table() {
        let floor = testing::floor().await;
        let db = &floor.db;
        let fries = testing::tracked_product(db, "Fries", 300, 4).await;
        let command = testing::open_command(&floor).await;

        let ticket = db
            .orders()
            .add_items(&command.id, &[NewLineItem::plain(&fries.id, 3)])
            .await
            .unwrap();
        db.orders()
            .update_status(&ticket.order.id, OrderStatus::Delivered)
            .await
            .unwrap();

        let canceled = db.commands().cancel(&command.id).await.unwrap();
        assert_eq!(canceled.status, CommandStatus::Canceled);

        let level = db.inventory().stock_level(&StockRef::Product(fries.id.clone())).await.unwrap();
        assert_eq!(level.stock_quantity, 4);

        let order = db.orders().get(&ticket.order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);

        let table = db.tables().get(&floor.table.id).await.unwrap();
        assert_eq!(table.status, TableStatus::Available);
        assert_eq!(table.revenue_today_cents, 0);

        assert!(db.commands().cancel(&command.id).await.unwrap_err().is_invalid_state());
    }

    #[tokio::test]
    async fn test_transfer_moves_whole_orders() {
        let floor = testing::floor().await;
        let db = &floor.db;
        let second_table = testing::extra_table(&floor, "T2").await;
        let soda = testing::tracked_product(db, "Soda", 200, 10).await;
        let fries = testing::tracked_product(db, "Fries", 300, 10).await;

        let source = testing::open_command(&floor).await;
        let target = db
            .commands()
            .open(OpenCommand {
                store_id: floor.store_id.clone(),
                table_id: Some(second_table.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();

        let ticket = db
            .orders()
            .add_items(
                &source.id,
                &[NewLineItem::plain(&soda.id, 1), NewLineItem::plain(&fries.id, 1)],
            )
            .await
            .unwrap();

        let moved = db
            .commands()
            .transfer_items(&source.id, &target.id, &[ticket.lines[0].item.id.clone()])
            .await
            .unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].command_id.as_deref(), Some(target.id.as_str()));
        assert_eq!(moved[0].table_id.as_deref(), Some(second_table.id.as_str()));

        // Both lines went with their parent order
        let reloaded = db.orders().get_ticket(&ticket.order.id).await.unwrap();
        assert_eq!(reloaded.lines.len(), 2);
        assert!(db.orders().list_for_command(&source.id).await.unwrap().is_empty());

        let err = db
            .commands()
            .transfer_items(&target.id, &target.id, &[ticket.lines[0].item.id.clone()])
            .await
            .unwrap_err();
        assert!(err.is_invalid_state());

        let err = db
            .commands()
            .transfer_items(&source.id, &target.id, &["ghost".to_string()])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_split_into_new_command() {
        let floor = testing::floor().await;
        let db = &floor.db;
        let soda = testing::tracked_product(db, "Soda", 200, 10).await;
        let source = testing::open_command(&floor).await;

        let ticket = db
            .orders()
            .add_items(&source.id, &[NewLineItem::plain(&soda.id, 2)])
            .await
            .unwrap();

        let created = db
            .commands()
            .split(
                &source.id,
                &[ticket.lines[0].item.id.clone()],
                OpenCommand {
                    store_id: "ignored".into(),
                    customer_name: Some("Bob".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.store_id, floor.store_id);
        assert!(created.table_id.is_none());

        let moved = db.orders().list_for_command(&created.id).await.unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].id, ticket.order.id);
    }

    #[tokio::test]
    async fn test_merge_closes_source_and_frees_its_table() {
        let floor = testing::floor().await;
        let db = &floor.db;
        let second_table = testing::extra_table(&floor, "T2").await;
        let soda = testing::tracked_product(db, "Soda", 200, 10).await;

        let source = testing::open_command(&floor).await;
        let target = db
            .commands()
            .open(OpenCommand {
                store_id: floor.store_id.clone(),
                table_id: Some(second_table.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        db.orders()
            .add_items(&source.id, &[NewLineItem::plain(&soda.id, 2)])
            .await
            .unwrap();

        db.commands().merge(&source.id, &target.id).await.unwrap();

        let source = db.commands().get(&source.id).await.unwrap();
        assert_eq!(source.status, CommandStatus::Closed);
        assert_eq!(db.orders().list_for_command(&target.id).await.unwrap().len(), 1);

        let freed = db.tables().get(&floor.table.id).await.unwrap();
        assert_eq!(freed.status, TableStatus::Available);
        assert_eq!(freed.revenue_today_cents, 0);

        let summary = db.commands().close(&target.id, None).await.unwrap();
        assert_eq!(summary.revenue_cents, 400);

        let err = db.commands().merge(&target.id, &target.id).await.unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[test]
    fn test_minutes_between_never_negative() {
        let now = Utc::now();
        assert_eq!(minutes_between(now, now - chrono::Duration::minutes(5)), 0);
        assert_eq!(minutes_between(now - chrono::Duration::minutes(90), now), 90);
    }

    // ===== Floor scenarios =====

    #[tokio::test]
    async fn test_scenario_combo_kit_through_close() {
        let db = testing::db().await;
        let store = "store-1";

        let main = db
            .saloons()
            .create(store, floor_core::NewSaloon { name: "Main".into(), display_order: 0 })
            .await
            .unwrap();
        let t1 = db
            .tables()
            .create(
                store,
                floor_core::NewTable {
                    saloon_id: main.id.clone(),
                    name: "T1".into(),
                    max_capacity: 4,
                    location_description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(t1.status, TableStatus::Available);

        let fries = testing::tracked_product(&db, "Fries", 300, 10).await;
        let combo = db
            .catalog()
            .create_product(
                store,
                floor_core::NewProduct {
                    name: "Combo".into(),
                    kind: floor_core::ProductKind::Kit,
                    price_cents: 1_200,
                    tracks_inventory: false,
                    stock_quantity: 0,
                },
            )
            .await
            .unwrap();
        db.catalog().add_kit_component(&combo.id, &fries.id, 2).await.unwrap();

        let c1 = db
            .commands()
            .open(OpenCommand {
                store_id: store.into(),
                table_id: Some(t1.id.clone()),
                customer_name: Some("Alice".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(c1.status, CommandStatus::Active);
        assert_eq!(db.tables().get(&t1.id).await.unwrap().status, TableStatus::Occupied);

        let ticket = db
            .orders()
            .add_items(&c1.id, &[NewLineItem::plain(&combo.id, 1)])
            .await
            .unwrap();
        db.orders()
            .update_status(&ticket.order.id, OrderStatus::Delivered)
            .await
            .unwrap();

        let fries_ref = StockRef::Product(fries.id.clone());
        assert_eq!(db.inventory().stock_level(&fries_ref).await.unwrap().stock_quantity, 8);
        let combo_ref = StockRef::Product(combo.id.clone());
        let combo_level = db.inventory().stock_level(&combo_ref).await.unwrap();
        assert_eq!(combo_level.stock_quantity, 0);

        db.commands().close(&c1.id, Some(&t1.id)).await.unwrap();

        assert_eq!(db.tables().get(&t1.id).await.unwrap().status, TableStatus::Available);
        assert_eq!(db.inventory().stock_level(&fries_ref).await.unwrap().stock_quantity, 8);

        let closes = db
            .activity()
            .for_table(&t1.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.action == ActivityAction::TableClosed)
            .count();
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn test_scenario_last_fries_pause_and_reactivate() {
        let db = testing::db().await;
        let fries = testing::tracked_product(&db, "Fries", 300, 1).await;
        let fries_ref = StockRef::Product(fries.id.clone());
        db.catalog()
            .add_availability_link("store-1", "delivery", &fries_ref, true)
            .await
            .unwrap();

        let order_id = testing::order_with_lines(&db, &[(fries.id.as_str(), 1)]).await;

        db.orders().update_status(&order_id, OrderStatus::Delivered).await.unwrap();
        let level = db.inventory().stock_level(&fries_ref).await.unwrap();
        assert_eq!(level.stock_quantity, 0);
        assert!(!level.is_available);
        let links = db.catalog().links_for(&fries_ref).await.unwrap();
        assert!(links.iter().all(|l| !l.is_available));

        db.orders().update_status(&order_id, OrderStatus::Canceled).await.unwrap();
        let level = db.inventory().stock_level(&fries_ref).await.unwrap();
        assert_eq!(level.stock_quantity, 1);
        assert!(level.is_available);
        let links = db.catalog().links_for(&fries_ref).await.unwrap();
        assert!(links.iter().all(|l| l.is_available));
    }

    // ===== Concurrency =====

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_open_has_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let floor = testing::file_floor(&dir).await;

        let mut set = tokio::task::JoinSet::new();
        for _ in 0..6 {
            let commands = floor.db.commands();
            let input = OpenCommand {
                store_id: floor.store_id.clone(),
                table_id: Some(floor.table.id.clone()),
                guest_count: Some(1),
                ..Default::default()
            };
            set.spawn(async move { commands.open(input).await });
        }

        let mut opened = 0;
        let mut unavailable = 0;
        while let Some(joined) = set.join_next().await {
            match joined.unwrap() {
                Ok(_) => opened += 1,
                Err(err) => {
                    assert!(
                        matches!(err.as_domain(), Some(CoreError::TableUnavailable { .. })),
                        "unexpected error: {err}"
                    );
                    unavailable += 1;
                }
            }
        }
        assert_eq!(opened, 1);
        assert_eq!(unavailable, 5);

        let active = floor.db.commands().list_active(&floor.store_id).await.unwrap();
        assert_eq!(active.len(), 1);
        floor.db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_close_settles_once() {
        let dir = tempfile::tempdir().unwrap();
        let floor = testing::file_floor(&dir).await;
        let db = &floor.db;
        let fries = testing::tracked_product(db, "Fries", 300, 10).await;
        let command = testing::open_command(&floor).await;
        db.orders()
            .add_items(&command.id, &[NewLineItem::plain(&fries.id, 2)])
            .await
            .unwrap();

        let mut set = tokio::task::JoinSet::new();
        for _ in 0..4 {
            let commands = db.commands();
            let id = command.id.clone();
            set.spawn(async move { commands.close(&id, None).await });
        }

        let mut closed = 0;
        while let Some(joined) = set.join_next().await {
            match joined.unwrap() {
                Ok(_) => closed += 1,
                Err(err) => assert!(err.is_invalid_state(), "unexpected error: {err}"),
            }
        }
        assert_eq!(closed, 1);

        let level = db.inventory().stock_level(&StockRef::Product(fries.id.clone())).await.unwrap();
        assert_eq!(level.stock_quantity, 8);
        let table = db.tables().get(&floor.table.id).await.unwrap();
        assert_eq!(table.revenue_today_cents, 600);
        db.close().await;
    }
}
