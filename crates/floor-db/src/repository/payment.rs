//! # Payment Repository
//!
//! Partial-payment batches produced by splitting a command's bill.
//!
//! ```text
//! split(command, plan)
//!   │
//!   ├── total = Σ total_cents of the command's non-canceled orders
//!   ├── parts = plan.allocate(total)          (floor-core, pure)
//!   ├── previous batch deleted, one row per part inserted
//!   ├── commands.split_strategy tagged
//!   └── activity payment_split + notifier event
//! ```
//!
//! A batch whose part already carries a gateway transaction id is settled
//! money and is never replaced.

use chrono::Utc;
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::events::{EventHub, FloorEvent, PendingEffects};
use crate::repository::activity::{self, NewActivity};
use crate::repository::new_id;
use floor_core::{
    ActivityAction, Command, CommandStatus, CoreError, Money, OrderStatus, PartialPayment,
    SplitOutcome, SplitPlan, ValidationError,
};

/// Repository for partial payments.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
    hub: EventHub,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool, hub: EventHub) -> Self {
        PaymentRepository { pool, hub }
    }

    /// Splits a command's total into one partial payment per participant.
    ///
    /// ## Arguments
    /// * `command_id` - an ACTIVE or CLOSED command
    /// * `plan` - EQUAL, PERCENTAGE or CUSTOM participants
    ///
    /// ## Errors
    /// * `NotFound` - no such command
    /// * `InvalidState` - command canceled, or the current batch is
    ///   already partly paid through a gateway
    /// * `Validation` - empty participant list or out-of-range share
    pub async fn split(&self, command_id: &str, plan: SplitPlan) -> DbResult<SplitOutcome> {
        plan.validate()?;

        let mut tx = self.pool.begin().await?;
        let command = touch_command(&mut tx, command_id).await?;

        if command.status == CommandStatus::Canceled {
            return Err(
                CoreError::invalid_state("Command", command_id, command.status, "split payment")
                    .into(),
            );
        }

        let settled: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM partial_payments
            WHERE command_id = ?1 AND external_transaction_id IS NOT NULL
            "#,
        )
        .bind(command_id)
        .fetch_one(&mut *tx)
        .await?;
        if settled > 0 {
            return Err(CoreError::invalid_state(
                "Command",
                command_id,
                "partly paid",
                "replace its payment split",
            )
            .into());
        }

        let total_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_cents), 0) FROM orders
            WHERE command_id = ?1 AND status <> ?2
            "#,
        )
        .bind(command_id)
        .bind(OrderStatus::Canceled)
        .fetch_one(&mut *tx)
        .await?;

        let strategy = plan.strategy();
        let parts = plan.allocate(Money::from_cents(total_cents))?;

        sqlx::query("DELETE FROM partial_payments WHERE command_id = ?1")
            .bind(command_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        let mut payments = Vec::with_capacity(parts.len());

        for part in parts {
            let payment = PartialPayment {
                id: new_id(),
                store_id: command.store_id.clone(),
                command_id: command.id.clone(),
                amount_cents: part.amount.cents(),
                payer_label: part.payer,
                strategy,
                external_transaction_id: None,
                notes: None,
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO partial_payments (
                    id, store_id, command_id, amount_cents, payer_label,
                    strategy, external_transaction_id, notes, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL, ?7)
                "#,
            )
            .bind(&payment.id)
            .bind(&payment.store_id)
            .bind(&payment.command_id)
            .bind(payment.amount_cents)
            .bind(&payment.payer_label)
            .bind(payment.strategy)
            .bind(payment.created_at)
            .execute(&mut *tx)
            .await?;

            payments.push(payment);
        }

        sqlx::query("UPDATE commands SET split_strategy = ?2 WHERE id = ?1")
            .bind(command_id)
            .bind(strategy)
            .execute(&mut *tx)
            .await?;

        let allocated: i64 = payments.iter().map(|p| p.amount_cents).sum();
        activity::append(
            &mut tx,
            NewActivity::new(&command.store_id, ActivityAction::PaymentSplit)
                .maybe_table(command.table_id.as_deref())
                .command(&command.id)
                .revenue(total_cents)
                .details(json!({
                    "strategy": strategy,
                    "participants": payments.len(),
                    "allocated_cents": allocated,
                })),
        )
        .await?;

        tx.commit().await?;

        let mut effects = PendingEffects::new();
        effects.event(FloorEvent::payment_split(&command.store_id, &command.id, strategy));
        self.hub.dispatch(effects);

        info!(
            command_id = %command_id,
            %strategy,
            total_cents,
            allocated,
            parts = payments.len(),
            "Payment split"
        );

        Ok(SplitOutcome {
            command_id: command.id,
            strategy,
            total_cents,
            payments,
        })
    }

    /// Current batch for a command, in insertion order.
    pub async fn list_for_command(&self, command_id: &str) -> DbResult<Vec<PartialPayment>> {
        let payments = sqlx::query_as::<_, PartialPayment>(
            "SELECT * FROM partial_payments WHERE command_id = ?1 ORDER BY rowid",
        )
        .bind(command_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Attaches a gateway transaction id to one part. A part can only be
    /// settled once.
    pub async fn record_external_payment(
        &self,
        payment_id: &str,
        transaction_id: &str,
    ) -> DbResult<PartialPayment> {
        if transaction_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "transaction_id".into(),
            }
            .into());
        }

        let mut conn = self.pool.acquire().await?;

        let recorded = sqlx::query_as::<_, PartialPayment>(
            r#"
            UPDATE partial_payments SET external_transaction_id = ?2
            WHERE id = ?1 AND external_transaction_id IS NULL
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(transaction_id.trim())
        .fetch_optional(&mut *conn)
        .await?;

        match recorded {
            Some(payment) => {
                info!(payment_id = %payment_id, "External payment recorded");
                Ok(payment)
            }
            None => {
                let exists: Option<String> =
                    sqlx::query_scalar("SELECT id FROM partial_payments WHERE id = ?1")
                        .bind(payment_id)
                        .fetch_optional(&mut *conn)
                        .await?;
                match exists {
                    Some(_) => Err(CoreError::invalid_state(
                        "PartialPayment",
                        payment_id,
                        "paid",
                        "record another transaction",
                    )
                    .into()),
                    None => Err(DbError::not_found("PartialPayment", payment_id)),
                }
            }
        }
    }
}

async fn touch_command(conn: &mut SqliteConnection, id: &str) -> DbResult<Command> {
    sqlx::query_as::<_, Command>("UPDATE commands SET updated_at = ?2 WHERE id = ?1 RETURNING *")
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Command", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use floor_core::{CustomShare, NewLineItem, PercentShare, Percentage, SplitStrategy};

    /// Floor with one open command holding a single order worth `cents`.
    async fn command_worth(cents: i64) -> (testing::Floor, Command) {
        let floor = testing::floor().await;
        let item = testing::tracked_product(&floor.db, "Menu", cents, 10).await;
        let command = testing::open_command(&floor).await;
        floor
            .db
            .orders()
            .add_items(&command.id, &[NewLineItem::plain(&item.id, 1)])
            .await
            .unwrap();
        (floor, command)
    }

    #[tokio::test]
    async fn test_equal_split_sums_exactly() {
        let (floor, command) = command_worth(100).await;
        let mut events = floor.db.subscribe();

        let outcome = floor
            .db
            .payments()
            .split(&command.id, SplitPlan::equal_among(3))
            .await
            .unwrap();

        let amounts: Vec<i64> = outcome.payments.iter().map(|p| p.amount_cents).collect();
        assert_eq!(amounts, vec![34, 33, 33]);
        assert_eq!(outcome.total_cents, 100);
        assert_eq!(outcome.payments[0].payer_label, "Guest 1");

        let tagged = floor.db.commands().get(&command.id).await.unwrap();
        assert_eq!(tagged.split_strategy, Some(SplitStrategy::Equal));

        let event = events.recv().await.unwrap();
        assert_eq!(event.entity_id, command.id);

        let logged = floor.db.activity().for_command(&command.id).await.unwrap();
        assert!(logged.iter().any(|e| e.action == ActivityAction::PaymentSplit));
    }

    #[tokio::test]
    async fn test_resplit_replaces_batch() {
        let (floor, command) = command_worth(1000).await;
        let payments = floor.db.payments();

        payments.split(&command.id, SplitPlan::equal_among(4)).await.unwrap();
        let outcome = payments
            .split(
                &command.id,
                SplitPlan::Percentage {
                    shares: vec![
                        PercentShare {
                            payer: "Ana".into(),
                            percentage: Percentage::from_percent(60),
                        },
                        PercentShare {
                            payer: "Bo".into(),
                            percentage: Percentage::from_percent(30),
                        },
                    ],
                },
            )
            .await
            .unwrap();

        // Percentages are not forced to 100%
        let amounts: Vec<i64> = outcome.payments.iter().map(|p| p.amount_cents).collect();
        assert_eq!(amounts, vec![600, 300]);

        let stored = payments.list_for_command(&command.id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|p| p.strategy == SplitStrategy::Percentage));
    }

    #[tokio::test]
    async fn test_custom_split_after_close() {
        let (floor, command) = command_worth(500).await;
        floor.db.commands().close(&command.id, None).await.unwrap();

        let outcome = floor
            .db
            .payments()
            .split(
                &command.id,
                SplitPlan::Custom {
                    shares: vec![
                        CustomShare { payer: "Ana".into(), amount: Money::from_cents(450) },
                        CustomShare { payer: "Bo".into(), amount: Money::from_cents(100) },
                    ],
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.total_cents, 500);
        assert_eq!(outcome.payments[1].amount_cents, 100);
    }

    #[tokio::test]
    async fn test_split_rejected_on_canceled_or_settled() {
        let (floor, command) = command_worth(300).await;
        let payments = floor.db.payments();

        let outcome = payments.split(&command.id, SplitPlan::equal_among(2)).await.unwrap();
        let paid = payments
            .record_external_payment(&outcome.payments[0].id, "txn-42")
            .await
            .unwrap();
        assert_eq!(paid.external_transaction_id.as_deref(), Some("txn-42"));

        let err = payments
            .record_external_payment(&outcome.payments[0].id, "txn-43")
            .await
            .unwrap_err();
        assert!(err.is_invalid_state());
        assert!(payments.record_external_payment("ghost", "t").await.unwrap_err().is_not_found());

        let err = payments.split(&command.id, SplitPlan::equal_among(3)).await.unwrap_err();
        assert!(err.is_invalid_state());

        let other = floor
            .db
            .commands()
            .open(floor_core::OpenCommand {
                store_id: floor.store_id.clone(),
                ..Default::default()
            })
            .await
            .unwrap();
        floor.db.commands().cancel(&other.id).await.unwrap();
        let err = payments.split(&other.id, SplitPlan::equal_among(2)).await.unwrap_err();
        assert!(err.is_invalid_state());

        let err = payments.split("ghost", SplitPlan::equal_among(2)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_empty_participants_rejected() {
        let (floor, command) = command_worth(300).await;
        let err = floor
            .db
            .payments()
            .split(&command.id, SplitPlan::Equal { payers: vec![] })
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));
    }
}
