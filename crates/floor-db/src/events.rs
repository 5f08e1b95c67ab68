//! # Notifications & Print Jobs
//!
//! Side channels fed after a floor transaction commits.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  repository op                                                         │
//! │     │  BEGIN                                                            │
//! │     │  ... writes ...            effects.event(..) / effects.print(..)  │
//! │     │  COMMIT                                                           │
//! │     ▼                                                                   │
//! │  hub.dispatch(effects)                                                  │
//! │     ├──► Notifier::notify(event)     fire-and-forget fan-out           │
//! │     └──► PrintQueue::enqueue(job)    failure is logged, not returned   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A rolled-back operation drops its pending effects, so subscribers never
//! see a state that was not committed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, trace, warn};

use floor_core::{CommandStatus, OrderStatus, SplitStrategy, TableStatus};

// =============================================================================
// Events
// =============================================================================

/// Entity family an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Table,
    Command,
    Order,
    PaymentSplit,
}

/// `{store_id, entity_type, entity_id, new_state}` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorEvent {
    pub store_id: String,
    #[serde(rename = "entity_type")]
    pub topic: Topic,
    pub entity_id: String,
    pub new_state: String,
}

impl FloorEvent {
    pub fn table(store_id: &str, table_id: &str, status: TableStatus) -> Self {
        Self::new(store_id, Topic::Table, table_id, status.as_str())
    }

    pub fn command(store_id: &str, command_id: &str, status: CommandStatus) -> Self {
        Self::new(store_id, Topic::Command, command_id, status.as_str())
    }

    pub fn order(store_id: &str, order_id: &str, status: OrderStatus) -> Self {
        Self::new(store_id, Topic::Order, order_id, status.as_str())
    }

    pub fn payment_split(store_id: &str, command_id: &str, strategy: SplitStrategy) -> Self {
        Self::new(store_id, Topic::PaymentSplit, command_id, strategy.as_str())
    }

    fn new(store_id: &str, topic: Topic, entity_id: &str, new_state: &str) -> Self {
        FloorEvent {
            store_id: store_id.to_string(),
            topic,
            entity_id: entity_id.to_string(),
            new_state: new_state.to_string(),
        }
    }
}

/// Real-time fan-out. Delivery is best-effort.
pub trait Notifier: Send + Sync + fmt::Debug {
    fn notify(&self, event: FloorEvent);
}

/// In-process fan-out over a `tokio::sync::broadcast` channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<FloorEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        BroadcastNotifier { tx }
    }

    /// New receiver; sees events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<FloorEvent> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, event: FloorEvent) {
        if self.tx.send(event).is_err() {
            trace!("No subscribers for floor event");
        }
    }
}

// =============================================================================
// Print Jobs
// =============================================================================

/// A ticket to print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    pub store_id: String,
    pub destination: String,
    pub order_id: String,
}

#[derive(Debug, Error)]
pub enum PrintQueueError {
    #[error("print queue is closed")]
    Closed,
}

/// Hand-off to the printer service. Never waits for the print itself.
pub trait PrintQueue: Send + Sync + fmt::Debug {
    fn enqueue(&self, job: PrintJob) -> Result<(), PrintQueueError>;
}

/// Forwards jobs to an in-process consumer over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelPrintQueue {
    tx: mpsc::UnboundedSender<PrintJob>,
}

impl ChannelPrintQueue {
    /// Returns the queue and the receiving end for the printer worker.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PrintJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelPrintQueue { tx }, rx)
    }
}

impl PrintQueue for ChannelPrintQueue {
    fn enqueue(&self, job: PrintJob) -> Result<(), PrintQueueError> {
        self.tx.send(job).map_err(|_| PrintQueueError::Closed)
    }
}

/// Default queue when no printer service is wired: logs the job.
#[derive(Debug, Clone, Default)]
pub struct LogPrintQueue;

impl PrintQueue for LogPrintQueue {
    fn enqueue(&self, job: PrintJob) -> Result<(), PrintQueueError> {
        info!(
            order_id = %job.order_id,
            destination = %job.destination,
            "Print job (no printer service attached)"
        );
        Ok(())
    }
}

// =============================================================================
// Pending Effects
// =============================================================================

/// Effects collected inside a transaction, released after commit.
#[derive(Debug, Default)]
#[must_use = "pending effects must be dispatched after commit"]
pub struct PendingEffects {
    events: Vec<FloorEvent>,
    jobs: Vec<PrintJob>,
}

impl PendingEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(&mut self, event: FloorEvent) {
        self.events.push(event);
    }

    pub fn print(&mut self, job: PrintJob) {
        self.jobs.push(job);
    }
}

/// The notifier and print queue a database handle dispatches to.
#[derive(Debug, Clone)]
pub struct EventHub {
    notifier: Arc<dyn Notifier>,
    printer: Arc<dyn PrintQueue>,
    kitchen_printer: String,
}

impl EventHub {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        printer: Arc<dyn PrintQueue>,
        kitchen_printer: impl Into<String>,
    ) -> Self {
        EventHub {
            notifier,
            printer,
            kitchen_printer: kitchen_printer.into(),
        }
    }

    /// Destination for tickets entering preparation.
    pub fn kitchen_printer(&self) -> &str {
        &self.kitchen_printer
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    pub fn printer(&self) -> Arc<dyn PrintQueue> {
        Arc::clone(&self.printer)
    }

    /// Kitchen ticket job for an order.
    pub fn kitchen_job(&self, store_id: &str, order_id: &str) -> PrintJob {
        PrintJob {
            store_id: store_id.to_string(),
            destination: self.kitchen_printer.clone(),
            order_id: order_id.to_string(),
        }
    }

    /// Releases committed effects. Never fails.
    pub fn dispatch(&self, effects: PendingEffects) {
        for event in effects.events {
            self.notifier.notify(event);
        }

        for job in effects.jobs {
            let order_id = job.order_id.clone();
            if let Err(e) = self.printer.enqueue(job) {
                warn!(order_id = %order_id, error = %e, "Failed to hand off print job");
            }
        }
    }
}
