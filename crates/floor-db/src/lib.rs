//! # floor-db: Storage and Orchestration for Floor POS
//!
//! SQLite persistence for the restaurant floor, and the transaction
//! boundary of every floor operation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Floor POS Data Flow                              │
//! │                                                                         │
//! │  Routing layer (open table, add items, close, split payment, ...)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     floor-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ Saloon, Table  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Command, Order │    │ 001_initial  │  │   │
//! │  │   │ EventHub      │    │ Inventory, ... │    │ _schema.sql  │  │   │
//! │  │   └───────┬───────┘    └────────────────┘    └──────────────┘  │   │
//! │  │           │ after commit                                        │   │
//! │  │           ▼                                                     │   │
//! │  │   Notifier (broadcast)     PrintQueue (kitchen tickets)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, [`Database`] handle and repository accessors
//! - [`config`] - `floor.toml` + environment configuration
//! - [`events`] - Notifier and print-job hand-off
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per floor component
//! - [`telemetry`] - Tracing subscriber setup for binaries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use floor_db::{Database, DbConfig};
//! use floor_core::OpenCommand;
//!
//! let db = Database::new(DbConfig::new("floor.db")).await?;
//!
//! let command = db.commands().open(OpenCommand {
//!     store_id: "store-1".into(),
//!     table_id: Some(table_id),
//!     guest_count: Some(2),
//!     ..Default::default()
//! }).await?;
//!
//! let summary = db.commands().close(&command.id, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod events;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod telemetry;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, FloorConfig};
pub use error::{DbError, DbResult};
pub use events::{
    BroadcastNotifier, ChannelPrintQueue, FloorEvent, LogPrintQueue, Notifier, PrintJob,
    PrintQueue, PrintQueueError, Topic,
};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::activity::{ActivityRepository, NewActivity};
pub use repository::catalog::CatalogRepository;
pub use repository::command::CommandRepository;
pub use repository::employee::EmployeeRepository;
pub use repository::inventory::{InventoryRepository, StockLevel};
pub use repository::order::OrderRepository;
pub use repository::payment::PaymentRepository;
pub use repository::saloon::SaloonRepository;
pub use repository::table::TableRepository;
