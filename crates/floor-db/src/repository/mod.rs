//! # Repository Module
//!
//! Floor repositories. Each public method is one transaction.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and what they own                       │
//! │                                                                         │
//! │  SaloonRepository     saloons, disable rules                           │
//! │  TableRepository      dining_tables, status/color, dashboard           │
//! │  CommandRepository    commands: open / close / cancel / move lines     │
//! │  OrderRepository      orders + line snapshots, status pipeline         │
//! │  InventoryRepository  stock ledger, availability links                 │
//! │  PaymentRepository    partial_payments (split batches)                 │
//! │  ActivityRepository   activity_log (append-only) + report              │
//! │  CatalogRepository    products, variants, options, kits, links         │
//! │  EmployeeRepository   employees + store access                         │
//! │                                                                         │
//! │  Cross-repository steps (e.g. close → deliver orders → decrement        │
//! │  stock → log activity) call crate-level helpers that take the open      │
//! │  transaction's connection, never the pool.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use uuid::Uuid;

pub mod activity;
pub mod catalog;
pub mod command;
pub mod employee;
pub mod inventory;
pub mod order;
pub mod payment;
pub mod saloon;
pub mod table;

/// Fresh primary key.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}
