//! # floor-core: Pure Business Logic for Floor POS
//!
//! This crate holds the rules of the restaurant floor as pure functions:
//! which order transitions are legal, how a ticket turns into stock
//! movements, how a bill is partitioned among payers. No database, no
//! network, no clock reads beyond what the caller passes in.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Floor POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Routing / API layer (external)                     │   │
//! │  │    open_table, add_item, close_table, split_payment, ...       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                floor-db (repositories, transactions)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ floor-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌───────────┐ ┌─────────┐ ┌───────┐ │   │
//! │  │   │  types  │ │  order  │ │ inventory │ │  split  │ │ money │ │   │
//! │  │   │ Table   │ │ status  │ │ kit plan  │ │ EQUAL   │ │ cents │ │   │
//! │  │   │ Command │ │ table   │ │ boundary  │ │ PCT     │ │       │ │   │
//! │  │   └─────────┘ └─────────┘ └───────────┘ └─────────┘ └───────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`money`] - Integer minor-unit money and even splitting
//! - [`types`] - Entities and status enums (Table, Command, Order, ...)
//! - [`order`] - Order state machine and its inventory trigger
//! - [`inventory`] - Kit expansion and the auto-pause boundary rule
//! - [`split`] - EQUAL / PERCENTAGE / CUSTOM payment allocation
//! - [`validation`] - Field limits for operator input
//! - [`error`] - Domain error taxonomy

pub mod error;
pub mod inventory;
pub mod money;
pub mod order;
pub mod split;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::{AvailabilityChange, StockDirection, StockMovement, StockRef};
pub use money::Money;
pub use order::{inventory_effect, OrderTransition};
pub use split::{CustomShare, PercentShare, Percentage, SplitPart, SplitPlan};
pub use types::*;

// =============================================================================
// Constants
// =============================================================================

/// Store used when no store is configured (single-location installs).
pub const DEFAULT_STORE_ID: &str = "default";

/// Maximum quantity on a single order line.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum seats on a single table.
pub const MAX_TABLE_CAPACITY: i64 = 100;

/// Number of entries returned by the activity report unless configured.
pub const DEFAULT_ACTIVITY_REPORT_LIMIT: i64 = 50;
