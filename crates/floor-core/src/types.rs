//! # Domain Types
//!
//! Entities, status enums, operation inputs and read models of the floor.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Floor Entities                                  │
//! │                                                                         │
//! │  Saloon 1───* Table 1───0..1 Command(ACTIVE) 1───* Order 1───* Line    │
//! │                 │                   │                           │       │
//! │                 │                   └──* PartialPayment         │       │
//! │                 │                                          Selection   │
//! │                 └──* ActivityLogEntry (append-only)            │       │
//! │                                                              Option    │
//! │                                                                         │
//! │  Catalog (read-mostly):                                                 │
//! │  Product ──* Variant ──* VariantOption      Product(KIT) ──* KitComp.  │
//! │  AvailabilityLink ──► Product | VariantOption                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All money is stored as `*_cents: i64`. Identifiers are UUID v4 strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Table Status
// =============================================================================

/// Occupancy status of a physical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
    Maintenance,
    Cleaning,
}

impl TableStatus {
    /// All statuses, in dashboard display order.
    pub const ALL: [TableStatus; 5] = [
        TableStatus::Available,
        TableStatus::Occupied,
        TableStatus::Reserved,
        TableStatus::Maintenance,
        TableStatus::Cleaning,
    ];

    /// Hex color shown on the floor plan.
    ///
    /// The color is a pure function of the status; it is rewritten on every
    /// status write and never accepted from a caller.
    pub const fn color(&self) -> &'static str {
        match self {
            TableStatus::Available => "#28a745",
            TableStatus::Occupied => "#dc3545",
            TableStatus::Reserved => "#ffc107",
            TableStatus::Maintenance => "#6c757d",
            TableStatus::Cleaning => "#17a2b8",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Available => "AVAILABLE",
            TableStatus::Occupied => "OCCUPIED",
            TableStatus::Reserved => "RESERVED",
            TableStatus::Maintenance => "MAINTENANCE",
            TableStatus::Cleaning => "CLEANING",
        }
    }
}

impl Default for TableStatus {
    fn default() -> Self {
        TableStatus::Available
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Command Status
// =============================================================================

/// Lifecycle of a tab. `Closed` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Active,
    Closed,
    Canceled,
}

impl CommandStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Active => "ACTIVE",
            CommandStatus::Closed => "CLOSED",
            CommandStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Status of an order ticket. See [`crate::order`] for the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    OnRoute,
    Delivered,
    /// Reached only through housekeeping after delivery.
    Finalized,
    Canceled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OnRoute => "on_route",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Finalized => "finalized",
            OrderStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

// =============================================================================
// Catalog Enums
// =============================================================================

/// How a product holds stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductKind {
    /// Holds its own stock; selected options may hold stock too.
    Individual,
    /// Consumes stock from its components, never its own.
    Kit,
}

/// Payment split strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitStrategy {
    Equal,
    Percentage,
    Custom,
}

impl SplitStrategy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SplitStrategy::Equal => "EQUAL",
            SplitStrategy::Percentage => "PERCENTAGE",
            SplitStrategy::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Activity Action
// =============================================================================

/// Kind of entry in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    TableOpened,
    TableClosed,
    /// Close of a command with no table (counter service).
    CommandClosed,
    CommandCanceled,
    TableStatusChanged,
    EmployeeAssigned,
    EmployeeUnassigned,
    ItemsTransferred,
    CommandSplit,
    CommandsMerged,
    PaymentSplit,
}

impl ActivityAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::TableOpened => "table_opened",
            ActivityAction::TableClosed => "table_closed",
            ActivityAction::CommandClosed => "command_closed",
            ActivityAction::CommandCanceled => "command_canceled",
            ActivityAction::TableStatusChanged => "table_status_changed",
            ActivityAction::EmployeeAssigned => "employee_assigned",
            ActivityAction::EmployeeUnassigned => "employee_unassigned",
            ActivityAction::ItemsTransferred => "items_transferred",
            ActivityAction::CommandSplit => "command_split",
            ActivityAction::CommandsMerged => "commands_merged",
            ActivityAction::PaymentSplit => "payment_split",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Saloon & Table
// =============================================================================

/// A named seating area.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Saloon {
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub display_order: i64,
    /// False once soft-disabled.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A physical table on the floor.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Table {
    pub id: String,
    pub store_id: String,
    pub saloon_id: String,
    /// Unique among the live tables of its saloon.
    pub name: String,
    pub status: TableStatus,
    /// Always `status.color()`.
    pub status_color: String,
    pub max_capacity: i64,
    /// Guests currently seated; zero whenever the table is not occupied.
    pub current_capacity: i64,
    pub location_description: Option<String>,
    /// Weak reference; the employee is owned by the access directory.
    pub assigned_employee_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub opened_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub revenue_today_cents: i64,
    pub orders_today: i64,
    pub is_deleted: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Table {
    #[inline]
    pub fn revenue_today(&self) -> Money {
        Money::from_cents(self.revenue_today_cents)
    }
}

// =============================================================================
// Command
// =============================================================================

/// A tab: a running bill bound to zero or one table.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Command {
    pub id: String,
    pub store_id: String,
    /// None for counter service.
    pub table_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub attendant_id: Option<String>,
    pub status: CommandStatus,
    pub notes: Option<String>,
    /// Strategy of the last payment split, if any.
    pub split_strategy: Option<SplitStrategy>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Order & Line Items
// =============================================================================

/// One ticket of items rung into a command.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub store_id: String,
    pub command_id: Option<String>,
    /// Copy of the command's table, moved along with the order.
    pub table_id: Option<String>,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub delivery_fee_cents: i64,
    pub total_cents: i64,
    pub payment_status: PaymentStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A product line inside an order.
/// Prices are frozen at the moment the line is created.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLineItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of order (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Product price plus selected option prices (frozen).
    pub unit_price_cents: i64,
    /// Catalog list price of the product alone (frozen).
    pub original_price_cents: i64,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderLineItem {
    /// unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// A customization group chosen on a line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLineVariant {
    pub id: String,
    pub order_item_id: String,
    pub variant_id: String,
    pub variant_name: String,
}

/// An option chosen inside a customization group.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLineOption {
    pub id: String,
    pub order_item_variant_id: String,
    pub variant_option_id: String,
    pub option_name: String,
    pub quantity: i64,
    /// Option price at time of order (frozen).
    pub unit_price_cents: i64,
}

// =============================================================================
// Catalog
// =============================================================================

/// A sellable product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub kind: ProductKind,
    pub price_cents: i64,
    pub tracks_inventory: bool,
    pub stock_quantity: i64,
    /// Derived: false while tracked stock is at or below zero.
    pub is_available: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A customization group of a product (e.g. "Size").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    pub name: String,
}

/// An option inside a variant group (e.g. "Large").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct VariantOption {
    pub id: String,
    pub variant_id: String,
    pub name: String,
    pub price_cents: i64,
    pub tracks_inventory: bool,
    pub stock_quantity: i64,
    pub is_available: bool,
}

/// Kit → component link with its per-kit multiplier.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct KitComponent {
    pub id: String,
    pub kit_product_id: String,
    pub component_product_id: String,
    pub quantity: i64,
}

/// Visibility of a stock item on one sales channel.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AvailabilityLink {
    pub id: String,
    pub store_id: String,
    pub channel: String,
    pub product_id: Option<String>,
    pub variant_option_id: Option<String>,
    pub is_available: bool,
}

// =============================================================================
// Payments & Activity
// =============================================================================

/// One payer's share of a split bill.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PartialPayment {
    pub id: String,
    pub store_id: String,
    pub command_id: String,
    pub amount_cents: i64,
    pub payer_label: String,
    pub strategy: SplitStrategy,
    /// Gateway reference once the share is actually charged.
    pub external_transaction_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PartialPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// An append-only record of something that happened on the floor.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ActivityLogEntry {
    pub id: String,
    pub store_id: String,
    pub table_id: Option<String>,
    pub command_id: Option<String>,
    pub action: ActivityAction,
    /// JSON object with action-specific detail.
    pub details: String,
    pub revenue_cents: Option<i64>,
    pub duration_minutes: Option<i64>,
    pub employee_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    /// Parses the detail payload; malformed payloads read as `null`.
    pub fn details_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.details).unwrap_or(serde_json::Value::Null)
    }
}

/// A staff member known to the access directory.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Operation Inputs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaloon {
    pub name: String,
    #[serde(default)]
    pub display_order: i64,
}

/// Partial saloon update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaloonUpdate {
    pub name: Option<String>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTable {
    pub saloon_id: String,
    pub name: String,
    pub max_capacity: i64,
    pub location_description: Option<String>,
}

/// Partial table update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TableUpdate {
    pub name: Option<String>,
    pub max_capacity: Option<i64>,
    pub location_description: Option<String>,
    pub status: Option<TableStatus>,
}

/// Input for opening a command.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OpenCommand {
    pub store_id: String,
    pub table_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub attendant_id: Option<String>,
    /// Seats taken; defaults to zero.
    pub guest_count: Option<i64>,
    pub notes: Option<String>,
}

/// An option chosen for a new line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SelectedOption {
    pub variant_option_id: String,
    #[serde(default = "default_option_quantity")]
    pub quantity: i64,
}

fn default_option_quantity() -> i64 {
    1
}

/// A variant group chosen for a new line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SelectedVariant {
    pub variant_id: String,
    pub options: Vec<SelectedOption>,
}

/// A product line to ring into a command.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewLineItem {
    pub product_id: String,
    pub quantity: i64,
    pub note: Option<String>,
    #[serde(default)]
    pub variants: Vec<SelectedVariant>,
}

impl NewLineItem {
    /// A plain line with no customizations.
    pub fn plain(product_id: impl Into<String>, quantity: i64) -> Self {
        NewLineItem {
            product_id: product_id.into(),
            quantity,
            note: None,
            variants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub kind: ProductKind,
    pub price_cents: i64,
    pub tracks_inventory: bool,
    #[serde(default)]
    pub stock_quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewVariantOption {
    pub variant_id: String,
    pub name: String,
    pub price_cents: i64,
    pub tracks_inventory: bool,
    #[serde(default)]
    pub stock_quantity: i64,
}

// =============================================================================
// Read Models
// =============================================================================

/// An order together with its lines and their selections.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTicket {
    pub order: Order,
    pub lines: Vec<TicketLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TicketLine {
    pub item: OrderLineItem,
    pub selections: Vec<LineSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineSelection {
    pub variant: OrderLineVariant,
    pub options: Vec<OrderLineOption>,
}

/// Result of closing a command.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CloseSummary {
    pub command: Command,
    pub revenue_cents: i64,
    pub order_count: i64,
    /// Minutes the table (or the tab) was open; never negative.
    pub duration_minutes: i64,
}

/// Result of a payment split.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitOutcome {
    pub command_id: String,
    pub strategy: SplitStrategy,
    pub total_cents: i64,
    pub payments: Vec<PartialPayment>,
}

/// Per-saloon occupancy on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaloonOccupancy {
    pub saloon_id: String,
    pub name: String,
    pub total_tables: i64,
    pub occupied_tables: i64,
}

/// Table occupancy snapshot for a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FloorDashboard {
    pub total_tables: i64,
    pub available: i64,
    pub occupied: i64,
    pub reserved: i64,
    pub maintenance: i64,
    pub cleaning: i64,
    pub revenue_today_cents: i64,
    pub orders_today: i64,
    pub saloons: Vec<SaloonOccupancy>,
}

/// Activity history with derived statistics.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActivityReport {
    pub entries: Vec<ActivityLogEntry>,
    /// Mean of `duration_minutes` over closed tables.
    pub average_occupation_minutes: Option<f64>,
    /// UTC hour (0-23) with the most table openings.
    pub busiest_hour: Option<u32>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_colors() {
        assert_eq!(TableStatus::Available.color(), "#28a745");
        assert_eq!(TableStatus::Occupied.color(), "#dc3545");
        assert_eq!(TableStatus::Reserved.color(), "#ffc107");
        assert_eq!(TableStatus::Maintenance.color(), "#6c757d");
        assert_eq!(TableStatus::Cleaning.color(), "#17a2b8");
    }

    #[test]
    fn test_status_serialization_matches_storage() {
        assert_eq!(
            serde_json::to_string(&TableStatus::Available).unwrap(),
            "\"AVAILABLE\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::OnRoute).unwrap(),
            "\"on_route\""
        );
        assert_eq!(
            serde_json::to_string(&ActivityAction::TableClosed).unwrap(),
            "\"table_closed\""
        );
        for status in TableStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_line_total() {
        let item = OrderLineItem {
            id: "i".into(),
            order_id: "o".into(),
            product_id: "p".into(),
            product_name: "Burger".into(),
            quantity: 3,
            unit_price_cents: 1250,
            original_price_cents: 1000,
            note: None,
            created_at: Utc::now(),
        };
        assert_eq!(item.line_total().cents(), 3750);
    }

    #[test]
    fn test_selected_option_quantity_defaults_to_one() {
        let opt: SelectedOption =
            serde_json::from_str(r#"{"variant_option_id":"vo-1"}"#).unwrap();
        assert_eq!(opt.quantity, 1);
    }
}
