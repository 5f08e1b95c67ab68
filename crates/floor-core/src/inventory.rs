//! # Inventory Planning
//!
//! Turns order lines into stock adjustments and decides when catalog
//! availability must flip.
//!
//! ## Kit Expansion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Line: "Combo" (KIT) × 2                                                │
//! │     ├── component "Fries"  ×2 per kit  → Fries  -4                     │
//! │     └── component "Soda"   ×1 per kit  → Soda   -2                     │
//! │     (the kit's own stock field is never touched)                        │
//! │                                                                         │
//! │  Line: "Burger" (INDIVIDUAL) × 3, option "Extra cheese" ×2              │
//! │     ├── Burger        -3            (only if Burger tracks stock)       │
//! │     └── Extra cheese  -6            (only if the option tracks stock)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Restock is the exact mirror: same expansion, opposite sign.
//!
//! ## Boundary Rule
//! Availability reacts to the *crossing*, never to the level:
//! ```text
//!   before > 0  and after <= 0   → Paused
//!   before <= 0 and after > 0    → Reactivated
//!   5 → 3, 0 → -1, -2 → -1       → nothing
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

// =============================================================================
// Stock References
// =============================================================================

/// A row that holds stock.
///
/// The derived ordering (products first, then options, each by id) is the
/// order in which rows are locked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
#[ts(export)]
pub enum StockRef {
    Product(String),
    VariantOption(String),
}

impl StockRef {
    pub fn id(&self) -> &str {
        match self {
            StockRef::Product(id) | StockRef::VariantOption(id) => id,
        }
    }

    /// Entity name used in errors and logs.
    pub const fn entity(&self) -> &'static str {
        match self {
            StockRef::Product(_) => "Product",
            StockRef::VariantOption(_) => "VariantOption",
        }
    }
}

/// Which way stock moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockDirection {
    /// Order delivered: stock leaves the shelf.
    Decrement,
    /// Delivered order canceled: stock comes back.
    Restock,
}

impl StockDirection {
    const fn sign(&self) -> i64 {
        match self {
            StockDirection::Decrement => -1,
            StockDirection::Restock => 1,
        }
    }
}

// =============================================================================
// Line Demand
// =============================================================================

/// A kit → component link as seen by the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLink {
    pub product_id: String,
    pub per_kit: i64,
    pub tracks_inventory: bool,
}

/// A selected variant option as seen by the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionPick {
    pub option_id: String,
    pub quantity: i64,
    pub tracks_inventory: bool,
}

/// How the product on a line holds stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockHolder {
    Kit {
        components: Vec<ComponentLink>,
    },
    Individual {
        product_id: String,
        tracks_inventory: bool,
        options: Vec<OptionPick>,
    },
}

/// One order line resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDemand {
    pub quantity: i64,
    pub holder: StockHolder,
}

/// Net change to apply to one stock row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAdjustment {
    pub item: StockRef,
    pub delta: i64,
}

/// Expands lines into per-row adjustments.
///
/// Adjustments to the same row are merged, and the result is sorted in
/// lock order. Untracked rows never appear.
pub fn plan_adjustments(lines: &[LineDemand], direction: StockDirection) -> Vec<PlannedAdjustment> {
    let sign = direction.sign();
    let mut deltas: BTreeMap<StockRef, i64> = BTreeMap::new();

    for line in lines {
        match &line.holder {
            StockHolder::Kit { components } => {
                for link in components.iter().filter(|c| c.tracks_inventory) {
                    *deltas
                        .entry(StockRef::Product(link.product_id.clone()))
                        .or_default() += sign * link.per_kit * line.quantity;
                }
            }
            StockHolder::Individual {
                product_id,
                tracks_inventory,
                options,
            } => {
                if *tracks_inventory {
                    *deltas
                        .entry(StockRef::Product(product_id.clone()))
                        .or_default() += sign * line.quantity;
                }
                for pick in options.iter().filter(|o| o.tracks_inventory) {
                    *deltas
                        .entry(StockRef::VariantOption(pick.option_id.clone()))
                        .or_default() += sign * pick.quantity * line.quantity;
                }
            }
        }
    }

    deltas
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .map(|(item, delta)| PlannedAdjustment { item, delta })
        .collect()
}

// =============================================================================
// Availability Boundary
// =============================================================================

/// Availability flip caused by a stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AvailabilityChange {
    Paused,
    Reactivated,
}

/// Applies the boundary rule to a quantity change.
///
/// ## Example
/// ```rust
/// use floor_core::inventory::{availability_change, AvailabilityChange};
///
/// assert_eq!(availability_change(1, 0), Some(AvailabilityChange::Paused));
/// assert_eq!(availability_change(0, 1), Some(AvailabilityChange::Reactivated));
/// assert_eq!(availability_change(5, 3), None);
/// ```
pub const fn availability_change(before: i64, after: i64) -> Option<AvailabilityChange> {
    if before > 0 && after <= 0 {
        Some(AvailabilityChange::Paused)
    } else if before <= 0 && after > 0 {
        Some(AvailabilityChange::Reactivated)
    } else {
        None
    }
}

/// A stock change that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockMovement {
    pub item: StockRef,
    pub before: i64,
    pub after: i64,
    pub availability: Option<AvailabilityChange>,
}

impl StockMovement {
    pub fn new(item: StockRef, before: i64, after: i64) -> Self {
        StockMovement {
            availability: availability_change(before, after),
            item,
            before,
            after,
        }
    }

    /// Stock went below zero (recorded, never blocked).
    pub const fn is_oversold(&self) -> bool {
        self.after < 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
