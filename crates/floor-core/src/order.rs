//! # Order State Machine
//!
//! Which status changes an order may make, and which of them move stock.
//!
//! ## Transition Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  PENDING ─► PREPARING ─► READY ─► ON_ROUTE ─► DELIVERED ─► FINALIZED   │
//! │     │           │          │         │            │                     │
//! │     └───────────┴──────────┴─────────┴────────────┴──────► CANCELED    │
//! │                                                                         │
//! │  • forward moves may skip steps (table tabs start at PREPARING)        │
//! │  • CANCELED and FINALIZED are terminal                                 │
//! │  • FINALIZED is reachable only from DELIVERED (housekeeping)           │
//! │  • moving to the current status is rejected                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Inventory Trigger
//! ```text
//!   x ──► DELIVERED   (x ≠ DELIVERED)   → Decrement
//!   DELIVERED ──► CANCELED              → Restock
//!   anything else                       → no stock movement
//! ```
//! The trigger compares the previous status with the target, so re-running
//! a transition can never double-apply stock.

use crate::error::{CoreError, CoreResult};
use crate::inventory::StockDirection;
use crate::types::OrderStatus;

impl OrderStatus {
    /// Position along the fulfilment pipeline, `None` for terminal states.
    const fn pipeline_rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Preparing => Some(1),
            OrderStatus::Ready => Some(2),
            OrderStatus::OnRoute => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Finalized | OrderStatus::Canceled => None,
        }
    }

    /// No further transitions are possible.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Finalized | OrderStatus::Canceled)
    }

    /// Whether `self → next` is a legal move.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next || self.is_terminal() {
            return false;
        }

        match next {
            OrderStatus::Canceled => true,
            OrderStatus::Finalized => *self == OrderStatus::Delivered,
            _ => match (self.pipeline_rank(), next.pipeline_rank()) {
                (Some(from), Some(to)) => to > from,
                _ => false,
            },
        }
    }
}

/// A validated status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderTransition {
    /// Validates `from → to` for the given order.
    ///
    /// ## Example
    /// ```rust
    /// use floor_core::{OrderStatus, OrderTransition};
    ///
    /// let t = OrderTransition::new("o-1", OrderStatus::Preparing, OrderStatus::Delivered);
    /// assert!(t.is_ok());
    ///
    /// let t = OrderTransition::new("o-1", OrderStatus::Canceled, OrderStatus::Preparing);
    /// assert!(t.is_err());
    /// ```
    pub fn new(order_id: &str, from: OrderStatus, to: OrderStatus) -> CoreResult<Self> {
        if !from.can_transition_to(to) {
            return Err(CoreError::invalid_state(
                "Order",
                order_id,
                from,
                format!("move to {to}"),
            ));
        }
        Ok(OrderTransition { from, to })
    }

    /// Stock movement this transition fires, if any.
    pub fn inventory_effect(&self) -> Option<StockDirection> {
        inventory_effect(self.from, self.to)
    }
}

/// Stock movement triggered by moving an order from `from` to `to`.
pub fn inventory_effect(from: OrderStatus, to: OrderStatus) -> Option<StockDirection> {
    match (from, to) {
        (f, OrderStatus::Delivered) if f != OrderStatus::Delivered => {
            Some(StockDirection::Decrement)
        }
        (OrderStatus::Delivered, OrderStatus::Canceled) => Some(StockDirection::Restock),
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
