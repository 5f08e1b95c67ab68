//! # Validation Module
//!
//! Field limits for operator input, checked before any row is written.
//!
//! ## Limits
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────────┐
//! │ Field                        │ Rule                                     │
//! ├──────────────────────────────┼──────────────────────────────────────────┤
//! │ table name                   │ 1-50 chars                               │
//! │ table max capacity           │ 1-100                                    │
//! │ table location description   │ ≤ 100 chars                              │
//! │ saloon name                  │ 1-100 chars                              │
//! │ saloon display order         │ ≥ 0                                      │
//! │ customer name / contact      │ ≤ 100 / ≤ 50 chars                       │
//! │ notes                        │ ≤ 500 chars                              │
//! │ line quantity                │ 1-999                                    │
//! │ guest count                  │ 0..=table max capacity                   │
//! └──────────────────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! Lengths count characters, not bytes, so accented names are not
//! penalised.
//!
//! ## Usage
//! ```rust
//! use floor_core::validation::{validate_table_name, validate_quantity};
//!
//! assert!(validate_table_name("T1").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_LINE_QUANTITY, MAX_TABLE_CAPACITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Text Helpers
// =============================================================================

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    optional_text(field, Some(value), max)
}

fn optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.trim().chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

fn in_range(field: &str, value: i64, min: i64, max: i64) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Registry
// =============================================================================

pub fn validate_table_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, 50)
}

pub fn validate_saloon_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, 100)
}

pub fn validate_location(location: Option<&str>) -> ValidationResult<()> {
    optional_text("location_description", location, 100)
}

/// Validates a table's seat count.
///
/// ## Example
/// ```rust
/// use floor_core::validation::validate_capacity;
///
/// assert!(validate_capacity(4).is_ok());
/// assert!(validate_capacity(0).is_err());
/// ```
pub fn validate_capacity(capacity: i64) -> ValidationResult<()> {
    in_range("max_capacity", capacity, 1, MAX_TABLE_CAPACITY)
}

pub fn validate_display_order(order: i64) -> ValidationResult<()> {
    if order < 0 {
        return Err(ValidationError::OutOfRange {
            field: "display_order".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Commands & Orders
// =============================================================================

pub fn validate_customer_name(name: Option<&str>) -> ValidationResult<()> {
    optional_text("customer_name", name, 100)
}

pub fn validate_customer_contact(contact: Option<&str>) -> ValidationResult<()> {
    optional_text("customer_contact", contact, 50)
}

pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    optional_text("notes", notes, 500)
}

/// Seats taken when a table is opened; zero is allowed.
pub fn validate_guest_count(guests: i64, max_capacity: i64) -> ValidationResult<()> {
    in_range("guest_count", guests, 0, max_capacity)
}

/// Validates a line (or option) quantity.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    in_range("quantity", qty, 1, MAX_LINE_QUANTITY)
}

// =============================================================================
// Catalog
// =============================================================================

/// Prices may be zero (free add-ons) but never negative.
pub fn validate_price(price_cents: i64) -> ValidationResult<()> {
    if price_cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price_cents".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, 200)
}

/// Kit links must consume at least one unit of the component.
pub fn validate_kit_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
