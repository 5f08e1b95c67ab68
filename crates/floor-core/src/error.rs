//! # Error Types
//!
//! Domain errors for the floor core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Hierarchy                                 │
//! │                                                                         │
//! │  CoreError (top-level)                                                 │
//! │  ├── NotFound          saloon/table/command/order/employee/stock item  │
//! │  ├── DuplicateName     table name collision inside a saloon            │
//! │  ├── ResourceInUse     delete/disable blocked by occupancy             │
//! │  ├── TableUnavailable  open attempted on a non-AVAILABLE table         │
//! │  ├── InvalidState      command/order not in the required status        │
//! │  ├── AccessDenied      employee lacks store access                     │
//! │  └── Validation        wraps ValidationError                           │
//! │                                                                         │
//! │  ValidationError (input validation)                                    │
//! │  ├── Required, TooLong, OutOfRange, MustBePositive                     │
//! │  └── InvalidFormat, Empty                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure is surfaced to the caller. Nothing in the core turns a
//! rejected operation into a silent no-op; translating these into transport
//! responses is the routing layer's job.

use thiserror::Error;

use crate::types::TableStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business logic errors for floor operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The referenced entity does not exist (or is soft-deleted).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A table with the same name already lives in the saloon.
    #[error("Table '{name}' already exists in saloon {saloon_id}")]
    DuplicateName { saloon_id: String, name: String },

    /// Delete/disable rejected because something is still occupied.
    ///
    /// ## When This Occurs
    /// - Deleting a table whose status is not AVAILABLE
    /// - Disabling a saloon that owns a non-AVAILABLE table
    #[error("{entity} {id} is in use: {reason}")]
    ResourceInUse {
        entity: String,
        id: String,
        reason: String,
    },

    /// Open attempted on a table that is not AVAILABLE.
    #[error("Table {table_id} is {status}, cannot open a command on it")]
    TableUnavailable { table_id: String, status: TableStatus },

    /// The command/order is not in the status the operation requires.
    ///
    /// A lost race between two operators surfaces here on retry rather
    /// than as a double-applied effect.
    #[error("{entity} {id} is {status}, cannot {operation}")]
    InvalidState {
        entity: String,
        id: String,
        status: String,
        operation: String,
    },

    /// Employee exists but has no access to the store.
    #[error("Employee {employee_id} has no access to store {store_id}")]
    AccessDenied {
        employee_id: String,
        store_id: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidState error.
    ///
    /// ## Example
    /// ```rust
    /// use floor_core::CoreError;
    ///
    /// let err = CoreError::invalid_state("Command", "c-1", "CLOSED", "add items");
    /// assert_eq!(err.to_string(), "Command c-1 is CLOSED, cannot add items");
    /// ```
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        status: impl std::fmt::Display,
        operation: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            status: status.to_string(),
            operation: operation.into(),
        }
    }

    /// Creates a ResourceInUse error.
    pub fn in_use(
        entity: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CoreError::ResourceInUse {
            entity: entity.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These fire before any row is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., a malformed identifier).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A list that needs at least one element was empty.
    #[error("{field} must not be empty")]
    Empty { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::TableUnavailable {
            table_id: "t-1".to_string(),
            status: TableStatus::Occupied,
        };
        assert_eq!(
            err.to_string(),
            "Table t-1 is OCCUPIED, cannot open a command on it"
        );

        let err = CoreError::DuplicateName {
            saloon_id: "s-1".to_string(),
            name: "T1".to_string(),
        };
        assert_eq!(err.to_string(), "Table 'T1' already exists in saloon s-1");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::TooLong {
            field: "notes".to_string(),
            max: 500,
        };
        assert_eq!(err.to_string(), "notes must be at most 500 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Empty {
            field: "participants".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
