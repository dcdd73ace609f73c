//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures (wraps CoreError)  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pricing and totals never produce errors: missing prices fall back to the
//! product's static price and negative results clamp to zero.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invoice cannot move from its current status to the requested one.
    ///
    /// ## When This Occurs
    /// - Sending an invoice that is already paid
    /// - Re-opening a cancelled invoice
    /// - Setting the status an invoice already has
    #[error("Invoice cannot move from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// Payment was aimed at an invoice that no longer accepts payments.
    #[error("Invoice {invoice_id} is {status} and cannot accept payments")]
    InvoiceNotPayable { invoice_id: String, status: String },

    /// Paid and cancelled invoices are frozen.
    #[error("Invoice {invoice_id} is {status} and cannot be edited")]
    InvoiceLocked { invoice_id: String, status: String },

    /// A draft line index did not point at an existing line.
    #[error("Line {index} does not exist (draft has {len} lines)")]
    LineNotFound { index: usize, len: usize },

    /// Draft has reached its maximum number of lines.
    #[error("Invoice cannot have more than {max} lines")]
    DraftTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before business logic runs, e.g. when a form submits a rule value.
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
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidStatusTransition {
            from: "paid".to_string(),
            to: "sent".to_string(),
        };
        assert_eq!(err.to_string(), "Invoice cannot move from paid to sent");

        let err = CoreError::LineNotFound { index: 4, len: 2 };
        assert_eq!(err.to_string(), "Line 4 does not exist (draft has 2 lines)");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        };
        assert_eq!(err.to_string(), "discount must be between 0 and 100");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
