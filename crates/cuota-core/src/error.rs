//! # Error Types
//!
//! Domain-specific error types for cuota-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cuota-core errors (this file)                                         │
//! │  ├── CoreError        - Cart / order rule violations                   │
//! │  └── ValidationError  - Form input failures (never hit the network)    │
//! │                                                                         │
//! │  cuota-ledger errors (separate crate)                                  │
//! │  └── LedgerError      - Auth, transport, server rejections             │
//! │                                                                         │
//! │  cuota-sync errors (separate crate)                                    │
//! │  └── SyncError        - Engine failures + user-facing text             │
//! │                                                                         │
//! │  Storefront errors (in app)                                            │
//! │  └── ApiError         - What the front end sees (serialized)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → ApiError → Frontend    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Message Style
//! `ValidationError` messages are shown to shoppers as-is, so they read as
//! instructions ("please select a bank"), not as diagnostics.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Cart line cannot be found.
    ///
    /// ## When This Occurs
    /// - Quantity edit for an item removed by a concurrent refresh
    /// - Stale item id from a previous session
    #[error("Cart item not found: {0}")]
    CartItemNotFound(String),

    /// Quota exists but is not the one currently open for payment.
    ///
    /// ## User Workflow
    /// ```text
    /// Order detail: [paid] [paid] [overdue] [pending]
    ///                                  ▲        ▲
    ///                         payable ─┘        └─ tap "pay"
    ///                                                │
    ///                                                ▼
    ///                                   QuotaNotPayable { quota_id }
    /// ```
    #[error("Quota {quota_id} is not open for payment")]
    QuotaNotPayable { quota_id: i64 },

    /// Sale is not in a state that allows the requested operation.
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: i64,
        current_status: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any request is built. The user corrects the input and
/// tries again; nothing is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., amount with three decimals).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// A choice from a list was never made (bank, office, id type).
    #[error("please select a {what}")]
    Selection { what: String },

    /// The receipt photo is missing. Cash payments attach a photo of the
    /// cash to be handed over instead of a transfer receipt.
    #[error("{}", missing_receipt_message(.cash))]
    MissingReceipt { cash: bool },
}

fn missing_receipt_message(cash: &bool) -> &'static str {
    if *cash {
        "please attach a photo of the cash to be delivered"
    } else {
        "please attach the payment receipt"
    }
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    /// Shorthand for [`ValidationError::Selection`].
    pub fn select(what: &str) -> Self {
        ValidationError::Selection {
            what: what.to_string(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidFormat`].
    pub fn format(field: &str, reason: &str) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
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
        let err = CoreError::QuotaNotPayable { quota_id: 42 };
        assert_eq!(err.to_string(), "Quota 42 is not open for payment");

        let err = CoreError::InvalidSaleStatus {
            sale_id: 7,
            current_status: "canceled".to_string(),
        };
        assert_eq!(err.to_string(), "Sale 7 is canceled, cannot perform operation");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("reference").to_string(), "reference is required");
        assert_eq!(ValidationError::select("bank").to_string(), "please select a bank");
        assert_eq!(
            ValidationError::MissingReceipt { cash: false }.to_string(),
            "please attach the payment receipt"
        );
        assert_eq!(
            ValidationError::MissingReceipt { cash: true }.to_string(),
            "please attach a photo of the cash to be delivered"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("reason").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
