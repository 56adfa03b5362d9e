//! # Sync Error Types
//!
//! Errors raised by the reconciliation engines.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Local input    │  │  Backend        │  │  Flow                   │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  Ledger(Auth)   │  │  MissingSaleId          │ │
//! │  │  Core           │  │  Ledger(Network)│  │  NoOfficeSelected       │ │
//! │  │                 │  │  Ledger(Rejected│  │  NotFound               │ │
//! │  │                 │  │         message)│  │  InvalidState           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `user_message()` is what the customer reads. It never contains codes,
//! ids or debug output.

use thiserror::Error;

use cuota_core::error::{CoreError, ValidationError};
use cuota_ledger::LedgerError;

/// Result type alias for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

const GENERIC_FAILURE: &str = "something went wrong, please try again";

#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Backend
    // =========================================================================
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // =========================================================================
    // Local Input
    // =========================================================================
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Flow
    // =========================================================================
    /// Neither the fresh totals nor the last known state carried a sale id.
    #[error("No sale id available for checkout")]
    MissingSaleId,

    /// Pickup delivery chosen without choosing an office.
    #[error("Pickup delivery requires an office")]
    NoOfficeSelected,

    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation does not apply to the current step.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl SyncError {
    /// The session is gone; the app must sign out.
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Ledger(e) if e.is_auth())
    }

    /// Re-invoking the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Ledger(e) => e.is_retryable(),
            SyncError::MissingSaleId => true,
            _ => false,
        }
    }

    /// True for problems the user fixes by editing the form.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SyncError::Validation(_)
                | SyncError::Core(CoreError::Validation(_))
                | SyncError::NoOfficeSelected
        )
    }

    /// Plain-language text for the customer.
    ///
    /// Server rejections pass through verbatim when the server explained
    /// itself.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Validation(e) | SyncError::Core(CoreError::Validation(e)) => e.to_string(),
            SyncError::Core(CoreError::QuotaNotPayable { .. }) => {
                "only the next pending quota can be paid".to_string()
            }
            SyncError::Core(CoreError::InvalidSaleStatus { .. }) => {
                "this order can no longer be canceled".to_string()
            }
            SyncError::Core(_) => GENERIC_FAILURE.to_string(),
            SyncError::Ledger(e) => ledger_message(e),
            SyncError::MissingSaleId => "could not get a sale id, try again".to_string(),
            SyncError::NoOfficeSelected => "please select a pickup office".to_string(),
            SyncError::NotFound(what) => format!("{} was not found", what),
            SyncError::InvalidState(_) => "this action is not available right now".to_string(),
        }
    }
}

fn ledger_message(err: &LedgerError) -> String {
    match err {
        LedgerError::Rejected {
            message: Some(message),
        } => message.clone(),
        LedgerError::Auth(_) => "your session has expired, please sign in again".to_string(),
        LedgerError::Network(_) | LedgerError::Timeout => {
            "could not reach the server, check your connection and try again".to_string()
        }
        LedgerError::NotFound(what) => format!("{} was not found", what),
        _ => GENERIC_FAILURE.to_string(),
    }
}
