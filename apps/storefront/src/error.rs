//! # API Error Type
//!
//! Unified error type for storefront commands.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Cuota                                  │
//! │                                                                         │
//! │  Front end                   Rust                                       │
//! │  ─────────                   ────                                       │
//! │                                                                         │
//! │  invoke('place_order')                                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Auth? ───── LedgerError::Auth ──────► AUTH_ERROR + sign-out    │  │
//! │  │  Form?  ──── ValidationError ────────► VALIDATION_ERROR         │  │
//! │  │  Network? ── LedgerError::Network ───► NETWORK_ERROR            │  │
//! │  │  Rejected? ─ server message ─────────► BUSINESS_RULE (verbatim) │  │
//! │  │         │                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `message` is always the plain-language text from
//! [`SyncError::user_message`]; internals only reach the logs.

use serde::Serialize;

use cuota_core::error::CoreError;
use cuota_ledger::LedgerError;
use cuota_sync::SyncError;

/// API error returned from storefront commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "please select a bank"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Session missing or rejected; the user has been signed out
    AuthError,

    /// Form input failed a local rule
    ValidationError,

    /// Server unreachable; the user may retry
    NetworkError,

    /// Server refused the operation
    BusinessRule,

    /// Requested record does not exist
    NotFound,

    /// Anything else
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::NotFound, what)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self.code, ErrorCode::AuthError)
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        let message = err.user_message();
        let code = match &err {
            e if e.is_auth() => ErrorCode::AuthError,
            e if e.is_validation() => ErrorCode::ValidationError,
            SyncError::Ledger(LedgerError::Network(_) | LedgerError::Timeout) => {
                ErrorCode::NetworkError
            }
            SyncError::Ledger(LedgerError::Rejected { .. }) => ErrorCode::BusinessRule,
            SyncError::Core(
                CoreError::QuotaNotPayable { .. } | CoreError::InvalidSaleStatus { .. },
            ) => ErrorCode::BusinessRule,
            SyncError::InvalidState(_) => ErrorCode::BusinessRule,
            SyncError::MissingSaleId => ErrorCode::NetworkError,
            SyncError::NoOfficeSelected => ErrorCode::ValidationError,
            SyncError::NotFound(_) | SyncError::Ledger(LedgerError::NotFound(_)) => {
                ErrorCode::NotFound
            }
            _ => {
                tracing::error!(error = %err, "Unexpected storefront failure");
                ErrorCode::Internal
            }
        };
        ApiError::new(code, message)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        SyncError::from(err).into()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
