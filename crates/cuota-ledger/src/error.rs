//! # Ledger Error Types
//!
//! Every way a backend call can fail, categorized for the caller.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Ledger Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │ Authentication  │  │   Transport     │  │   Server Verdict        │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Auth           │  │  Network        │  │  Rejected { message }   │ │
//! │  │  → force        │  │  Timeout        │  │  → shown verbatim       │ │
//! │  │    sign-out     │  │  → user retries │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │   Contract      │  │  Configuration  │                              │
//! │  │                 │  │                 │                              │
//! │  │ InvalidResponse │  │  Config         │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is retried automatically. Callers decide whether to
//! re-invoke.

use thiserror::Error;

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger error type covering all backend call failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // =========================================================================
    // Authentication
    // =========================================================================
    /// Missing, expired or server-rejected session token.
    #[error("Authentication failed: {0}")]
    Auth(String),

    // =========================================================================
    // Transport
    // =========================================================================
    /// The request could not complete.
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    // =========================================================================
    // Server Verdict
    // =========================================================================
    /// The backend answered `success: false`.
    #[error("Rejected by server: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    /// The requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    // =========================================================================
    // Contract & Configuration
    // =========================================================================
    /// The response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Bad or missing client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return LedgerError::Timeout;
        }
        match err.status().map(|s| s.as_u16()) {
            Some(401) | Some(403) => LedgerError::Auth(err.to_string()),
            _ => LedgerError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::InvalidResponse(err.to_string())
    }
}

impl From<url::ParseError> for LedgerError {
    fn from(err: url::ParseError) -> Self {
        LedgerError::Config(format!("invalid URL: {}", err))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl LedgerError {
    /// True when the session is no longer valid and the app must sign out.
    pub fn is_auth(&self) -> bool {
        matches!(self, LedgerError::Auth(_))
    }

    /// True when re-invoking the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Network(_) | LedgerError::Timeout)
    }

    /// True for configuration problems.
    pub fn is_config_error(&self) -> bool {
        matches!(self, LedgerError::Config(_))
    }

    /// The server's own explanation, when it gave one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            LedgerError::Rejected { message } => message.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert!(LedgerError::Auth("expired".into()).is_auth());
        assert!(!LedgerError::Auth("expired".into()).is_retryable());

        assert!(LedgerError::Network("reset".into()).is_retryable());
        assert!(LedgerError::Timeout.is_retryable());

        let rejected = LedgerError::Rejected {
            message: Some("Referencia duplicada".into()),
        };
        assert!(!rejected.is_retryable());
        assert_eq!(rejected.server_message(), Some("Referencia duplicada"));

        assert!(LedgerError::Config("no url".into()).is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::Rejected { message: None };
        assert_eq!(err.to_string(), "Rejected by server: no message");
    }
}
