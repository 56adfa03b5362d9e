//! # Session
//!
//! Holds the signed-in user's bearer token.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   sign_in(token) ──► [ Some(token) ] ──► bearer() before every call     │
//! │                            │                                            │
//! │         expired, or first  │                                            │
//! │         AUTH_ERROR seen    ▼                                            │
//! │                      sign_out() ──► [ None ] ──► bearer() = Err(Auth)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The token is read for every call and never held across one. Storage of
//! the token between app launches is the host platform's job.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};

/// Token information stored after sign-in.
#[derive(Clone)]
pub struct SessionToken {
    pub access_token: String,
    pub user_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionToken {
    /// A token with no known expiry.
    pub fn new(access_token: impl Into<String>) -> Self {
        SessionToken {
            access_token: access_token.into(),
            user_id: None,
            expires_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

// The access token never reaches logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("access_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Shared handle to the current session. Clones share the same token.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<SessionToken>>>,
}

impl Session {
    /// A signed-out session.
    pub fn new() -> Self {
        Session::default()
    }

    /// A session already holding `token`.
    pub fn with_token(token: SessionToken) -> Self {
        Session {
            token: Arc::new(RwLock::new(Some(token))),
        }
    }

    pub async fn sign_in(&self, token: SessionToken) {
        info!(user_id = ?token.user_id, "Session started");
        *self.token.write().await = Some(token);
    }

    /// Drops the token. Returns whether one was held.
    pub async fn sign_out(&self) -> bool {
        let had_token = self.token.write().await.take().is_some();
        if had_token {
            info!("Session cleared");
        }
        had_token
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .await
            .as_ref()
            .map(|t| !t.is_expired(Utc::now()))
            .unwrap_or(false)
    }

    pub async fn user_id(&self) -> Option<String> {
        self.token.read().await.as_ref().and_then(|t| t.user_id.clone())
    }

    /// The access token for the next request.
    ///
    /// ## Errors
    /// `Auth` when signed out or when the token has expired.
    pub async fn bearer(&self) -> LedgerResult<String> {
        let guard = self.token.read().await;
        match guard.as_ref() {
            None => Err(LedgerError::Auth("not signed in".into())),
            Some(token) if token.is_expired(Utc::now()) => {
                debug!("Session token expired");
                Err(LedgerError::Auth("session expired".into()))
            }
            Some(token) => Ok(token.access_token.clone()),
        }
    }
}
