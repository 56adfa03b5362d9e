//! # Notification Service
//!
//! Unread badge and notification center, injected into the [`Storefront`]
//! at composition time instead of living as a global.
//!
//! ```text
//! sign_in ──► on_sign_in(user) ──► registered ──► unread_count / list / mark_read
//! sign_out / forced sign-out ──► on_sign_out ──► unregistered (badge reads 0)
//! ```
//!
//! [`Storefront`]: crate::state::Storefront

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use cuota_ledger::wire::Notification;
use cuota_ledger::LedgerClient;
use cuota_sync::SyncResult;

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Registers the signed-in user.
    async fn on_sign_in(&self, user_id: Option<&str>);

    /// Tears down registration. Must be safe to call when not registered.
    async fn on_sign_out(&self);

    async fn unread_count(&self) -> SyncResult<u32>;

    async fn list(&self) -> SyncResult<Vec<Notification>>;

    async fn mark_read(&self, notification_id: &str) -> SyncResult<()>;
}

// =============================================================================
// Ledger-backed
// =============================================================================

/// Notifications served by the backend of record.
pub struct LedgerNotifications {
    ledger: Arc<dyn LedgerClient>,
    registered: AtomicBool,
}

impl LedgerNotifications {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        LedgerNotifications {
            ledger,
            registered: AtomicBool::new(false),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationService for LedgerNotifications {
    async fn on_sign_in(&self, user_id: Option<&str>) {
        self.registered.store(true, Ordering::SeqCst);
        info!(user_id = ?user_id, "Notifications registered");
    }

    async fn on_sign_out(&self) {
        if self.registered.swap(false, Ordering::SeqCst) {
            info!("Notifications unregistered");
        }
    }

    async fn unread_count(&self) -> SyncResult<u32> {
        if !self.is_registered() {
            return Ok(0);
        }
        let count = self.ledger.unread_notifications().await?;
        debug!(count, "Unread notifications");
        Ok(count)
    }

    async fn list(&self) -> SyncResult<Vec<Notification>> {
        if !self.is_registered() {
            return Ok(Vec::new());
        }
        Ok(self.ledger.notifications().await?)
    }

    async fn mark_read(&self, notification_id: &str) -> SyncResult<()> {
        if !self.is_registered() {
            return Ok(());
        }
        self.ledger.mark_notification_read(notification_id).await?;
        Ok(())
    }
}

// =============================================================================
// No-op
// =============================================================================

/// For surfaces without a notification center (the CLI, tests).
#[derive(Debug, Default)]
pub struct NoopNotifications;

#[async_trait]
impl NotificationService for NoopNotifications {
    async fn on_sign_in(&self, _user_id: Option<&str>) {}

    async fn on_sign_out(&self) {}

    async fn unread_count(&self) -> SyncResult<u32> {
        Ok(0)
    }

    async fn list(&self) -> SyncResult<Vec<Notification>> {
        Ok(Vec::new())
    }

    async fn mark_read(&self, _notification_id: &str) -> SyncResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuota_sync::mock::MockLedger;

    #[tokio::test]
    async fn test_unregistered_service_stays_quiet() {
        let mock = Arc::new(MockLedger::new());
        let service = LedgerNotifications::new(mock.clone());

        assert_eq!(service.unread_count().await.unwrap(), 0);
        assert!(service.list().await.unwrap().is_empty());
        assert_eq!(mock.total_calls(), 0);

        service.on_sign_in(Some("user-1")).await;
        service.unread_count().await.unwrap();
        assert_eq!(mock.call_count("unread_notifications"), 1);

        service.on_sign_out().await;
        service.on_sign_out().await;
        assert!(!service.is_registered());
    }
}
