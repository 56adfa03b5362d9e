//! Session and notification commands.

use cuota_ledger::wire::Notification;
use cuota_ledger::SessionToken;

use crate::error::ApiError;
use crate::state::Storefront;

pub async fn sign_in(sf: &Storefront, token: SessionToken) {
    sf.sign_in(token).await;
}

pub async fn sign_out(sf: &Storefront) {
    sf.sign_out().await;
}

/// Badge count; zero while signed out.
pub async fn unread_count(sf: &Storefront) -> Result<u32, ApiError> {
    let result = sf.notifications().unread_count().await;
    sf.observe(result).await
}

pub async fn list_notifications(sf: &Storefront) -> Result<Vec<Notification>, ApiError> {
    let result = sf.notifications().list().await;
    sf.observe(result).await
}

pub async fn mark_notification_read(
    sf: &Storefront,
    notification_id: &str,
) -> Result<(), ApiError> {
    let result = sf.notifications().mark_read(notification_id).await;
    sf.observe(result).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::LedgerNotifications;
    use cuota_ledger::{LedgerError, PaymentSettings, Session};
    use cuota_sync::mock::MockLedger;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_notifications_follow_session() {
        let mock = Arc::new(MockLedger::new());
        let sf = Storefront::new(
            mock.clone(),
            Session::new(),
            Arc::new(LedgerNotifications::new(mock.clone())),
            &PaymentSettings::default(),
        );

        assert_eq!(unread_count(&sf).await.unwrap(), 0);
        assert_eq!(mock.call_count("unread_notifications"), 0);

        sign_in(&sf, SessionToken::new("token")).await;
        unread_count(&sf).await.unwrap();
        assert_eq!(mock.call_count("unread_notifications"), 1);

        // A rejected token tears registration down with the session
        mock.fail("notifications", LedgerError::Auth("revoked".into()));
        assert!(list_notifications(&sf).await.unwrap_err().is_auth());
        assert_eq!(unread_count(&sf).await.unwrap(), 0);
        assert_eq!(mock.call_count("unread_notifications"), 1);
    }
}
