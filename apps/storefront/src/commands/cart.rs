//! # Cart Commands
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Checkout │────►│  Order   │       │
//! │  │  Cart    │     │ (local)  │     │ (synced) │     │  placed  │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                │                               │
//! │                   add_to_cart      sync_cart                            │
//! │                   add_products     (persist + refresh)                  │
//! │                   update_quantity                                       │
//! │                   remove_item                                           │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   clear_cart ──────────────────────► (back to empty)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every response carries the full item list and the composed summary, so
//! the screen never recomputes totals itself.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use cuota_core::money::Money;
use cuota_core::types::{CartItem, OrderSummary};

use crate::error::ApiError;
use crate::state::Storefront;

/// Cart response including items and totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub summary: OrderSummary,
    pub total: Money,
    pub item_count: usize,
}

async fn respond(sf: &Storefront, summary: OrderSummary) -> CartResponse {
    let items = sf.cart().items().await;
    CartResponse {
        item_count: items.len(),
        total: summary.total(),
        items,
        summary,
    }
}

/// Current cart contents, as held locally.
pub async fn get_cart(sf: &Storefront) -> CartResponse {
    let summary = sf.cart().summary().await;
    respond(sf, summary).await
}

/// Adds one product. A line with the same id grows by one instead.
pub async fn add_to_cart(sf: &Storefront, item: CartItem) -> CartResponse {
    debug!(item_id = %item.id, quantity = item.quantity, "add_to_cart command");
    let summary = sf.cart().add_item(item).await;
    respond(sf, summary).await
}

/// Adds products as delivered by the product screens, in whatever shape
/// they arrive. Missing fields fall back to defaults.
pub async fn add_products(sf: &Storefront, payloads: Vec<Value>) -> CartResponse {
    debug!(count = payloads.len(), "add_products command");
    let summary = sf.cart().merge_raw(&payloads).await;
    respond(sf, summary).await
}

/// Sets a line's quantity. Values below 1 are ignored.
pub async fn update_quantity(
    sf: &Storefront,
    item_id: &str,
    quantity: i64,
) -> Result<CartResponse, ApiError> {
    debug!(item_id, quantity, "update_quantity command");
    let summary = sf.observe(sf.cart().set_quantity(item_id, quantity).await).await?;
    Ok(respond(sf, summary).await)
}

pub async fn remove_item(sf: &Storefront, item_id: &str) -> Result<CartResponse, ApiError> {
    debug!(item_id, "remove_item command");
    let summary = sf.observe(sf.cart().remove_item(item_id).await).await?;
    Ok(respond(sf, summary).await)
}

pub async fn clear_cart(sf: &Storefront) -> Result<CartResponse, ApiError> {
    debug!("clear_cart command");
    let summary = sf.observe(sf.cart().clear_cart().await).await?;
    Ok(respond(sf, summary).await)
}

/// Replaces the local cart with the server's copy.
pub async fn refresh_cart(sf: &Storefront) -> Result<CartResponse, ApiError> {
    let summary = sf.observe(sf.cart().refresh_cart().await).await?;
    Ok(respond(sf, summary).await)
}

/// Sends local edits the server has not seen yet, then refreshes.
pub async fn sync_cart(sf: &Storefront) -> Result<CartResponse, ApiError> {
    let summary = sf.observe(sf.cart().persist().await).await?;
    Ok(respond(sf, summary).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NoopNotifications;
    use cuota_ledger::{LedgerError, PaymentSettings, Session, SessionToken};
    use cuota_sync::mock::MockLedger;
    use serde_json::json;
    use std::sync::Arc;

    fn storefront(mock: Arc<MockLedger>) -> Storefront {
        Storefront::new(
            mock,
            Session::with_token(SessionToken::new("token")),
            Arc::new(NoopNotifications),
            &PaymentSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_add_products_merges_loose_payloads() {
        let sf = storefront(Arc::new(MockLedger::new()));

        add_to_cart(&sf, CartItem::new("p-1", "Bolso", Money::from_cents(1500))).await;
        let cart = add_products(
            &sf,
            vec![
                json!({"id": "p-1", "title": "Bolso", "price": "15.00", "quantity": 2}),
                json!({"id": "p-2", "name": "Correa", "price": 7.5}),
            ],
        )
        .await;

        assert_eq!(cart.item_count, 2);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.summary.subtotal_local, Money::from_cents(5250));
    }

    #[tokio::test]
    async fn test_quantity_below_one_changes_nothing() {
        let mock = Arc::new(MockLedger::new());
        let sf = storefront(mock.clone());
        add_to_cart(&sf, CartItem::new("p-1", "Bolso", Money::from_cents(1500))).await;

        let cart = update_quantity(&sf, "p-1", 0).await.unwrap();
        assert_eq!(cart.items[0].quantity, 1);
        assert_eq!(mock.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_on_refresh_signs_out() {
        let mock = Arc::new(MockLedger::new());
        mock.fail("fetch_cart", LedgerError::Auth("jwt expired".into()));
        let sf = storefront(mock);
        add_to_cart(&sf, CartItem::new("p-1", "Bolso", Money::from_cents(1500))).await;

        let err = refresh_cart(&sf).await.unwrap_err();
        assert!(err.is_auth());
        assert!(!sf.session().is_authenticated().await);
        assert_eq!(get_cart(&sf).await.item_count, 0);
    }
}
