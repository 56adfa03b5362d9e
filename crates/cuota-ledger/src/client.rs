//! # Ledger Client Trait
//!
//! The seam between the reconciliation engines and the backend of record.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every operation:                                                       │
//! │    • takes plain data, returns LedgerResult<T>                          │
//! │    • never panics on expected failures (network, rejection, auth)       │
//! │    • holds no state between calls                                       │
//! │    • is not retried here; callers re-invoke if they want to             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `HttpLedgerClient` is the production implementation. Engines hold an
//! `Arc<dyn LedgerClient>` so tests can swap in an in-memory ledger.

use async_trait::async_trait;

use cuota_core::money::{Currency, ExchangeRate};
use cuota_core::types::{
    CancellationRequest, CartItem, DeliveryTarget, NewShippingAddress, PurchaseConditions,
    RefundBreakdown, Sale, SaleId, ShippingAddress,
};

use crate::error::LedgerResult;
use crate::wire::{
    AmountDue, AmountDueRequest, InitialPaymentRequest, Locations, Notification,
    OrderDetailBundle, PaymentMethodsCatalog, QuotaPaymentRequest, ServerCart,
    SubmissionReceipt,
};

#[async_trait]
pub trait LedgerClient: Send + Sync {
    // =========================================================================
    // Cart
    // =========================================================================

    /// Authoritative cart items and summary.
    async fn fetch_cart(&self) -> LedgerResult<ServerCart>;

    /// Summary only (totals and the sale id created for this cart).
    async fn fetch_cart_totals(&self) -> LedgerResult<ServerCart>;

    async fn add_cart_items(&self, items: &[CartItem]) -> LedgerResult<()>;

    async fn update_cart_item(&self, item_id: &str, quantity: i64) -> LedgerResult<()>;

    async fn remove_cart_item(&self, item_id: &str) -> LedgerResult<()>;

    async fn clear_cart(&self) -> LedgerResult<()>;

    // =========================================================================
    // Delivery
    // =========================================================================

    async fn addresses(&self) -> LedgerResult<Vec<ShippingAddress>>;

    async fn add_address(&self, address: &NewShippingAddress) -> LedgerResult<ShippingAddress>;

    /// Marks an address or pickup office as the cart's active target.
    async fn set_delivery_target(&self, target: &DeliveryTarget) -> LedgerResult<()>;

    async fn locations(&self) -> LedgerResult<Locations>;

    // =========================================================================
    // Payment Plan
    // =========================================================================

    async fn purchase_conditions(
        &self,
        sale_id: SaleId,
        is_lump_sum: bool,
    ) -> LedgerResult<PurchaseConditions>;

    async fn amount_due(&self, request: &AmountDueRequest) -> LedgerResult<AmountDue>;

    /// Current Bs/USD rate. `Ok(None)` when the server has no usable rate.
    async fn exchange_rate(&self) -> LedgerResult<Option<ExchangeRate>>;

    async fn payment_methods(&self, currency: Currency) -> LedgerResult<PaymentMethodsCatalog>;

    async fn submit_initial_payment(
        &self,
        request: &InitialPaymentRequest,
    ) -> LedgerResult<SubmissionReceipt>;

    async fn submit_quota_payment(
        &self,
        request: &QuotaPaymentRequest,
    ) -> LedgerResult<SubmissionReceipt>;

    // =========================================================================
    // Orders
    // =========================================================================

    async fn orders(&self) -> LedgerResult<Vec<Sale>>;

    async fn order_detail(&self, sale_id: SaleId) -> LedgerResult<OrderDetailBundle>;

    async fn cancel_order(&self, request: &CancellationRequest) -> LedgerResult<RefundBreakdown>;

    // =========================================================================
    // Notifications
    // =========================================================================

    async fn unread_notifications(&self) -> LedgerResult<u32>;

    async fn notifications(&self) -> LedgerResult<Vec<Notification>>;

    async fn mark_notification_read(&self, notification_id: &str) -> LedgerResult<()>;
}
