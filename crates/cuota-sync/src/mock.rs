//! In-memory `LedgerClient` for engine tests.
//!
//! Responses are scripted per operation, failures are switched on by
//! operation name, and every call is recorded so tests can assert that no
//! request was issued.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use cuota_core::money::{Currency, ExchangeRate, Money};
use cuota_core::types::{
    CancellationRequest, CartItem, DeliveryTarget, NewShippingAddress, PurchaseConditions,
    RefundBreakdown, Sale, SaleId, ServerTotals, ShippingAddress,
};
use cuota_ledger::wire::{
    AmountDue, AmountDueRequest, InitialPaymentRequest, Locations, Notification,
    OrderDetailBundle, PaymentMethodsCatalog, QuotaPaymentRequest, ServerCart, SubmissionReceipt,
};
use cuota_ledger::{LedgerClient, LedgerError, LedgerResult};

#[derive(Default)]
struct Script {
    cart: ServerCart,
    totals: ServerTotals,
    addresses: Vec<ShippingAddress>,
    rates: VecDeque<LedgerResult<Option<ExchangeRate>>>,
    amount_due: Option<Money>,
    conditions: Option<PurchaseConditions>,
    orders: Vec<Sale>,
    detail: OrderDetailBundle,
    refund: RefundBreakdown,
    failures: HashMap<&'static str, LedgerError>,
    delays: HashMap<&'static str, VecDeque<Duration>>,
    calls: Vec<&'static str>,
    initial_requests: Vec<InitialPaymentRequest>,
    quota_requests: Vec<QuotaPaymentRequest>,
    targets: Vec<DeliveryTarget>,
    cancellations: Vec<CancellationRequest>,
}

#[derive(Default)]
pub struct MockLedger {
    script: Mutex<Script>,
}

impl MockLedger {
    pub fn new() -> Self {
        MockLedger::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut script = self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut script)
    }

    // ---- scripting ---------------------------------------------------------

    pub fn set_cart(&self, items: Vec<CartItem>, totals: ServerTotals) {
        self.with(|s| {
            s.cart = ServerCart {
                items,
                totals: totals.clone(),
            };
            s.totals = totals;
        });
    }

    pub fn set_totals(&self, totals: ServerTotals) {
        self.with(|s| s.totals = totals);
    }

    pub fn set_addresses(&self, addresses: Vec<ShippingAddress>) {
        self.with(|s| s.addresses = addresses);
    }

    /// Queues the answer for the next `exchange_rate` call.
    pub fn push_rate(&self, rate: LedgerResult<Option<ExchangeRate>>) {
        self.with(|s| s.rates.push_back(rate));
    }

    pub fn set_amount_due(&self, amount: Option<Money>) {
        self.with(|s| s.amount_due = amount);
    }

    pub fn set_conditions(&self, conditions: PurchaseConditions) {
        self.with(|s| s.conditions = Some(conditions));
    }

    pub fn set_orders(&self, orders: Vec<Sale>) {
        self.with(|s| s.orders = orders);
    }

    pub fn set_detail(&self, detail: OrderDetailBundle) {
        self.with(|s| s.detail = detail);
    }

    pub fn set_refund(&self, refund: RefundBreakdown) {
        self.with(|s| s.refund = refund);
    }

    /// Makes every call to `operation` fail with `error` until cleared.
    pub fn fail(&self, operation: &'static str, error: LedgerError) {
        self.with(|s| s.failures.insert(operation, error));
    }

    pub fn clear_failure(&self, operation: &'static str) {
        self.with(|s| s.failures.remove(operation));
    }

    /// Delays the next call to `operation`.
    pub fn delay_next(&self, operation: &'static str, delay: Duration) {
        self.with(|s| s.delays.entry(operation).or_default().push_back(delay));
    }

    // ---- inspection --------------------------------------------------------

    pub fn calls(&self) -> Vec<&'static str> {
        self.with(|s| s.calls.clone())
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.with(|s| s.calls.iter().filter(|c| **c == operation).count())
    }

    pub fn total_calls(&self) -> usize {
        self.with(|s| s.calls.len())
    }

    pub fn initial_requests(&self) -> Vec<InitialPaymentRequest> {
        self.with(|s| s.initial_requests.clone())
    }

    pub fn quota_requests(&self) -> Vec<QuotaPaymentRequest> {
        self.with(|s| s.quota_requests.clone())
    }

    pub fn targets(&self) -> Vec<DeliveryTarget> {
        self.with(|s| s.targets.clone())
    }

    pub fn cancellations(&self) -> Vec<CancellationRequest> {
        self.with(|s| s.cancellations.clone())
    }

    /// Records the call, waits any scripted delay, then applies failures.
    async fn enter(&self, operation: &'static str) -> LedgerResult<()> {
        let delay = self.with(|s| {
            s.calls.push(operation);
            s.delays.get_mut(operation).and_then(VecDeque::pop_front)
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.with(|s| s.failures.get(operation).cloned()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn fetch_cart(&self) -> LedgerResult<ServerCart> {
        self.enter("fetch_cart").await?;
        Ok(self.with(|s| s.cart.clone()))
    }

    async fn fetch_cart_totals(&self) -> LedgerResult<ServerCart> {
        self.enter("fetch_cart_totals").await?;
        Ok(self.with(|s| ServerCart {
            items: Vec::new(),
            totals: s.totals.clone(),
        }))
    }

    async fn add_cart_items(&self, items: &[CartItem]) -> LedgerResult<()> {
        self.enter("add_cart_items").await?;
        self.with(|s| s.cart.items.extend_from_slice(items));
        Ok(())
    }

    async fn update_cart_item(&self, item_id: &str, quantity: i64) -> LedgerResult<()> {
        self.enter("update_cart_item").await?;
        self.with(|s| {
            if let Some(item) = s.cart.items.iter_mut().find(|i| i.id == item_id) {
                item.quantity = quantity;
            }
        });
        Ok(())
    }

    async fn remove_cart_item(&self, item_id: &str) -> LedgerResult<()> {
        self.enter("remove_cart_item").await?;
        self.with(|s| s.cart.items.retain(|i| i.id != item_id));
        Ok(())
    }

    async fn clear_cart(&self) -> LedgerResult<()> {
        self.enter("clear_cart").await?;
        self.with(|s| s.cart.items.clear());
        Ok(())
    }

    async fn addresses(&self) -> LedgerResult<Vec<ShippingAddress>> {
        self.enter("addresses").await?;
        Ok(self.with(|s| s.addresses.clone()))
    }

    async fn add_address(&self, address: &NewShippingAddress) -> LedgerResult<ShippingAddress> {
        self.enter("add_address").await?;
        let saved = ShippingAddress {
            id: format!("addr-{}", self.with(|s| s.addresses.len() + 1)),
            full_name: address.full_name.clone(),
            street: address.street.clone(),
            building: address.building.clone(),
            apartment: address.apartment.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            phone: address.phone.clone(),
            reference: address.reference.clone(),
            is_default: address.is_default,
        };
        self.with(|s| s.addresses.push(saved.clone()));
        Ok(saved)
    }

    async fn set_delivery_target(&self, target: &DeliveryTarget) -> LedgerResult<()> {
        self.enter("set_delivery_target").await?;
        self.with(|s| s.targets.push(target.clone()));
        Ok(())
    }

    async fn locations(&self) -> LedgerResult<Locations> {
        self.enter("locations").await?;
        Ok(Locations::default())
    }

    async fn purchase_conditions(
        &self,
        sale_id: SaleId,
        is_lump_sum: bool,
    ) -> LedgerResult<PurchaseConditions> {
        self.enter("purchase_conditions").await?;
        Ok(self.with(|s| {
            s.conditions.clone().unwrap_or(PurchaseConditions {
                sale_id,
                pay_today_usd: Money::zero(),
                schedule: Vec::new(),
                credit_level: None,
                available_credit: None,
                is_lump_sum,
            })
        }))
    }

    async fn amount_due(&self, request: &AmountDueRequest) -> LedgerResult<AmountDue> {
        self.enter("amount_due").await?;
        Ok(AmountDue {
            amount: self.with(|s| s.amount_due),
            currency: request.currency,
            exchange_rate: None,
        })
    }

    async fn exchange_rate(&self) -> LedgerResult<Option<ExchangeRate>> {
        self.enter("exchange_rate").await?;
        self.with(|s| s.rates.pop_front())
            .unwrap_or(Ok(ExchangeRate::from_decimal(36.0)))
    }

    async fn payment_methods(&self, _currency: Currency) -> LedgerResult<PaymentMethodsCatalog> {
        self.enter("payment_methods").await?;
        Ok(PaymentMethodsCatalog::default())
    }

    async fn submit_initial_payment(
        &self,
        request: &InitialPaymentRequest,
    ) -> LedgerResult<SubmissionReceipt> {
        self.enter("submit_initial_payment").await?;
        self.with(|s| s.initial_requests.push(request.clone()));
        Ok(SubmissionReceipt {
            payment_id: Some("pay-1".into()),
            status: Some("en revision".into()),
            message: None,
        })
    }

    async fn submit_quota_payment(
        &self,
        request: &QuotaPaymentRequest,
    ) -> LedgerResult<SubmissionReceipt> {
        self.enter("submit_quota_payment").await?;
        self.with(|s| s.quota_requests.push(request.clone()));
        Ok(SubmissionReceipt::default())
    }

    async fn orders(&self) -> LedgerResult<Vec<Sale>> {
        self.enter("orders").await?;
        Ok(self.with(|s| s.orders.clone()))
    }

    async fn order_detail(&self, _sale_id: SaleId) -> LedgerResult<OrderDetailBundle> {
        self.enter("order_detail").await?;
        Ok(self.with(|s| s.detail.clone()))
    }

    async fn cancel_order(&self, request: &CancellationRequest) -> LedgerResult<RefundBreakdown> {
        self.enter("cancel_order").await?;
        self.with(|s| {
            s.cancellations.push(request.clone());
            Ok(s.refund.clone())
        })
    }

    async fn unread_notifications(&self) -> LedgerResult<u32> {
        self.enter("unread_notifications").await?;
        Ok(0)
    }

    async fn notifications(&self) -> LedgerResult<Vec<Notification>> {
        self.enter("notifications").await?;
        Ok(Vec::new())
    }

    async fn mark_notification_read(&self, _notification_id: &str) -> LedgerResult<()> {
        self.enter("mark_notification_read").await?;
        Ok(())
    }
}
