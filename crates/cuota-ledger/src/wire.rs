//! # Wire Types
//!
//! Request bodies sent to, and responses read from, the Edge Functions.
//!
//! ## Conventions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Requests                          │  Responses                        │
//! │  ────────                          │  ─────────                        │
//! │  • Strict serde structs            │  • Read through cuota_core::coerce│
//! │  • Money → JSON decimal (19.99)    │    (key fallbacks, numeric       │
//! │  • Receipt → base64 (STANDARD)     │    strings, missing ids)         │
//! │  • Built once from validated       │  • Stable shapes (locations,     │
//! │    domain types                    │    methods) use serde derives    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use cuota_core::banks::REFUND_BANKS;
use cuota_core::coerce::{self, Loose};
use cuota_core::money::{Currency, ExchangeRate, Money};
use cuota_core::types::{
    CartItem, DeliveryOption, DeliveryTarget, InitialPaymentRecord, PaymentEvidence,
    PaymentInstallment, PaymentMethod, PickupOffice, QuotaId, Sale, SaleId, ServerTotals,
};

// =============================================================================
// Cart
// =============================================================================

/// Server copy of the cart: items plus summary fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerCart {
    pub items: Vec<CartItem>,
    pub totals: ServerTotals,
}

impl ServerCart {
    /// Accepts `{items, summary}`, `{cart_items, totals}`, a bare item
    /// array, or summary fields inline next to `items`.
    pub fn from_value(value: &Value) -> Self {
        if let Some(items) = value.as_array() {
            return ServerCart {
                items: items.iter().map(coerce::cart_item).collect(),
                totals: ServerTotals::default(),
            };
        }

        let v = Loose::new(value);
        let items = v
            .array(&["items", "cart_items", "cart"])
            .iter()
            .map(coerce::cart_item)
            .collect();
        let totals = v
            .field(&["summary", "totals", "cart_summary"])
            .map(coerce::server_totals)
            .unwrap_or_else(|| coerce::server_totals(value));

        ServerCart { items, totals }
    }
}

/// One cart line as the backend stores it.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemPayload {
    /// Client id; `tmp-` ids are replaced by the server.
    pub client_id: String,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: i64,
    pub image_url: Option<String>,
    pub provider_name: Option<String>,
    pub sku: Option<String>,
    pub product_url: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl From<&CartItem> for CartItemPayload {
    fn from(item: &CartItem) -> Self {
        CartItemPayload {
            client_id: item.id.clone(),
            product_name: item.title.clone(),
            unit_price: item.unit_price.to_decimal(),
            quantity: item.quantity,
            image_url: item.image_url.clone(),
            provider_name: item.provider_name.clone(),
            sku: item.sku.clone(),
            product_url: item.source_url.clone(),
            color: item.color.clone(),
            size: item.size.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AddCartItemsRequest {
    pub items: Vec<CartItemPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateCartItemRequest {
    pub item_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveCartItemRequest {
    pub item_id: String,
}

// =============================================================================
// Delivery
// =============================================================================

/// Marks an address or a pickup office as the cart's active target.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryTargetRequest {
    pub delivery_type: DeliveryOption,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office: Option<PickupOffice>,
}

impl From<&DeliveryTarget> for DeliveryTargetRequest {
    fn from(target: &DeliveryTarget) -> Self {
        match target {
            DeliveryTarget::Address(address) => DeliveryTargetRequest {
                delivery_type: DeliveryOption::Address,
                address_id: Some(address.id.clone()),
                office: None,
            },
            DeliveryTarget::Office(office) => DeliveryTargetRequest {
                delivery_type: DeliveryOption::Zoom,
                address_id: None,
                office: Some(office.clone()),
            },
        }
    }
}

/// States and their cities, for the address form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locations {
    #[serde(default, alias = "estados")]
    pub states: Vec<String>,
    #[serde(default, alias = "cities", alias = "ciudades")]
    pub cities_by_state: BTreeMap<String, Vec<String>>,
}

impl Locations {
    pub fn cities(&self, state: &str) -> &[String] {
        self.cities_by_state
            .get(state)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// =============================================================================
// Payment Plan
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseConditionsRequest {
    pub sale_id: SaleId,
    pub is_lump_sum: bool,
}

/// Asks for the amount due on a sale (initial) or on one quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AmountDueRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<SaleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_id: Option<QuotaId>,
    pub currency: Currency,
}

impl AmountDueRequest {
    pub fn initial(sale_id: SaleId, currency: Currency) -> Self {
        AmountDueRequest {
            sale_id: Some(sale_id),
            quota_id: None,
            currency,
        }
    }

    pub fn quota(quota_id: QuotaId, currency: Currency) -> Self {
        AmountDueRequest {
            sale_id: None,
            quota_id: Some(quota_id),
            currency,
        }
    }

    /// Which endpoint answers this request.
    pub fn is_quota(&self) -> bool {
        self.quota_id.is_some()
    }
}

/// Authoritative amount due in the requested currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountDue {
    /// `None` when the server had no figure for this currency.
    pub amount: Option<Money>,
    pub currency: Currency,
    pub exchange_rate: Option<ExchangeRate>,
}

impl AmountDue {
    pub fn from_value(value: &Value, currency: Currency) -> Self {
        let v = Loose::new(value);
        let amount = match currency {
            Currency::Bs => v.money(&["amount_bs", "monto_bs", "amount", "monto"]),
            Currency::Usd => v.money(&["amount_usd", "monto_usd", "amount", "monto"]),
        };

        AmountDue {
            amount: amount.filter(|a| a.is_positive()),
            currency,
            exchange_rate: v
                .float(&["exchange_rate", "tasa", "rate"])
                .and_then(ExchangeRate::from_decimal),
        }
    }
}

/// Reads a rate quote. `None` for missing, zero or negative rates.
pub fn exchange_rate_from_value(value: &Value) -> Option<ExchangeRate> {
    if let Some(n) = value.as_f64() {
        return ExchangeRate::from_decimal(n);
    }
    Loose::new(value)
        .float(&["rate", "tasa", "exchange_rate", "bcv", "usd"])
        .and_then(ExchangeRate::from_decimal)
}

// =============================================================================
// Payment Methods
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodOption {
    pub method: PaymentMethod,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankOption {
    pub code: String,
    pub name: String,
}

/// Payment options and banks available for one currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodsCatalog {
    #[serde(default)]
    pub methods: Vec<PaymentMethodOption>,
    #[serde(default)]
    pub banks: Vec<BankOption>,
}

impl PaymentMethodsCatalog {
    /// Server banks, or the bundled reference list when the server sent none.
    pub fn banks_or_default(&self) -> Vec<BankOption> {
        if !self.banks.is_empty() {
            return self.banks.clone();
        }
        REFUND_BANKS
            .iter()
            .map(|b| BankOption {
                code: b.code.to_string(),
                name: b.name.to_string(),
            })
            .collect()
    }
}

// =============================================================================
// Payment Submission
// =============================================================================

/// USD amount due plus its BS equivalent when paying in bolivares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentAmounts {
    pub usd: Money,
    pub bs: Option<Money>,
}

/// Evidence for the first payment of a sale.
#[derive(Clone, Serialize)]
pub struct InitialPaymentRequest {
    pub sale_id: SaleId,
    pub usd_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bs_amount: Option<f64>,
    pub deposited_amount: Option<f64>,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub bank_code: Option<String>,
    pub reference: Option<String>,
    pub receipt_base64: String,
    pub submitted_at: DateTime<Utc>,
}

impl InitialPaymentRequest {
    pub fn new(sale_id: SaleId, amounts: PaymentAmounts, evidence: &PaymentEvidence) -> Self {
        InitialPaymentRequest {
            sale_id,
            usd_amount: amounts.usd.to_decimal(),
            bs_amount: bs_amount(amounts, evidence.currency),
            deposited_amount: evidence.declared_amount.map(|m| m.to_decimal()),
            currency: evidence.currency,
            payment_method: evidence.method,
            bank_code: evidence.bank_code.clone(),
            reference: evidence.reference_number.clone(),
            receipt_base64: STANDARD.encode(&evidence.receipt_image),
            submitted_at: evidence.submitted_at,
        }
    }
}

/// Evidence for one scheduled quota.
#[derive(Clone, Serialize)]
pub struct QuotaPaymentRequest {
    pub quota_id: QuotaId,
    pub usd_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bs_amount: Option<f64>,
    pub payment_method: PaymentMethod,
    pub bank_code: Option<String>,
    pub reference: Option<String>,
    pub receipt_base64: String,
}

impl QuotaPaymentRequest {
    pub fn new(quota_id: QuotaId, amounts: PaymentAmounts, evidence: &PaymentEvidence) -> Self {
        QuotaPaymentRequest {
            quota_id,
            usd_amount: amounts.usd.to_decimal(),
            bs_amount: bs_amount(amounts, evidence.currency),
            payment_method: evidence.method,
            bank_code: evidence.bank_code.clone(),
            reference: evidence.reference_number.clone(),
            receipt_base64: STANDARD.encode(&evidence.receipt_image),
        }
    }
}

fn bs_amount(amounts: PaymentAmounts, currency: Currency) -> Option<f64> {
    match currency {
        Currency::Bs => amounts.bs.map(|m| m.to_decimal()),
        Currency::Usd => None,
    }
}

// Receipts are large and private; Debug shows only their size.
impl fmt::Debug for InitialPaymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitialPaymentRequest")
            .field("sale_id", &self.sale_id)
            .field("usd_amount", &self.usd_amount)
            .field("bs_amount", &self.bs_amount)
            .field("currency", &self.currency)
            .field("payment_method", &self.payment_method)
            .field("receipt_base64_len", &self.receipt_base64.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for QuotaPaymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotaPaymentRequest")
            .field("quota_id", &self.quota_id)
            .field("usd_amount", &self.usd_amount)
            .field("bs_amount", &self.bs_amount)
            .field("payment_method", &self.payment_method)
            .field("receipt_base64_len", &self.receipt_base64.len())
            .finish_non_exhaustive()
    }
}

/// Acknowledgement of an accepted submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub payment_id: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
}

impl SubmissionReceipt {
    pub fn from_value(value: &Value) -> Self {
        let v = Loose::new(value);
        SubmissionReceipt {
            payment_id: v.string(&["payment_id", "id", "pago_id"]),
            status: v.string(&["status", "estado"]),
            message: v.string(&["message", "mensaje"]),
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SaleRef {
    pub sale_id: SaleId,
}

/// Everything the order detail screen needs, each part optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDetailBundle {
    pub order: Option<Sale>,
    pub items: Vec<CartItem>,
    pub initial_payment: Option<InitialPaymentRecord>,
    pub quotas: Vec<PaymentInstallment>,
}

impl OrderDetailBundle {
    pub fn from_value(value: &Value) -> Self {
        let v = Loose::new(value);
        OrderDetailBundle {
            order: v.field(&["order", "sale", "venta"]).and_then(coerce::sale),
            items: v
                .array(&["items", "order_items", "productos"])
                .iter()
                .map(coerce::cart_item)
                .collect(),
            initial_payment: v
                .field(&["initial_payment", "pago_inicial"])
                .filter(|p| p.is_object())
                .map(coerce::initial_payment),
            quotas: v
                .array(&["quotas", "cuotas", "installments"])
                .iter()
                .filter_map(coerce::installment)
                .collect(),
        }
    }
}

/// Reads the order list (bare array or `{orders: [...]}`).
pub fn orders_from_value(value: &Value) -> Vec<Sale> {
    let rows = match value.as_array() {
        Some(rows) => rows.as_slice(),
        None => Loose::new(value).array(&["orders", "sales", "ventas"]),
    };
    rows.iter().filter_map(coerce::sale).collect()
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub sale_id: Option<SaleId>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn from_value(value: &Value) -> Option<Self> {
        let v = Loose::new(value);
        Some(Notification {
            id: v.string(&["id"])?,
            title: v.string(&["title", "titulo"]).unwrap_or_default(),
            body: v.string(&["body", "message", "mensaje"]).unwrap_or_default(),
            read: v.boolean(&["read", "is_read", "leida"]).unwrap_or(false),
            sale_id: v.int(&["sale_id", "venta_id"]),
            created_at: v.timestamp(&["created_at", "fecha"]),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationRef {
    pub notification_id: String,
}
