//! # Domain Types
//!
//! Core domain types shared by every Cuota crate.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │    CartItem     │   │  OrderSummary   │   │   DeliveryTarget    │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  id (string)    │   │  subtotal_local │   │  Address(..)        │   │
//! │  │  title          │   │  fees, discount │   │  Office(..)         │   │
//! │  │  unit_price     │   │  total_server?  │   └─────────────────────┘   │
//! │  │  quantity ≥ 1   │   │  sale_id?       │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────┐  ┌──────────────────┐   │
//! │  │      Sale       │──►│ PaymentInstallment  │  │ PaymentEvidence  │   │
//! │  │  id (i64)       │ 1:N  sequence_number   │  │  method, bank    │   │
//! │  │  status         │   │  amount_due_usd     │  │  reference       │   │
//! │  │  breakdown      │   │  status             │  │  receipt bytes   │   │
//! │  └─────────────────┘   └─────────────────────┘  └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! - Cart items use the server's string id, or a `tmp-<uuid>` placeholder
//! - Sales and quotas use the server's integer ids

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Currency, ExchangeRate, Money, Percent};
use crate::status::{QuotaStatus, SaleStatus};

/// Server identifier of a sale.
pub type SaleId = i64;

/// Server identifier of a quota.
pub type QuotaId = i64;

// =============================================================================
// Cart Item
// =============================================================================

/// One product line awaiting purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    /// Stable id shared by the local and server copies.
    pub id: String,

    pub title: String,

    /// Never negative.
    pub unit_price: Money,

    /// Always at least 1.
    pub quantity: i64,

    pub image_url: Option<String>,
    pub provider_name: Option<String>,
    pub sku: Option<String>,
    pub source_url: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl CartItem {
    /// Creates an item with quantity 1 and no optional details.
    pub fn new(id: impl Into<String>, title: impl Into<String>, unit_price: Money) -> Self {
        CartItem {
            id: id.into(),
            title: title.into(),
            unit_price: unit_price.non_negative(),
            quantity: 1,
            image_url: None,
            provider_name: None,
            sku: None,
            source_url: None,
            color: None,
            size: None,
        }
    }

    /// Sets the quantity (builder style, clamped to 1).
    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    /// `unit_price × quantity`.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// Secondary identity used when merging items that arrive without a
    /// matching id: case- and whitespace-insensitive title plus price.
    pub fn match_key(&self) -> (String, i64) {
        let title = self
            .title
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        (title, self.unit_price.cents())
    }
}

// =============================================================================
// Order Summary
// =============================================================================

/// Shipping mode. Only air freight can currently be purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ShippingMode {
    #[default]
    Air,
    Sea,
}

impl ShippingMode {
    pub const fn is_purchasable(&self) -> bool {
        matches!(self, ShippingMode::Air)
    }
}

/// The server's half of the order summary (everything but the subtotal).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ServerTotals {
    pub tax: Money,
    pub handling_fee: Money,
    pub shipping_fee: Money,
    pub product_fee: Money,
    pub additional_fee: Money,
    pub discount: Money,
    pub total: Option<Money>,
    pub shipping_mode: ShippingMode,
    pub address_id: Option<String>,
    pub sale_id: Option<SaleId>,
}

/// Financial snapshot for the active cart.
///
/// ## Two Sources Of Truth
/// ```text
/// subtotal_local  ◄── recomputed from local items after EVERY edit
/// total_server    ◄── last server answer (may lag behind an edit)
///
/// qty 2 → 3          subtotal_local: 39.98 → 59.97  (instant)
///                    total_server:   45.12 → 65.47  (after refresh)
/// ```
/// The two may differ between a local edit and the next refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderSummary {
    pub subtotal_local: Money,
    pub tax: Money,
    pub handling_fee: Money,
    pub product_fee: Money,
    pub shipping_fee: Money,
    pub additional_fee: Money,
    pub discount: Money,
    pub total_server: Option<Money>,
    pub shipping_mode: ShippingMode,
    pub active_address_id: Option<String>,
    pub sale_id: Option<SaleId>,
}

impl OrderSummary {
    /// Combines the local subtotal with the latest server totals.
    pub fn compose(subtotal_local: Money, totals: &ServerTotals) -> Self {
        OrderSummary {
            subtotal_local,
            tax: totals.tax,
            handling_fee: totals.handling_fee,
            product_fee: totals.product_fee,
            shipping_fee: totals.shipping_fee,
            additional_fee: totals.additional_fee,
            discount: totals.discount,
            total_server: totals.total,
            shipping_mode: totals.shipping_mode,
            active_address_id: totals.address_id.clone(),
            sale_id: totals.sale_id,
        }
    }

    /// Amount shown as "total": the server figure, or the local subtotal
    /// until the server has answered.
    pub fn total(&self) -> Money {
        self.total_server.unwrap_or(self.subtotal_local)
    }
}

// =============================================================================
// Delivery
// =============================================================================

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingAddress {
    pub id: String,
    pub full_name: String,
    pub street: String,
    pub building: Option<String>,
    pub apartment: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: Option<String>,
    pub phone: String,
    pub reference: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Address form contents before the server assigns an id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewShippingAddress {
    pub full_name: String,
    pub street: String,
    pub building: Option<String>,
    pub apartment: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: Option<String>,
    pub phone: String,
    pub reference: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// A pickup office from the carrier's fixed reference list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PickupOffice {
    pub code: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub address: String,
    pub phone: Option<String>,
}

/// Where the sale is delivered. Exactly one is active per sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
#[ts(export)]
pub enum DeliveryTarget {
    Address(ShippingAddress),
    Office(PickupOffice),
}

impl DeliveryTarget {
    pub fn option(&self) -> DeliveryOption {
        match self {
            DeliveryTarget::Address(_) => DeliveryOption::Address,
            DeliveryTarget::Office(_) => DeliveryOption::Zoom,
        }
    }
}

/// Checkout tab: home delivery or carrier pickup office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DeliveryOption {
    #[default]
    Address,
    Zoom,
}

/// Installments (default) or one lump-sum payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentModality {
    #[default]
    Installments,
    Cash,
}

impl PaymentModality {
    pub const fn is_lump_sum(&self) -> bool {
        matches!(self, PaymentModality::Cash)
    }
}

// =============================================================================
// Sale & Quotas
// =============================================================================

/// The authoritative purchase record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: SaleId,
    pub status: SaleStatus,
    /// Status text exactly as the server sent it.
    pub raw_status: String,
    pub subtotal: Money,
    pub tax: Money,
    pub handling_fee: Money,
    pub shipping_fee: Money,
    pub product_fee: Money,
    pub additional_fee: Money,
    pub discount: Money,
    pub total: Money,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Sale {
    pub fn can_cancel(&self) -> bool {
        self.status.can_cancel()
    }
}

/// One scheduled installment of a sale's plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentInstallment {
    pub id: QuotaId,
    pub sequence_number: i32,
    pub amount_due_usd: Money,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub status: QuotaStatus,
    pub late_interest: Money,
    pub outstanding_balance: Money,
}

impl PaymentInstallment {
    /// Amount to pay now: the installment plus any late interest.
    pub fn amount_to_pay_usd(&self) -> Money {
        self.amount_due_usd + self.late_interest
    }
}

/// The initial payment recorded against a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InitialPaymentRecord {
    pub amount_usd: Money,
    pub amount_bs: Option<Money>,
    pub method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub status: QuotaStatus,
    #[ts(as = "Option<String>")]
    pub submitted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Payment Evidence
// =============================================================================

/// How the customer paid outside the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMethod {
    #[serde(alias = "pago_movil", alias = "pago movil")]
    MobileTransfer,
    #[serde(alias = "transferencia")]
    BankTransfer,
    Zelle,
    #[serde(alias = "efectivo")]
    Cash,
    Binance,
    #[serde(rename = "paypal", alias = "pay_pal")]
    PayPal,
    #[serde(other)]
    Other,
}

impl PaymentMethod {
    /// Cash skips reference, amount and bank fields.
    pub const fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }

    pub const fn code(&self) -> &'static str {
        match self {
            PaymentMethod::MobileTransfer => "mobile_transfer",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Zelle => "zelle",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Binance => "binance",
            PaymentMethod::PayPal => "paypal",
            PaymentMethod::Other => "other",
        }
    }
}

/// Validated proof of an out-of-app payment. Created once, sent once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvidence {
    pub method: PaymentMethod,
    pub bank_code: Option<String>,
    pub reference_number: Option<String>,
    pub declared_amount: Option<Money>,
    pub currency: Currency,
    /// Raw image bytes; base64-encoded only when the request is built.
    pub receipt_image: Vec<u8>,
    pub submitted_at: DateTime<Utc>,
}

// =============================================================================
// Server-Computed Plans
// =============================================================================

/// A BS/USD quote, valid for the current screen only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExchangeRateQuote {
    pub rate: ExchangeRate,
    /// True when the quote is the fixed fallback, not a server answer.
    pub fallback: bool,
}

/// One row of the installment schedule returned by the calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScheduledQuota {
    pub sequence_number: i32,
    pub amount_usd: Money,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
}

/// Installment plan computed by the backend for one sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseConditions {
    pub sale_id: SaleId,
    /// USD due today (initial payment, or the whole amount if lump sum).
    pub pay_today_usd: Money,
    pub schedule: Vec<ScheduledQuota>,
    pub credit_level: Option<String>,
    pub available_credit: Option<Money>,
    pub is_lump_sum: bool,
}

// =============================================================================
// Cancellation
// =============================================================================

/// National id type prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum IdPrefix {
    /// Venezuelan citizen.
    V,
    /// Foreign resident.
    E,
    /// Company (RIF).
    J,
}

impl std::str::FromStr for IdPrefix {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "V" => Ok(IdPrefix::V),
            "E" => Ok(IdPrefix::E),
            "J" => Ok(IdPrefix::J),
            _ => Err(crate::error::ValidationError::select("id type")),
        }
    }
}

/// Validated request to cancel a sale and refund what was paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CancellationRequest {
    pub sale_id: SaleId,
    pub reason: String,
    pub refund_phone: String,
    pub refund_bank_code: String,
    pub id_prefix: IdPrefix,
    pub id_number: String,
}

/// Refund figures as computed by the backend. Rendered, never derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundBreakdown {
    pub total_paid_usd: Money,
    pub penalty_rate: Percent,
    pub penalty_usd: Money,
    pub late_quota_penalty_usd: Money,
    pub late_quota_count: u32,
    pub net_refund_usd: Money,
    pub net_refund_bs: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let item = CartItem::new("A", "Widget", Money::from_cents(1999)).with_quantity(3);
        assert_eq!(item.line_total().cents(), 5997);
    }

    #[test]
    fn test_new_item_clamps_price_and_quantity() {
        let item = CartItem::new("A", "Widget", Money::from_cents(-10)).with_quantity(0);
        assert_eq!(item.unit_price, Money::zero());
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_match_key_ignores_case_and_spacing() {
        let a = CartItem::new("1", "Blue  Shirt", Money::from_cents(1500));
        let b = CartItem::new("2", " blue shirt ", Money::from_cents(1500));
        let c = CartItem::new("3", "blue shirt", Money::from_cents(1600));
        assert_eq!(a.match_key(), b.match_key());
        assert_ne!(a.match_key(), c.match_key());
    }

    #[test]
    fn test_summary_total_falls_back_to_subtotal() {
        let summary = OrderSummary::compose(Money::from_cents(5997), &ServerTotals::default());
        assert_eq!(summary.total(), Money::from_cents(5997));

        let totals = ServerTotals {
            total: Some(Money::from_cents(6547)),
            ..Default::default()
        };
        let summary = OrderSummary::compose(Money::from_cents(5997), &totals);
        assert_eq!(summary.total(), Money::from_cents(6547));
        assert_eq!(summary.subtotal_local, Money::from_cents(5997));
    }

    #[test]
    fn test_only_air_is_purchasable() {
        assert!(ShippingMode::Air.is_purchasable());
        assert!(!ShippingMode::Sea.is_purchasable());
    }

    #[test]
    fn test_payment_method_aliases() {
        let m: PaymentMethod = serde_json::from_str("\"pago_movil\"").unwrap();
        assert_eq!(m, PaymentMethod::MobileTransfer);
        let m: PaymentMethod = serde_json::from_str("\"efectivo\"").unwrap();
        assert!(m.is_cash());
        let m: PaymentMethod = serde_json::from_str("\"cripto\"").unwrap();
        assert_eq!(m, PaymentMethod::Other);
    }

    #[test]
    fn test_delivery_target_option() {
        let office = PickupOffice {
            code: "CCS-01".to_string(),
            name: "Zoom Chacao".to_string(),
            city: "Caracas".to_string(),
            state: "Miranda".to_string(),
            address: "Av. Francisco de Miranda".to_string(),
            phone: None,
        };
        assert_eq!(DeliveryTarget::Office(office).option(), DeliveryOption::Zoom);
    }

    #[test]
    fn test_id_prefix_parsing() {
        assert_eq!("v".parse::<IdPrefix>().unwrap(), IdPrefix::V);
        assert!("X".parse::<IdPrefix>().is_err());
    }
}
