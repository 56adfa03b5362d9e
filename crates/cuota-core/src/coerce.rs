//! # Coerce Module
//!
//! Tolerant readers for the backend's loosely shaped JSON.
//!
//! ## Why?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The same cart item has arrived over time as:                           │
//! │                                                                         │
//! │   { "id": 12, "product_name": "Widget", "price": "19.99", "qty": 2 }    │
//! │   { "cart_item_id": "ab-1", "title": "Widget", "unit_price": 19.99 }    │
//! │   { "name": "Widget", "precio": null, "cantidad": "dos" }               │
//! │                                                                         │
//! │  Each field is read through a fallback chain of keys, and numbers are   │
//! │  accepted as JSON numbers or numeric strings:                           │
//! │                                                                         │
//! │   price:    non-numeric → 0,  negative → 0                              │
//! │   quantity: non-numeric → 1,  below 1  → 1                              │
//! │   id:       missing     → "tmp-<uuid>"                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Strict `serde` derives are used everywhere the shape is stable; this
//! module exists only for payloads that historically were not.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::money::{Money, Percent};
use crate::status::{QuotaStatus, SaleStatus};
use crate::types::{
    CartItem, InitialPaymentRecord, PaymentInstallment, PaymentMethod, PurchaseConditions,
    RefundBreakdown, SaleId, Sale, ScheduledQuota, ServerTotals, ShippingAddress, ShippingMode,
};
use crate::TEMP_ID_PREFIX;

// =============================================================================
// Loose Reader
// =============================================================================

/// Field reader over one JSON object with key fallback chains.
#[derive(Debug, Clone, Copy)]
pub struct Loose<'a>(&'a Value);

impl<'a> Loose<'a> {
    pub fn new(value: &'a Value) -> Self {
        Loose(value)
    }

    /// First present, non-null value among `keys`.
    pub fn field(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find(|value| !value.is_null())
    }

    /// Non-empty trimmed string. Numbers are accepted and stringified.
    pub fn string(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(|value| match value {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    /// Decimal amount from a number or numeric string.
    pub fn money(&self, keys: &[&str]) -> Option<Money> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(number_of)
            .map(Money::from_decimal)
    }

    /// Integer from a number or numeric string (fractions are rounded).
    pub fn int(&self, keys: &[&str]) -> Option<i64> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(number_of)
            .map(|n| n.round() as i64)
    }

    pub fn float(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().filter_map(|key| self.0.get(*key)).find_map(number_of)
    }

    /// Booleans, plus the strings "true"/"false" and numbers 0/1.
    pub fn boolean(&self, keys: &[&str]) -> Option<bool> {
        self.field(keys).and_then(|value| match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "si" | "sí" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    /// Calendar date from `YYYY-MM-DD` or the date part of a timestamp.
    pub fn date(&self, keys: &[&str]) -> Option<NaiveDate> {
        let raw = self.string(keys)?;
        let head = raw.get(..10).unwrap_or(&raw);
        NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
    }

    /// RFC 3339 timestamp.
    pub fn timestamp(&self, keys: &[&str]) -> Option<DateTime<Utc>> {
        let raw = self.string(keys)?;
        DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Array under the first matching key, or an empty slice.
    pub fn array(&self, keys: &[&str]) -> &'a [Value] {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(|value| value.as_array())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Nested object under the first matching key.
    pub fn object(&self, keys: &[&str]) -> Option<Loose<'a>> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find(|value| value.is_object())
            .map(Loose)
    }
}

fn number_of(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

// =============================================================================
// Scalar Coercions
// =============================================================================

/// Price coercion: missing or non-numeric → 0, negative → 0.
pub fn price(value: Option<&Value>) -> Money {
    value
        .and_then(number_of)
        .map(Money::from_decimal)
        .unwrap_or_default()
        .non_negative()
}

/// Quantity coercion: missing or non-numeric → 1, below 1 → 1.
pub fn quantity(value: Option<&Value>) -> i64 {
    value
        .and_then(number_of)
        .map(|n| n.round() as i64)
        .unwrap_or(1)
        .max(1)
}

/// Placeholder id for items the server has not assigned one to.
pub fn temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4())
}

// =============================================================================
// Entity Readers
// =============================================================================

/// Maps one server (or scraped) cart item into a [`CartItem`].
pub fn cart_item(value: &Value) -> CartItem {
    let v = Loose::new(value);
    // Some payloads nest product details under "product".
    let product = v.object(&["product", "producto"]);
    let pick = |keys: &[&str]| v.string(keys).or_else(|| product.and_then(|p| p.string(keys)));

    CartItem {
        id: v
            .string(&["id", "cart_item_id", "item_id", "product_id"])
            .unwrap_or_else(temp_id),
        title: pick(&["product_name", "title", "name", "nombre"])
            .unwrap_or_else(|| "Producto".to_string()),
        unit_price: price(
            v.field(&["unit_price", "price", "precio"])
                .or_else(|| product.and_then(|p| p.field(&["unit_price", "price", "precio"]))),
        ),
        quantity: quantity(v.field(&["quantity", "qty", "cantidad"])),
        image_url: pick(&["image_url", "image", "imagen", "thumbnail"]),
        provider_name: pick(&["provider_name", "store_name", "provider", "tienda"]),
        sku: pick(&["sku", "product_sku"]),
        source_url: pick(&["product_url", "source_url", "url"]),
        color: pick(&["color"]),
        size: pick(&["size", "talla"]),
    }
}

/// Reads the summary fields of a cart or totals payload.
pub fn server_totals(value: &Value) -> ServerTotals {
    let v = Loose::new(value);
    let money = |keys: &[&str]| v.money(keys).unwrap_or_default();

    let shipping_mode = match v
        .string(&["shipping_mode", "shipping_type", "tipo_envio"])
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("sea") | Some("maritimo") | Some("marítimo") => ShippingMode::Sea,
        _ => ShippingMode::Air,
    };

    ServerTotals {
        tax: money(&["tax", "taxes", "impuesto", "iva"]),
        handling_fee: money(&["handling_fee", "handling", "manejo"]),
        shipping_fee: money(&["shipping_fee", "shipping_cost", "envio"]),
        product_fee: money(&["product_fee", "product_fees"]),
        additional_fee: money(&["additional_fee", "additional_fees", "cargos_adicionales"]),
        discount: money(&["discount", "descuento"]),
        total: v.money(&["total", "total_amount", "monto_total"]),
        shipping_mode,
        address_id: v.string(&["address_id", "shipping_address_id", "direccion_id"]),
        sale_id: v.int(&["sale_id", "venta_id", "id_venta"]),
    }
}

/// Reads a saved address. `None` when the payload has no id.
pub fn shipping_address(value: &Value) -> Option<ShippingAddress> {
    let v = Loose::new(value);
    let text = |keys: &[&str]| v.string(keys).unwrap_or_default();

    Some(ShippingAddress {
        id: v.string(&["id", "address_id"])?,
        full_name: text(&["full_name", "name", "nombre"]),
        street: text(&["street", "address_line", "calle"]),
        building: v.string(&["building", "edificio"]),
        apartment: v.string(&["apartment", "apartamento"]),
        city: text(&["city", "ciudad"]),
        state: text(&["state", "estado"]),
        postal_code: v.string(&["postal_code", "zip_code", "codigo_postal"]),
        phone: text(&["phone", "telefono"]),
        reference: v.string(&["reference", "referencia", "notes"]),
        is_default: v.boolean(&["is_default", "predeterminada"]).unwrap_or(false),
    })
}

/// Reads an order header. `None` when the payload has no sale id.
pub fn sale(value: &Value) -> Option<Sale> {
    let v = Loose::new(value);
    let id = v.int(&["id", "sale_id", "venta_id"])?;
    let money = |keys: &[&str]| v.money(keys).unwrap_or_default();
    let raw_status = v.string(&["status", "estado"]).unwrap_or_default();
    let subtotal = money(&["subtotal", "sub_total"]);

    Some(Sale {
        id,
        status: SaleStatus::from_raw(&raw_status),
        raw_status,
        subtotal,
        tax: money(&["tax", "taxes", "impuesto"]),
        handling_fee: money(&["handling_fee", "manejo"]),
        shipping_fee: money(&["shipping_fee", "shipping_cost", "envio"]),
        product_fee: money(&["product_fee"]),
        additional_fee: money(&["additional_fee", "additional_fees"]),
        discount: money(&["discount", "descuento"]),
        total: v.money(&["total", "total_amount", "monto_total"]).unwrap_or(subtotal),
        notes: v.string(&["notes", "notas"]),
        created_at: v.timestamp(&["created_at", "fecha"]),
    })
}

/// Reads one quota. `None` when the payload has no quota id.
pub fn installment(value: &Value) -> Option<PaymentInstallment> {
    let v = Loose::new(value);
    let amount = v
        .money(&["amount_due_usd", "amount_usd", "amount", "monto"])
        .unwrap_or_default();

    Some(PaymentInstallment {
        id: v.int(&["id", "quota_id", "cuota_id"])?,
        sequence_number: v
            .int(&["sequence_number", "quota_number", "numero_cuota", "number"])
            .unwrap_or(0) as i32,
        amount_due_usd: amount,
        due_date: v.date(&["due_date", "fecha_vencimiento"]),
        status: QuotaStatus::from_raw(&v.string(&["status", "estado"]).unwrap_or_default()),
        late_interest: v
            .money(&["late_interest", "late_interest_amount", "interes_mora"])
            .unwrap_or_default(),
        outstanding_balance: v
            .money(&["outstanding_balance", "saldo_pendiente"])
            .unwrap_or(amount),
    })
}

/// Reads the initial payment record of an order.
pub fn initial_payment(value: &Value) -> InitialPaymentRecord {
    let v = Loose::new(value);
    InitialPaymentRecord {
        amount_usd: v
            .money(&["amount_usd", "usd_amount", "monto_usd", "amount"])
            .unwrap_or_default(),
        amount_bs: v.money(&["amount_bs", "bs_amount", "monto_bs"]),
        method: v
            .field(&["payment_method", "method", "metodo"])
            .and_then(|m| serde_json::from_value::<PaymentMethod>(m.clone()).ok()),
        reference: v.string(&["reference", "reference_number", "referencia"]),
        status: QuotaStatus::from_raw(&v.string(&["status", "estado"]).unwrap_or_default()),
        submitted_at: v.timestamp(&["created_at", "submitted_at", "fecha"]),
    }
}

/// Reads the calculator's answer for a sale.
pub fn purchase_conditions(sale_id: SaleId, is_lump_sum: bool, value: &Value) -> PurchaseConditions {
    let v = Loose::new(value);
    let schedule = v
        .array(&["cuotas", "quotas", "schedule"])
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let r = Loose::new(row);
            ScheduledQuota {
                sequence_number: r
                    .int(&["numero", "number", "sequence_number"])
                    .unwrap_or(index as i64 + 1) as i32,
                amount_usd: r.money(&["monto", "amount", "amount_usd"]).unwrap_or_default(),
                due_date: r.date(&["fecha", "due_date", "fecha_vencimiento"]),
            }
        })
        .collect();

    PurchaseConditions {
        sale_id,
        pay_today_usd: v
            .money(&["pago_hoy", "pay_today", "initial_payment"])
            .unwrap_or_default(),
        schedule,
        credit_level: v.string(&["nivel", "level", "credit_level"]),
        available_credit: v.money(&["credito_disponible", "available_credit"]),
        is_lump_sum: v.boolean(&["is_lump_sum", "contado"]).unwrap_or(is_lump_sum),
    }
}

/// Reads the refund figures of a cancellation response.
pub fn refund_breakdown(value: &Value) -> RefundBreakdown {
    let v = Loose::new(value);
    let money = |keys: &[&str]| v.money(keys).unwrap_or_default();

    RefundBreakdown {
        total_paid_usd: money(&["total_paid", "total_paid_usd", "total_pagado"]),
        penalty_rate: Percent::from_percentage(
            v.float(&["penalty_percentage", "penalty_rate", "porcentaje_penalizacion"])
                .unwrap_or_default(),
        ),
        penalty_usd: money(&["penalty_amount", "penalty_usd", "penalizacion"]),
        late_quota_penalty_usd: money(&["late_quota_penalty", "penalizacion_cuotas_atrasadas"]),
        late_quota_count: v
            .int(&["late_quota_count", "cuotas_atrasadas"])
            .unwrap_or(0)
            .max(0) as u32,
        net_refund_usd: money(&["refund_amount_usd", "net_refund_usd", "reembolso_usd"]),
        net_refund_bs: money(&["refund_amount_bs", "net_refund_bs", "reembolso_bs"]),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_coercion() {
        assert_eq!(price(Some(&json!(19.99))).cents(), 1999);
        assert_eq!(price(Some(&json!("19.99"))).cents(), 1999);
        assert_eq!(price(Some(&json!("gratis"))).cents(), 0);
        assert_eq!(price(Some(&json!(-4))).cents(), 0);
        assert_eq!(price(None).cents(), 0);
    }

    #[test]
    fn test_quantity_coercion() {
        assert_eq!(quantity(Some(&json!(3))), 3);
        assert_eq!(quantity(Some(&json!("2"))), 2);
        assert_eq!(quantity(Some(&json!("dos"))), 1);
        assert_eq!(quantity(Some(&json!(0))), 1);
        assert_eq!(quantity(Some(&json!(-5))), 1);
        assert_eq!(quantity(None), 1);
    }

    #[test]
    fn test_cart_item_fallback_chain() {
        let item = cart_item(&json!({
            "cart_item_id": 12,
            "name": "Widget",
            "price": "19.99",
            "qty": 2,
            "store_name": "Shein"
        }));
        assert_eq!(item.id, "12");
        assert_eq!(item.title, "Widget");
        assert_eq!(item.unit_price.cents(), 1999);
        assert_eq!(item.quantity, 2);
        assert_eq!(item.provider_name.as_deref(), Some("Shein"));
    }

    #[test]
    fn test_cart_item_nested_product() {
        let item = cart_item(&json!({
            "id": "x1",
            "quantity": 1,
            "product": { "title": "Lamp", "price": 12.5, "image_url": "https://img/x.png" }
        }));
        assert_eq!(item.title, "Lamp");
        assert_eq!(item.unit_price.cents(), 1250);
        assert_eq!(item.image_url.as_deref(), Some("https://img/x.png"));
    }

    #[test]
    fn test_cart_item_without_id_gets_temp_id() {
        let item = cart_item(&json!({ "title": "Mystery" }));
        assert!(item.id.starts_with(TEMP_ID_PREFIX));
        assert_eq!(item.quantity, 1);
        assert_eq!(item.unit_price, Money::zero());
    }

    #[test]
    fn test_server_totals() {
        let totals = server_totals(&json!({
            "tax": 1.2,
            "shipping_cost": "4.30",
            "total": 65.47,
            "sale_id": "881",
            "shipping_mode": "air"
        }));
        assert_eq!(totals.tax.cents(), 120);
        assert_eq!(totals.shipping_fee.cents(), 430);
        assert_eq!(totals.total, Some(Money::from_cents(6547)));
        assert_eq!(totals.sale_id, Some(881));
        assert_eq!(totals.shipping_mode, ShippingMode::Air);
    }

    #[test]
    fn test_shipping_address() {
        let address = shipping_address(&json!({
            "id": 5,
            "full_name": "Ana Pérez",
            "street": "Av. Libertador",
            "ciudad": "Caracas",
            "estado": "Distrito Capital",
            "phone": "04141234567",
            "is_default": true
        }))
        .unwrap();
        assert_eq!(address.id, "5");
        assert_eq!(address.city, "Caracas");
        assert!(address.is_default);
        assert!(shipping_address(&json!({ "street": "x" })).is_none());
    }

    #[test]
    fn test_sale_requires_id() {
        assert!(sale(&json!({ "status": "pendiente" })).is_none());

        let s = sale(&json!({ "id": 7, "estado": "Orden Confirmada", "subtotal": 10 })).unwrap();
        assert_eq!(s.status, SaleStatus::Confirmed);
        assert_eq!(s.raw_status, "Orden Confirmada");
        assert_eq!(s.total.cents(), 1000);
    }

    #[test]
    fn test_installment() {
        let q = installment(&json!({
            "id": 31,
            "numero_cuota": 2,
            "monto": "25.00",
            "fecha_vencimiento": "2026-11-01T00:00:00Z",
            "estado": "atrasada",
            "interes_mora": 1.5
        }))
        .unwrap();
        assert_eq!(q.sequence_number, 2);
        assert_eq!(q.status, QuotaStatus::Overdue);
        assert_eq!(q.due_date, NaiveDate::from_ymd_opt(2026, 11, 1));
        assert_eq!(q.amount_to_pay_usd().cents(), 2650);
        assert_eq!(q.outstanding_balance.cents(), 2500);
    }

    #[test]
    fn test_purchase_conditions() {
        let pc = purchase_conditions(
            9,
            false,
            &json!({
                "pago_hoy": 30.0,
                "cuotas": [{ "monto": 20 }, { "monto": 20, "numero": 3 }],
                "nivel": "Plata",
                "credito_disponible": "150"
            }),
        );
        assert_eq!(pc.pay_today_usd.cents(), 3000);
        assert_eq!(pc.schedule[0].sequence_number, 1);
        assert_eq!(pc.schedule[1].sequence_number, 3);
        assert_eq!(pc.credit_level.as_deref(), Some("Plata"));
        assert_eq!(pc.available_credit, Some(Money::from_cents(15000)));
        assert!(!pc.is_lump_sum);
    }

    #[test]
    fn test_refund_breakdown_is_read_not_computed() {
        let r = refund_breakdown(&json!({
            "total_paid": 100,
            "penalty_percentage": 35,
            "penalty_amount": 35,
            "late_quota_penalty": 8,
            "late_quota_count": 2,
            "refund_amount_usd": 57,
            "refund_amount_bs": 2850
        }));
        assert_eq!(r.penalty_rate.bps(), 3500);
        assert_eq!(r.net_refund_usd.cents(), 5700);
        assert_eq!(r.net_refund_bs.cents(), 285000);
        assert_eq!(r.late_quota_count, 2);
    }
}
