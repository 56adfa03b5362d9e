//! # Order Detail Reconciler
//!
//! Assembles one consistent view of a sale for history and detail screens.
//!
//! ## Detail Assembly
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  order_detail(sale_id)                                                  │
//! │     │                                                                   │
//! │     ├─ order header ─────── missing? ──► NotFound (hard failure)        │
//! │     ├─ line items ───────── missing? ──► empty list                     │
//! │     ├─ initial payment ──── missing? ──► None                           │
//! │     └─ quotas ───────────── missing? ──► empty list                     │
//! │                                                                         │
//! │  quotas sorted by sequence; the first payable one gets the pay action   │
//! │  status badge, cancellability: one status table in cuota-core          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use cuota_core::error::CoreError;
use cuota_core::money::Money;
use cuota_core::status::{next_payable_index, QuotaStatus, StatusDisplay, StatusTier};
use cuota_core::types::{
    CartItem, InitialPaymentRecord, PaymentInstallment, QuotaId, Sale, SaleId,
};
use cuota_ledger::LedgerClient;

use crate::error::{SyncError, SyncResult};
use crate::resolver::PaymentTarget;

// =============================================================================
// View Models
// =============================================================================

/// One quota row. Only the next payable quota is actionable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaRow {
    pub id: QuotaId,
    pub sequence_number: i32,
    pub amount_usd: Money,
    pub amount_to_pay_usd: Money,
    pub due_date: Option<NaiveDate>,
    pub status: QuotaStatus,
    pub label: &'static str,
    pub payable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub sale: Sale,
    pub display: StatusDisplay,
    pub items: Vec<CartItem>,
    pub initial_payment: Option<InitialPaymentRecord>,
    pub quotas: Vec<QuotaRow>,
    pub next_payable: Option<QuotaId>,
    pub can_cancel: bool,
}

impl OrderView {
    /// Payment target for `quota_id`, if it is the one open for payment.
    pub fn pay_target(&self, quota_id: QuotaId) -> SyncResult<PaymentTarget> {
        let row = self
            .quotas
            .iter()
            .find(|row| row.id == quota_id)
            .ok_or_else(|| SyncError::NotFound(format!("quota {}", quota_id)))?;

        if !row.payable {
            return Err(CoreError::QuotaNotPayable { quota_id }.into());
        }

        Ok(PaymentTarget::Quota {
            quota_id,
            amount_usd: row.amount_to_pay_usd,
        })
    }
}

/// One line of the order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRow {
    pub sale_id: SaleId,
    pub total: Money,
    pub display: StatusDisplay,
    pub created_at: Option<DateTime<Utc>>,
    pub can_cancel: bool,
}

impl From<&Sale> for OrderRow {
    fn from(sale: &Sale) -> Self {
        OrderRow {
            sale_id: sale.id,
            total: sale.total,
            display: StatusDisplay::for_raw(&sale.raw_status),
            created_at: sale.created_at,
            can_cancel: sale.can_cancel(),
        }
    }
}

// =============================================================================
// Reconciler
// =============================================================================

pub struct OrderDetailReconciler {
    ledger: Arc<dyn LedgerClient>,
}

impl OrderDetailReconciler {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        OrderDetailReconciler { ledger }
    }

    /// Loads and assembles the detail view of one sale.
    pub async fn load(&self, sale_id: SaleId) -> SyncResult<OrderView> {
        let bundle = self.ledger.order_detail(sale_id).await?;
        let sale = bundle
            .order
            .ok_or_else(|| SyncError::NotFound(format!("order {}", sale_id)))?;

        let mut installments = bundle.quotas;
        installments.sort_by_key(|q| q.sequence_number);
        let next = next_payable_index(&installments);

        let quotas: Vec<QuotaRow> = installments
            .iter()
            .enumerate()
            .map(|(index, q)| quota_row(q, Some(index) == next))
            .collect();
        let next_payable = next.map(|index| installments[index].id);

        debug!(
            sale_id,
            items = bundle.items.len(),
            quotas = quotas.len(),
            next_payable = ?next_payable,
            "Order detail assembled"
        );

        Ok(OrderView {
            display: StatusDisplay::for_raw(&sale.raw_status),
            can_cancel: sale.can_cancel(),
            sale,
            items: bundle.items,
            initial_payment: bundle.initial_payment,
            quotas,
            next_payable,
        })
    }

    /// Order history, newest first, optionally limited to one status tier.
    pub async fn history(&self, tier: Option<StatusTier>) -> SyncResult<Vec<OrderRow>> {
        let mut sales = self.ledger.orders().await?;
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let rows: Vec<OrderRow> = sales
            .iter()
            .filter(|sale| tier.map_or(true, |t| sale.status.tier() == t))
            .map(OrderRow::from)
            .collect();

        info!(count = rows.len(), tier = ?tier, "Order history loaded");
        Ok(rows)
    }
}

fn quota_row(quota: &PaymentInstallment, payable: bool) -> QuotaRow {
    QuotaRow {
        id: quota.id,
        sequence_number: quota.sequence_number,
        amount_usd: quota.amount_due_usd,
        amount_to_pay_usd: quota.amount_to_pay_usd(),
        due_date: quota.due_date,
        status: quota.status,
        label: quota.status.label(),
        payable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLedger;
    use cuota_core::status::SaleStatus;
    use cuota_ledger::wire::OrderDetailBundle;

    fn sale(id: SaleId, raw: &str) -> Sale {
        Sale {
            id,
            status: SaleStatus::from_raw(raw),
            raw_status: raw.to_string(),
            subtotal: Money::from_cents(10000),
            tax: Money::zero(),
            handling_fee: Money::zero(),
            shipping_fee: Money::zero(),
            product_fee: Money::zero(),
            additional_fee: Money::zero(),
            discount: Money::zero(),
            total: Money::from_cents(10000),
            notes: None,
            created_at: None,
        }
    }

    fn quota(id: QuotaId, seq: i32, status: QuotaStatus) -> PaymentInstallment {
        PaymentInstallment {
            id,
            sequence_number: seq,
            amount_due_usd: Money::from_cents(2500),
            due_date: None,
            status,
            late_interest: Money::zero(),
            outstanding_balance: Money::from_cents(2500),
        }
    }

    #[tokio::test]
    async fn test_missing_header_is_hard_failure() {
        let mock = Arc::new(MockLedger::new());
        mock.set_detail(OrderDetailBundle {
            quotas: vec![quota(1, 1, QuotaStatus::Pending)],
            ..OrderDetailBundle::default()
        });

        let err = OrderDetailReconciler::new(mock).load(3).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_optional_parts_may_be_absent() {
        let mock = Arc::new(MockLedger::new());
        mock.set_detail(OrderDetailBundle {
            order: Some(sale(3, "pendiente")),
            ..OrderDetailBundle::default()
        });

        let view = OrderDetailReconciler::new(mock).load(3).await.unwrap();
        assert!(view.items.is_empty());
        assert!(view.quotas.is_empty());
        assert_eq!(view.next_payable, None);
        assert!(!view.can_cancel);
    }

    #[tokio::test]
    async fn test_only_first_payable_quota_is_actionable() {
        let mock = Arc::new(MockLedger::new());
        mock.set_detail(OrderDetailBundle {
            order: Some(sale(3, "orden confirmada")),
            // Arrives out of order
            quotas: vec![
                quota(14, 4, QuotaStatus::Pending),
                quota(11, 1, QuotaStatus::Paid),
                quota(15, 5, QuotaStatus::Paid),
                quota(13, 3, QuotaStatus::Overdue),
                quota(12, 2, QuotaStatus::Paid),
            ],
            ..OrderDetailBundle::default()
        });

        let view = OrderDetailReconciler::new(mock).load(3).await.unwrap();

        assert_eq!(view.next_payable, Some(13));
        assert_eq!(view.quotas.iter().filter(|q| q.payable).count(), 1);
        assert_eq!(view.display.label, "Por entregar");
        assert!(view.can_cancel);

        assert!(view.pay_target(13).is_ok());
        let err = view.pay_target(14).unwrap_err();
        assert!(matches!(err, SyncError::Core(CoreError::QuotaNotPayable { quota_id: 14 })));
        assert!(matches!(view.pay_target(99), Err(SyncError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_history_filters_by_tier() {
        let mock = Arc::new(MockLedger::new());
        mock.set_orders(vec![
            sale(1, "entregado"),
            sale(2, "en proceso"),
            sale(3, "cancelado"),
            sale(4, "orden confirmada"),
        ]);
        let reconciler = OrderDetailReconciler::new(mock);

        let all = reconciler.history(None).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].sale_id, 4);

        let processing = reconciler.history(Some(StatusTier::Processing)).await.unwrap();
        let ids: Vec<SaleId> = processing.iter().map(|r| r.sale_id).collect();
        assert_eq!(ids, vec![4, 2]);
    }
}
