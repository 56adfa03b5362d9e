//! # Order Commands
//!
//! History, detail and cancellation. Status labels, colors and the
//! cancel action all come from the one status table in `cuota-core`.

use tracing::debug;

use cuota_core::status::StatusTier;
use cuota_core::types::{RefundBreakdown, SaleId};
use cuota_core::validation::CancellationForm;
use cuota_sync::{CancellationPhase, OrderRow, OrderView};

use crate::error::ApiError;
use crate::state::Storefront;

/// Order history, newest first, optionally narrowed to one status tier.
pub async fn list_orders(
    sf: &Storefront,
    tier: Option<StatusTier>,
) -> Result<Vec<OrderRow>, ApiError> {
    debug!(?tier, "list_orders command");
    let result = sf.orders().history(tier).await;
    sf.observe(result).await
}

pub async fn get_order(sf: &Storefront, sale_id: SaleId) -> Result<OrderView, ApiError> {
    debug!(sale_id, "get_order command");
    let result = sf.orders().load(sale_id).await;
    sf.observe(result).await
}

/// Opens the cancellation form for an order that still allows it.
pub async fn open_cancellation(
    sf: &Storefront,
    sale_id: SaleId,
) -> Result<CancellationPhase, ApiError> {
    let view = sf.observe(sf.orders().load(sale_id).await).await?;
    let result = {
        let mut flow = sf.cancellation().lock().await;
        flow.open(&view.sale).map(|_| flow.phase().clone())
    };
    sf.observe(result).await
}

/// Replaces the typed form contents.
pub async fn update_cancellation_form(sf: &Storefront, form: CancellationForm) {
    *sf.cancellation().lock().await.form_mut() = form;
}

/// Validates and submits the cancellation. On failure the flow moves to its
/// error phase and keeps the form for another attempt.
pub async fn submit_cancellation(sf: &Storefront) -> Result<RefundBreakdown, ApiError> {
    let result = sf.cancellation().lock().await.submit().await;
    sf.observe(result).await
}

pub async fn cancellation_phase(sf: &Storefront) -> CancellationPhase {
    sf.cancellation().lock().await.phase().clone()
}

pub async fn close_cancellation(sf: &Storefront) {
    sf.cancellation().lock().await.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::notifications::NoopNotifications;
    use cuota_core::money::Money;
    use cuota_core::status::SaleStatus;
    use cuota_core::types::{IdPrefix, Sale};
    use cuota_ledger::wire::OrderDetailBundle;
    use cuota_ledger::{PaymentSettings, Session, SessionToken};
    use cuota_sync::mock::MockLedger;
    use std::sync::Arc;

    fn storefront(mock: Arc<MockLedger>) -> Storefront {
        Storefront::new(
            mock,
            Session::with_token(SessionToken::new("token")),
            Arc::new(NoopNotifications),
            &PaymentSettings::default(),
        )
    }

    fn sale(raw: &str) -> Sale {
        Sale {
            id: 5,
            status: SaleStatus::from_raw(raw),
            raw_status: raw.to_string(),
            subtotal: Money::from_cents(8000),
            tax: Money::zero(),
            handling_fee: Money::zero(),
            shipping_fee: Money::zero(),
            product_fee: Money::zero(),
            additional_fee: Money::zero(),
            discount: Money::zero(),
            total: Money::from_cents(8000),
            notes: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_delivered_order_cannot_open_cancellation() {
        let mock = Arc::new(MockLedger::new());
        mock.set_detail(OrderDetailBundle {
            order: Some(sale("entregado")),
            ..OrderDetailBundle::default()
        });
        let sf = storefront(mock);

        let err = open_cancellation(&sf, 5).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);
        assert_eq!(cancellation_phase(&sf).await, CancellationPhase::Idle);
    }

    #[tokio::test]
    async fn test_cancellation_round_trip_keeps_form_on_error() {
        let mock = Arc::new(MockLedger::new());
        mock.set_detail(OrderDetailBundle {
            order: Some(sale("por entregar")),
            ..OrderDetailBundle::default()
        });
        let sf = storefront(mock.clone());

        let phase = open_cancellation(&sf, 5).await.unwrap();
        assert_eq!(phase, CancellationPhase::FormOpen);

        let mut form = CancellationForm {
            reason: "Ya no lo necesito".into(),
            refund_phone: "04121234567".into(),
            refund_bank_code: None,
            id_prefix: Some(IdPrefix::E),
            id_number: "8456123".into(),
        };
        update_cancellation_form(&sf, form.clone()).await;

        let err = submit_cancellation(&sf).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "please select a bank");
        assert_eq!(mock.call_count("cancel_order"), 0);

        form.refund_bank_code = Some("0102".into());
        update_cancellation_form(&sf, form).await;
        submit_cancellation(&sf).await.unwrap();

        assert!(matches!(cancellation_phase(&sf).await, CancellationPhase::Success(_)));
        assert_eq!(mock.cancellations()[0].id_prefix, IdPrefix::E);
    }
}
