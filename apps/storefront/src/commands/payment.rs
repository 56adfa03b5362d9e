//! # Payment Commands
//!
//! ## Payment Screen
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open_initial_payment(handoff)      open_quota_payment(sale, quota)     │
//! │          │                                   │                          │
//! │          ▼                                   ▼                          │
//! │  purchase conditions ──► pay today   order detail ──► next payable only │
//! │          └──────────────┬────────────────────┘                          │
//! │                         ▼                                               │
//! │               resolver: amount in BS or USD ◄── switch_currency         │
//! │                         │                                               │
//! │                         ▼                                               │
//! │               submit_payment(form) ──► initial or quota endpoint        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::{debug, info};

use cuota_core::money::Currency;
use cuota_core::types::{ExchangeRateQuote, PurchaseConditions, QuotaId, SaleId};
use cuota_core::validation::PaymentForm;
use cuota_ledger::wire::{BankOption, PaymentMethodOption, SubmissionReceipt};
use cuota_sync::{CheckoutHandoff, PaymentTarget, ResolverState, SyncError};

use crate::error::ApiError;
use crate::state::Storefront;

/// What the payment screen draws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentScreen {
    pub target: PaymentTarget,
    pub currency: Currency,
    pub amount: ResolverState,
    /// Formatted amount, e.g. `Bs. 500.00`, once resolved.
    pub display: Option<String>,
    /// True when the BS figure used the fallback rate.
    pub approximate: bool,
    pub conditions: Option<PurchaseConditions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOptions {
    pub methods: Vec<PaymentMethodOption>,
    pub banks: Vec<BankOption>,
}

async fn screen(
    sf: &Storefront,
    target: PaymentTarget,
    conditions: Option<PurchaseConditions>,
) -> PaymentScreen {
    let amount = sf.payment().resolver.state().await;
    PaymentScreen {
        target,
        currency: sf.payment().currency().await,
        display: amount.amount().map(|a| a.display()),
        approximate: amount.is_degraded(),
        amount,
        conditions,
    }
}

/// Opens the first payment of a freshly placed order.
pub async fn open_initial_payment(
    sf: &Storefront,
    handoff: CheckoutHandoff,
    currency: Currency,
) -> Result<PaymentScreen, ApiError> {
    debug!(sale_id = handoff.sale_id, ?currency, "open_initial_payment command");
    let result = sf
        .payment()
        .resolver
        .resolve_initial(handoff.sale_id, handoff.modality, currency)
        .await;
    let (conditions, _) = sf.observe(result).await?;

    let target = PaymentTarget::Initial {
        sale_id: handoff.sale_id,
        amount_usd: conditions.pay_today_usd,
    };
    sf.payment().open(target, currency).await;
    Ok(screen(sf, target, Some(conditions)).await)
}

/// Opens payment of one quota. Only the next payable quota is accepted.
pub async fn open_quota_payment(
    sf: &Storefront,
    sale_id: SaleId,
    quota_id: QuotaId,
    currency: Currency,
) -> Result<PaymentScreen, ApiError> {
    debug!(sale_id, quota_id, ?currency, "open_quota_payment command");
    let view = sf.observe(sf.orders().load(sale_id).await).await?;
    let target = sf.observe(view.pay_target(quota_id)).await?;

    sf.payment().open(target, currency).await;
    let result = sf.payment().resolver.resolve(target, currency).await;
    sf.observe(result).await?;
    Ok(screen(sf, target, None).await)
}

/// Re-resolves the open payment in another currency. A slower answer for
/// a previous currency never overwrites this one.
pub async fn switch_currency(
    sf: &Storefront,
    currency: Currency,
) -> Result<PaymentScreen, ApiError> {
    let target = sf.observe(open_target(sf).await).await?;
    sf.payment().set_currency(currency).await;

    let result = sf.payment().resolver.resolve(target, currency).await;
    sf.observe(result).await?;
    Ok(screen(sf, target, None).await)
}

/// Methods and banks offered for `currency`.
pub async fn payment_options(
    sf: &Storefront,
    currency: Currency,
) -> Result<PaymentOptions, ApiError> {
    let result = sf.ledger().payment_methods(currency).await.map_err(Into::into);
    let catalog = sf.observe(result).await?;
    Ok(PaymentOptions {
        banks: catalog.banks_or_default(),
        methods: catalog.methods,
    })
}

/// Current BS per USD. Falls back to the configured rate, flagged as such,
/// when the backend cannot quote one.
pub async fn exchange_rate(sf: &Storefront) -> Result<ExchangeRateQuote, ApiError> {
    let result = sf.payment().resolver.exchange_rate().await;
    sf.observe(result).await
}

/// Validates and submits the form against the open payment.
///
/// The amount sent is the one shown on screen; the form's currency must
/// match it.
pub async fn submit_payment(
    sf: &Storefront,
    form: PaymentForm,
) -> Result<SubmissionReceipt, ApiError> {
    let target = sf.observe(open_target(sf).await).await?;
    let state = sf.payment().resolver.state().await;
    let resolved = match state.amount() {
        Some(resolved) if resolved.currency == form.currency => *resolved,
        _ => {
            return Err(SyncError::InvalidState(format!(
                "no {} amount resolved for this payment",
                form.currency
            ))
            .into())
        }
    };

    let result = sf
        .payment()
        .submitter
        .submit(target, resolved.amounts(), &form)
        .await;
    let receipt = sf.observe(result).await?;

    info!(payment = ?target, "Payment submitted");
    sf.payment().reset().await;
    Ok(receipt)
}

async fn open_target(sf: &Storefront) -> Result<PaymentTarget, SyncError> {
    sf.payment()
        .target()
        .await
        .ok_or_else(|| SyncError::InvalidState("no payment is open".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::notifications::NoopNotifications;
    use cuota_core::money::{ExchangeRate, Money};
    use cuota_core::status::{QuotaStatus, SaleStatus};
    use cuota_core::types::{PaymentInstallment, PaymentMethod, PaymentModality, Sale};
    use cuota_ledger::wire::OrderDetailBundle;
    use cuota_ledger::{LedgerError, PaymentSettings, Session, SessionToken};
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

    fn conditions(sale_id: SaleId) -> PurchaseConditions {
        PurchaseConditions {
            sale_id,
            pay_today_usd: Money::from_cents(1000),
            schedule: Vec::new(),
            credit_level: None,
            available_credit: None,
            is_lump_sum: false,
        }
    }

    fn handoff() -> CheckoutHandoff {
        CheckoutHandoff {
            sale_id: 7,
            modality: PaymentModality::Installments,
            total: None,
        }
    }

    fn cash_form(currency: Currency) -> PaymentForm {
        let mut form = PaymentForm::new(PaymentMethod::Cash, currency);
        form.receipt_image = Some(vec![0xFF, 0xD8]);
        form
    }

    #[tokio::test]
    async fn test_rate_failure_shows_approximate_amount() {
        let mock = Arc::new(MockLedger::new());
        mock.set_conditions(conditions(7));
        mock.push_rate(Err(LedgerError::Network("timeout".into())));
        let sf = storefront(mock);

        let screen = open_initial_payment(&sf, handoff(), Currency::Bs).await.unwrap();

        assert!(screen.approximate);
        assert_eq!(screen.display.as_deref(), Some("Bs. 500.00"));
    }

    #[tokio::test]
    async fn test_submit_uses_resolved_amount() {
        let mock = Arc::new(MockLedger::new());
        mock.set_conditions(conditions(7));
        let sf = storefront(mock.clone());

        open_initial_payment(&sf, handoff(), Currency::Usd).await.unwrap();
        submit_payment(&sf, cash_form(Currency::Usd)).await.unwrap();

        let sent = mock.initial_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].sale_id, 7);
        assert!(sf.payment().target().await.is_none());
    }

    #[tokio::test]
    async fn test_submit_rejects_currency_mismatch() {
        let mock = Arc::new(MockLedger::new());
        mock.set_conditions(conditions(7));
        let sf = storefront(mock.clone());

        open_initial_payment(&sf, handoff(), Currency::Usd).await.unwrap();
        let err = submit_payment(&sf, cash_form(Currency::Bs)).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::BusinessRule);
        assert!(mock.initial_requests().is_empty());
    }

    #[tokio::test]
    async fn test_only_next_quota_opens() {
        let mock = Arc::new(MockLedger::new());
        let quota = |id, seq, status| PaymentInstallment {
            id,
            sequence_number: seq,
            amount_due_usd: Money::from_cents(2500),
            due_date: None,
            status,
            late_interest: Money::zero(),
            outstanding_balance: Money::from_cents(2500),
        };
        mock.set_detail(OrderDetailBundle {
            order: Some(Sale {
                id: 7,
                status: SaleStatus::InProcess,
                raw_status: "en proceso".into(),
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
            }),
            quotas: vec![
                quota(21, 1, QuotaStatus::Paid),
                quota(22, 2, QuotaStatus::Pending),
                quota(23, 3, QuotaStatus::Pending),
            ],
            ..OrderDetailBundle::default()
        });
        let sf = storefront(mock);

        let err = open_quota_payment(&sf, 7, 23, Currency::Usd).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);

        let screen = open_quota_payment(&sf, 7, 22, Currency::Usd).await.unwrap();
        assert_eq!(
            screen.target,
            PaymentTarget::Quota {
                quota_id: 22,
                amount_usd: Money::from_cents(2500)
            }
        );
    }

    #[tokio::test]
    async fn test_exchange_rate_falls_back() {
        let mock = Arc::new(MockLedger::new());
        mock.push_rate(Ok(None));
        let sf = storefront(mock);

        let quote = exchange_rate(&sf).await.unwrap();
        assert!(quote.fallback);
        assert_eq!(quote.rate, ExchangeRate::FALLBACK);
    }
}
