//! # Payment Submission
//!
//! Validates one payment form and submits its evidence against an initial
//! payment or a quota.
//!
//! ## Flow
//! ```text
//! PaymentForm ──validate──► PaymentEvidence ──route──┬─► submit_quota_payment
//!      │                                             │     (Quota target)
//!      └─ first failing rule, no request made        └─► submit_initial_payment
//!                                                          (Initial target)
//! ```
//!
//! Navigation after success belongs to the caller.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use cuota_core::validation::{validate_payment_form, PaymentForm};
use cuota_ledger::wire::{
    InitialPaymentRequest, PaymentAmounts, QuotaPaymentRequest, SubmissionReceipt,
};
use cuota_ledger::LedgerClient;

use crate::error::SyncResult;
use crate::resolver::PaymentTarget;

pub struct PaymentSubmitter {
    ledger: Arc<dyn LedgerClient>,
}

impl PaymentSubmitter {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        PaymentSubmitter { ledger }
    }

    /// Validates `form` and submits it for `target`.
    ///
    /// ## Errors
    /// - `Validation`: the first failing form rule (nothing sent)
    /// - `Ledger(Rejected)`: the server's message, shown verbatim
    /// - any other ledger failure, shown as a generic message
    pub async fn submit(
        &self,
        target: PaymentTarget,
        amounts: PaymentAmounts,
        form: &PaymentForm,
    ) -> SyncResult<SubmissionReceipt> {
        let evidence = validate_payment_form(form, Utc::now())?;

        let result = match target {
            PaymentTarget::Quota { quota_id, .. } => {
                let request = QuotaPaymentRequest::new(quota_id, amounts, &evidence);
                self.ledger.submit_quota_payment(&request).await
            }
            PaymentTarget::Initial { sale_id, .. } => {
                let request = InitialPaymentRequest::new(sale_id, amounts, &evidence);
                self.ledger.submit_initial_payment(&request).await
            }
        };

        match result {
            Ok(receipt) => {
                info!(
                    payment = ?target,
                    method = evidence.method.code(),
                    currency = %evidence.currency,
                    "Payment evidence submitted"
                );
                Ok(receipt)
            }
            Err(e) => {
                error!(payment = ?target, error = %e, "Payment submission failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::mock::MockLedger;
    use cuota_core::error::ValidationError;
    use cuota_core::money::{Currency, Money};
    use cuota_core::types::PaymentMethod;
    use cuota_ledger::LedgerError;

    fn amounts() -> PaymentAmounts {
        PaymentAmounts {
            usd: Money::from_cents(1000),
            bs: Some(Money::from_cents(50000)),
        }
    }

    fn initial() -> PaymentTarget {
        PaymentTarget::Initial {
            sale_id: 12,
            amount_usd: Money::from_cents(1000),
        }
    }

    fn transfer_form() -> PaymentForm {
        let mut form = PaymentForm::new(PaymentMethod::MobileTransfer, Currency::Bs);
        form.bank_code = Some("0102".into());
        form.reference = "123456".into();
        form.amount = "500.00".into();
        form.receipt_image = Some(vec![1, 2, 3]);
        form
    }

    #[tokio::test]
    async fn test_cash_skips_reference_bank_and_amount() {
        let mock = Arc::new(MockLedger::new());
        let submitter = PaymentSubmitter::new(mock.clone());

        let mut form = PaymentForm::new(PaymentMethod::Cash, Currency::Usd);
        form.receipt_image = Some(vec![0xFF, 0xD8]);
        submitter.submit(initial(), amounts(), &form).await.unwrap();

        let sent = mock.initial_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reference, None);
        assert_eq!(sent[0].bank_code, None);
        assert_eq!(sent[0].bs_amount, None);
    }

    #[tokio::test]
    async fn test_receipt_required_for_every_method() {
        let mock = Arc::new(MockLedger::new());
        let submitter = PaymentSubmitter::new(mock.clone());

        let cash = PaymentForm::new(PaymentMethod::Cash, Currency::Usd);
        let err = submitter.submit(initial(), amounts(), &cash).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::MissingReceipt { cash: true })
        ));

        let mut transfer = transfer_form();
        transfer.receipt_image = None;
        let err = submitter.submit(initial(), amounts(), &transfer).await.unwrap_err();
        assert_eq!(err.user_message(), "please attach the payment receipt");
        assert_eq!(mock.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_amount_never_reaches_network() {
        let mock = Arc::new(MockLedger::new());
        let submitter = PaymentSubmitter::new(mock.clone());

        let mut form = transfer_form();
        form.amount = "500,5,0.123".into();
        let err = submitter.submit(initial(), amounts(), &form).await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(mock.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_quota_target_routes_to_quota_endpoint() {
        let mock = Arc::new(MockLedger::new());
        let submitter = PaymentSubmitter::new(mock.clone());
        let target = PaymentTarget::Quota {
            quota_id: 31,
            amount_usd: Money::from_cents(1000),
        };

        submitter.submit(target, amounts(), &transfer_form()).await.unwrap();

        assert_eq!(mock.calls(), vec!["submit_quota_payment"]);
        let sent = mock.quota_requests();
        assert_eq!(sent[0].quota_id, 31);
        assert_eq!(sent[0].bs_amount, Some(500.0));
    }

    #[tokio::test]
    async fn test_server_message_is_verbatim() {
        let mock = Arc::new(MockLedger::new());
        mock.fail(
            "submit_initial_payment",
            LedgerError::Rejected {
                message: Some("La referencia 123456 ya fue registrada".into()),
            },
        );
        let submitter = PaymentSubmitter::new(mock.clone());

        let err = submitter
            .submit(initial(), amounts(), &transfer_form())
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "La referencia 123456 ya fue registrada");
    }

    #[tokio::test]
    async fn test_network_failure_is_generic() {
        let mock = Arc::new(MockLedger::new());
        mock.fail("submit_initial_payment", LedgerError::Network("tls handshake".into()));
        let submitter = PaymentSubmitter::new(mock.clone());

        let err = submitter
            .submit(initial(), amounts(), &transfer_form())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(!err.user_message().contains("tls"));
    }
}
