//! Payment screen state: what is being paid and in which currency.

use std::sync::Arc;
use tokio::sync::Mutex;

use cuota_core::money::{Currency, ExchangeRate};
use cuota_ledger::LedgerClient;
use cuota_sync::{PaymentPlanResolver, PaymentSubmitter, PaymentTarget};

pub struct PaymentState {
    pub resolver: PaymentPlanResolver,
    pub submitter: PaymentSubmitter,
    target: Mutex<Option<PaymentTarget>>,
    currency: Mutex<Currency>,
    default_currency: Currency,
}

impl PaymentState {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        fallback_rate: ExchangeRate,
        default_currency: Currency,
    ) -> Self {
        PaymentState {
            resolver: PaymentPlanResolver::new(ledger.clone(), fallback_rate),
            submitter: PaymentSubmitter::new(ledger),
            target: Mutex::new(None),
            currency: Mutex::new(default_currency),
            default_currency,
        }
    }

    pub async fn target(&self) -> Option<PaymentTarget> {
        *self.target.lock().await
    }

    pub async fn currency(&self) -> Currency {
        *self.currency.lock().await
    }

    /// Starts a payment screen for `target`.
    pub async fn open(&self, target: PaymentTarget, currency: Currency) {
        *self.target.lock().await = Some(target);
        *self.currency.lock().await = currency;
    }

    pub async fn set_currency(&self, currency: Currency) {
        *self.currency.lock().await = currency;
    }

    /// Leaves the payment screen. Pending resolutions are discarded.
    pub async fn reset(&self) {
        *self.target.lock().await = None;
        *self.currency.lock().await = self.default_currency;
        self.resolver.reset().await;
    }
}
