//! # Payment Plan Resolver
//!
//! Answers "what do I owe, in which currency, right now" for an initial
//! payment or one quota.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  resolve(target, currency)          token = next request token          │
//! │     │                                                                   │
//! │     ├─ USD ──► known USD amount ─────────────────────────► Ready        │
//! │     │                                                                   │
//! │     └─ BS ───► exchange_rate()                                          │
//! │                  ├─ usable rate ──► usd × rate ──────────► Ready        │
//! │                  └─ failed/none ──► usd × fallback ──────► Degraded     │
//! │                                                                         │
//! │                quota targets also ask amount_due(); a server amount     │
//! │                replaces the computed one                                │
//! │                                                                         │
//! │  token != latest when the answer arrives ──► discarded (None)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is cached: every currency switch or screen open fetches again.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use cuota_core::money::{Currency, ExchangeRate, Money};
use cuota_core::types::{
    ExchangeRateQuote, PaymentModality, PurchaseConditions, QuotaId, SaleId,
};
use cuota_ledger::wire::{AmountDueRequest, PaymentAmounts};
use cuota_ledger::LedgerClient;

use crate::error::SyncResult;

// =============================================================================
// Types
// =============================================================================

/// What is being paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentTarget {
    /// First payment of a sale; `amount_usd` is the plan's pay-today figure.
    Initial { sale_id: SaleId, amount_usd: Money },
    /// One scheduled quota.
    Quota { quota_id: QuotaId, amount_usd: Money },
}

impl PaymentTarget {
    pub fn amount_usd(&self) -> Money {
        match self {
            PaymentTarget::Initial { amount_usd, .. } | PaymentTarget::Quota { amount_usd, .. } => {
                *amount_usd
            }
        }
    }
}

/// Where the displayed amount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountSource {
    /// The USD figure as given.
    Known,
    /// USD converted with a live rate.
    Converted,
    /// USD converted with the fallback rate.
    Fallback,
    /// The server's own figure for this currency.
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedAmount {
    pub target: PaymentTarget,
    pub currency: Currency,
    pub amount_usd: Money,
    /// Amount in `currency`.
    pub amount: Money,
    /// Rate used for BS amounts.
    pub quote: Option<ExchangeRateQuote>,
    pub source: AmountSource,
}

impl ResolvedAmount {
    /// Amounts for a submission request.
    pub fn amounts(&self) -> PaymentAmounts {
        PaymentAmounts {
            usd: self.amount_usd,
            bs: match self.currency {
                Currency::Bs => Some(self.amount),
                Currency::Usd => None,
            },
        }
    }

    /// Display string, e.g. `Bs. 500.00`.
    pub fn display(&self) -> String {
        self.amount.format(self.currency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "amount", rename_all = "snake_case")]
pub enum ResolverState {
    #[default]
    Idle,
    Loading { token: u64 },
    Ready(ResolvedAmount),
    /// Available, but computed with the fallback rate.
    Degraded(ResolvedAmount),
}

impl ResolverState {
    pub fn amount(&self) -> Option<&ResolvedAmount> {
        match self {
            ResolverState::Ready(amount) | ResolverState::Degraded(amount) => Some(amount),
            _ => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ResolverState::Degraded(_))
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves payment amounts. Clones share state and request tokens.
#[derive(Clone)]
pub struct PaymentPlanResolver {
    ledger: Arc<dyn LedgerClient>,
    fallback_rate: ExchangeRate,
    latest: Arc<AtomicU64>,
    state: Arc<Mutex<ResolverState>>,
}

impl PaymentPlanResolver {
    pub fn new(ledger: Arc<dyn LedgerClient>, fallback_rate: ExchangeRate) -> Self {
        PaymentPlanResolver {
            ledger,
            fallback_rate,
            latest: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(ResolverState::Idle)),
        }
    }

    pub async fn state(&self) -> ResolverState {
        *self.state.lock().await
    }

    /// Back to `Idle`; in-flight answers are discarded.
    pub async fn reset(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().await = ResolverState::Idle;
    }

    /// The installment plan for a sale.
    pub async fn purchase_conditions(
        &self,
        sale_id: SaleId,
        modality: PaymentModality,
    ) -> SyncResult<PurchaseConditions> {
        let conditions = self
            .ledger
            .purchase_conditions(sale_id, modality.is_lump_sum())
            .await?;
        info!(
            sale_id,
            pay_today = %conditions.pay_today_usd,
            quotas = conditions.schedule.len(),
            "Purchase conditions loaded"
        );
        Ok(conditions)
    }

    /// Loads the plan, then resolves its pay-today amount in `currency`.
    pub async fn resolve_initial(
        &self,
        sale_id: SaleId,
        modality: PaymentModality,
        currency: Currency,
    ) -> SyncResult<(PurchaseConditions, Option<ResolverState>)> {
        let conditions = self.purchase_conditions(sale_id, modality).await?;
        let target = PaymentTarget::Initial {
            sale_id,
            amount_usd: conditions.pay_today_usd,
        };
        let state = self.resolve(target, currency).await?;
        Ok((conditions, state))
    }

    /// Resolves the amount due for `target` in `currency`.
    ///
    /// Returns the new state, or `None` when a newer resolution was started
    /// meanwhile (its answer wins and this one is dropped).
    ///
    /// ## Errors
    /// Only authentication failures. Every other rate or amount failure
    /// degrades to the fallback rate.
    pub async fn resolve(
        &self,
        target: PaymentTarget,
        currency: Currency,
    ) -> SyncResult<Option<ResolverState>> {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.lock().await = ResolverState::Loading { token };
        debug!(token, ?currency, "Resolving payment amount");

        let next = match self.compute(target, currency).await {
            Ok(next) => next,
            Err(e) => {
                if self.latest.load(Ordering::SeqCst) == token {
                    *self.state.lock().await = ResolverState::Idle;
                }
                return Err(e);
            }
        };

        let mut state = self.state.lock().await;
        if self.latest.load(Ordering::SeqCst) != token {
            debug!(token, "Discarding superseded payment amount");
            return Ok(None);
        }
        *state = next;
        Ok(Some(next))
    }

    async fn compute(&self, target: PaymentTarget, currency: Currency) -> SyncResult<ResolverState> {
        let amount_usd = target.amount_usd();

        if currency == Currency::Usd {
            return Ok(ResolverState::Ready(ResolvedAmount {
                target,
                currency,
                amount_usd,
                amount: amount_usd,
                quote: None,
                source: AmountSource::Known,
            }));
        }

        let quote = self.exchange_rate().await?;
        let mut resolved = ResolvedAmount {
            target,
            currency,
            amount_usd,
            amount: quote.rate.usd_to_bs(amount_usd),
            quote: Some(quote),
            source: if quote.fallback {
                AmountSource::Fallback
            } else {
                AmountSource::Converted
            },
        };

        if let PaymentTarget::Quota { quota_id, .. } = target {
            match self.ledger.amount_due(&AmountDueRequest::quota(quota_id, currency)).await {
                Ok(due) => {
                    if let Some(amount) = due.amount {
                        debug!(quota_id, server = %amount, computed = %resolved.amount, "Using server amount");
                        resolved.amount = amount;
                        resolved.source = AmountSource::Server;
                        if let Some(rate) = due.exchange_rate {
                            resolved.quote = Some(ExchangeRateQuote {
                                rate,
                                fallback: false,
                            });
                        }
                    }
                }
                Err(e) if e.is_auth() => return Err(e.into()),
                Err(e) => warn!(quota_id, error = %e, "Quota amount unavailable, keeping computed amount"),
            }
        }

        Ok(match resolved.source {
            AmountSource::Fallback => ResolverState::Degraded(resolved),
            _ => ResolverState::Ready(resolved),
        })
    }

    /// A live quote, or the fallback rate flagged as such.
    pub async fn exchange_rate(&self) -> SyncResult<ExchangeRateQuote> {
        let fallback = ExchangeRateQuote {
            rate: self.fallback_rate,
            fallback: true,
        };
        match self.ledger.exchange_rate().await {
            Ok(Some(rate)) => Ok(ExchangeRateQuote {
                rate,
                fallback: false,
            }),
            Ok(None) => {
                warn!(fallback = %self.fallback_rate, "No usable exchange rate, using fallback");
                Ok(fallback)
            }
            Err(e) if e.is_auth() => Err(e.into()),
            Err(e) => {
                warn!(error = %e, fallback = %self.fallback_rate, "Exchange rate fetch failed, using fallback");
                Ok(fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLedger;
    use cuota_ledger::LedgerError;
    use std::time::Duration;

    fn resolver(mock: &Arc<MockLedger>) -> PaymentPlanResolver {
        PaymentPlanResolver::new(mock.clone(), ExchangeRate::FALLBACK)
    }

    fn initial(cents: i64) -> PaymentTarget {
        PaymentTarget::Initial {
            sale_id: 5,
            amount_usd: Money::from_cents(cents),
        }
    }

    #[tokio::test]
    async fn test_usd_needs_no_request() {
        let mock = Arc::new(MockLedger::new());
        let state = resolver(&mock)
            .resolve(initial(1000), Currency::Usd)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(state.amount().map(|a| a.amount), Some(Money::from_cents(1000)));
        assert!(!state.is_degraded());
        assert_eq!(mock.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_rate_falls_back_to_fifty() {
        let mock = Arc::new(MockLedger::new());
        mock.push_rate(Err(LedgerError::Network("down".into())));
        let resolver = resolver(&mock);

        let state = resolver.resolve(initial(1000), Currency::Bs).await.unwrap().unwrap();

        assert!(matches!(state, ResolverState::Degraded(_)));
        let amount = state.amount().unwrap();
        assert_eq!(amount.amount, Money::from_cents(50000));
        assert_eq!(amount.display(), "Bs. 500.00");
        assert_eq!(resolver.state().await, state);
    }

    #[tokio::test]
    async fn test_missing_rate_also_degrades() {
        let mock = Arc::new(MockLedger::new());
        mock.push_rate(Ok(None));
        let state = resolver(&mock).resolve(initial(200), Currency::Bs).await.unwrap().unwrap();
        assert!(state.is_degraded());
        assert_eq!(state.amount().unwrap().amount, Money::from_cents(10000));
    }

    #[tokio::test]
    async fn test_live_rate_is_ready() {
        let mock = Arc::new(MockLedger::new());
        mock.push_rate(Ok(ExchangeRate::from_decimal(36.55)));
        let state = resolver(&mock).resolve(initial(1000), Currency::Bs).await.unwrap().unwrap();

        assert!(matches!(state, ResolverState::Ready(_)));
        let amount = state.amount().unwrap();
        assert_eq!(amount.amount, Money::from_cents(36550));
        assert_eq!(amount.amounts().bs, Some(Money::from_cents(36550)));
    }

    #[tokio::test]
    async fn test_quota_prefers_server_amount() {
        let mock = Arc::new(MockLedger::new());
        mock.push_rate(Err(LedgerError::Timeout));
        mock.set_amount_due(Some(Money::from_cents(91375)));

        let target = PaymentTarget::Quota {
            quota_id: 31,
            amount_usd: Money::from_cents(2500),
        };
        let state = resolver(&mock).resolve(target, Currency::Bs).await.unwrap().unwrap();

        assert!(matches!(state, ResolverState::Ready(_)));
        let amount = state.amount().unwrap();
        assert_eq!(amount.amount, Money::from_cents(91375));
        assert_eq!(amount.source, AmountSource::Server);
    }

    #[tokio::test]
    async fn test_quota_without_server_amount_keeps_computed() {
        let mock = Arc::new(MockLedger::new());
        mock.push_rate(Ok(ExchangeRate::from_decimal(40.0)));
        mock.fail("amount_due", LedgerError::Network("down".into()));

        let target = PaymentTarget::Quota {
            quota_id: 31,
            amount_usd: Money::from_cents(2500),
        };
        let state = resolver(&mock).resolve(target, Currency::Bs).await.unwrap().unwrap();
        assert_eq!(state.amount().unwrap().amount, Money::from_cents(100000));
    }

    #[tokio::test]
    async fn test_auth_error_propagates() {
        let mock = Arc::new(MockLedger::new());
        mock.push_rate(Err(LedgerError::Auth("expired".into())));
        let resolver = resolver(&mock);

        let err = resolver.resolve(initial(1000), Currency::Bs).await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(resolver.state().await, ResolverState::Idle);
    }

    #[tokio::test]
    async fn test_superseded_answer_is_dropped() {
        let mock = Arc::new(MockLedger::new());
        // BS request is slow; the user switches to USD meanwhile
        mock.delay_next("exchange_rate", Duration::from_millis(50));
        let resolver = resolver(&mock);

        let slow = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve(initial(1000), Currency::Bs).await })
        };
        tokio::task::yield_now().await;
        let fast = resolver.resolve(initial(1000), Currency::Usd).await.unwrap();

        assert!(fast.is_some());
        assert_eq!(slow.await.unwrap().unwrap(), None);
        let state = resolver.state().await;
        assert_eq!(state.amount().map(|a| a.currency), Some(Currency::Usd));
    }

    #[tokio::test]
    async fn test_resolve_initial_uses_pay_today() {
        let mock = Arc::new(MockLedger::new());
        mock.set_conditions(PurchaseConditions {
            sale_id: 5,
            pay_today_usd: Money::from_cents(1000),
            schedule: Vec::new(),
            credit_level: Some("Plata".into()),
            available_credit: None,
            is_lump_sum: false,
        });
        mock.push_rate(Err(LedgerError::Network("down".into())));

        let (conditions, state) = resolver(&mock)
            .resolve_initial(5, PaymentModality::Installments, Currency::Bs)
            .await
            .unwrap();

        assert_eq!(conditions.credit_level.as_deref(), Some("Plata"));
        assert_eq!(state.unwrap().amount().unwrap().amount, Money::from_cents(50000));
    }
}
