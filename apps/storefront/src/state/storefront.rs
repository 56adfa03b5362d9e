//! # Storefront
//!
//! Composition root: one session, one ledger client, every engine built
//! over them, plus the app-level auth policy.
//!
//! ## Forced Sign-Out
//! ```text
//! command ──► engine ──► Err(Auth) ──► observe()
//!                                         │
//!                                         ├─ session held a token?
//!                                         │     yes ──► clear session
//!                                         │             reset cart, checkout,
//!                                         │             payment, cancellation
//!                                         │             notifications.on_sign_out
//!                                         │     no ───► already signed out
//!                                         ▼
//!                                  ApiError { AUTH_ERROR }
//! ```

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use cuota_ledger::{ClientConfig, HttpLedgerClient, LedgerClient, PaymentSettings, Session, SessionToken};
use cuota_sync::{
    CancellationFlow, CartStore, CheckoutSession, OrderDetailReconciler, SyncResult,
};

use crate::error::ApiError;
use crate::notifications::NotificationService;
use crate::state::PaymentState;

pub struct Storefront {
    session: Session,
    ledger: Arc<dyn LedgerClient>,
    cart: CartStore,
    checkout: Mutex<CheckoutSession>,
    payment: PaymentState,
    orders: OrderDetailReconciler,
    cancellation: Mutex<CancellationFlow>,
    notifications: Arc<dyn NotificationService>,
}

impl Storefront {
    /// Builds every engine over `ledger`. `session` must be the one the
    /// ledger client reads its bearer token from.
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        session: Session,
        notifications: Arc<dyn NotificationService>,
        settings: &PaymentSettings,
    ) -> Self {
        let cart = CartStore::new(ledger.clone());
        Storefront {
            checkout: Mutex::new(CheckoutSession::new(ledger.clone(), cart.clone())),
            payment: PaymentState::new(
                ledger.clone(),
                settings.fallback_rate(),
                settings.default_currency,
            ),
            orders: OrderDetailReconciler::new(ledger.clone()),
            cancellation: Mutex::new(CancellationFlow::new(ledger.clone())),
            cart,
            session,
            ledger,
            notifications,
        }
    }

    /// Connects to the configured backend over HTTP.
    pub fn connect(
        config: &ClientConfig,
        session: Session,
        notifications: Arc<dyn NotificationService>,
    ) -> Result<Self, ApiError> {
        let client = HttpLedgerClient::new(config, session.clone())?;
        info!(base_url = %config.backend.base_url, "Ledger client ready");
        Ok(Storefront::new(
            Arc::new(client),
            session,
            notifications,
            &config.payments,
        ))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn checkout(&self) -> &Mutex<CheckoutSession> {
        &self.checkout
    }

    pub fn payment(&self) -> &PaymentState {
        &self.payment
    }

    pub fn orders(&self) -> &OrderDetailReconciler {
        &self.orders
    }

    pub fn cancellation(&self) -> &Mutex<CancellationFlow> {
        &self.cancellation
    }

    pub fn notifications(&self) -> &Arc<dyn NotificationService> {
        &self.notifications
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Starts a session and registers notifications for the user.
    pub async fn sign_in(&self, token: SessionToken) {
        let user_id = token.user_id.clone();
        self.session.sign_in(token).await;
        self.notifications.on_sign_in(user_id.as_deref()).await;
    }

    /// Ends the session and drops every piece of per-user state.
    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        self.teardown().await;
    }

    /// Converts an engine result for the caller, applying the auth policy.
    ///
    /// Callers must release any engine lock before calling this, since a
    /// forced sign-out resets every engine.
    pub async fn observe<T>(&self, result: SyncResult<T>) -> Result<T, ApiError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                if err.is_auth() {
                    self.force_sign_out().await;
                }
                Err(err.into())
            }
        }
    }

    async fn force_sign_out(&self) {
        if self.session.sign_out().await {
            warn!("Authentication rejected, signing out");
            self.teardown().await;
        }
    }

    async fn teardown(&self) {
        self.cart.reset().await;
        *self.checkout.lock().await = CheckoutSession::new(self.ledger.clone(), self.cart.clone());
        self.payment.reset().await;
        *self.cancellation.lock().await = CancellationFlow::new(self.ledger.clone());
        self.notifications.on_sign_out().await;
    }
}
