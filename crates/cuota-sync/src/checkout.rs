//! # Checkout Session
//!
//! Turns a cart into a confirmed sale with a delivery target and a payment
//! modality.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   SelectingDelivery ──choose_modality──► SelectingPaymentModality       │
//! │     │  ▲   select_address / select_office / switch_tab                  │
//! │     │  │   (persisted immediately, totals refreshed)                    │
//! │     │  │                                                                │
//! │     │  └──────────── any failure restores the previous step ───┐        │
//! │     │                                                           │        │
//! │     └────────────────────── place_order ──────────► Confirming ─┤        │
//! │                                                                 │        │
//! │                               fresh sale id + total ──► Completed        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pickup delivery without an office fails before any request is made.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use cuota_core::money::Money;
use cuota_core::types::{
    DeliveryOption, DeliveryTarget, NewShippingAddress, PaymentModality, PickupOffice, SaleId,
    ShippingAddress,
};
use cuota_ledger::LedgerClient;

use crate::cart_store::{CartStore, TotalsSnapshot};
use crate::error::{SyncError, SyncResult};

/// Where the checkout currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "handoff", rename_all = "snake_case")]
pub enum CheckoutStep {
    SelectingDelivery,
    SelectingPaymentModality,
    Confirming,
    Completed(CheckoutHandoff),
}

/// What the payment screen receives once the order is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutHandoff {
    pub sale_id: SaleId,
    pub modality: PaymentModality,
    pub total: Option<Money>,
}

/// One checkout, from delivery selection to handoff.
pub struct CheckoutSession {
    ledger: Arc<dyn LedgerClient>,
    cart: CartStore,
    step: CheckoutStep,
    delivery: DeliveryOption,
    address: Option<ShippingAddress>,
    office: Option<PickupOffice>,
    modality: PaymentModality,
}

impl CheckoutSession {
    pub fn new(ledger: Arc<dyn LedgerClient>, cart: CartStore) -> Self {
        CheckoutSession {
            ledger,
            cart,
            step: CheckoutStep::SelectingDelivery,
            delivery: DeliveryOption::default(),
            address: None,
            office: None,
            modality: PaymentModality::default(),
        }
    }

    pub fn step(&self) -> &CheckoutStep {
        &self.step
    }

    pub fn delivery(&self) -> DeliveryOption {
        self.delivery
    }

    pub fn modality(&self) -> PaymentModality {
        self.modality
    }

    pub fn selected_address(&self) -> Option<&ShippingAddress> {
        self.address.as_ref()
    }

    pub fn selected_office(&self) -> Option<&PickupOffice> {
        self.office.as_ref()
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Saved addresses, with the default one preselected when nothing was
    /// chosen yet. Preselection is local; it is persisted on selection.
    pub async fn addresses(&mut self) -> SyncResult<Vec<ShippingAddress>> {
        let addresses = self.ledger.addresses().await?;
        if self.address.is_none() {
            self.address = addresses.iter().find(|a| a.is_default).cloned();
        }
        Ok(addresses)
    }

    /// Saves a new address and makes it the active target.
    pub async fn add_address(&mut self, address: &NewShippingAddress) -> SyncResult<TotalsSnapshot> {
        let saved = self.ledger.add_address(address).await?;
        info!(address_id = %saved.id, "Address saved");
        self.select_address(saved).await
    }

    /// Persists `address` as the active target and refreshes totals.
    pub async fn select_address(&mut self, address: ShippingAddress) -> SyncResult<TotalsSnapshot> {
        let target = DeliveryTarget::Address(address.clone());
        let snapshot = self.activate(&target).await?;
        self.delivery = DeliveryOption::Address;
        self.address = Some(address);
        Ok(snapshot)
    }

    /// Persists `office` as the active target and refreshes totals.
    pub async fn select_office(&mut self, office: PickupOffice) -> SyncResult<TotalsSnapshot> {
        let target = DeliveryTarget::Office(office.clone());
        let snapshot = self.activate(&target).await?;
        self.delivery = DeliveryOption::Zoom;
        self.office = Some(office);
        Ok(snapshot)
    }

    /// Switches between home delivery and pickup.
    ///
    /// If a target was already chosen on the tab being opened, it is sent
    /// again as the active one and fresh totals are returned. The tab only
    /// changes once the server accepted that target.
    pub async fn switch_tab(&mut self, option: DeliveryOption) -> SyncResult<Option<TotalsSnapshot>> {
        if option == self.delivery {
            return Ok(None);
        }
        let target = match option {
            DeliveryOption::Address => self.address.clone().map(DeliveryTarget::Address),
            DeliveryOption::Zoom => self.office.clone().map(DeliveryTarget::Office),
        };
        let snapshot = match target {
            Some(target) => Some(self.activate(&target).await?),
            None => None,
        };

        debug!(?option, "Checkout tab switched");
        self.delivery = option;
        Ok(snapshot)
    }

    async fn activate(&mut self, target: &DeliveryTarget) -> SyncResult<TotalsSnapshot> {
        self.ledger.set_delivery_target(target).await?;
        let snapshot = self.cart.refresh_cart_totals().await?;
        debug!(option = ?target.option(), total = ?snapshot.total, "Delivery target active");
        Ok(snapshot)
    }

    // =========================================================================
    // Payment Modality
    // =========================================================================

    /// Local choice; nothing is sent until the order is placed.
    pub fn choose_modality(&mut self, modality: PaymentModality) {
        self.modality = modality;
        if !matches!(self.step, CheckoutStep::Completed(_)) {
            self.step = CheckoutStep::SelectingPaymentModality;
        }
    }

    /// Returns to delivery selection.
    pub fn back_to_delivery(&mut self) {
        if !matches!(self.step, CheckoutStep::Completed(_)) {
            self.step = CheckoutStep::SelectingDelivery;
        }
    }

    // =========================================================================
    // Confirmation
    // =========================================================================

    /// Confirms the order and hands off `(sale_id, modality)`.
    ///
    /// ## Errors
    /// - `NoOfficeSelected`: pickup chosen without an office (no request made)
    /// - `MissingSaleId`: neither the fresh totals nor the known state carry one
    /// - any ledger failure from sending unsent cart lines or the totals refresh
    ///
    /// On error the session returns to the step it was in.
    pub async fn place_order(&mut self) -> SyncResult<CheckoutHandoff> {
        if let CheckoutStep::Completed(handoff) = &self.step {
            return Ok(*handoff);
        }
        if self.delivery == DeliveryOption::Zoom && self.office.is_none() {
            return Err(SyncError::NoOfficeSelected);
        }

        let previous = std::mem::replace(&mut self.step, CheckoutStep::Confirming);

        match self.confirm().await {
            Ok(handoff) => {
                info!(sale_id = handoff.sale_id, modality = ?handoff.modality, "Order placed");
                self.step = CheckoutStep::Completed(handoff);
                Ok(handoff)
            }
            Err(e) => {
                warn!(error = %e, "Order placement failed");
                self.step = previous;
                Err(e)
            }
        }
    }

    async fn confirm(&self) -> SyncResult<CheckoutHandoff> {
        // Lines added or merged locally must be on the server before the
        // sale id and total are read.
        if self.cart.has_unsent().await {
            self.cart.persist().await?;
        }
        let snapshot = self.cart.refresh_cart_totals().await?;
        let sale_id = match snapshot.sale_id {
            Some(id) => id,
            None => self
                .cart
                .known_sale_id()
                .await
                .ok_or(SyncError::MissingSaleId)?,
        };

        Ok(CheckoutHandoff {
            sale_id,
            modality: self.modality,
            total: snapshot.total,
        })
    }
}
