//! # Checkout Commands
//!
//! ```text
//! SelectingDelivery ──choose_modality──► SelectingPaymentModality ──place_order──► Completed
//!        ▲                                        │                                  │
//!        └──────────── back_to_delivery ──────────┘                        handoff to payment
//! ```
//!
//! Each command locks the checkout session only for its own duration and
//! releases it before the auth policy runs.

use serde::Serialize;
use tracing::debug;

use cuota_core::types::{
    DeliveryOption, NewShippingAddress, PaymentModality, PickupOffice, ShippingAddress,
};
use cuota_ledger::wire::Locations;
use cuota_sync::{CheckoutHandoff, CheckoutStep, TotalsSnapshot};

use crate::error::ApiError;
use crate::state::Storefront;

/// What the checkout screen draws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub step: CheckoutStep,
    pub delivery: DeliveryOption,
    pub modality: PaymentModality,
    pub selected_address: Option<ShippingAddress>,
    pub selected_office: Option<PickupOffice>,
}

pub async fn get_checkout(sf: &Storefront) -> CheckoutView {
    let checkout = sf.checkout().lock().await;
    CheckoutView {
        step: checkout.step().clone(),
        delivery: checkout.delivery(),
        modality: checkout.modality(),
        selected_address: checkout.selected_address().cloned(),
        selected_office: checkout.selected_office().cloned(),
    }
}

/// Saved addresses; the default one is preselected on first load.
pub async fn list_addresses(sf: &Storefront) -> Result<Vec<ShippingAddress>, ApiError> {
    let result = sf.checkout().lock().await.addresses().await;
    sf.observe(result).await
}

pub async fn add_address(
    sf: &Storefront,
    address: NewShippingAddress,
) -> Result<TotalsSnapshot, ApiError> {
    debug!(city = %address.city, "add_address command");
    let result = sf.checkout().lock().await.add_address(&address).await;
    sf.observe(result).await
}

pub async fn select_address(
    sf: &Storefront,
    address: ShippingAddress,
) -> Result<TotalsSnapshot, ApiError> {
    debug!(address_id = %address.id, "select_address command");
    let result = sf.checkout().lock().await.select_address(address).await;
    sf.observe(result).await
}

pub async fn select_office(
    sf: &Storefront,
    office: PickupOffice,
) -> Result<TotalsSnapshot, ApiError> {
    debug!(office = %office.code, "select_office command");
    let result = sf.checkout().lock().await.select_office(office).await;
    sf.observe(result).await
}

/// Switches the delivery tab. Returns fresh totals when the tab already
/// had a target.
pub async fn switch_delivery(
    sf: &Storefront,
    option: DeliveryOption,
) -> Result<Option<TotalsSnapshot>, ApiError> {
    let result = sf.checkout().lock().await.switch_tab(option).await;
    sf.observe(result).await
}

/// States and cities for the address form.
pub async fn locations(sf: &Storefront) -> Result<Locations, ApiError> {
    let result = sf.ledger().locations().await.map_err(Into::into);
    sf.observe(result).await
}

pub async fn choose_modality(sf: &Storefront, modality: PaymentModality) -> CheckoutView {
    sf.checkout().lock().await.choose_modality(modality);
    get_checkout(sf).await
}

pub async fn back_to_delivery(sf: &Storefront) -> CheckoutView {
    sf.checkout().lock().await.back_to_delivery();
    get_checkout(sf).await
}

/// Confirms the order and returns the handoff for the payment screen.
pub async fn place_order(sf: &Storefront) -> Result<CheckoutHandoff, ApiError> {
    let result = sf.checkout().lock().await.place_order().await;
    sf.observe(result).await
}
