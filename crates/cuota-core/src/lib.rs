//! # cuota-core: Pure Domain Logic for the Cuota Storefront
//!
//! Everything the storefront knows about carts, money, order statuses and
//! payment forms, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cuota Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Front end (React Native)                        │   │
//! │  │   Cart ──► Checkout ──► Payment ──► Orders ──► Cancellation     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          cuota-sync (cart store, checkout, resolver ...)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cuota-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐  │   │
//! │  │   │  types  │ │  money  │ │  cart   │ │ status  │ │validation│  │   │
//! │  │   │  Sale   │ │ Currency│ │  merge  │ │  tiers  │ │  forms   │  │   │
//! │  │   │  Quota  │ │  Rate   │ │subtotal │ │ payable │ │  banks   │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          cuota-ledger (Edge Function client, reqwest)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CartItem, Sale, PaymentInstallment, ...)
//! - [`money`] - Money, Currency and ExchangeRate (integer arithmetic)
//! - [`status`] - The one table mapping server status strings to variants
//! - [`cart`] - Local cart math (add, merge, quantity, subtotal)
//! - [`coerce`] - Tolerant readers for loosely shaped server JSON
//! - [`validation`] - Payment and cancellation form rules
//! - [`banks`] - Bank reference list used by both forms
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **The server owns the money rules**: installment plans, penalties and
//!    credit levels are only ever read, never computed here
//! 2. **Integer Money**: all amounts are cents (i64), floats only at the wire
//! 3. **One status table**: display tier, cancellability and payability all
//!    derive from the same enum
//!
//! ## Example Usage
//!
//! ```rust
//! use cuota_core::cart::Cart;
//! use cuota_core::money::Money;
//! use cuota_core::types::CartItem;
//!
//! let mut cart = Cart::new();
//! cart.add_item(CartItem::new("A", "Widget", Money::from_cents(1999)));
//! cart.add_item(CartItem::new("A", "Widget", Money::from_cents(1999)));
//!
//! assert_eq!(cart.items()[0].quantity, 2);
//! assert_eq!(cart.subtotal().cents(), 3998);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod banks;
pub mod cart;
pub mod coerce;
pub mod error;
pub mod money;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Currency, ExchangeRate, Money, Percent};
pub use status::{QuotaStatus, SaleStatus, StatusTier};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Prefix for ids generated for cart items the server never assigned one.
pub const TEMP_ID_PREFIX: &str = "tmp-";
