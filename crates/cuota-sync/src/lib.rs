//! # cuota-sync: Reconciliation Engines for Cuota
//!
//! Keeps the local view of cart, checkout, payment amounts and orders
//! consistent with the backend of record while the user keeps working.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Reconciliation Engines                           │
//! │                                                                         │
//! │  ┌────────────────┐   sale id   ┌────────────────┐   target             │
//! │  │   CartStore    │────────────►│ CheckoutSession│─────────┐            │
//! │  │                │             │                │         │            │
//! │  │ optimistic     │             │ delivery tabs, │         ▼            │
//! │  │ edits, guarded │             │ modality,      │  ┌────────────────┐  │
//! │  │ refresh        │             │ place order    │  │ PaymentPlan    │  │
//! │  └────────────────┘             └────────────────┘  │ Resolver       │  │
//! │                                                     │ USD/BS amount, │  │
//! │  ┌────────────────┐  pay_target ──────────────────► │ fallback rate  │  │
//! │  │ OrderDetail    │                                 └───────┬────────┘  │
//! │  │ Reconciler     │                                         │           │
//! │  │ history, quotas│  ┌────────────────┐             ┌───────▼────────┐  │
//! │  └────────────────┘  │CancellationFlow│             │PaymentSubmitter│  │
//! │                      │ form → refund  │             │ validate+route │  │
//! │                      └────────────────┘             └────────────────┘  │
//! │                                                                         │
//! │  Every engine talks to the backend through Arc<dyn LedgerClient>.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`cart_store`] - Local cart mirror with optimistic edits
//! - [`checkout`] - Delivery and payment modality selection
//! - [`resolver`] - Amount owed in the chosen currency
//! - [`submission`] - Payment evidence validation and routing
//! - [`orders`] - Order history and detail assembly
//! - [`cancellation`] - Cancellation form and refund display
//! - [`error`] - Sync error types and user-facing messages
//!
//! ## Error Handling
//!
//! All engines return [`SyncResult`]. Auth failures always propagate so the
//! app layer can sign the user out. Everything else is either degraded
//! gracefully inside the engine or mapped through
//! [`SyncError::user_message`].

pub mod cancellation;
pub mod cart_store;
pub mod checkout;
pub mod error;
pub mod orders;
pub mod resolver;
pub mod submission;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use cancellation::{CancellationFlow, CancellationPhase};
pub use cart_store::{CartStore, TotalsSnapshot};
pub use checkout::{CheckoutHandoff, CheckoutSession, CheckoutStep};
pub use error::{SyncError, SyncResult};
pub use orders::{OrderDetailReconciler, OrderRow, OrderView, QuotaRow};
pub use resolver::{
    AmountSource, PaymentPlanResolver, PaymentTarget, ResolvedAmount, ResolverState,
};
pub use submission::PaymentSubmitter;
