//! # State Module
//!
//! Application state for the storefront.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                         Storefront                              │   │
//! │  │  Session (bearer token, RwLock) ── read before every call       │   │
//! │  │  Arc<dyn LedgerClient> ─────────── shared by every engine       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              │                                          │
//! │     ┌──────────────┬─────────┼──────────────┬──────────────────┐       │
//! │     ▼              ▼         ▼              ▼                  ▼        │
//! │  ┌────────┐  ┌──────────┐ ┌──────────┐ ┌──────────────┐ ┌────────────┐ │
//! │  │CartStore│ │ Checkout │ │ Payment  │ │ Orders +     │ │Notification│ │
//! │  │(Clone) │  │ (Mutex)  │ │ State    │ │ Cancellation │ │ Service    │ │
//! │  └────────┘  └──────────┘ └──────────┘ └──────────────┘ └────────────┘ │
//! │                                                                         │
//! │  AUTH POLICY: the first auth error observed by any command signs the   │
//! │  user out and resets every engine above.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod payment;
mod storefront;

pub use payment::PaymentState;
pub use storefront::Storefront;
