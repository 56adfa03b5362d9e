//! # cuota-ledger
//!
//! Remote ledger client for Cuota: every call to the backend of record goes
//! through here.
//!
//! ## Module Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           cuota-ledger                                  │
//! │                                                                         │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌──────────────────┐  │
//! │  │  client    │  │   http     │  │   wire     │  │    endpoints     │  │
//! │  │            │  │            │  │            │  │                  │  │
//! │  │ LedgerClient│ │ HttpLedger │  │ Request/   │  │ Edge Function    │  │
//! │  │ (trait)    │◄─│ Client     │──│ response   │  │ names            │  │
//! │  └────────────┘  └─────┬──────┘  │ DTOs       │  └──────────────────┘  │
//! │                        │         └────────────┘                        │
//! │  ┌────────────┐  ┌─────┴──────┐  ┌────────────┐                        │
//! │  │  config    │  │  session   │  │   error    │                        │
//! │  │ TOML + env │  │ bearer     │  │ LedgerError│                        │
//! │  └────────────┘  └────────────┘  └────────────┘                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use cuota_ledger::{ClientConfig, HttpLedgerClient, LedgerClient, Session, SessionToken};
//!
//! let config = ClientConfig::load(None)?;
//! let session = Session::with_token(SessionToken::new(token));
//! let ledger = HttpLedgerClient::new(&config, session)?;
//!
//! let cart = ledger.fetch_cart().await?;
//! ```

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod session;
pub mod wire;

pub use client::LedgerClient;
pub use config::{BackendSettings, ClientConfig, PaymentSettings};
pub use error::{LedgerError, LedgerResult};
pub use http::{decode_envelope, HttpLedgerClient};
pub use session::{Session, SessionToken};
pub use wire::{
    AmountDue, AmountDueRequest, BankOption, InitialPaymentRequest, Locations, Notification,
    OrderDetailBundle, PaymentAmounts, PaymentMethodOption, PaymentMethodsCatalog,
    QuotaPaymentRequest, ServerCart, SubmissionReceipt,
};
