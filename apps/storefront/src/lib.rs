//! # Cuota Storefront Library
//!
//! Composition root for the Cuota client: builds the engines over one
//! ledger client and session, exposes the commands the front end invokes,
//! and applies the app-level auth policy.
//!
//! ## Module Organization
//! ```text
//! cuota_storefront/
//! ├── lib.rs            ◄─── You are here (tracing, CLI dispatch)
//! ├── args.rs           ◄─── clap arguments for the `cuota` binary
//! ├── state/
//! │   ├── mod.rs        ◄─── State exports
//! │   ├── storefront.rs ◄─── Composition root + forced sign-out
//! │   └── payment.rs    ◄─── Open payment target and currency
//! ├── commands/
//! │   ├── cart.rs       ◄─── Cart edits and sync
//! │   ├── checkout.rs   ◄─── Delivery, modality, place order
//! │   ├── payment.rs    ◄─── Amount resolution and submission
//! │   ├── orders.rs     ◄─── History, detail, cancellation
//! │   └── account.rs    ◄─── Session and notifications
//! ├── notifications.rs  ◄─── Injected NotificationService
//! └── error.rs          ◄─── ApiError with machine-readable codes
//! ```

pub mod args;
pub mod commands;
pub mod error;
pub mod notifications;
pub mod state;

use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cuota_core::types::PaymentModality;
use cuota_ledger::{ClientConfig, Session, SessionToken};
use cuota_sync::CheckoutHandoff;

pub use args::{Args, Command};
pub use error::{ApiError, ErrorCode};
pub use notifications::{LedgerNotifications, NoopNotifications, NotificationService};
pub use state::Storefront;

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=cuota=trace` - Show trace for cuota crates only
/// - Default: `info,cuota=debug,reqwest=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cuota=debug,reqwest=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs one CLI command and returns its JSON output.
///
/// ## Sequence
/// ```text
/// load config ──► connect ledger ──► sign in (token) ──► dispatch ──► JSON
/// ```
pub async fn run(args: Args) -> Result<String, ApiError> {
    let config = ClientConfig::load(args.config)?;
    let storefront = Storefront::connect(&config, Session::new(), Arc::new(NoopNotifications))?;

    if let Some(token) = args.token {
        storefront.sign_in(SessionToken::new(token)).await;
    }

    info!(command = ?args.command, "Running command");
    let sf = &storefront;
    match args.command {
        Command::Rate => to_json(&commands::payment::exchange_rate(sf).await?),
        Command::Cart => to_json(&commands::cart::refresh_cart(sf).await?),
        Command::Orders { status } => to_json(&commands::orders::list_orders(sf, status).await?),
        Command::Order { sale_id } => to_json(&commands::orders::get_order(sf, sale_id).await?),
        Command::Conditions {
            sale_id,
            cash,
            currency,
        } => {
            let handoff = CheckoutHandoff {
                sale_id,
                modality: if cash {
                    PaymentModality::Cash
                } else {
                    PaymentModality::Installments
                },
                total: None,
            };
            to_json(&commands::payment::open_initial_payment(sf, handoff, currency).await?)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::new(ErrorCode::Internal, format!("could not encode output: {}", e)))
}
