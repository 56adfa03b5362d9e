//! [`Args`] definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cuota_core::money::Currency;
use cuota_core::status::StatusTier;
use cuota_core::types::SaleId;

/// Terminal client for the Cuota storefront backend.
#[derive(Debug, Parser)]
#[command(name = "cuota", version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file (defaults to the platform config dir).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Access token of a signed-in user.
    #[arg(long, env = "CUOTA_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Current BS per USD exchange rate.
    Rate,

    /// Server copy of the cart with its totals.
    Cart,

    /// Order history, newest first.
    Orders {
        /// Only orders in this tier: success, processing, pending, canceled.
        #[arg(long)]
        status: Option<StatusTier>,
    },

    /// One order with its quotas.
    Order { sale_id: SaleId },

    /// Installment plan and amount due today for a sale.
    Conditions {
        sale_id: SaleId,

        /// Single lump-sum payment instead of installments.
        #[arg(long)]
        cash: bool,

        /// Currency for the amount due today (BS or USD).
        #[arg(long, default_value = "BS")]
        currency: Currency,
    },
}

impl Args {
    /// Parses command line arguments.
    ///
    /// # Errors
    ///
    /// Errors if failed to parse command line arguments.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_subcommands() {
        let args = Args::try_parse_from(["cuota", "orders", "--status", "processing"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Orders {
                status: Some(StatusTier::Processing)
            }
        ));

        let args =
            Args::try_parse_from(["cuota", "conditions", "12", "--cash", "--currency", "usd"])
                .unwrap();
        assert!(matches!(
            args.command,
            Command::Conditions {
                sale_id: 12,
                cash: true,
                currency: Currency::Usd
            }
        ));
    }

    #[test]
    fn test_rejects_unknown_tier() {
        assert!(Args::try_parse_from(["cuota", "orders", "--status", "shipped"]).is_err());
    }
}
