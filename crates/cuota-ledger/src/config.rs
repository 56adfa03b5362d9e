//! # Client Configuration
//!
//! Where the backend lives and how payments degrade.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CUOTA_BASE_URL=https://abc.supabase.co                             │
//! │     CUOTA_ANON_KEY=eyJ...                                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/storefront/cuota.toml (Linux)                            │
//! │     ~/Library/Application Support/com.cuota.storefront/cuota.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     local Supabase stack, 30 s timeout, 50 Bs/USD fallback             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [backend]
//! base_url = "https://abc.supabase.co"
//! anon_key = "eyJ..."
//! timeout_secs = 30
//!
//! [payments]
//! fallback_exchange_rate = 50.0
//! default_currency = "BS"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use cuota_core::money::{Currency, ExchangeRate};

use crate::error::{LedgerError, LedgerResult};

// =============================================================================
// Backend Settings
// =============================================================================

/// Connection settings for the Edge Functions backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Project URL, without the `/functions/v1` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Public anon key, sent as the `apikey` header.
    #[serde(default)]
    pub anon_key: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        BackendSettings {
            base_url: default_base_url(),
            anon_key: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

// =============================================================================
// Payment Settings
// =============================================================================

/// Payment display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettings {
    /// Bs per USD used when the backend cannot quote a rate.
    #[serde(default = "default_fallback_rate")]
    pub fallback_exchange_rate: f64,

    /// Currency preselected on payment screens.
    #[serde(default)]
    pub default_currency: Currency,
}

fn default_fallback_rate() -> f64 {
    50.0
}

impl PaymentSettings {
    /// Fallback rate as fixed point. Invalid settings fall back to 50.
    pub fn fallback_rate(&self) -> ExchangeRate {
        ExchangeRate::from_decimal(self.fallback_exchange_rate).unwrap_or(ExchangeRate::FALLBACK)
    }
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            fallback_exchange_rate: default_fallback_rate(),
            default_currency: Currency::default(),
        }
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub payments: PaymentSettings,
}

impl ClientConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`cuota.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> LedgerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> LedgerResult<()> {
        let url = Url::parse(&self.backend.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(LedgerError::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.backend.base_url
            )));
        }

        if self.backend.timeout_secs == 0 {
            return Err(LedgerError::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if ExchangeRate::from_decimal(self.payments.fallback_exchange_rate).is_none() {
            return Err(LedgerError::Config(
                "fallback_exchange_rate must be a positive number".into(),
            ));
        }

        Ok(())
    }

    /// Applies `CUOTA_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the environment in practice).
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CUOTA_BASE_URL") {
            debug!(url = %url, "Overriding base URL from environment");
            self.backend.base_url = url;
        }

        if let Some(key) = lookup("CUOTA_ANON_KEY") {
            self.backend.anon_key = key;
        }

        if let Some(timeout) = lookup("CUOTA_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(t) => self.backend.timeout_secs = t,
                Err(_) => warn!(value = %timeout, "Ignoring invalid CUOTA_TIMEOUT_SECS"),
            }
        }

        if let Some(rate) = lookup("CUOTA_FALLBACK_RATE") {
            match rate.parse::<f64>() {
                Ok(r) => self.payments.fallback_exchange_rate = r,
                Err(_) => warn!(value = %rate, "Ignoring invalid CUOTA_FALLBACK_RATE"),
            }
        }

        if let Some(currency) = lookup("CUOTA_DEFAULT_CURRENCY") {
            match currency.parse::<Currency>() {
                Ok(c) => self.payments.default_currency = c,
                Err(_) => warn!(value = %currency, "Ignoring invalid CUOTA_DEFAULT_CURRENCY"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "cuota", "storefront")
            .map(|dirs| dirs.config_dir().join("cuota.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Base URL of the Edge Functions endpoint (`{base}/functions/v1/`).
    pub fn functions_url(&self) -> LedgerResult<Url> {
        let base = self.backend.base_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{}/functions/v1/", base))?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    pub fn fallback_rate(&self) -> ExchangeRate {
        self.payments.fallback_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.fallback_rate(), ExchangeRate::FALLBACK);
        assert_eq!(config.payments.default_currency, Currency::Bs);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.backend.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.backend.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.backend.base_url = "https://abc.supabase.co".to_string();
        assert!(config.validate().is_ok());

        config.backend.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.backend.timeout_secs = 10;
        config.payments.fallback_exchange_rate = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CUOTA_BASE_URL", "https://abc.supabase.co"),
            ("CUOTA_TIMEOUT_SECS", "5"),
            ("CUOTA_FALLBACK_RATE", "not-a-number"),
            ("CUOTA_DEFAULT_CURRENCY", "usd"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.base_url, "https://abc.supabase.co");
        assert_eq!(config.backend.timeout_secs, 5);
        assert_eq!(config.payments.fallback_exchange_rate, 50.0);
        assert_eq!(config.payments.default_currency, Currency::Usd);
    }

    #[test]
    fn test_toml_parsing() {
        let config: ClientConfig = toml::from_str(
            r#"
            [backend]
            base_url = "https://abc.supabase.co/"
            anon_key = "anon"

            [payments]
            fallback_exchange_rate = 36.5
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(
            config.functions_url().unwrap().as_str(),
            "https://abc.supabase.co/functions/v1/"
        );
        assert_eq!(config.fallback_rate(), ExchangeRate::from_decimal(36.5).unwrap());
    }
}
