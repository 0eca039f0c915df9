//! # Storefront Configuration
//!
//! Configuration for the local auth backend, the session store and the
//! storefront's pricing rules.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BAZAAR_DB_PATH=/var/lib/bazaar/bazaar.db                           │
//! │     BAZAAR_JWT_SECRET=...                                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/storefront/storefront.toml (Linux)                       │
//! │     ~/Library/Application Support/com.bazaar.storefront/ (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     Platform data dir, 7.5% tax, $5.00 shipping                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # storefront.toml
//! [data]
//! db_path = "/home/ada/.local/share/storefront/bazaar.db"
//! session_path = "/home/ada/.local/share/storefront/session.json"
//!
//! [auth]
//! jwt_secret = "a-long-random-string"
//! access_lifetime_secs = 3600
//! min_password_length = 6
//! site_url = "http://localhost:5173"
//!
//! [store]
//! name = "Bazaar"
//! tax_rate_bps = 750
//! shipping_cents = 500
//! free_shipping_threshold_cents = 10000
//! ```

use std::path::PathBuf;

use bazaar_core::validation::validate_tax_rate_bps;
use bazaar_core::{PricingRules, TaxRate, MIN_PASSWORD_LENGTH};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Shortest JWT secret accepted by `validate`.
const MIN_SECRET_LENGTH: usize = 16;

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "bazaar", "storefront")
}

fn data_file(name: &str) -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(name))
        .unwrap_or_else(|| PathBuf::from(name))
}

// =============================================================================
// Data Paths
// =============================================================================

/// Where the storefront keeps its files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// SQLite database backing the local service.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Persisted session slice (the admin flag).
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    data_file("bazaar.db")
}

fn default_session_path() -> PathBuf {
    data_file("session.json")
}

impl Default for DataSettings {
    fn default() -> Self {
        DataSettings {
            db_path: default_db_path(),
            session_path: default_session_path(),
        }
    }
}

// =============================================================================
// Auth Settings
// =============================================================================

/// Settings for the local auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing secret for access tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Access token lifetime (seconds).
    #[serde(default = "default_access_lifetime")]
    pub access_lifetime_secs: i64,

    /// Minimum password length for sign-up and password reset.
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// Base URL used for OAuth and recovery links.
    #[serde(default = "default_site_url")]
    pub site_url: String,
}

fn default_jwt_secret() -> String {
    "bazaar-local-development-secret".to_string()
}

fn default_access_lifetime() -> i64 {
    3600
}

fn default_min_password_length() -> usize {
    MIN_PASSWORD_LENGTH
}

fn default_site_url() -> String {
    "http://localhost:5173".to_string()
}

impl Default for AuthSettings {
    fn default() -> Self {
        AuthSettings {
            jwt_secret: default_jwt_secret(),
            access_lifetime_secs: default_access_lifetime(),
            min_password_length: default_min_password_length(),
            site_url: default_site_url(),
        }
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// Storefront-wide pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_name")]
    pub name: String,

    /// Tax rate in basis points (750 = 7.5%).
    #[serde(default = "default_tax_rate")]
    pub tax_rate_bps: u32,

    /// Flat shipping fee per order.
    #[serde(default = "default_shipping")]
    pub shipping_cents: i64,

    /// Orders at or above this subtotal ship free. `None` disables.
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold_cents: Option<i64>,
}

fn default_store_name() -> String {
    "Bazaar".to_string()
}

fn default_tax_rate() -> u32 {
    750
}

fn default_shipping() -> i64 {
    500
}

fn default_free_shipping_threshold() -> Option<i64> {
    Some(10_000)
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
            tax_rate_bps: default_tax_rate(),
            shipping_cents: default_shipping(),
            free_shipping_threshold_cents: default_free_shipping_threshold(),
        }
    }
}

impl StoreSettings {
    /// Pricing rules for cart totals.
    pub fn pricing_rules(&self) -> PricingRules {
        PricingRules {
            tax_rate: TaxRate::from_bps(self.tax_rate_bps),
            shipping_cents: self.shipping_cents,
            free_shipping_threshold_cents: self.free_shipping_threshold_cents,
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete storefront configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub data: DataSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl StorefrontConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (storefront.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading storefront config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load storefront config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Storefront config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "jwt_secret must be at least {} characters",
                MIN_SECRET_LENGTH
            )));
        }

        if self.auth.access_lifetime_secs <= 0 {
            return Err(ConfigError::Invalid(
                "access_lifetime_secs must be greater than 0".into(),
            ));
        }

        if self.auth.min_password_length < MIN_PASSWORD_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "min_password_length must be at least {}",
                MIN_PASSWORD_LENGTH
            )));
        }

        let url = &self.auth.site_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "site_url must start with http:// or https://, got: {}",
                url
            )));
        }

        validate_tax_rate_bps(self.store.tax_rate_bps)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.store.shipping_cents < 0 {
            return Err(ConfigError::Invalid(
                "shipping_cents must not be negative".into(),
            ));
        }

        if matches!(self.store.free_shipping_threshold_cents, Some(t) if t < 0) {
            return Err(ConfigError::Invalid(
                "free_shipping_threshold_cents must not be negative".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides from `lookup` (the process environment in `load`).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("BAZAAR_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.data.db_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("BAZAAR_SESSION_PATH") {
            self.data.session_path = PathBuf::from(path);
        }

        if let Some(secret) = lookup("BAZAAR_JWT_SECRET") {
            debug!("Overriding JWT secret from environment");
            self.auth.jwt_secret = secret;
        }

        if let Some(rate) = lookup("BAZAAR_TAX_RATE_BPS") {
            match rate.parse::<u32>() {
                Ok(bps) => self.store.tax_rate_bps = bps,
                Err(_) => warn!(rate = %rate, "Ignoring unparseable tax rate in environment"),
            }
        }

        if let Some(url) = lookup("BAZAAR_SITE_URL") {
            debug!(url = %url, "Overriding site URL from environment");
            self.auth.site_url = url;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("storefront.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = StorefrontConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.tax_rate_bps, 750);
        assert_eq!(config.auth.min_password_length, MIN_PASSWORD_LENGTH);
    }

    #[test]
    fn test_config_validation() {
        let mut config = StorefrontConfig::default();

        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());

        config = StorefrontConfig::default();
        config.auth.site_url = "localhost".to_string();
        assert!(config.validate().is_err());

        config = StorefrontConfig::default();
        config.store.tax_rate_bps = 20_000;
        assert!(config.validate().is_err());

        config = StorefrontConfig::default();
        config.store.shipping_cents = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_win_over_file_values() {
        let mut config: StorefrontConfig = toml::from_str(
            r#"
            [store]
            tax_rate_bps = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.store.tax_rate_bps, 500);
        assert_eq!(config.store.shipping_cents, 500);

        let env: HashMap<&str, &str> = [
            ("BAZAAR_TAX_RATE_BPS", "825"),
            ("BAZAAR_DB_PATH", "/tmp/test.db"),
            ("BAZAAR_SITE_URL", "https://shop.example"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.tax_rate_bps, 825);
        assert_eq!(config.data.db_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.auth.site_url, "https://shop.example");
    }

    #[test]
    fn test_bad_env_tax_rate_is_ignored() {
        let mut config = StorefrontConfig::default();
        config.apply_overrides(|key| (key == "BAZAAR_TAX_RATE_BPS").then(|| "lots".to_string()));
        assert_eq!(config.store.tax_rate_bps, 750);
    }

    #[test]
    fn test_pricing_rules() {
        let rules = StoreSettings::default().pricing_rules();
        assert_eq!(rules.tax_rate.bps(), 750);
        assert_eq!(rules.shipping_cents, 500);
        assert_eq!(rules.free_shipping_threshold_cents, Some(10_000));
    }

    #[test]
    fn test_toml_serialization() {
        let config = StorefrontConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[data]"));
        assert!(toml_str.contains("[auth]"));
        assert!(toml_str.contains("[store]"));
    }
}
