//! # Configuration State
//!
//! Store settings the commands need, copied out of `StorefrontConfig` at
//! startup.
//!
//! ## Thread Safety
//! Read-only after initialization, so no mutex needed.

use bazaar_core::PricingRules;
use bazaar_session::StorefrontConfig;
use serde::Serialize;

/// Store settings shown to shoppers and used for pricing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Store name (shown in the shell banner)
    pub store_name: String,

    /// Tax, shipping and free-shipping threshold applied to every cart
    pub pricing: PricingRules,

    /// Where OAuth and recovery links point back to
    pub site_url: String,
}

impl ConfigState {
    pub fn from_config(config: &StorefrontConfig) -> Self {
        ConfigState {
            store_name: config.store.name.clone(),
            pricing: config.store.pricing_rules(),
            site_url: config.auth.site_url.clone(),
        }
    }
}

impl Default for ConfigState {
    fn default() -> Self {
        ConfigState::from_config(&StorefrontConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pricing() {
        let config = ConfigState::default();

        assert_eq!(config.pricing.tax_rate.bps(), 750);
        assert_eq!(config.pricing.shipping_cents, 500);
        assert_eq!(config.pricing.free_shipping_threshold_cents, Some(10_000));
    }
}
