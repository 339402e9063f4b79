//! Billing behaviour configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::billing::EntitlementPolicy;

/// Entitlement and caching settings
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// How the premium flag is derived from stored state
    #[serde(default)]
    pub entitlement_policy: EntitlementPolicy,

    /// How long a premium answer may be served from cache, in seconds
    #[serde(default = "default_cache_ttl")]
    pub premium_cache_ttl_secs: u64,

    /// Length of the synthetic subscription period written in demo mode
    #[serde(default = "default_demo_period_days")]
    pub demo_period_days: i64,
}

impl BillingConfig {
    /// Get the premium cache TTL as Duration
    pub fn premium_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.premium_cache_ttl_secs)
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.premium_cache_ttl_secs == 0 || self.premium_cache_ttl_secs > 3600 {
            return Err(ValidationError::InvalidCacheTtl);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            entitlement_policy: EntitlementPolicy::default(),
            premium_cache_ttl_secs: default_cache_ttl(),
            demo_period_days: default_demo_period_days(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    60
}

fn default_demo_period_days() -> i64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_config_defaults() {
        let config = BillingConfig::default();
        assert_eq!(config.entitlement_policy, EntitlementPolicy::ActiveSubscription);
        assert_eq!(config.premium_cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.demo_period_days, 30);
    }

    #[test]
    fn test_validation_cache_ttl_bounds() {
        let config = BillingConfig {
            premium_cache_ttl_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BillingConfig {
            premium_cache_ttl_secs: 7200,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(BillingConfig::default().validate().is_ok());
    }
}
