//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `UJJWALDEEP` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use ujjwaldeep_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod auth;
mod billing;
mod database;
mod error;
mod payment;
mod server;

pub use auth::AuthConfig;
pub use billing::BillingConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (Supabase Postgres)
    pub database: DatabaseConfig,

    /// Authentication configuration (Supabase JWT)
    #[serde(default)]
    pub auth: AuthConfig,

    /// Payment configuration (Razorpay)
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Entitlement and cache settings
    #[serde(default)]
    pub billing: BillingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variable Format
    ///
    /// - `UJJWALDEEP__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `UJJWALDEEP__PAYMENT__RAZORPAY_KEY_ID=...` -> `payment.razorpay_key_id = ...`
    ///
    /// A `.env` file is read first when present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("UJJWALDEEP")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.payment.validate(&self.server.environment)?;
        self.billing.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::EntitlementPolicy;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "UJJWALDEEP__DATABASE__URL",
        "UJJWALDEEP__AUTH__SUPABASE_JWT_SECRET",
        "UJJWALDEEP__PAYMENT__RAZORPAY_KEY_ID",
        "UJJWALDEEP__PAYMENT__RAZORPAY_KEY_SECRET",
        "UJJWALDEEP__PAYMENT__RAZORPAY_WEBHOOK_SECRET",
        "UJJWALDEEP__SERVER__PORT",
        "UJJWALDEEP__SERVER__ENVIRONMENT",
        "UJJWALDEEP__BILLING__ENTITLEMENT_POLICY",
    ];

    fn set_minimal_env() {
        env::set_var("UJJWALDEEP__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("UJJWALDEEP__AUTH__SUPABASE_JWT_SECRET", "dev-jwt-secret");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_minimal_environment_defaults_to_demo() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.server.port, 8080);
        assert!(config.payment.is_demo_mode());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_razorpay_credentials() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("UJJWALDEEP__PAYMENT__RAZORPAY_KEY_ID", "rzp_test_9aZ");
        env::set_var("UJJWALDEEP__PAYMENT__RAZORPAY_KEY_SECRET", "key-secret");
        env::set_var("UJJWALDEEP__PAYMENT__RAZORPAY_WEBHOOK_SECRET", "hook-secret");
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.payment.razorpay_key_id, "rzp_test_9aZ");
        assert!(!config.payment.is_demo_mode());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_entitlement_policy_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("UJJWALDEEP__BILLING__ENTITLEMENT_POLICY", "all_authenticated");
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(
            config.billing.entitlement_policy,
            EntitlementPolicy::AllAuthenticated
        );
    }

    #[test]
    fn test_production_rejects_demo_mode() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("UJJWALDEEP__SERVER__ENVIRONMENT", "production");
        env::set_var(
            "UJJWALDEEP__AUTH__SUPABASE_JWT_SECRET",
            "a-production-grade-secret-of-40-bytes!!!",
        );
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert!(config.is_production());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("UJJWALDEEP__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        assert_eq!(result.unwrap().server.port, 3000);
    }
}
