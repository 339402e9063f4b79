//! Authentication configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Authentication configuration (Supabase Auth)
///
/// Supabase signs access tokens with the project's JWT secret (HS256);
/// the secret is shared with this service so tokens can be checked locally.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Project JWT secret used to verify access tokens
    #[serde(default)]
    pub supabase_jwt_secret: String,

    /// Expected `aud` claim
    #[serde(default = "default_audience")]
    pub jwt_audience: String,

    /// Expected `iss` claim, e.g. `https://<ref>.supabase.co/auth/v1`
    pub jwt_issuer: Option<String>,

    /// Allowed clock skew in seconds
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// Production deployments must carry a secret of at least 32 bytes;
    /// development only needs one to be present.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.supabase_jwt_secret.is_empty() {
            return Err(ValidationError::MissingRequired("SUPABASE_JWT_SECRET"));
        }
        if self.jwt_audience.is_empty() {
            return Err(ValidationError::MissingRequired("JWT_AUDIENCE"));
        }
        if *environment == Environment::Production && self.supabase_jwt_secret.len() < 32 {
            return Err(ValidationError::MissingRequired("SUPABASE_JWT_SECRET (32+ bytes)"));
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            supabase_jwt_secret: String::new(),
            jwt_audience: default_audience(),
            jwt_issuer: None,
            leeway_secs: default_leeway(),
        }
    }
}

fn default_audience() -> String {
    "authenticated".to_string()
}

fn default_leeway() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.jwt_audience, "authenticated");
        assert_eq!(config.leeway_secs, 30);
        assert!(config.jwt_issuer.is_none());
    }

    #[test]
    fn test_validation_missing_secret() {
        let config = AuthConfig::default();
        assert!(config.validate(&Environment::Development).is_err());
    }

    #[test]
    fn test_validation_production_requires_long_secret() {
        let config = AuthConfig {
            supabase_jwt_secret: "short-secret".to_string(),
            ..Default::default()
        };
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(config.validate(&Environment::Production).is_err());

        let config = AuthConfig {
            supabase_jwt_secret: "x".repeat(40),
            ..Default::default()
        };
        assert!(config.validate(&Environment::Production).is_ok());
    }
}
