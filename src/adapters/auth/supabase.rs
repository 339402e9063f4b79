//! Supabase Auth adapter for JWT validation.
//!
//! Supabase signs access tokens with the project's JWT secret (HS256). This
//! adapter checks the signature locally and validates:
//!
//! - **Audience (aud)**: must match the configured audience (`authenticated`)
//! - **Issuer (iss)**: checked only when one is configured
//! - **Expiry (exp)**: must be in the future, within the configured leeway

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Configuration for the Supabase session validator.
#[derive(Clone)]
pub struct SupabaseAuthConfig {
    jwt_secret: SecretString,
    audience: String,
    issuer: Option<String>,
    leeway_secs: u64,
}

impl SupabaseAuthConfig {
    /// Create a configuration for the given secret and the default audience.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: SecretString::new(jwt_secret.into()),
            audience: "authenticated".to_string(),
            issuer: None,
            leeway_secs: 30,
        }
    }

    /// Require this issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Set the allowed clock skew.
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    pub fn from_auth_config(config: &AuthConfig) -> Self {
        Self {
            jwt_secret: SecretString::new(config.supabase_jwt_secret.clone()),
            audience: config.jwt_audience.clone(),
            issuer: config.jwt_issuer.clone(),
            leeway_secs: config.leeway_secs,
        }
    }
}

/// Claims Supabase puts in an access token.
#[derive(Debug, Serialize, Deserialize)]
struct SupabaseClaims {
    /// Subject - the auth user id
    sub: String,

    exp: i64,

    #[serde(default)]
    email: Option<String>,

    #[serde(default)]
    role: Option<String>,
}

/// Validates Supabase access tokens.
pub struct SupabaseSessionValidator {
    config: SupabaseAuthConfig,
    decoding_key: DecodingKey,
}

impl SupabaseSessionValidator {
    /// Create a validator for the given configuration.
    pub fn new(config: SupabaseAuthConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes());
        Self {
            config,
            decoding_key,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation.leeway = self.config.leeway_secs;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        validation
    }

    fn decode_claims(&self, token: &str) -> Result<TokenData<SupabaseClaims>, AuthError> {
        decode::<SupabaseClaims>(token, &self.decoding_key, &self.validation()).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidAudience => {
                    tracing::warn!("Invalid audience in token");
                    AuthError::InvalidToken
                }
                ErrorKind::InvalidIssuer => {
                    tracing::warn!("Invalid issuer in token");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!(error = %e, "Token validation failed");
                    AuthError::InvalidToken
                }
            }
        })
    }
}

#[async_trait]
impl SessionValidator for SupabaseSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if self.config.jwt_secret.expose_secret().is_empty() {
            return Err(AuthError::service_unavailable("JWT secret not configured"));
        }

        let claims = self.decode_claims(token)?.claims;

        let user_id = UserId::new(&claims.sub).map_err(|_| {
            tracing::warn!("Token has an empty subject");
            AuthError::InvalidToken
        })?;

        let email = claims.email.filter(|e| !e.is_empty());
        Ok(AuthenticatedUser::new(user_id, email))
    }
}

impl std::fmt::Debug for SupabaseSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseSessionValidator")
            .field("audience", &self.config.audience)
            .field("issuer", &self.config.issuer)
            .finish_non_exhaustive()
    }
}
