//! Authentication types for the domain layer.
//!
//! A caller is identified by a bearer token issued by Supabase Auth. The
//! `SessionValidator` port turns that token into an `AuthenticatedUser`;
//! nothing in here knows about JWTs.

use super::UserId;
use thiserror::Error;

/// Authenticated caller extracted from a validated access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The unique user identifier from the auth provider (`sub` claim).
    pub id: UserId,

    /// Email from the token claims, when the provider includes one.
    pub email: Option<String>,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(id: UserId, email: Option<String>) -> Self {
        Self { id, email }
    }

    /// Returns the email, or an empty string when the token carried none.
    ///
    /// The gateway accepts an empty email in subscription notes.
    pub fn email_or_empty(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The validator could not run (misconfiguration, key fetch failure).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the user should re-authenticate.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::TokenExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_or_empty_falls_back_to_empty_string() {
        let user = AuthenticatedUser::new(UserId::new("user-1").unwrap(), None);
        assert_eq!(user.email_or_empty(), "");

        let user = AuthenticatedUser::new(
            UserId::new("user-1").unwrap(),
            Some("asha@example.com".to_string()),
        );
        assert_eq!(user.email_or_empty(), "asha@example.com");
    }

    #[test]
    fn auth_error_service_unavailable_displays_message() {
        let err = AuthError::service_unavailable("jwt secret not configured");
        assert_eq!(
            format!("{}", err),
            "Auth service unavailable: jwt secret not configured"
        );
    }

    #[test]
    fn requires_reauthentication_only_for_token_errors() {
        assert!(AuthError::InvalidToken.requires_reauthentication());
        assert!(AuthError::TokenExpired.requires_reauthentication());
        assert!(!AuthError::service_unavailable("").requires_reauthentication());
    }
}
