//! Billing error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Unauthenticated | 401 |
//! | InvalidSignature | 400 |
//! | InvalidMode | 400 |
//! | ValidationFailed | 400 |
//! | Gateway | 500 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors returned by billing commands and queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// The operation needs a signed-in user.
    Unauthenticated,

    /// A checkout confirmation signature did not verify.
    InvalidSignature,

    /// Checkout was asked for a mode other than `order` or `subscription`.
    InvalidMode(String),

    /// A required input was missing or malformed.
    ValidationFailed { field: String, message: String },

    /// The payment gateway rejected or failed the call.
    Gateway(String),

    /// Store or other infrastructure failure.
    Infrastructure(String),
}

impl BillingError {
    pub fn invalid_mode(mode: impl Into<String>) -> Self {
        BillingError::InvalidMode(mode.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn gateway(message: impl Into<String>) -> Self {
        BillingError::Gateway(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::Unauthenticated => ErrorCode::Unauthorized,
            BillingError::InvalidSignature => ErrorCode::InvalidSignature,
            BillingError::InvalidMode(_) => ErrorCode::InvalidFormat,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Gateway(_) => ErrorCode::ExternalServiceError,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing message.
    pub fn message(&self) -> String {
        match self {
            BillingError::Unauthenticated => "Unauthorized".to_string(),
            BillingError::InvalidSignature => "Invalid signature".to_string(),
            BillingError::InvalidMode(mode) => {
                format!("Unknown checkout mode '{}': expected 'order' or 'subscription'", mode)
            }
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Gateway(_) => "Payment provider request failed".to_string(),
            BillingError::Infrastructure(_) => "Internal error".to_string(),
        }
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Keep the cause in logs even though the message hides it.
            BillingError::Gateway(cause) => write!(f, "Payment provider request failed: {}", cause),
            BillingError::Infrastructure(cause) => write!(f, "Infrastructure error: {}", cause),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed | ErrorCode::InvalidFormat => BillingError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::Unauthorized => BillingError::Unauthenticated,
            ErrorCode::InvalidSignature => BillingError::InvalidSignature,
            ErrorCode::ExternalServiceError => BillingError::Gateway(err.message),
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<BillingError> for DomainError {
    fn from(err: BillingError) -> Self {
        let domain = DomainError::new(err.code(), err.message());
        match err {
            BillingError::ValidationFailed { field, .. } => domain.with_detail("field", field),
            BillingError::InvalidMode(mode) => domain.with_detail("mode", mode),
            _ => domain,
        }
    }
}
