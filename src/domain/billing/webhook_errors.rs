//! Webhook error types for Razorpay webhook handling.
//!
//! Razorpay redelivers on any non-2xx. Only `InvalidSignature` leaves the
//! webhook handler; the other variants are logged and acknowledged there.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header missing or not matching the body.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Verified body is not JSON or not a Razorpay event envelope.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The event tag requires an entity the payload does not carry.
    #[error("Missing entity: {0}")]
    MissingEntity(&'static str),

    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::ParseError(_)
            | WebhookError::MissingEntity(_) => StatusCode::BAD_REQUEST,
            WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Plain-text body returned to the caller.
    ///
    /// Store failures stay opaque; the detail goes to the logs.
    pub fn response_body(&self) -> String {
        match self {
            WebhookError::Database(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}
