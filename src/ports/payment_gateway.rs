//! Payment gateway port for outbound calls to the payment provider.
//!
//! Covers the three calls checkout and the billing portal make: create a
//! one-time order, create a recurring subscription, cancel a subscription.
//! Price and plan terms are fixed by the adapter's configuration, so
//! requests only carry who is buying.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, UserId};

/// Port for the payment provider's REST API.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a one-time order for the plan price.
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, PaymentError>;

    /// Create a recurring subscription to the premium plan.
    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, PaymentError>;

    /// Cancel a subscription immediately.
    async fn cancel_subscription(
        &self,
        provider_subscription_id: &str,
    ) -> Result<GatewaySubscription, PaymentError>;
}

/// Request to create an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Buyer; attached to the order notes so webhooks can attribute it.
    pub user_id: UserId,
}

/// Request to create a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub user_id: UserId,
    /// May be empty when the auth provider has no email for the user.
    pub email: String,
}

/// Order created at the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    pub currency: String,
}

/// Subscription as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySubscription {
    pub id: String,
    pub status: String,
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// HTTP status returned by the provider, if a response arrived.
    pub http_status: Option<u16>,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            http_status: None,
        }
    }

    /// Attach the provider's error code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Attach the HTTP status.
    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Connection could not be established or was reset.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Request timed out.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    /// Response body could not be understood.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    /// Maps an HTTP error status to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let code = match status {
            401 | 403 => PaymentErrorCode::AuthenticationError,
            404 => PaymentErrorCode::NotFound,
            429 => PaymentErrorCode::RateLimitExceeded,
            400..=499 => PaymentErrorCode::InvalidRequest,
            500..=599 => PaymentErrorCode::ServerError,
            _ => PaymentErrorCode::Unknown,
        };
        Self::new(code, message).with_http_status(status)
    }

    /// Whether the same request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let domain = DomainError::new(ErrorCode::ExternalServiceError, err.message)
            .with_detail("payment_error", err.code.to_string());
        match err.provider_code {
            Some(code) => domain.with_detail("provider_code", code),
            None => domain,
        }
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Connection refused, reset or DNS failure.
    NetworkError,

    /// No response within the request timeout.
    Timeout,

    /// API credentials rejected.
    AuthenticationError,

    /// Request rejected as malformed (4xx).
    InvalidRequest,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider-side failure (5xx).
    ServerError,

    /// Response could not be parsed.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Transport failures and 5xx are retried; 4xx never are.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::ServerError
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ServerError => "server_error",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn status_mapping_covers_client_and_server_errors() {
        assert_eq!(
            PaymentError::from_status(400, "bad").code,
            PaymentErrorCode::InvalidRequest
        );
        assert_eq!(
            PaymentError::from_status(401, "auth").code,
            PaymentErrorCode::AuthenticationError
        );
        assert_eq!(
            PaymentError::from_status(404, "gone").code,
            PaymentErrorCode::NotFound
        );
        assert_eq!(
            PaymentError::from_status(502, "bad gateway").code,
            PaymentErrorCode::ServerError
        );
        assert_eq!(PaymentError::from_status(503, "x").http_status, Some(503));
    }

    #[test]
    fn only_transport_and_server_errors_retry() {
        assert!(PaymentError::network("reset").is_retryable());
        assert!(PaymentError::timeout("15s").is_retryable());
        assert!(PaymentError::from_status(500, "boom").is_retryable());

        assert!(!PaymentError::from_status(400, "bad").is_retryable());
        assert!(!PaymentError::from_status(429, "slow down").is_retryable());
        assert!(!PaymentError::provider("unexpected body").is_retryable());
    }

    #[test]
    fn payment_error_display() {
        let err = PaymentError::from_status(400, "amount must be at least 100");
        assert_eq!(err.to_string(), "invalid_request: amount must be at least 100");
    }

    #[test]
    fn converts_to_external_service_domain_error() {
        let err: DomainError = PaymentError::from_status(400, "bad")
            .with_provider_code("BAD_REQUEST_ERROR")
            .into();
        assert_eq!(err.code, ErrorCode::ExternalServiceError);
        assert_eq!(
            err.details.get("provider_code"),
            Some(&"BAD_REQUEST_ERROR".to_string())
        );
    }
}
