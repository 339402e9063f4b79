//! Razorpay payment gateway adapter.
//!
//! Implements `PaymentGateway` over Razorpay's REST API with HTTP basic auth
//! (`key_id:key_secret`). Transient failures (timeouts, connection errors,
//! 5xx) are retried with exponential backoff; 4xx responses never are.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;

use super::api_types::{
    CancelSubscriptionBody, CreateOrderBody, CreateSubscriptionBody, EntityNotes, ErrorResponse,
    OrderResponse, SubscriptionResponse,
};
use crate::config::PaymentConfig;
use crate::domain::billing::PlanTerms;
use crate::ports::{
    CreateOrderRequest, CreateSubscriptionRequest, GatewayOrder, GatewaySubscription,
    PaymentError, PaymentGateway,
};

/// Upper bound on a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Razorpay API configuration.
#[derive(Clone)]
pub struct RazorpayConfig {
    key_id: String,
    key_secret: SecretString,
    api_base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    plan: PlanTerms,
}

impl RazorpayConfig {
    /// Create a configuration with default endpoint, plan and retry policy.
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self::from_payment_config(&PaymentConfig {
            razorpay_key_id: key_id.into(),
            razorpay_key_secret: key_secret.into(),
            ..PaymentConfig::default()
        })
    }

    /// Build from the application's payment section.
    pub fn from_payment_config(config: &PaymentConfig) -> Self {
        Self {
            key_id: config.razorpay_key_id.clone(),
            key_secret: SecretString::new(config.razorpay_key_secret.clone()),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.request_timeout_secs),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            plan: PlanTerms::from_config(config),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = base_delay;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delay before retry number `retry_count` (zero-based).
    fn backoff(&self, retry_count: u32) -> Duration {
        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        self.retry_base_delay
            .checked_mul(factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

/// Razorpay payment gateway adapter.
pub struct RazorpayGateway {
    config: RazorpayConfig,
    http_client: reqwest::Client,
}

impl RazorpayGateway {
    /// Create a gateway with the given configuration.
    pub fn new(config: RazorpayConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// POSTs `body` to `path`, retrying transient failures.
    async fn post_with_retry<B, T>(
        &self,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> Result<T, PaymentError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.api_base_url, path);
        let mut retry_count = 0;

        loop {
            match self.post_once(&url, body).await {
                Ok(value) => {
                    tracing::debug!(operation, attempts = retry_count + 1, "Razorpay call succeeded");
                    return Ok(value);
                }
                Err(err) => {
                    if !err.is_retryable() || retry_count >= self.config.max_retries {
                        tracing::error!(
                            operation,
                            attempts = retry_count + 1,
                            code = %err.code,
                            http_status = ?err.http_status,
                            error = %err.message,
                            "Razorpay call failed"
                        );
                        return Err(err);
                    }

                    let delay = self.config.backoff(retry_count);
                    tracing::warn!(
                        operation,
                        attempt = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        code = %err.code,
                        "Retrying Razorpay call"
                    );
                    sleep(delay).await;
                    retry_count += 1;
                }
            }
        }
    }

    async fn post_once<B, T>(&self, url: &str, body: &B) -> Result<T, PaymentError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.expose_secret()))
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(error_from_response(status.as_u16(), &text));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                map_transport_error(e)
            } else {
                PaymentError::provider(format!("Unexpected response body: {}", e))
            }
        })
    }
}

fn map_transport_error(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::timeout(format!("Request timed out: {}", e))
    } else if e.is_connect() {
        PaymentError::network(format!("Connection failed: {}", e))
    } else {
        PaymentError::network(e.to_string())
    }
}

fn error_from_response(status: u16, body: &str) -> PaymentError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => {
            let description = parsed
                .error
                .description
                .unwrap_or_else(|| format!("HTTP {}", status));
            let err = PaymentError::from_status(status, description);
            match parsed.error.code {
                Some(code) => err.with_provider_code(code),
                None => err,
            }
        }
        Err(_) => PaymentError::from_status(status, format!("HTTP {}: {}", status, body)),
    }
}

fn notes_for<'a>(user_id: &'a str, email: Option<&'a str>) -> EntityNotes<'a> {
    EntityNotes {
        user_id,
        email: email.filter(|e| !e.is_empty()),
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, PaymentError> {
        let body = CreateOrderBody {
            amount: self.config.plan.amount_minor,
            currency: &self.config.plan.currency,
            payment_capture: 1,
            notes: notes_for(request.user_id.as_str(), None),
        };

        let order: OrderResponse = self.post_with_retry("create_order", "/orders", &body).await?;

        tracing::info!(order_id = %order.id, user_id = %request.user_id, "Created Razorpay order");
        Ok(GatewayOrder {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, PaymentError> {
        let body = CreateSubscriptionBody::for_plan(
            &self.config.plan,
            notes_for(request.user_id.as_str(), Some(&request.email)),
        );

        let sub: SubscriptionResponse = self
            .post_with_retry("create_subscription", "/subscriptions", &body)
            .await?;

        tracing::info!(subscription_id = %sub.id, user_id = %request.user_id, "Created Razorpay subscription");
        Ok(GatewaySubscription {
            id: sub.id,
            status: sub.status.unwrap_or_else(|| "created".to_string()),
        })
    }

    async fn cancel_subscription(
        &self,
        provider_subscription_id: &str,
    ) -> Result<GatewaySubscription, PaymentError> {
        let path = format!("/subscriptions/{}/cancel", provider_subscription_id);
        let body = CancelSubscriptionBody {
            cancel_at_cycle_end: 0,
        };

        let sub: SubscriptionResponse = self
            .post_with_retry("cancel_subscription", &path, &body)
            .await?;

        tracing::info!(subscription_id = %sub.id, "Cancelled Razorpay subscription");
        Ok(GatewaySubscription {
            id: sub.id,
            status: sub.status.unwrap_or_else(|| "cancelled".to_string()),
        })
    }
}
