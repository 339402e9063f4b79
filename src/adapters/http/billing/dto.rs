//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing API.
//! Field names follow what Razorpay checkout hands back to the browser.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{BillingPortal, CreateCheckoutResult};
use crate::domain::billing::{Invoice, Subscription};
use crate::domain::foundation::Timestamp;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start checkout. An empty body means `order`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub mode: Option<String>,
}

/// Checkout confirmation posted by the browser after Razorpay's handler fires.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    #[serde(default)]
    pub razorpay_subscription_id: Option<String>,
    #[serde(default)]
    pub razorpay_signature: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Checkout response; the shape depends on the mode.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CheckoutResponse {
    Order {
        order_id: String,
        amount: i64,
        currency: String,
        key_id: String,
    },
    Subscription {
        subscription_id: String,
        key_id: String,
        user_email: String,
    },
    Demo {
        demo_mode: bool,
        success: bool,
        message: String,
    },
}

impl From<CreateCheckoutResult> for CheckoutResponse {
    fn from(result: CreateCheckoutResult) -> Self {
        match result {
            CreateCheckoutResult::Order {
                order_id,
                amount,
                currency,
                key_id,
            } => CheckoutResponse::Order {
                order_id,
                amount,
                currency,
                key_id,
            },
            CreateCheckoutResult::Subscription {
                subscription_id,
                key_id,
                user_email,
            } => CheckoutResponse::Subscription {
                subscription_id,
                key_id,
                user_email,
            },
            CreateCheckoutResult::Demo { message } => CheckoutResponse::Demo {
                demo_mode: true,
                success: true,
                message,
            },
        }
    }
}

/// `{ok: true}` acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub premium: bool,
}

/// Subscription as shown in the portal.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub provider_subscription_id: String,
    pub status: String,
    pub current_period_start: Option<String>,
    pub current_period_end: Option<String>,
    pub autopay: bool,
    pub cancel_at: Option<String>,
    pub canceled_at: Option<String>,
    pub created_at: String,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id.to_string(),
            provider_subscription_id: sub.provider_subscription_id,
            status: sub.status.as_str().to_string(),
            current_period_start: rfc3339(sub.current_period_start),
            current_period_end: rfc3339(sub.current_period_end),
            autopay: sub.autopay,
            cancel_at: rfc3339(sub.cancel_at),
            canceled_at: rfc3339(sub.canceled_at),
            created_at: sub.created_at.to_rfc3339(),
        }
    }
}

/// Invoice as shown in the portal.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceResponse {
    pub id: String,
    pub provider_subscription_id: String,
    /// Whole currency units.
    pub amount: i64,
    pub currency: String,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id.to_string(),
            provider_subscription_id: invoice.provider_subscription_id,
            amount: invoice.amount,
            currency: invoice.currency,
            period_start: rfc3339(invoice.period_start),
            period_end: rfc3339(invoice.period_end),
            status: invoice.status,
            created_at: invoice.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortalResponse {
    pub subscription: Option<SubscriptionResponse>,
    pub invoices: Vec<InvoiceResponse>,
}

impl From<BillingPortal> for PortalResponse {
    fn from(portal: BillingPortal) -> Self {
        Self {
            subscription: portal.subscription.map(SubscriptionResponse::from),
            invoices: portal.invoices.into_iter().map(InvoiceResponse::from).collect(),
        }
    }
}

fn rfc3339(ts: Option<Timestamp>) -> Option<String> {
    ts.map(|t| t.to_rfc3339())
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{SubscriptionSnapshot, SubscriptionStatus};
    use serde_json::json;

    #[test]
    fn checkout_request_defaults_to_no_mode() {
        let req: CheckoutRequest = serde_json::from_str("{}").unwrap();
        assert!(req.mode.is_none());

        let req: CheckoutRequest = serde_json::from_str(r#"{"mode":"subscription"}"#).unwrap();
        assert_eq!(req.mode.as_deref(), Some("subscription"));
    }

    #[test]
    fn confirm_request_accepts_partial_bodies() {
        let req: ConfirmRequest =
            serde_json::from_str(r#"{"razorpay_payment_id":"pay_1"}"#).unwrap();
        assert_eq!(req.razorpay_payment_id.as_deref(), Some("pay_1"));
        assert!(req.razorpay_signature.is_none());
    }

    #[test]
    fn demo_checkout_serializes_flags() {
        let response = CheckoutResponse::from(CreateCheckoutResult::Demo {
            message: "granted".to_string(),
        });
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"demo_mode": true, "success": true, "message": "granted"})
        );
    }

    #[test]
    fn order_checkout_serializes_flat() {
        let response = CheckoutResponse::from(CreateCheckoutResult::Order {
            order_id: "order_1".to_string(),
            amount: 99_900,
            currency: "INR".to_string(),
            key_id: "rzp_test_1".to_string(),
        });
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"order_id": "order_1", "amount": 99900, "currency": "INR", "key_id": "rzp_test_1"})
        );
    }

    #[test]
    fn portal_serializes_null_subscription() {
        let response = PortalResponse::from(BillingPortal {
            subscription: None,
            invoices: vec![],
        });
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"subscription": null, "invoices": []})
        );
    }

    #[test]
    fn subscription_response_uses_stored_status_spelling() {
        let now = Timestamp::now();
        let sub = Subscription::from_snapshot(
            SubscriptionSnapshot {
                provider_subscription_id: "sub_1".to_string(),
                status: SubscriptionStatus::Canceled,
                current_period_start: None,
                current_period_end: None,
                user_id: None,
                autopay: false,
            },
            now,
        );
        let response = SubscriptionResponse::from(sub);
        assert_eq!(response.status, "canceled");
        assert!(response.current_period_end.is_none());
    }

    #[test]
    fn error_response_omits_empty_details() {
        let value = serde_json::to_value(ErrorResponse::new("UNAUTHORIZED", "Unauthorized")).unwrap();
        assert_eq!(value, json!({"error_code": "UNAUTHORIZED", "message": "Unauthorized"}));
    }
}
