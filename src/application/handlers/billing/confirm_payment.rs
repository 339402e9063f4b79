//! ConfirmPaymentHandler - records a payment the browser checkout reports.
//!
//! Razorpay checkout hands the browser a signature over the payment; this
//! handler verifies it with the key secret before recording anything.

use std::sync::Arc;

use super::BillingSettings;
use crate::application::PremiumCache;
use crate::domain::billing::signature::{
    verify_payment_confirmation, verify_subscription_confirmation,
};
use crate::domain::billing::{BillingError, Payment};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::BillingStore;

/// Command to confirm a checkout payment.
///
/// Carries either an order id or a subscription id alongside the payment.
#[derive(Debug, Clone, Default)]
pub struct ConfirmPaymentCommand {
    /// Caller, when the request was authenticated.
    pub user_id: Option<UserId>,
    pub payment_id: Option<String>,
    pub order_id: Option<String>,
    pub subscription_id: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPaymentResult {
    pub provider_payment_id: String,
}

/// What the signature was computed over.
#[derive(Clone, Copy)]
enum Confirmed<'a> {
    Order(&'a str),
    Subscription(&'a str),
}

/// Handler for checkout confirmations.
pub struct ConfirmPaymentHandler {
    store: Arc<dyn BillingStore>,
    cache: PremiumCache,
    settings: Arc<BillingSettings>,
}

impl ConfirmPaymentHandler {
    pub fn new(
        store: Arc<dyn BillingStore>,
        cache: PremiumCache,
        settings: Arc<BillingSettings>,
    ) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: ConfirmPaymentCommand,
    ) -> Result<ConfirmPaymentResult, BillingError> {
        let payment_id = required(&cmd.payment_id, "razorpay_payment_id")?;
        let signature = required(&cmd.signature, "razorpay_signature")?;
        let target = match (non_empty(&cmd.order_id), non_empty(&cmd.subscription_id)) {
            (Some(order_id), _) => Confirmed::Order(order_id),
            (None, Some(subscription_id)) => Confirmed::Subscription(subscription_id),
            (None, None) => {
                return Err(BillingError::validation(
                    "razorpay_order_id",
                    "razorpay_order_id or razorpay_subscription_id is required",
                ))
            }
        };

        let secret = self.settings.key_secret();
        let verified = match target {
            Confirmed::Order(order_id) => {
                verify_payment_confirmation(order_id, payment_id, signature, secret)
            }
            Confirmed::Subscription(subscription_id) => {
                verify_subscription_confirmation(subscription_id, payment_id, signature, secret)
            }
        };
        if !verified {
            tracing::warn!(
                security_event = "confirmation_signature_rejected",
                provider_payment_id = %payment_id,
                "Rejected checkout confirmation with invalid signature"
            );
            return Err(BillingError::InvalidSignature);
        }

        let order_id = match target {
            Confirmed::Order(order_id) => Some(order_id.to_string()),
            Confirmed::Subscription(_) => None,
        };
        let plan = &self.settings.plan;
        let payment = Payment::confirmed(
            payment_id,
            order_id,
            plan.amount_minor,
            plan.currency.clone(),
            cmd.user_id.clone(),
            Timestamp::now(),
        );
        self.store.upsert_payment(&payment).await?;

        if let Some(user) = &cmd.user_id {
            self.cache.invalidate(user).await;
        }

        tracing::info!(
            provider_payment_id = %payment_id,
            user_id = ?cmd.user_id.as_ref().map(|u| u.as_str()),
            "Confirmed checkout payment"
        );

        Ok(ConfirmPaymentResult {
            provider_payment_id: payment.provider_payment_id,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, BillingError> {
    non_empty(value).ok_or_else(|| BillingError::validation(field, "is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::signature::sign;
    use crate::domain::billing::PaymentStatus;

    const KEY_SECRET: &str = "key_secret_test";

    struct Fixture {
        store: InMemoryBillingStore,
        cache: PremiumCache,
        handler: ConfirmPaymentHandler,
    }

    fn fixture() -> Fixture {
        let store = InMemoryBillingStore::new();
        let cache = PremiumCache::default();
        let settings = Arc::new(BillingSettings::new("rzp_test_1", KEY_SECRET, "whsec"));
        let handler = ConfirmPaymentHandler::new(Arc::new(store.clone()), cache.clone(), settings);
        Fixture {
            store,
            cache,
            handler,
        }
    }

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn order_command(signature: Option<String>) -> ConfirmPaymentCommand {
        ConfirmPaymentCommand {
            user_id: Some(user()),
            payment_id: Some("pay_1".to_string()),
            order_id: Some("ord_1".to_string()),
            subscription_id: None,
            signature,
        }
    }

    #[tokio::test]
    async fn valid_order_signature_records_captured_payment() {
        let f = fixture();
        f.cache.put(&user(), false).await;
        let sig = sign(b"ord_1|pay_1", KEY_SECRET);

        let result = f.handler.handle(order_command(sig)).await.unwrap();

        assert_eq!(result.provider_payment_id, "pay_1");
        let stored = f.store.find_payment("pay_1").await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Captured);
        assert_eq!(stored.amount, 999);
        assert_eq!(stored.provider_order_id.as_deref(), Some("ord_1"));
        assert_eq!(stored.user_id, Some(user()));
        assert_eq!(f.cache.get(&user()).await, None);
    }

    #[tokio::test]
    async fn valid_subscription_signature_is_accepted() {
        let f = fixture();
        let cmd = ConfirmPaymentCommand {
            user_id: None,
            payment_id: Some("pay_2".to_string()),
            order_id: None,
            subscription_id: Some("sub_2".to_string()),
            signature: sign(b"pay_2|sub_2", KEY_SECRET),
        };

        f.handler.handle(cmd).await.unwrap();

        let stored = f.store.find_payment("pay_2").await.unwrap().unwrap();
        assert!(stored.user_id.is_none());
        assert!(stored.provider_order_id.is_none());
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_without_mutation() {
        let f = fixture();
        let sig = sign(b"ord_1|pay_1", "wrong-secret");

        let err = f.handler.handle(order_command(sig)).await.unwrap_err();

        assert_eq!(err, BillingError::InvalidSignature);
        assert_eq!(f.store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn missing_fields_are_validation_errors() {
        let f = fixture();

        let err = f.handler.handle(order_command(None)).await.unwrap_err();
        assert!(matches!(err, BillingError::ValidationFailed { ref field, .. } if field == "razorpay_signature"));

        let cmd = ConfirmPaymentCommand {
            order_id: None,
            ..order_command(Some("ab".to_string()))
        };
        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::ValidationFailed { ref field, .. } if field == "razorpay_order_id"));
    }

    #[tokio::test]
    async fn empty_key_secret_fails_closed() {
        let store = InMemoryBillingStore::new();
        let settings = Arc::new(BillingSettings::new("rzp_test_1", "", "whsec"));
        let handler = ConfirmPaymentHandler::new(Arc::new(store.clone()), PremiumCache::default(), settings);

        let sig = sign(b"ord_1|pay_1", "anything");
        assert_eq!(
            handler.handle(order_command(sig)).await.unwrap_err(),
            BillingError::InvalidSignature
        );
    }
}
