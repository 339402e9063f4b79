//! HandleWebhookHandler - applies verified Razorpay webhook deliveries.
//!
//! Deliveries are at-least-once and may arrive out of order. Every mutation
//! is an upsert keyed by a provider id, so applying an event twice leaves the
//! same state as applying it once.
//!
//! Only the signature check fails closed. Once a delivery is verified it is
//! acknowledged. A malformed body or a failed write is logged and reported in
//! the result, never as an error.

use std::sync::Arc;

use super::BillingSettings;
use crate::application::PremiumCache;
use crate::domain::billing::signature::verify_webhook_signature;
use crate::domain::billing::{
    FailurePosture, Invoice, ParsedWebhook, Payment, PaymentEntity, PaymentStatus,
    SubscriptionEntity, SubscriptionSnapshot, WebhookError, WebhookEvent,
};
use crate::domain::foundation::Timestamp;
use crate::ports::BillingStore;

/// Command to handle a webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Value of the `x-razorpay-signature` header.
    pub signature: Option<String>,
}

/// What a delivery changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleWebhookResult {
    PaymentRecorded {
        provider_payment_id: String,
        status: PaymentStatus,
    },
    SubscriptionSynced {
        provider_subscription_id: String,
        invoice_recorded: bool,
    },
    SubscriptionCanceled {
        provider_subscription_id: String,
        rows_affected: u64,
    },
    /// Verified but not an event this service acts on.
    Ignored { event: String },
    /// Verified but not a usable event envelope.
    Malformed { reason: String },
    /// The primary write failed; logged for out-of-band reconciliation.
    NotApplied { event: String },
}

/// Handler for Razorpay webhooks.
pub struct HandleWebhookHandler {
    store: Arc<dyn BillingStore>,
    cache: PremiumCache,
    settings: Arc<BillingSettings>,
}

impl HandleWebhookHandler {
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

    /// # Errors
    ///
    /// `InvalidSignature` when the header is missing or does not match the
    /// body. Every verified delivery returns `Ok`.
    pub async fn handle(
        &self,
        cmd: HandleWebhookCommand,
    ) -> Result<HandleWebhookResult, WebhookError> {
        // 1. Verify before parsing anything (fail closed)
        let signature = cmd.signature.as_deref().unwrap_or_default();
        if !verify_webhook_signature(&cmd.payload, signature, self.settings.webhook_secret()) {
            tracing::warn!(
                security_event = "webhook_signature_rejected",
                has_signature = !signature.is_empty(),
                body_len = cmd.payload.len(),
                "Rejected webhook with invalid signature"
            );
            return Err(WebhookError::InvalidSignature);
        }

        // 2. Parse into a typed event
        let ParsedWebhook { event, raw } = match ParsedWebhook::parse(&cmd.payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Acknowledged verified webhook with malformed body");
                return Ok(HandleWebhookResult::Malformed {
                    reason: e.to_string(),
                });
            }
        };

        let user_id = event.user_id();
        let tag = event.tag().to_string();
        tracing::info!(event = %tag, user_id = ?user_id.as_ref().map(|u| u.as_str()), "Processing webhook");

        // 3. Apply; a failed primary write is swallowed
        let applied = self.apply(event, raw, Timestamp::now()).await;
        let not_applied = || HandleWebhookResult::NotApplied { event: tag.clone() };
        let result = FailurePosture::BestEffort
            .resolve("apply_webhook", applied, not_applied)
            .unwrap_or_else(|_| not_applied());

        // 4. The user's entitlement may have changed
        if let Some(user) = &user_id {
            self.cache.invalidate(user).await;
        }

        Ok(result)
    }

    async fn apply(
        &self,
        event: WebhookEvent,
        raw: serde_json::Value,
        now: Timestamp,
    ) -> Result<HandleWebhookResult, WebhookError> {
        match event {
            WebhookEvent::PaymentCaptured(entity) => {
                self.record_payment(&entity, PaymentStatus::Captured, raw, now).await
            }
            WebhookEvent::PaymentFailed(entity) => {
                self.record_payment(&entity, PaymentStatus::Failed, raw, now).await
            }
            WebhookEvent::SubscriptionActivated(entity) => {
                self.sync_subscription(&entity, None, raw, now).await
            }
            WebhookEvent::SubscriptionCharged {
                subscription,
                payment,
            } => {
                self.sync_subscription(&subscription, payment.as_ref(), raw, now)
                    .await
            }
            WebhookEvent::SubscriptionHalted(entity)
            | WebhookEvent::SubscriptionCancelled(entity) => {
                self.cancel_subscription(&entity, now).await
            }
            WebhookEvent::Unhandled(tag) => {
                tracing::info!(event = %tag, "Acknowledged unhandled webhook event");
                Ok(HandleWebhookResult::Ignored { event: tag })
            }
        }
    }

    async fn record_payment(
        &self,
        entity: &PaymentEntity,
        status: PaymentStatus,
        raw: serde_json::Value,
        now: Timestamp,
    ) -> Result<HandleWebhookResult, WebhookError> {
        let plan = &self.settings.plan;
        let payment = Payment::from_entity(entity, status, plan.amount_minor, &plan.currency, raw, now);

        self.store.upsert_payment(&payment).await.map_err(|e| {
            tracing::error!(provider_payment_id = %payment.provider_payment_id, error = %e, "Failed to upsert payment");
            WebhookError::Database(e.to_string())
        })?;

        tracing::info!(
            provider_payment_id = %payment.provider_payment_id,
            status = %status,
            amount = payment.amount,
            "Recorded payment"
        );

        Ok(HandleWebhookResult::PaymentRecorded {
            provider_payment_id: payment.provider_payment_id,
            status,
        })
    }

    async fn sync_subscription(
        &self,
        entity: &SubscriptionEntity,
        bundled_payment: Option<&PaymentEntity>,
        raw: serde_json::Value,
        now: Timestamp,
    ) -> Result<HandleWebhookResult, WebhookError> {
        let snapshot = SubscriptionSnapshot::from_entity(entity);

        let stored = self.store.upsert_subscription(&snapshot).await.map_err(|e| {
            tracing::error!(provider_subscription_id = %entity.id, error = %e, "Failed to upsert subscription");
            WebhookError::Database(e.to_string())
        })?;

        tracing::info!(
            provider_subscription_id = %stored.provider_subscription_id,
            status = %stored.status,
            "Synced subscription"
        );

        // Invoice is secondary to the subscription row.
        let amount_minor = bundled_payment
            .and_then(|p| p.amount)
            .or_else(|| entity.plan_amount())
            .unwrap_or(self.settings.plan.amount_minor);
        let currency = bundled_payment
            .and_then(|p| p.currency.clone())
            .unwrap_or_else(|| self.settings.plan.currency.clone());
        let invoice = Invoice::for_period(&snapshot, amount_minor, currency, raw, now);

        let invoice_recorded = FailurePosture::BestEffort
            .resolve(
                "upsert_invoice",
                self.store.upsert_invoice(&invoice).await.map(|_| true),
                || false,
            )
            .unwrap_or(false);

        Ok(HandleWebhookResult::SubscriptionSynced {
            provider_subscription_id: stored.provider_subscription_id,
            invoice_recorded,
        })
    }

    async fn cancel_subscription(
        &self,
        entity: &SubscriptionEntity,
        now: Timestamp,
    ) -> Result<HandleWebhookResult, WebhookError> {
        let rows_affected = self
            .store
            .mark_subscription_canceled(&entity.id, now)
            .await
            .map_err(|e| {
                tracing::error!(provider_subscription_id = %entity.id, error = %e, "Failed to cancel subscription");
                WebhookError::Database(e.to_string())
            })?;

        if rows_affected == 0 {
            tracing::debug!(provider_subscription_id = %entity.id, "Cancellation for unknown subscription");
        } else {
            tracing::info!(provider_subscription_id = %entity.id, "Marked subscription canceled");
        }

        Ok(HandleWebhookResult::SubscriptionCanceled {
            provider_subscription_id: entity.id.clone(),
            rows_affected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::signature::sign;
    use crate::domain::billing::SubscriptionStatus;
    use crate::domain::foundation::UserId;
    use serde_json::json;

    const WEBHOOK_SECRET: &str = "whsec_test";

    struct Fixture {
        store: InMemoryBillingStore,
        cache: PremiumCache,
        handler: HandleWebhookHandler,
    }

    fn fixture() -> Fixture {
        let store = InMemoryBillingStore::new();
        let cache = PremiumCache::default();
        let settings = Arc::new(BillingSettings::new("rzp_test_1", "key_secret", WEBHOOK_SECRET));
        let handler = HandleWebhookHandler::new(Arc::new(store.clone()), cache.clone(), settings);
        Fixture {
            store,
            cache,
            handler,
        }
    }

    fn signed(body: &serde_json::Value) -> HandleWebhookCommand {
        let payload = body.to_string().into_bytes();
        let signature = sign(&payload, WEBHOOK_SECRET);
        HandleWebhookCommand { payload, signature }
    }

    fn payment_captured() -> serde_json::Value {
        json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": {
                "id": "pay_1", "order_id": "ord_1", "amount": 99900, "currency": "INR",
                "status": "captured", "method": "card", "notes": { "user_id": "u1" }
            }}}
        })
    }

    fn subscription_event(event: &str, id: &str, extra: serde_json::Value) -> serde_json::Value {
        let mut entity = json!({
            "id": id, "status": "active",
            "current_start": 1_704_067_200, "current_end": 1_706_745_600,
            "charge_at": 1_706_745_600, "notes": { "user_id": "u1" }
        });
        if let (Some(e), Some(x)) = (entity.as_object_mut(), extra.as_object()) {
            for (k, v) in x {
                e.insert(k.clone(), v.clone());
            }
        }
        json!({ "event": event, "payload": { "subscription": { "entity": entity } } })
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Signature gate
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_signature_is_rejected_without_mutation() {
        let f = fixture();
        let cmd = HandleWebhookCommand {
            payload: payment_captured().to_string().into_bytes(),
            signature: None,
        };

        let err = f.handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature));
        assert_eq!(f.store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn wrong_signature_is_rejected_without_mutation() {
        let f = fixture();
        let mut cmd = signed(&payment_captured());
        cmd.signature = sign(&cmd.payload, "some-other-secret");

        let err = f.handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature));
        assert_eq!(f.store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn empty_webhook_secret_rejects_everything() {
        let store = InMemoryBillingStore::new();
        let settings = Arc::new(BillingSettings::new("rzp_test_1", "key_secret", ""));
        let handler = HandleWebhookHandler::new(Arc::new(store.clone()), PremiumCache::default(), settings);

        let body = payment_captured().to_string().into_bytes();
        let cmd = HandleWebhookCommand {
            signature: sign(&body, "anything"),
            payload: body,
        };

        assert!(handler.handle(cmd).await.is_err());
        assert_eq!(store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn verified_garbage_is_acknowledged_as_malformed() {
        let f = fixture();
        let payload = b"not json".to_vec();
        let cmd = HandleWebhookCommand {
            signature: sign(&payload, WEBHOOK_SECRET),
            payload,
        };

        let result = f.handler.handle(cmd).await.unwrap();

        assert!(matches!(result, HandleWebhookResult::Malformed { .. }));
        assert_eq!(f.store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn verified_event_missing_its_entity_is_acknowledged() {
        let f = fixture();
        let body = json!({ "event": "payment.captured", "payload": {} });

        let result = f.handler.handle(signed(&body)).await.unwrap();

        assert_eq!(
            result,
            HandleWebhookResult::Malformed {
                reason: "Missing entity: payload.payment.entity".to_string()
            }
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payments
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn payment_captured_records_payment() {
        let f = fixture();

        let result = f.handler.handle(signed(&payment_captured())).await.unwrap();

        assert_eq!(
            result,
            HandleWebhookResult::PaymentRecorded {
                provider_payment_id: "pay_1".to_string(),
                status: PaymentStatus::Captured,
            }
        );
        let stored = f.store.find_payment("pay_1").await.unwrap().unwrap();
        assert_eq!(stored.amount, 999);
        assert_eq!(stored.currency, "INR");
        assert_eq!(stored.provider_order_id.as_deref(), Some("ord_1"));
        assert_eq!(stored.user_id, Some(user("u1")));
        assert!(stored.raw.is_some());
    }

    #[tokio::test]
    async fn replayed_payment_keeps_one_row() {
        let f = fixture();

        f.handler.handle(signed(&payment_captured())).await.unwrap();
        f.handler.handle(signed(&payment_captured())).await.unwrap();

        assert_eq!(f.store.payment_count().await, 1);
    }

    #[tokio::test]
    async fn payment_failed_records_failed_status() {
        let f = fixture();
        let mut body = payment_captured();
        body["event"] = json!("payment.failed");

        f.handler.handle(signed(&body)).await.unwrap();

        let stored = f.store.find_payment("pay_1").await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn payment_write_failure_is_acknowledged() {
        let f = fixture();
        f.store.fail_writes(true);

        let result = f.handler.handle(signed(&payment_captured())).await.unwrap();

        assert_eq!(
            result,
            HandleWebhookResult::NotApplied {
                event: "payment.captured".to_string()
            }
        );
        assert_eq!(f.store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn subscription_write_failure_is_acknowledged() {
        let f = fixture();
        f.store.fail_writes(true);

        for event in ["subscription.activated", "subscription.cancelled"] {
            let body = subscription_event(event, "sub_1", json!({}));
            let result = f.handler.handle(signed(&body)).await.unwrap();
            assert_eq!(
                result,
                HandleWebhookResult::NotApplied {
                    event: event.to_string()
                }
            );
        }
    }

    #[tokio::test]
    async fn unknown_event_with_partial_entity_is_acknowledged() {
        let f = fixture();
        let body = json!({
            "event": "refund.created",
            "payload": { "payment": { "entity": { "amount": 100 } } }
        });

        let result = f.handler.handle(signed(&body)).await.unwrap();

        assert_eq!(
            result,
            HandleWebhookResult::Ignored {
                event: "refund.created".to_string()
            }
        );
    }

    #[tokio::test]
    async fn processed_event_invalidates_user_cache() {
        let f = fixture();
        f.cache.put(&user("u1"), false).await;

        f.handler.handle(signed(&payment_captured())).await.unwrap();

        assert_eq!(f.cache.get(&user("u1")).await, None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscriptions and invoices
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn activation_upserts_subscription_and_invoice() {
        let f = fixture();
        let body = subscription_event("subscription.activated", "sub_1", json!({}));

        let result = f.handler.handle(signed(&body)).await.unwrap();

        assert_eq!(
            result,
            HandleWebhookResult::SubscriptionSynced {
                provider_subscription_id: "sub_1".to_string(),
                invoice_recorded: true,
            }
        );
        let sub = f.store.find_subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.autopay);
        assert_eq!(sub.user_id, Some(user("u1")));
        assert_eq!(f.store.invoice_count().await, 1);
    }

    #[tokio::test]
    async fn charged_redelivery_keeps_one_invoice() {
        let f = fixture();
        let body = subscription_event("subscription.charged", "sub_1", json!({}));

        f.handler.handle(signed(&body)).await.unwrap();
        f.handler.handle(signed(&body)).await.unwrap();

        assert_eq!(f.store.subscription_count().await, 1);
        assert_eq!(f.store.invoice_count().await, 1);
    }

    #[tokio::test]
    async fn charged_invoice_prefers_bundled_payment_amount() {
        let f = fixture();
        let mut body = subscription_event(
            "subscription.charged",
            "sub_1",
            json!({ "plan": { "item": { "amount": 49900 } } }),
        );
        body["payload"]["payment"] = json!({ "entity": { "id": "pay_9", "amount": 19900, "currency": "INR" } });

        f.handler.handle(signed(&body)).await.unwrap();

        let invoices = f.store.invoices_for_user(&user("u1")).await.unwrap();
        assert_eq!(invoices[0].amount, 199);
    }

    #[tokio::test]
    async fn invoice_amount_falls_back_to_plan_then_config() {
        let f = fixture();
        let body = subscription_event(
            "subscription.activated",
            "sub_plan",
            json!({ "plan": { "amount": 49900 } }),
        );
        f.handler.handle(signed(&body)).await.unwrap();

        let body = subscription_event(
            "subscription.activated",
            "sub_cfg",
            json!({ "current_start": 1_709_251_200 }),
        );
        f.handler.handle(signed(&body)).await.unwrap();

        let invoices = f.store.invoices_for_user(&user("u1")).await.unwrap();
        let by_sub = |id: &str| invoices.iter().find(|i| i.provider_subscription_id == id).unwrap().amount;
        assert_eq!(by_sub("sub_plan"), 499);
        assert_eq!(by_sub("sub_cfg"), 999);
    }

    #[tokio::test]
    async fn invoice_failure_is_swallowed() {
        let f = fixture();
        f.store.fail_invoices(true);
        let body = subscription_event("subscription.charged", "sub_1", json!({}));

        let result = f.handler.handle(signed(&body)).await.unwrap();

        assert_eq!(
            result,
            HandleWebhookResult::SubscriptionSynced {
                provider_subscription_id: "sub_1".to_string(),
                invoice_recorded: false,
            }
        );
        assert_eq!(f.store.subscription_count().await, 1);
        assert_eq!(f.store.invoice_count().await, 0);
    }

    #[tokio::test]
    async fn cancellation_of_unknown_subscription_is_a_noop() {
        let f = fixture();
        let body = subscription_event("subscription.cancelled", "sub_unknown", json!({}));

        let result = f.handler.handle(signed(&body)).await.unwrap();

        assert_eq!(
            result,
            HandleWebhookResult::SubscriptionCanceled {
                provider_subscription_id: "sub_unknown".to_string(),
                rows_affected: 0,
            }
        );
        assert_eq!(f.store.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn activation_after_cancellation_stays_canceled() {
        let f = fixture();
        let activated = subscription_event("subscription.activated", "sub_1", json!({}));
        let cancelled = subscription_event("subscription.cancelled", "sub_1", json!({ "status": "cancelled" }));

        f.handler.handle(signed(&activated)).await.unwrap();
        f.handler.handle(signed(&cancelled)).await.unwrap();
        f.handler.handle(signed(&activated)).await.unwrap();

        let sub = f.store.find_subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert!(sub.canceled_at.is_some());
    }

    #[tokio::test]
    async fn halted_marks_canceled() {
        let f = fixture();
        f.handler
            .handle(signed(&subscription_event("subscription.activated", "sub_1", json!({}))))
            .await
            .unwrap();

        f.handler
            .handle(signed(&subscription_event("subscription.halted", "sub_1", json!({ "status": "halted" }))))
            .await
            .unwrap();

        let sub = f.store.find_subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn unknown_event_is_acknowledged() {
        let f = fixture();
        let body = json!({ "event": "refund.processed", "payload": {} });

        let result = f.handler.handle(signed(&body)).await.unwrap();

        assert_eq!(
            result,
            HandleWebhookResult::Ignored {
                event: "refund.processed".to_string()
            }
        );
    }
}
