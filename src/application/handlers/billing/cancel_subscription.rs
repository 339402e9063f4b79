//! CancelSubscriptionHandler - user-initiated cancellation from the portal.
//!
//! The gateway is called first; the local row only changes once the
//! provider has accepted the cancellation.

use std::sync::Arc;

use super::BillingSettings;
use crate::application::PremiumCache;
use crate::domain::billing::{BillingError, SubscriptionStatus};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{BillingStore, PaymentGateway};

/// Command to cancel the caller's latest subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: Option<UserId>,
}

/// Outcome of a cancellation request. Every variant is a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelSubscriptionResult {
    Canceled { provider_subscription_id: String },
    AlreadyCanceled { provider_subscription_id: String },
    NoSubscription,
}

/// Handler for portal cancellation.
pub struct CancelSubscriptionHandler {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn BillingStore>,
    cache: PremiumCache,
    settings: Arc<BillingSettings>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn BillingStore>,
        cache: PremiumCache,
        settings: Arc<BillingSettings>,
    ) -> Self {
        Self {
            gateway,
            store,
            cache,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
        let user_id = cmd.user_id.ok_or(BillingError::Unauthenticated)?;

        let Some(subscription) = self.store.latest_subscription_for_user(&user_id).await? else {
            return Ok(CancelSubscriptionResult::NoSubscription);
        };
        let provider_subscription_id = subscription.provider_subscription_id.clone();

        if subscription.status == SubscriptionStatus::Canceled {
            return Ok(CancelSubscriptionResult::AlreadyCanceled {
                provider_subscription_id,
            });
        }

        if self.settings.demo_mode || subscription.is_demo() {
            tracing::debug!(%provider_subscription_id, "Skipping gateway cancel for demo subscription");
        } else {
            self.gateway
                .cancel_subscription(&provider_subscription_id)
                .await
                .map_err(|e| {
                    tracing::error!(%provider_subscription_id, error = %e, "Gateway cancel failed");
                    BillingError::gateway(e.to_string())
                })?;
        }

        self.store
            .record_cancellation(subscription.id, Timestamp::now())
            .await?;
        self.cache.invalidate(&user_id).await;

        tracing::info!(user_id = %user_id, %provider_subscription_id, "Subscription canceled by user");
        Ok(CancelSubscriptionResult::Canceled {
            provider_subscription_id,
        })
    }
}
