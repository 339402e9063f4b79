//! GetBillingStatusHandler - the premium flag used to gate the UI.
//!
//! Fails open to `false`: an anonymous caller or a store failure yields a
//! non-premium answer, never an error.

use std::sync::Arc;

use super::BillingSettings;
use crate::application::PremiumCache;
use crate::domain::billing::FailurePosture;
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::BillingStore;

/// Query for the caller's entitlement.
#[derive(Debug, Clone)]
pub struct GetBillingStatusQuery {
    /// `None` for anonymous callers.
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingStatus {
    pub premium: bool,
}

/// Handler for the status query.
pub struct GetBillingStatusHandler {
    store: Arc<dyn BillingStore>,
    cache: PremiumCache,
    settings: Arc<BillingSettings>,
}

impl GetBillingStatusHandler {
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

    pub async fn handle(&self, query: GetBillingStatusQuery) -> BillingStatus {
        let Some(user_id) = query.user_id else {
            return BillingStatus { premium: false };
        };

        if let Some(premium) = self.cache.get(&user_id).await {
            return BillingStatus { premium };
        }

        let policy = self.settings.entitlement_policy;
        if !policy.needs_subscription() {
            let premium = policy.is_premium(None, Timestamp::now());
            self.cache.put(&user_id, premium).await;
            return BillingStatus { premium };
        }

        let ticket = self.cache.ticket().await;
        let lookup = self.store.latest_subscription_for_user(&user_id).await;
        let cacheable = lookup.is_ok();
        let premium = FailurePosture::FailOpen
            .resolve(
                "billing_status",
                lookup.map(|latest| policy.is_premium(latest.as_ref(), Timestamp::now())),
                || false,
            )
            .unwrap_or(false);

        // A fallback answer is not cached so the next query retries the store.
        if cacheable {
            self.cache.put_if_current(ticket, &user_id, premium).await;
        }

        tracing::debug!(user_id = %user_id, premium, "Resolved billing status");
        BillingStatus { premium }
    }
}
