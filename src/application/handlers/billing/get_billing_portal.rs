//! GetBillingPortalHandler - the caller's latest subscription and invoices.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Invoice, Subscription};
use crate::domain::foundation::UserId;
use crate::ports::BillingStore;

/// Query for the portal view.
#[derive(Debug, Clone)]
pub struct GetBillingPortalQuery {
    pub user_id: Option<UserId>,
}

/// Portal view of the caller's billing.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingPortal {
    /// Latest subscription by creation time.
    pub subscription: Option<Subscription>,
    /// Newest first.
    pub invoices: Vec<Invoice>,
}

/// Handler for the portal view. Store failures propagate.
pub struct GetBillingPortalHandler {
    store: Arc<dyn BillingStore>,
}

impl GetBillingPortalHandler {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: GetBillingPortalQuery) -> Result<BillingPortal, BillingError> {
        let user_id = query.user_id.ok_or(BillingError::Unauthenticated)?;

        let subscription = self.store.latest_subscription_for_user(&user_id).await?;
        let invoices = self.store.invoices_for_user(&user_id).await?;

        Ok(BillingPortal {
            subscription,
            invoices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::{SubscriptionSnapshot, SubscriptionStatus};
    use crate::domain::foundation::Timestamp;

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn snapshot(id: &str) -> SubscriptionSnapshot {
        let now = Timestamp::now();
        SubscriptionSnapshot {
            provider_subscription_id: id.to_string(),
            status: SubscriptionStatus::Active,
            current_period_start: Some(now),
            current_period_end: Some(now.add_days(30)),
            user_id: Some(user()),
            autopay: true,
        }
    }

    #[tokio::test]
    async fn anonymous_caller_is_rejected() {
        let handler = GetBillingPortalHandler::new(Arc::new(InMemoryBillingStore::new()));
        let result = handler.handle(GetBillingPortalQuery { user_id: None }).await;
        assert_eq!(result, Err(BillingError::Unauthenticated));
    }

    #[tokio::test]
    async fn empty_history_returns_nothing() {
        let handler = GetBillingPortalHandler::new(Arc::new(InMemoryBillingStore::new()));
        let portal = handler
            .handle(GetBillingPortalQuery {
                user_id: Some(user()),
            })
            .await
            .unwrap();

        assert!(portal.subscription.is_none());
        assert!(portal.invoices.is_empty());
    }

    #[tokio::test]
    async fn returns_latest_subscription_and_invoices() {
        let store = InMemoryBillingStore::new();
        store.upsert_subscription(&snapshot("sub_old")).await.unwrap();
        let latest = store.upsert_subscription(&snapshot("sub_new")).await.unwrap();

        let snap = snapshot("sub_new");
        let invoice = Invoice::for_period(&snap, 99_900, "INR", serde_json::json!({}), Timestamp::now());
        store.upsert_invoice(&invoice).await.unwrap();

        let handler = GetBillingPortalHandler::new(Arc::new(store));
        let portal = handler
            .handle(GetBillingPortalQuery {
                user_id: Some(user()),
            })
            .await
            .unwrap();

        assert_eq!(portal.subscription.map(|s| s.id), Some(latest.id));
        assert_eq!(portal.invoices.len(), 1);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = InMemoryBillingStore::new();
        store.fail_reads(true);
        let handler = GetBillingPortalHandler::new(Arc::new(store));

        let result = handler
            .handle(GetBillingPortalQuery {
                user_id: Some(user()),
            })
            .await;

        assert!(matches!(result, Err(BillingError::Infrastructure(_))));
    }
}
