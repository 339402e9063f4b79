//! Billing store port - persistence of payments, subscriptions and invoices.
//!
//! Every write is an upsert keyed by a provider identifier, so replaying the
//! same webhook any number of times leaves the same rows behind.

use async_trait::async_trait;

use crate::domain::billing::{Invoice, Payment, Subscription, SubscriptionSnapshot};
use crate::domain::foundation::{DomainError, SubscriptionRecordId, Timestamp, UserId};

/// Store for billing records.
///
/// # Upsert rules
///
/// - Payments are keyed by `provider_payment_id`. Nullable columns keep their
///   stored value when the incoming record has none; `created_at` is never
///   rewritten.
/// - Subscriptions are keyed by `provider_subscription_id`. A stored
///   `canceled` status is never replaced and a known `user_id` is never
///   cleared.
/// - Invoices are keyed by `idempotency_key`.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Insert or update a payment.
    async fn upsert_payment(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Find a payment by provider id.
    async fn find_payment(&self, provider_payment_id: &str) -> Result<Option<Payment>, DomainError>;

    /// Insert or merge a subscription snapshot; returns the stored row.
    async fn upsert_subscription(
        &self,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<Subscription, DomainError>;

    /// Mark a subscription canceled by provider id.
    ///
    /// Returns the number of rows affected; zero for an unknown id.
    async fn mark_subscription_canceled(
        &self,
        provider_subscription_id: &str,
        canceled_at: Timestamp,
    ) -> Result<u64, DomainError>;

    /// Record a user-initiated cancellation on a stored row.
    async fn record_cancellation(
        &self,
        id: SubscriptionRecordId,
        cancel_at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Insert an invoice unless one with the same key exists.
    async fn upsert_invoice(&self, invoice: &Invoice) -> Result<(), DomainError>;

    /// The user's most recently created subscription.
    async fn latest_subscription_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// The user's invoices, newest first.
    async fn invoices_for_user(&self, user_id: &UserId) -> Result<Vec<Invoice>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn BillingStore) {}
    }
}
