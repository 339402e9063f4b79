//! In-memory billing store.
//!
//! Applies the same upsert rules as the Postgres store. Used by tests and
//! by local runs without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{Invoice, Payment, Subscription, SubscriptionSnapshot, SubscriptionStatus};
use crate::domain::foundation::{DomainError, SubscriptionRecordId, Timestamp, UserId};
use crate::ports::BillingStore;

#[derive(Debug, Default)]
struct Tables {
    payments: HashMap<String, Payment>,
    /// Insertion order doubles as creation order.
    subscriptions: Vec<Subscription>,
    invoices: Vec<Invoice>,
}

/// Injected failures, for exercising error postures.
#[derive(Debug, Default)]
struct Faults {
    reads: AtomicBool,
    writes: AtomicBool,
    invoices: AtomicBool,
}

/// In-memory store for payments, subscriptions and invoices.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
}

impl InMemoryBillingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with a database error.
    pub fn fail_reads(&self, fail: bool) {
        self.faults.reads.store(fail, Ordering::SeqCst);
    }

    /// Make payment and subscription writes fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.faults.writes.store(fail, Ordering::SeqCst);
    }

    /// Make invoice writes fail with a database error.
    pub fn fail_invoices(&self, fail: bool) {
        self.faults.invoices.store(fail, Ordering::SeqCst);
    }

    /// Number of stored payments
    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }

    /// Number of stored subscriptions
    pub async fn subscription_count(&self) -> usize {
        self.tables.read().await.subscriptions.len()
    }

    /// Number of stored invoices
    pub async fn invoice_count(&self) -> usize {
        self.tables.read().await.invoices.len()
    }

    /// All payments, in no particular order
    pub async fn payments(&self) -> Vec<Payment> {
        self.tables.read().await.payments.values().cloned().collect()
    }

    /// Find a subscription by provider id
    pub async fn find_subscription(&self, provider_subscription_id: &str) -> Option<Subscription> {
        self.tables
            .read()
            .await
            .subscriptions
            .iter()
            .find(|s| s.provider_subscription_id == provider_subscription_id)
            .cloned()
    }

    /// Insert a subscription row as-is.
    pub async fn insert_subscription(&self, subscription: Subscription) {
        self.tables.write().await.subscriptions.push(subscription);
    }

    fn check(flag: &AtomicBool, operation: &str) -> Result<(), DomainError> {
        if flag.load(Ordering::SeqCst) {
            return Err(DomainError::database(format!("{}: injected failure", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn upsert_payment(&self, payment: &Payment) -> Result<(), DomainError> {
        Self::check(&self.faults.writes, "upsert_payment")?;

        let mut tables = self.tables.write().await;
        match tables.payments.get_mut(&payment.provider_payment_id) {
            Some(stored) => stored.merge(payment.clone()),
            None => {
                tables
                    .payments
                    .insert(payment.provider_payment_id.clone(), payment.clone());
            }
        }
        Ok(())
    }

    async fn find_payment(&self, provider_payment_id: &str) -> Result<Option<Payment>, DomainError> {
        Self::check(&self.faults.reads, "find_payment")?;
        Ok(self.tables.read().await.payments.get(provider_payment_id).cloned())
    }

    async fn upsert_subscription(
        &self,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<Subscription, DomainError> {
        Self::check(&self.faults.writes, "upsert_subscription")?;

        let now = Timestamp::now();
        let mut tables = self.tables.write().await;
        let existing = tables
            .subscriptions
            .iter_mut()
            .find(|s| s.provider_subscription_id == snapshot.provider_subscription_id);

        match existing {
            Some(stored) => {
                stored.apply_snapshot(snapshot.clone(), now);
                Ok(stored.clone())
            }
            None => {
                let row = Subscription::from_snapshot(snapshot.clone(), now);
                tables.subscriptions.push(row.clone());
                Ok(row)
            }
        }
    }

    async fn mark_subscription_canceled(
        &self,
        provider_subscription_id: &str,
        canceled_at: Timestamp,
    ) -> Result<u64, DomainError> {
        Self::check(&self.faults.writes, "mark_subscription_canceled")?;

        let mut tables = self.tables.write().await;
        let mut affected = 0;
        for sub in tables
            .subscriptions
            .iter_mut()
            .filter(|s| s.provider_subscription_id == provider_subscription_id)
        {
            sub.status = SubscriptionStatus::Canceled;
            sub.canceled_at = Some(canceled_at);
            sub.updated_at = canceled_at;
            affected += 1;
        }
        Ok(affected)
    }

    async fn record_cancellation(
        &self,
        id: SubscriptionRecordId,
        cancel_at: Timestamp,
    ) -> Result<(), DomainError> {
        Self::check(&self.faults.writes, "record_cancellation")?;

        let mut tables = self.tables.write().await;
        if let Some(sub) = tables.subscriptions.iter_mut().find(|s| s.id == id) {
            sub.status = SubscriptionStatus::Canceled;
            sub.cancel_at = Some(cancel_at);
            sub.updated_at = cancel_at;
        }
        Ok(())
    }

    async fn upsert_invoice(&self, invoice: &Invoice) -> Result<(), DomainError> {
        Self::check(&self.faults.invoices, "upsert_invoice")?;

        let mut tables = self.tables.write().await;
        if !tables
            .invoices
            .iter()
            .any(|i| i.idempotency_key == invoice.idempotency_key)
        {
            tables.invoices.push(invoice.clone());
        }
        Ok(())
    }

    async fn latest_subscription_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        Self::check(&self.faults.reads, "latest_subscription_for_user")?;

        Ok(self
            .tables
            .read()
            .await
            .subscriptions
            .iter()
            .rev()
            .find(|s| s.user_id.as_ref() == Some(user_id))
            .cloned())
    }

    async fn invoices_for_user(&self, user_id: &UserId) -> Result<Vec<Invoice>, DomainError> {
        Self::check(&self.faults.reads, "invoices_for_user")?;

        Ok(self
            .tables
            .read()
            .await
            .invoices
            .iter()
            .rev()
            .filter(|i| i.user_id.as_ref() == Some(user_id))
            .cloned()
            .collect())
    }
}
