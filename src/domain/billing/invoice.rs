//! Invoice records written for subscription charges.

use super::payment::minor_to_whole;
use super::subscription::SubscriptionSnapshot;
use crate::domain::foundation::{InvoiceId, Timestamp, UserId};

/// Builds the key that makes invoice writes idempotent.
///
/// One invoice per subscription per billing period; a missing period start
/// collapses to `0`.
pub fn invoice_idempotency_key(
    provider_subscription_id: &str,
    period_start: Option<Timestamp>,
) -> String {
    format!(
        "{}:{}",
        provider_subscription_id,
        period_start.map_or(0, |t| t.as_epoch_secs())
    )
}

/// A stored invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: InvoiceId,
    pub idempotency_key: String,
    pub provider_subscription_id: String,
    pub user_id: Option<UserId>,
    /// Whole currency units.
    pub amount: i64,
    pub currency: String,
    pub period_start: Option<Timestamp>,
    pub period_end: Option<Timestamp>,
    /// Always `paid`; only charges produce invoices.
    pub status: String,
    pub raw: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

impl Invoice {
    /// The invoice for the period a subscription snapshot describes.
    pub fn for_period(
        snapshot: &SubscriptionSnapshot,
        amount_minor: i64,
        currency: impl Into<String>,
        raw: serde_json::Value,
        now: Timestamp,
    ) -> Self {
        Self {
            id: InvoiceId::new(),
            idempotency_key: invoice_idempotency_key(
                &snapshot.provider_subscription_id,
                snapshot.current_period_start,
            ),
            provider_subscription_id: snapshot.provider_subscription_id.clone(),
            user_id: snapshot.user_id.clone(),
            amount: minor_to_whole(amount_minor),
            currency: currency.into(),
            period_start: snapshot.current_period_start,
            period_end: snapshot.current_period_end,
            status: "paid".to_string(),
            raw: Some(raw),
            created_at: now,
        }
    }
}
