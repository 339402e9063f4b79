//! Payment records.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::webhook_event::PaymentEntity;
use crate::domain::foundation::{Timestamp, UserId};

/// Converts paise to whole rupees, rounding half up.
///
/// Widened to `i128` so webhook amounts at the edge of `i64` cannot overflow;
/// the quotient always fits back into `i64`.
pub fn minor_to_whole(minor: i64) -> i64 {
    ((i128::from(minor) + 50).div_euclid(100)) as i64
}

/// Stored payment outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Captured,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Captured => "captured",
            PaymentStatus::Failed => "failed",
        }
    }

    /// Parses a stored status; anything but `failed` counts as captured.
    pub fn parse(s: &str) -> Self {
        match s {
            "failed" => PaymentStatus::Failed,
            _ => PaymentStatus::Captured,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment, keyed by the provider's payment id.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub provider_payment_id: String,
    pub provider_order_id: Option<String>,
    /// Whole currency units.
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub method: Option<String>,
    pub user_id: Option<UserId>,
    pub raw: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Builds the record a webhook payment entity describes.
    ///
    /// Missing amount or currency fall back to the configured plan.
    pub fn from_entity(
        entity: &PaymentEntity,
        status: PaymentStatus,
        fallback_amount_minor: i64,
        fallback_currency: &str,
        raw: serde_json::Value,
        now: Timestamp,
    ) -> Self {
        Self {
            provider_payment_id: entity.id.clone(),
            provider_order_id: entity.order_id.clone(),
            amount: minor_to_whole(entity.amount.unwrap_or(fallback_amount_minor)),
            currency: entity
                .currency
                .clone()
                .unwrap_or_else(|| fallback_currency.to_string()),
            status,
            method: entity.method.clone(),
            user_id: entity.notes.user_id(),
            raw: Some(raw),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds a captured payment recorded from a checkout confirmation.
    pub fn confirmed(
        provider_payment_id: impl Into<String>,
        provider_order_id: Option<String>,
        amount_minor: i64,
        currency: impl Into<String>,
        user_id: Option<UserId>,
        now: Timestamp,
    ) -> Self {
        Self {
            provider_payment_id: provider_payment_id.into(),
            provider_order_id,
            amount: minor_to_whole(amount_minor),
            currency: currency.into(),
            status: PaymentStatus::Captured,
            method: None,
            user_id,
            raw: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Payment {
    /// Merges a later write for the same provider payment into this record.
    ///
    /// Nullable fields keep their stored value when the incoming record has
    /// none. `created_at` is never rewritten.
    pub fn merge(&mut self, incoming: Payment) {
        self.amount = incoming.amount;
        self.currency = incoming.currency;
        self.status = incoming.status;
        if incoming.provider_order_id.is_some() {
            self.provider_order_id = incoming.provider_order_id;
        }
        if incoming.method.is_some() {
            self.method = incoming.method;
        }
        if incoming.user_id.is_some() {
            self.user_id = incoming.user_id;
        }
        if incoming.raw.is_some() {
            self.raw = incoming.raw;
        }
        self.updated_at = incoming.updated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::webhook_event::Notes;

    #[test]
    fn minor_to_whole_rounds_half_up() {
        assert_eq!(minor_to_whole(99900), 999);
        assert_eq!(minor_to_whole(99949), 999);
        assert_eq!(minor_to_whole(99950), 1000);
        assert_eq!(minor_to_whole(0), 0);
        assert_eq!(minor_to_whole(-150), -1);
        assert_eq!(minor_to_whole(-151), -2);
    }

    #[test]
    fn minor_to_whole_handles_i64_bounds() {
        assert_eq!(minor_to_whole(i64::MAX), 92_233_720_368_547_758);
        assert_eq!(minor_to_whole(i64::MIN), -92_233_720_368_547_758);
    }

    #[test]
    fn status_parse_round_trips() {
        assert_eq!(PaymentStatus::parse("failed"), PaymentStatus::Failed);
        assert_eq!(PaymentStatus::parse("captured"), PaymentStatus::Captured);
        assert_eq!(PaymentStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn from_entity_maps_fields() {
        let entity = PaymentEntity {
            id: "pay_1".to_string(),
            order_id: Some("ord_1".to_string()),
            amount: Some(99900),
            currency: Some("INR".to_string()),
            status: Some("captured".to_string()),
            method: Some("card".to_string()),
            notes: Notes::with("user_id", "u1"),
        };
        let now = Timestamp::now();

        let payment = Payment::from_entity(
            &entity,
            PaymentStatus::Captured,
            1,
            "USD",
            serde_json::json!({"event": "payment.captured"}),
            now,
        );

        assert_eq!(payment.provider_payment_id, "pay_1");
        assert_eq!(payment.amount, 999);
        assert_eq!(payment.currency, "INR");
        assert_eq!(payment.user_id.unwrap().as_str(), "u1");
        assert!(payment.raw.is_some());
    }

    #[test]
    fn from_entity_uses_fallbacks() {
        let entity = PaymentEntity {
            id: "pay_2".to_string(),
            order_id: None,
            amount: None,
            currency: None,
            status: None,
            method: None,
            notes: Notes::default(),
        };

        let payment = Payment::from_entity(
            &entity,
            PaymentStatus::Failed,
            49900,
            "INR",
            serde_json::Value::Null,
            Timestamp::now(),
        );

        assert_eq!(payment.amount, 499);
        assert_eq!(payment.currency, "INR");
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert!(payment.user_id.is_none());
    }

    #[test]
    fn merge_keeps_stored_values_for_missing_fields() {
        let earlier = Timestamp::from_epoch_secs(1_704_067_200).unwrap();
        let mut stored = Payment::confirmed(
            "pay_1",
            Some("ord_1".to_string()),
            99900,
            "INR",
            Some(UserId::new("u1").unwrap()),
            earlier,
        );

        let later = Timestamp::now();
        let mut incoming = Payment::confirmed("pay_1", None, 99900, "INR", None, later);
        incoming.status = PaymentStatus::Failed;
        stored.merge(incoming);

        assert_eq!(stored.status, PaymentStatus::Failed);
        assert_eq!(stored.provider_order_id.as_deref(), Some("ord_1"));
        assert_eq!(stored.user_id.as_ref().unwrap().as_str(), "u1");
        assert_eq!(stored.created_at, earlier);
        assert_eq!(stored.updated_at, later);
    }
}
