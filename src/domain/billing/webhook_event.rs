//! Razorpay webhook event types.
//!
//! A delivery is an envelope `{ event, payload: { payment?, subscription? } }`
//! where each present key wraps an `entity`. Parsing turns the tag plus the
//! entities it needs into a closed [`WebhookEvent`]; tags outside the handled
//! set become [`WebhookEvent::Unhandled`] and are acknowledged without effect.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use super::webhook_errors::WebhookError;
use crate::domain::foundation::UserId;

/// Free-form `notes` attached to Razorpay entities.
///
/// Razorpay serializes empty notes as `[]` rather than `{}`, so anything that
/// is not an object is read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Notes(HashMap<String, serde_json::Value>);

impl Notes {
    /// Returns a non-empty string note.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The user this entity was created for, when checkout attached one.
    pub fn user_id(&self) -> Option<UserId> {
        self.get_str("user_id").and_then(|id| UserId::new(id).ok())
    }

    #[cfg(test)]
    pub fn with(key: &str, value: &str) -> Self {
        let mut map = HashMap::new();
        map.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        Self(map)
    }
}

impl<'de> Deserialize<'de> for Notes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Object(map) => Ok(Notes(map.into_iter().collect())),
            _ => Ok(Notes::default()),
        }
    }
}

/// `payload.payment.entity`; only the fields we persist.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PaymentEntity {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    /// Amount in paise.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub notes: Notes,
}

/// Nested plan details, present on some subscription payloads.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PlanEntity {
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub item: Option<PlanItemEntity>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PlanItemEntity {
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// `payload.subscription.entity`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SubscriptionEntity {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Period bounds in epoch seconds; `null` before the first charge.
    #[serde(default)]
    pub current_start: Option<i64>,
    #[serde(default)]
    pub current_end: Option<i64>,
    /// Next scheduled charge; `null` once autopay is off.
    #[serde(default)]
    pub charge_at: Option<i64>,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub plan: Option<PlanEntity>,
    #[serde(default)]
    pub notes: Notes,
}

impl SubscriptionEntity {
    /// Plan price in paise, when the payload carries it.
    pub fn plan_amount(&self) -> Option<i64> {
        let plan = self.plan.as_ref()?;
        plan.amount
            .or_else(|| plan.item.as_ref().and_then(|item| item.amount))
    }
}

/// Webhook event tags this service recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PaymentCaptured,
    PaymentFailed,
    SubscriptionActivated,
    SubscriptionCharged,
    SubscriptionHalted,
    SubscriptionCancelled,
    Unknown,
}

impl EventKind {
    /// Parse an event tag.
    pub fn from_tag(s: &str) -> Self {
        match s {
            "payment.captured" => Self::PaymentCaptured,
            "payment.failed" => Self::PaymentFailed,
            "subscription.activated" => Self::SubscriptionActivated,
            "subscription.charged" => Self::SubscriptionCharged,
            "subscription.halted" => Self::SubscriptionHalted,
            "subscription.cancelled" => Self::SubscriptionCancelled,
            _ => Self::Unknown,
        }
    }

    /// The Razorpay tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentCaptured => "payment.captured",
            Self::PaymentFailed => "payment.failed",
            Self::SubscriptionActivated => "subscription.activated",
            Self::SubscriptionCharged => "subscription.charged",
            Self::SubscriptionHalted => "subscription.halted",
            Self::SubscriptionCancelled => "subscription.cancelled",
            Self::Unknown => "unknown",
        }
    }
}

/// A verified, typed webhook event.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    PaymentCaptured(PaymentEntity),
    PaymentFailed(PaymentEntity),
    SubscriptionActivated(SubscriptionEntity),
    /// Renewal charge; Razorpay bundles the payment that paid for it.
    SubscriptionCharged {
        subscription: SubscriptionEntity,
        payment: Option<PaymentEntity>,
    },
    SubscriptionHalted(SubscriptionEntity),
    SubscriptionCancelled(SubscriptionEntity),
    /// Any other tag, kept for logging.
    Unhandled(String),
}

impl WebhookEvent {
    /// The tag this event arrived with.
    pub fn tag(&self) -> &str {
        match self {
            WebhookEvent::PaymentCaptured(_) => EventKind::PaymentCaptured.as_str(),
            WebhookEvent::PaymentFailed(_) => EventKind::PaymentFailed.as_str(),
            WebhookEvent::SubscriptionActivated(_) => EventKind::SubscriptionActivated.as_str(),
            WebhookEvent::SubscriptionCharged { .. } => EventKind::SubscriptionCharged.as_str(),
            WebhookEvent::SubscriptionHalted(_) => EventKind::SubscriptionHalted.as_str(),
            WebhookEvent::SubscriptionCancelled(_) => EventKind::SubscriptionCancelled.as_str(),
            WebhookEvent::Unhandled(tag) => tag,
        }
    }

    /// The user named in the primary entity's notes.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            WebhookEvent::PaymentCaptured(p) | WebhookEvent::PaymentFailed(p) => p.notes.user_id(),
            WebhookEvent::SubscriptionActivated(s)
            | WebhookEvent::SubscriptionHalted(s)
            | WebhookEvent::SubscriptionCancelled(s) => s.notes.user_id(),
            WebhookEvent::SubscriptionCharged {
                subscription,
                payment,
            } => subscription
                .notes
                .user_id()
                .or_else(|| payment.as_ref().and_then(|p| p.notes.user_id())),
            WebhookEvent::Unhandled(_) => None,
        }
    }
}

/// Parsed delivery: the typed event plus the full JSON for audit columns.
#[derive(Debug, Clone)]
pub struct ParsedWebhook {
    pub event: WebhookEvent,
    pub raw: serde_json::Value,
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Reads `payload.<key>.entity`; absent or null is `None`.
fn entity<T: DeserializeOwned>(
    payload: &serde_json::Value,
    key: &'static str,
) -> Result<Option<T>, WebhookError> {
    match payload.get(key).and_then(|wrapper| wrapper.get("entity")) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| WebhookError::ParseError(format!("payload.{key}.entity: {e}"))),
    }
}

impl ParsedWebhook {
    /// Parses an already-verified request body.
    ///
    /// Entities are only read for handled tags, so an unhandled event is
    /// accepted whatever its payload looks like.
    ///
    /// # Errors
    ///
    /// - `ParseError` if the body is not a JSON event envelope, or an entity
    ///   a handled tag needs does not match its type
    /// - `MissingEntity` if the tag needs an entity the payload lacks
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let raw: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let envelope: Envelope = serde_json::from_value(raw.clone())
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let payload = &envelope.payload;

        let payment = || -> Result<PaymentEntity, WebhookError> {
            entity(payload, "payment")?.ok_or(WebhookError::MissingEntity("payload.payment.entity"))
        };
        let subscription = || -> Result<SubscriptionEntity, WebhookError> {
            entity(payload, "subscription")?
                .ok_or(WebhookError::MissingEntity("payload.subscription.entity"))
        };

        let event = match EventKind::from_tag(&envelope.event) {
            EventKind::PaymentCaptured => WebhookEvent::PaymentCaptured(payment()?),
            EventKind::PaymentFailed => WebhookEvent::PaymentFailed(payment()?),
            EventKind::SubscriptionActivated => WebhookEvent::SubscriptionActivated(subscription()?),
            EventKind::SubscriptionCharged => WebhookEvent::SubscriptionCharged {
                subscription: subscription()?,
                payment: entity(payload, "payment")?,
            },
            EventKind::SubscriptionHalted => WebhookEvent::SubscriptionHalted(subscription()?),
            EventKind::SubscriptionCancelled => WebhookEvent::SubscriptionCancelled(subscription()?),
            EventKind::Unknown => WebhookEvent::Unhandled(envelope.event.clone()),
        };

        Ok(Self { event, raw })
    }
}
