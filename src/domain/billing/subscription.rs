//! Subscription records and provider status vocabulary.

use serde::{Serialize, Serializer};
use std::fmt;

use super::webhook_event::SubscriptionEntity;
use crate::domain::foundation::{SubscriptionRecordId, Timestamp, UserId};

/// Prefix of subscriptions synthesized by demo checkout.
pub const DEMO_SUBSCRIPTION_PREFIX: &str = "demo_sub_";

/// Razorpay subscription status, kept verbatim when unrecognised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionStatus {
    Created,
    Authenticated,
    Active,
    Pending,
    Halted,
    Canceled,
    Completed,
    Expired,
    Paused,
    Other(String),
}

impl SubscriptionStatus {
    /// Parses a provider or stored status string.
    ///
    /// Razorpay spells it `cancelled`; rows store `canceled`.
    pub fn parse(s: &str) -> Self {
        match s {
            "created" => Self::Created,
            "authenticated" => Self::Authenticated,
            "active" => Self::Active,
            "pending" => Self::Pending,
            "halted" => Self::Halted,
            "cancelled" | "canceled" => Self::Canceled,
            "completed" => Self::Completed,
            "expired" => Self::Expired,
            "paused" => Self::Paused,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Authenticated => "authenticated",
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Halted => "halted",
            Self::Canceled => "canceled",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Paused => "paused",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SubscriptionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The provider-reported state of a subscription at one point in time.
///
/// This is what webhooks and demo checkout hand to the store; the store
/// merges it into the existing row, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionSnapshot {
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub user_id: Option<UserId>,
    pub autopay: bool,
}

impl SubscriptionSnapshot {
    /// Reads a webhook subscription entity.
    ///
    /// A missing status is read as `active`, which is what both
    /// `subscription.activated` and `subscription.charged` imply.
    pub fn from_entity(entity: &SubscriptionEntity) -> Self {
        Self {
            provider_subscription_id: entity.id.clone(),
            status: entity
                .status
                .as_deref()
                .map(SubscriptionStatus::parse)
                .unwrap_or(SubscriptionStatus::Active),
            current_period_start: entity.current_start.and_then(Timestamp::from_epoch_secs),
            current_period_end: entity.current_end.and_then(Timestamp::from_epoch_secs),
            user_id: entity.notes.user_id(),
            autopay: entity.charge_at.is_some(),
        }
    }
}

/// A stored subscription row.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub id: SubscriptionRecordId,
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub user_id: Option<UserId>,
    pub autopay: bool,
    pub cancel_at: Option<Timestamp>,
    pub canceled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// A fresh row for a subscription seen for the first time.
    pub fn from_snapshot(snapshot: SubscriptionSnapshot, now: Timestamp) -> Self {
        Self {
            id: SubscriptionRecordId::new(),
            provider_subscription_id: snapshot.provider_subscription_id,
            status: snapshot.status,
            current_period_start: snapshot.current_period_start,
            current_period_end: snapshot.current_period_end,
            user_id: snapshot.user_id,
            autopay: snapshot.autopay,
            cancel_at: None,
            canceled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges a later snapshot into this row.
    ///
    /// `canceled` is terminal and a known user is never cleared.
    pub fn apply_snapshot(&mut self, snapshot: SubscriptionSnapshot, now: Timestamp) {
        if self.status != SubscriptionStatus::Canceled {
            self.status = snapshot.status;
        }
        self.current_period_start = snapshot.current_period_start;
        self.current_period_end = snapshot.current_period_end;
        if snapshot.user_id.is_some() {
            self.user_id = snapshot.user_id;
        }
        self.autopay = snapshot.autopay;
        self.updated_at = now;
    }

    /// Whether this row was synthesized by demo checkout.
    pub fn is_demo(&self) -> bool {
        self.provider_subscription_id
            .starts_with(DEMO_SUBSCRIPTION_PREFIX)
    }

    /// Active and not past its period end.
    pub fn is_entitled_at(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active
            && self
                .current_period_end
                .map_or(true, |end| end.is_after(&now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::webhook_event::Notes;

    fn snapshot(status: SubscriptionStatus, user: Option<&str>) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            provider_subscription_id: "sub_1".to_string(),
            status,
            current_period_start: Timestamp::from_epoch_secs(1_704_067_200),
            current_period_end: Timestamp::from_epoch_secs(1_706_745_600),
            user_id: user.map(|u| UserId::new(u).unwrap()),
            autopay: true,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Status vocabulary
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn both_cancel_spellings_parse_to_canceled() {
        assert_eq!(SubscriptionStatus::parse("cancelled"), SubscriptionStatus::Canceled);
        assert_eq!(SubscriptionStatus::parse("canceled"), SubscriptionStatus::Canceled);
        assert_eq!(SubscriptionStatus::Canceled.as_str(), "canceled");
    }

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let status = SubscriptionStatus::parse("on_hold");
        assert_eq!(status, SubscriptionStatus::Other("on_hold".to_string()));
        assert_eq!(status.to_string(), "on_hold");
    }

    // ══════════════════════════════════════════════════════════════
    // Snapshot merging
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn snapshot_from_entity_reads_periods_and_autopay() {
        let entity = SubscriptionEntity {
            id: "sub_1".to_string(),
            status: Some("active".to_string()),
            current_start: Some(1_704_067_200),
            current_end: Some(0),
            charge_at: Some(1_706_745_600),
            plan_id: None,
            plan: None,
            notes: Notes::with("user_id", "u1"),
        };

        let snap = SubscriptionSnapshot::from_entity(&entity);
        assert_eq!(snap.status, SubscriptionStatus::Active);
        assert_eq!(
            snap.current_period_start.unwrap().as_epoch_secs(),
            1_704_067_200
        );
        assert!(snap.current_period_end.is_none());
        assert!(snap.autopay);
        assert_eq!(snap.user_id.unwrap().as_str(), "u1");
    }

    #[test]
    fn canceled_is_sticky_across_later_snapshots() {
        let now = Timestamp::now();
        let mut sub = Subscription::from_snapshot(snapshot(SubscriptionStatus::Active, Some("u1")), now);
        sub.status = SubscriptionStatus::Canceled;

        let mut later = snapshot(SubscriptionStatus::Active, Some("u1"));
        later.current_period_end = Timestamp::from_epoch_secs(1_709_251_200);
        sub.apply_snapshot(later, now);

        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert_eq!(
            sub.current_period_end.unwrap().as_epoch_secs(),
            1_709_251_200
        );
    }

    #[test]
    fn known_user_is_not_cleared() {
        let now = Timestamp::now();
        let mut sub = Subscription::from_snapshot(snapshot(SubscriptionStatus::Active, Some("u1")), now);
        sub.apply_snapshot(snapshot(SubscriptionStatus::Halted, None), now);

        assert_eq!(sub.user_id.as_ref().unwrap().as_str(), "u1");
        assert_eq!(sub.status, SubscriptionStatus::Halted);
    }

    // ══════════════════════════════════════════════════════════════
    // Entitlement
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn active_with_future_end_is_entitled() {
        let now = Timestamp::now();
        let mut sub = Subscription::from_snapshot(snapshot(SubscriptionStatus::Active, None), now);
        sub.current_period_end = Some(now.add_days(3));
        assert!(sub.is_entitled_at(now));

        sub.current_period_end = Some(now.add_days(-1));
        assert!(!sub.is_entitled_at(now));

        sub.current_period_end = None;
        assert!(sub.is_entitled_at(now));
    }

    #[test]
    fn non_active_is_not_entitled() {
        let now = Timestamp::now();
        let mut sub = Subscription::from_snapshot(snapshot(SubscriptionStatus::Halted, None), now);
        sub.current_period_end = Some(now.add_days(3));
        assert!(!sub.is_entitled_at(now));
    }

    #[test]
    fn demo_prefix_marks_demo_rows() {
        let now = Timestamp::now();
        let mut sub = Subscription::from_snapshot(snapshot(SubscriptionStatus::Active, None), now);
        assert!(!sub.is_demo());
        sub.provider_subscription_id = "demo_sub_123".to_string();
        assert!(sub.is_demo());
    }
}
