//! Premium entitlement policy.

use serde::Deserialize;

use super::subscription::Subscription;
use crate::domain::foundation::Timestamp;

/// How the premium flag is derived for an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementPolicy {
    /// Premium while the most recent subscription is active and unexpired.
    #[default]
    ActiveSubscription,
    /// Every authenticated user is premium. Launch-period behaviour.
    AllAuthenticated,
}

impl EntitlementPolicy {
    /// Whether this policy needs the user's subscription to decide.
    pub fn needs_subscription(&self) -> bool {
        matches!(self, EntitlementPolicy::ActiveSubscription)
    }

    /// Decides premium for a user given their latest subscription.
    pub fn is_premium(&self, latest: Option<&Subscription>, now: Timestamp) -> bool {
        match self {
            EntitlementPolicy::AllAuthenticated => true,
            EntitlementPolicy::ActiveSubscription => {
                latest.map_or(false, |sub| sub.is_entitled_at(now))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{SubscriptionSnapshot, SubscriptionStatus};

    fn subscription(status: SubscriptionStatus, end_in_days: i64, now: Timestamp) -> Subscription {
        Subscription::from_snapshot(
            SubscriptionSnapshot {
                provider_subscription_id: "sub_1".to_string(),
                status,
                current_period_start: Some(now.add_days(-1)),
                current_period_end: Some(now.add_days(end_in_days)),
                user_id: None,
                autopay: true,
            },
            now,
        )
    }

    #[test]
    fn active_subscription_policy_requires_current_active_row() {
        let now = Timestamp::now();
        let policy = EntitlementPolicy::ActiveSubscription;

        assert!(!policy.is_premium(None, now));
        assert!(policy.is_premium(
            Some(&subscription(SubscriptionStatus::Active, 10, now)),
            now
        ));
        assert!(!policy.is_premium(
            Some(&subscription(SubscriptionStatus::Active, -1, now)),
            now
        ));
        assert!(!policy.is_premium(
            Some(&subscription(SubscriptionStatus::Canceled, 10, now)),
            now
        ));
    }

    #[test]
    fn all_authenticated_policy_ignores_subscription() {
        let now = Timestamp::now();
        let policy = EntitlementPolicy::AllAuthenticated;
        assert!(policy.is_premium(None, now));
        assert!(!policy.needs_subscription());
    }

    #[test]
    fn policy_deserializes_from_snake_case() {
        let policy: EntitlementPolicy = serde_json::from_str("\"all_authenticated\"").unwrap();
        assert_eq!(policy, EntitlementPolicy::AllAuthenticated);
        assert_eq!(EntitlementPolicy::default(), EntitlementPolicy::ActiveSubscription);
    }
}
