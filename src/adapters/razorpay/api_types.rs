//! Razorpay REST request and response bodies.
//!
//! Only the fields this service sends or reads are modelled; everything
//! else in Razorpay's responses is ignored.

use serde::{Deserialize, Serialize};

use crate::domain::billing::PlanTerms;

/// Notes attached to orders and subscriptions.
///
/// `user_id` lets webhook deliveries be attributed to the buyer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EntityNotes<'a> {
    pub user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
}

/// `POST /orders`
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderBody<'a> {
    pub amount: i64,
    pub currency: &'a str,
    /// `1` captures the payment automatically on authorization.
    pub payment_capture: u8,
    pub notes: EntityNotes<'a>,
}

/// Plan definition sent inline when no plan id is configured.
#[derive(Debug, Clone, Serialize)]
pub struct InlinePlan<'a> {
    pub period: &'a str,
    pub interval: u32,
    pub item: InlinePlanItem<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlinePlanItem<'a> {
    pub name: &'a str,
    pub amount: i64,
    pub currency: &'a str,
}

/// `POST /subscriptions`
#[derive(Debug, Clone, Serialize)]
pub struct CreateSubscriptionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<InlinePlan<'a>>,
    pub customer_notify: u8,
    pub total_count: u32,
    pub notes: EntityNotes<'a>,
}

impl<'a> CreateSubscriptionBody<'a> {
    /// Builds the body for the configured plan.
    pub fn for_plan(terms: &'a PlanTerms, notes: EntityNotes<'a>) -> Self {
        let (plan_id, plan) = match terms.plan_id.as_deref() {
            Some(id) => (Some(id), None),
            None => (
                None,
                Some(InlinePlan {
                    period: &terms.period,
                    interval: terms.interval,
                    item: InlinePlanItem {
                        name: &terms.name,
                        amount: terms.amount_minor,
                        currency: &terms.currency,
                    },
                }),
            ),
        };

        Self {
            plan_id,
            plan,
            customer_notify: 1,
            total_count: terms.total_count,
            notes,
        }
    }
}

/// `POST /subscriptions/{id}/cancel`
#[derive(Debug, Clone, Serialize)]
pub struct CancelSubscriptionBody {
    /// `0` cancels immediately rather than at the end of the cycle.
    pub cancel_at_cycle_end: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionResponse {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error envelope: `{ "error": { "code": ..., "description": ... } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
