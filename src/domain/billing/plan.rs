//! Terms of the premium plan sold at checkout.

use crate::config::PaymentConfig;

/// Price and billing cadence for the premium plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanTerms {
    /// Provider plan id, when the plan was created in the dashboard.
    pub plan_id: Option<String>,
    /// Price in paise.
    pub amount_minor: i64,
    pub currency: String,
    pub name: String,
    pub period: String,
    pub interval: u32,
    pub total_count: u32,
}

impl PlanTerms {
    pub fn from_config(config: &PaymentConfig) -> Self {
        Self {
            plan_id: config.razorpay_plan_id.clone().filter(|id| !id.trim().is_empty()),
            amount_minor: config.plan_amount_minor,
            currency: config.currency.clone(),
            name: config.plan_name.clone(),
            period: config.plan_period.clone(),
            interval: config.plan_interval,
            total_count: config.plan_total_count,
        }
    }
}

impl Default for PlanTerms {
    fn default() -> Self {
        Self::from_config(&PaymentConfig::default())
    }
}
