//! Billing settings shared by the billing handlers.

use secrecy::{ExposeSecret, SecretString};

use crate::config::AppConfig;
use crate::domain::billing::{EntitlementPolicy, PlanTerms};

/// Secrets, plan terms and switches the billing handlers read.
#[derive(Clone)]
pub struct BillingSettings {
    /// Razorpay key id, handed to the browser checkout.
    pub key_id: String,
    key_secret: SecretString,
    webhook_secret: SecretString,
    /// Synthesize paid state instead of calling the gateway.
    pub demo_mode: bool,
    pub plan: PlanTerms,
    pub entitlement_policy: EntitlementPolicy,
    /// Length of the period granted by demo checkout.
    pub demo_period_days: i64,
}

impl BillingSettings {
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: SecretString::new(key_secret.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            demo_mode: false,
            plan: PlanTerms::default(),
            entitlement_policy: EntitlementPolicy::default(),
            demo_period_days: 30,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            key_id: config.payment.razorpay_key_id.clone(),
            key_secret: SecretString::new(config.payment.razorpay_key_secret.clone()),
            webhook_secret: SecretString::new(config.payment.razorpay_webhook_secret.clone()),
            demo_mode: config.payment.is_demo_mode(),
            plan: PlanTerms::from_config(&config.payment),
            entitlement_policy: config.billing.entitlement_policy,
            demo_period_days: config.billing.demo_period_days,
        }
    }

    pub fn with_demo_mode(mut self, demo_mode: bool) -> Self {
        self.demo_mode = demo_mode;
        self
    }

    pub fn with_entitlement_policy(mut self, policy: EntitlementPolicy) -> Self {
        self.entitlement_policy = policy;
        self
    }

    pub fn with_plan(mut self, plan: PlanTerms) -> Self {
        self.plan = plan;
        self
    }

    pub(crate) fn key_secret(&self) -> &str {
        self.key_secret.expose_secret()
    }

    pub(crate) fn webhook_secret(&self) -> &str {
        self.webhook_secret.expose_secret()
    }
}

impl std::fmt::Debug for BillingSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingSettings")
            .field("key_id", &self.key_id)
            .field("demo_mode", &self.demo_mode)
            .field("plan", &self.plan)
            .field("entitlement_policy", &self.entitlement_policy)
            .finish_non_exhaustive()
    }
}
