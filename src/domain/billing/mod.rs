//! Billing domain - payments, subscriptions, invoices and entitlement.
//!
//! Pure types and rules. Nothing in here performs I/O; the store, gateway
//! and HTTP concerns live behind ports and adapters.

mod entitlement;
mod errors;
mod invoice;
mod payment;
mod plan;
mod posture;
pub mod signature;
mod subscription;
mod webhook_errors;
mod webhook_event;

pub use entitlement::EntitlementPolicy;
pub use errors::BillingError;
pub use invoice::{invoice_idempotency_key, Invoice};
pub use payment::{minor_to_whole, Payment, PaymentStatus};
pub use plan::PlanTerms;
pub use posture::FailurePosture;
pub use subscription::{
    Subscription, SubscriptionSnapshot, SubscriptionStatus, DEMO_SUBSCRIPTION_PREFIX,
};
pub use webhook_errors::WebhookError;
pub use webhook_event::{
    EventKind, Notes, ParsedWebhook, PaymentEntity, PlanEntity, PlanItemEntity,
    SubscriptionEntity, WebhookEvent,
};

/// Prefix of payments synthesized by demo checkout.
pub const DEMO_PAYMENT_PREFIX: &str = "demo_pay_";
