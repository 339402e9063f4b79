//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod billing;

pub use billing::{
    BillingPortal, BillingSettings, BillingStatus, CancelSubscriptionCommand,
    CancelSubscriptionHandler, CancelSubscriptionResult, CheckoutMode, ConfirmPaymentCommand,
    ConfirmPaymentHandler, ConfirmPaymentResult, CreateCheckoutCommand, CreateCheckoutHandler,
    CreateCheckoutResult, GetBillingPortalHandler, GetBillingPortalQuery, GetBillingStatusHandler,
    GetBillingStatusQuery, HandleWebhookCommand, HandleWebhookHandler, HandleWebhookResult,
};
