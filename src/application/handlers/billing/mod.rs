//! Billing handlers.
//!
//! ## Commands
//! - Processing Razorpay webhooks
//! - Starting checkout (order or subscription, or demo)
//! - Confirming a completed checkout
//! - Cancelling from the portal
//!
//! ## Queries
//! - Premium status
//! - Portal view

mod cancel_subscription;
mod confirm_payment;
mod create_checkout;
mod get_billing_portal;
mod get_billing_status;
mod handle_webhook;
mod settings;

pub use settings::BillingSettings;

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use confirm_payment::{ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult};
pub use create_checkout::{
    CheckoutMode, CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult,
};
pub use handle_webhook::{HandleWebhookCommand, HandleWebhookHandler, HandleWebhookResult};

// Queries
pub use get_billing_portal::{BillingPortal, GetBillingPortalHandler, GetBillingPortalQuery};
pub use get_billing_status::{BillingStatus, GetBillingStatusHandler, GetBillingStatusQuery};
