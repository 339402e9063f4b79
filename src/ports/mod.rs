//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `BillingStore` - payments, subscriptions and invoices
//! - `PaymentGateway` - outbound payment provider API
//! - `SessionValidator` - bearer token validation

mod billing_store;
mod payment_gateway;
mod session_validator;

pub use billing_store::BillingStore;
pub use payment_gateway::{
    CreateOrderRequest, CreateSubscriptionRequest, GatewayOrder, GatewaySubscription,
    PaymentError, PaymentErrorCode, PaymentGateway,
};
pub use session_validator::SessionValidator;
