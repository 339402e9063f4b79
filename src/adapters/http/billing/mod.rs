//! HTTP adapter for billing endpoints.
//!
//! - `POST /api/billing/webhook` - Razorpay webhooks (signature verified)
//! - `POST /api/billing/checkout` - Start order or subscription checkout
//! - `POST /api/billing/confirm` - Confirm a completed checkout
//! - `GET /api/billing/status` - Premium flag
//! - `GET /api/billing/portal` - Subscription and invoices
//! - `POST /api/billing/portal` - Cancel the latest subscription

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BillingApiError, BillingAppState, SIGNATURE_HEADER};
pub use routes::{billing_router, billing_routes};
