//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, caller identity, errors)
//! - `billing` - Payments, subscriptions, invoices, webhook events and entitlement

pub mod billing;
pub mod foundation;
