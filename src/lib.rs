//! UjjwalDeep billing - Razorpay payment reconciliation service
//!
//! Verifies and applies Razorpay webhooks, starts and confirms checkouts,
//! answers the premium-status query and serves the billing portal.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
