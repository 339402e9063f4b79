//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresBillingStore` - payments, subscriptions and invoices

mod billing_store;

pub use billing_store::PostgresBillingStore;
