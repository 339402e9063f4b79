//! In-memory adapters for tests and database-less local runs.

mod billing_store;

pub use billing_store::InMemoryBillingStore;
