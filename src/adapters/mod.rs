//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Supabase JWT validation (and a mock)
//! - `http` - axum routes, middleware and DTOs
//! - `memory` - in-memory billing store
//! - `postgres` - Postgres billing store
//! - `razorpay` - Razorpay REST client (and a mock)

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod razorpay;

pub use auth::{MockSessionValidator, SupabaseAuthConfig, SupabaseSessionValidator};
pub use memory::InMemoryBillingStore;
pub use postgres::PostgresBillingStore;
pub use razorpay::{MockPaymentGateway, RazorpayConfig, RazorpayGateway};
