//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, caller identity and error types used across
//! the billing domain.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{InvoiceId, SubscriptionRecordId, UserId};
pub use timestamp::Timestamp;
