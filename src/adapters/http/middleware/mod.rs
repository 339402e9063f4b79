//! HTTP middleware for axum.
//!
//! - `auth` - Authentication middleware and extractors

pub mod auth;

pub use auth::{
    auth_middleware, bearer_token, lenient_auth_middleware, AuthRejection, AuthState,
    OptionalAuth, RequireAuth,
};
