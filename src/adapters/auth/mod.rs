//! Authentication adapters.
//!
//! Implementations of the `SessionValidator` port:
//!
//! - `supabase` - HS256 validation of Supabase Auth access tokens
//! - `mock` - Token table for tests

mod mock;
mod supabase;

pub use mock::MockSessionValidator;
pub use supabase::{SupabaseAuthConfig, SupabaseSessionValidator};
