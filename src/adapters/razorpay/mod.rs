//! Razorpay payment gateway adapters.
//!
//! - `RazorpayGateway` - REST client with bounded retry
//! - `MockPaymentGateway` - in-process fake for tests and demo wiring

mod api_types;
mod mock_gateway;
mod razorpay_gateway;

pub use mock_gateway::{MethodCall, MockPaymentGateway};
pub use razorpay_gateway::{RazorpayConfig, RazorpayGateway};
