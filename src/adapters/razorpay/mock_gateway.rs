//! Mock payment gateway for testing.
//!
//! Configurable `PaymentGateway` for unit and integration tests. Supports
//! error injection (once, per method, or as a script of consecutive
//! failures) and call tracking.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{
    CreateOrderRequest, CreateSubscriptionRequest, GatewayOrder, GatewaySubscription,
    PaymentError, PaymentGateway,
};

/// Mock payment gateway.
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// gateway.set_method_error("create_subscription", PaymentError::from_status(400, "bad plan"));
///
/// let result = gateway.create_subscription(request).await;
/// assert!(result.is_err());
/// assert_eq!(gateway.call_count("create_subscription"), 1);
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Amount returned on orders, in paise.
    order_amount: Option<i64>,

    /// Counter used to mint ids.
    sequence: u64,

    /// Error to return on the next call to any method.
    next_error: Option<PaymentError>,

    /// Specific errors by method name; returned on every call.
    method_errors: HashMap<String, PaymentError>,

    /// Errors returned on consecutive calls before succeeding.
    failure_script: VecDeque<PaymentError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentGateway {
    /// Create a new mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Amount reported on created orders.
    pub fn set_order_amount(&self, amount_minor: i64) {
        self.state().order_amount = Some(amount_minor);
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Fail the next calls, in order, with these errors.
    pub fn script_failures(&self, errors: impl IntoIterator<Item = PaymentError>) {
        self.state().failure_script.extend(errors);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
        state.failure_script.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    /// Number of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Total calls to any method.
    pub fn total_calls(&self) -> usize {
        self.state().call_log.len()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internals
    // ════════════════════════════════════════════════════════════════════════════

    /// Records the call and returns the error to inject, if any.
    fn begin(&self, method: &str, args: Vec<String>) -> Result<u64, PaymentError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });

        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        if let Some(err) = state.method_errors.get(method) {
            return Err(err.clone());
        }
        if let Some(err) = state.failure_script.pop_front() {
            return Err(err);
        }

        state.sequence += 1;
        Ok(state.sequence)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, PaymentError> {
        let seq = self.begin("create_order", vec![request.user_id.to_string()])?;
        let amount = self.state().order_amount.unwrap_or(99_900);
        Ok(GatewayOrder {
            id: format!("order_mock_{}", seq),
            amount,
            currency: "INR".to_string(),
        })
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, PaymentError> {
        let seq = self.begin(
            "create_subscription",
            vec![request.user_id.to_string(), request.email],
        )?;
        Ok(GatewaySubscription {
            id: format!("sub_mock_{}", seq),
            status: "created".to_string(),
        })
    }

    async fn cancel_subscription(
        &self,
        provider_subscription_id: &str,
    ) -> Result<GatewaySubscription, PaymentError> {
        self.begin(
            "cancel_subscription",
            vec![provider_subscription_id.to_string()],
        )?;
        Ok(GatewaySubscription {
            id: provider_subscription_id.to_string(),
            status: "cancelled".to_string(),
        })
    }
}
