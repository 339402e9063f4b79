//! Axum router configuration for billing endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::super::middleware::{auth_middleware, lenient_auth_middleware, AuthState};
use super::handlers::{
    cancel_subscription, confirm_payment, create_checkout, get_portal, get_status,
    handle_razorpay_webhook, health, BillingAppState,
};

/// Routes that reject a bad bearer token with 401.
///
/// - `POST /checkout` - start checkout
/// - `POST /confirm` - confirm a checkout (caller optional)
/// - `GET /portal` - subscription and invoices
/// - `POST /portal` - cancel the latest subscription
pub fn authenticated_routes(auth: AuthState) -> Router<BillingAppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/confirm", post(confirm_payment))
        .route("/portal", get(get_portal).post(cancel_subscription))
        .route_layer(middleware::from_fn_with_state(auth, auth_middleware))
}

/// `GET /status`; a bad bearer token reads as anonymous.
pub fn status_routes(auth: AuthState) -> Router<BillingAppState> {
    Router::new()
        .route("/status", get(get_status))
        .route_layer(middleware::from_fn_with_state(auth, lenient_auth_middleware))
}

/// `POST /webhook`; authenticated by signature, not bearer token.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/webhook", post(handle_razorpay_webhook))
}

/// Every billing route, for mounting at `/api/billing`.
pub fn billing_routes(auth: AuthState) -> Router<BillingAppState> {
    Router::new()
        .merge(authenticated_routes(auth.clone()))
        .merge(status_routes(auth))
        .merge(webhook_routes())
}

/// The full application router: `/health` plus `/api/billing/*`.
///
/// # Example
///
/// ```ignore
/// let app = billing_router(state, Arc::new(validator));
/// axum::serve(listener, app).await?;
/// ```
pub fn billing_router(state: BillingAppState, auth: AuthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/billing", billing_routes(auth))
        .with_state(state)
}
