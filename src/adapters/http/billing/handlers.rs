//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::billing::{
    BillingSettings, CancelSubscriptionCommand, CancelSubscriptionHandler, ConfirmPaymentCommand,
    ConfirmPaymentHandler, CreateCheckoutCommand, CreateCheckoutHandler, GetBillingPortalHandler,
    GetBillingPortalQuery, GetBillingStatusHandler, GetBillingStatusQuery, HandleWebhookCommand,
    HandleWebhookHandler,
};
use crate::application::PremiumCache;
use crate::domain::billing::BillingError;
use crate::domain::foundation::DomainError;
use crate::ports::{BillingStore, PaymentGateway};

use super::super::middleware::{OptionalAuth, RequireAuth};
use super::dto::{
    CheckoutRequest, CheckoutResponse, ConfirmRequest, ErrorResponse, OkResponse, PortalResponse,
    StatusResponse,
};

/// Header Razorpay signs webhook bodies into.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct BillingAppState {
    pub store: Arc<dyn BillingStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub cache: PremiumCache,
    pub settings: Arc<BillingSettings>,
}

impl BillingAppState {
    pub fn new(
        store: Arc<dyn BillingStore>,
        gateway: Arc<dyn PaymentGateway>,
        cache: PremiumCache,
        settings: BillingSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            cache,
            settings: Arc::new(settings),
        }
    }

    pub fn webhook_handler(&self) -> HandleWebhookHandler {
        HandleWebhookHandler::new(
            self.store.clone(),
            self.cache.clone(),
            self.settings.clone(),
        )
    }

    pub fn checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(
            self.gateway.clone(),
            self.store.clone(),
            self.cache.clone(),
            self.settings.clone(),
        )
    }

    pub fn confirm_handler(&self) -> ConfirmPaymentHandler {
        ConfirmPaymentHandler::new(
            self.store.clone(),
            self.cache.clone(),
            self.settings.clone(),
        )
    }

    pub fn status_handler(&self) -> GetBillingStatusHandler {
        GetBillingStatusHandler::new(
            self.store.clone(),
            self.cache.clone(),
            self.settings.clone(),
        )
    }

    pub fn portal_handler(&self) -> GetBillingPortalHandler {
        GetBillingPortalHandler::new(self.store.clone())
    }

    pub fn cancel_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(
            self.gateway.clone(),
            self.store.clone(),
            self.cache.clone(),
            self.settings.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/billing/webhook - Razorpay event delivery
///
/// Replies in plain text: `ok` for every verified delivery, 400 on a bad
/// signature.
pub async fn handle_razorpay_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = HandleWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    match state.webhook_handler().handle(cmd).await {
        Ok(_) => (StatusCode::OK, "ok").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Webhook rejected");
            (e.status_code(), e.response_body()).into_response()
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/billing/checkout - Start an order or subscription checkout
pub async fn create_checkout(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let request = parse_optional_json::<CheckoutRequest>(&body)?;

    let cmd = CreateCheckoutCommand {
        user: Some(user),
        mode: request.mode,
    };
    let result = state.checkout_handler().handle(cmd).await?;

    Ok(Json(CheckoutResponse::from(result)))
}

/// POST /api/billing/confirm - Record a checkout the browser reports as paid
pub async fn confirm_payment(
    State(state): State<BillingAppState>,
    OptionalAuth(user): OptionalAuth,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let request = parse_optional_json::<ConfirmRequest>(&body)?;

    let cmd = ConfirmPaymentCommand {
        user_id: user.map(|u| u.id),
        payment_id: request.razorpay_payment_id,
        order_id: request.razorpay_order_id,
        subscription_id: request.razorpay_subscription_id,
        signature: request.razorpay_signature,
    };
    state.confirm_handler().handle(cmd).await?;

    Ok(Json(OkResponse::ok()))
}

/// POST /api/billing/portal - Cancel the caller's latest subscription
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = CancelSubscriptionCommand {
        user_id: Some(user.id),
    };
    state.cancel_handler().handle(cmd).await?;

    Ok(Json(OkResponse::ok()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/billing/status - Premium flag; never fails
pub async fn get_status(
    State(state): State<BillingAppState>,
    OptionalAuth(user): OptionalAuth,
) -> Json<StatusResponse> {
    let query = GetBillingStatusQuery {
        user_id: user.map(|u| u.id),
    };
    let status = state.status_handler().handle(query).await;

    Json(StatusResponse {
        premium: status.premium,
    })
}

/// GET /api/billing/portal - Latest subscription and invoices
pub async fn get_portal(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let query = GetBillingPortalQuery {
        user_id: Some(user.id),
    };
    let portal = state.portal_handler().handle(query).await?;

    Ok(Json(PortalResponse::from(portal)))
}

/// GET /health - Liveness probe
pub async fn health() -> &'static str {
    "ok"
}

/// An empty body reads as the request type's defaults.
fn parse_optional_json<T>(body: &[u8]) -> Result<T, BillingApiError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| BillingApiError(BillingError::validation("body", e.to_string())))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(pub BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for BillingApiError {
    fn from(err: DomainError) -> Self {
        Self(BillingError::from(err))
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BillingError::Unauthenticated => StatusCode::UNAUTHORIZED,
            BillingError::InvalidSignature
            | BillingError::InvalidMode(_)
            | BillingError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            BillingError::Gateway(_) | BillingError::Infrastructure(_) => {
                tracing::error!(error = %self.0, "Billing request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse::new(self.0.code().to_string(), self.0.message());
        (status, Json(body)).into_response()
    }
}
