//! CreateCheckoutHandler - starts a Razorpay checkout for the caller.

use std::fmt;
use std::sync::Arc;

use super::BillingSettings;
use crate::application::PremiumCache;
use crate::domain::billing::{
    BillingError, Payment, SubscriptionSnapshot, SubscriptionStatus, DEMO_PAYMENT_PREFIX,
    DEMO_SUBSCRIPTION_PREFIX,
};
use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::ports::{BillingStore, CreateOrderRequest, CreateSubscriptionRequest, PaymentGateway};

/// What the caller is buying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutMode {
    /// One-time order for the plan price.
    #[default]
    Order,
    /// Recurring subscription.
    Subscription,
}

impl CheckoutMode {
    /// Parses the request's `mode`; absent means `order`.
    pub fn parse(mode: Option<&str>) -> Result<Self, BillingError> {
        match mode {
            None | Some("order") => Ok(CheckoutMode::Order),
            Some("subscription") => Ok(CheckoutMode::Subscription),
            Some(other) => Err(BillingError::invalid_mode(other)),
        }
    }
}

impl fmt::Display for CheckoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutMode::Order => f.write_str("order"),
            CheckoutMode::Subscription => f.write_str("subscription"),
        }
    }
}

/// Command to start a checkout.
#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    pub user: Option<AuthenticatedUser>,
    pub mode: Option<String>,
}

/// Data the browser needs to open Razorpay checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateCheckoutResult {
    Order {
        order_id: String,
        /// Paise.
        amount: i64,
        currency: String,
        key_id: String,
    },
    Subscription {
        subscription_id: String,
        key_id: String,
        user_email: String,
    },
    /// Demo mode granted premium without calling the gateway.
    Demo { message: String },
}

/// Handler for starting checkout.
pub struct CreateCheckoutHandler {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn BillingStore>,
    cache: PremiumCache,
    settings: Arc<BillingSettings>,
}

impl CreateCheckoutHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn BillingStore>,
        cache: PremiumCache,
        settings: Arc<BillingSettings>,
    ) -> Self {
        Self {
            gateway,
            store,
            cache,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutCommand,
    ) -> Result<CreateCheckoutResult, BillingError> {
        let user = cmd.user.ok_or(BillingError::Unauthenticated)?;
        let mode = CheckoutMode::parse(cmd.mode.as_deref())?;

        if self.settings.demo_mode {
            return self.demo_checkout(&user, mode).await;
        }

        match mode {
            CheckoutMode::Subscription => {
                let email = user.email_or_empty().to_string();
                let subscription = self
                    .gateway
                    .create_subscription(CreateSubscriptionRequest {
                        user_id: user.id.clone(),
                        email: email.clone(),
                    })
                    .await
                    .map_err(|e| BillingError::gateway(e.to_string()))?;

                tracing::info!(user_id = %user.id, subscription_id = %subscription.id, "Subscription checkout started");
                Ok(CreateCheckoutResult::Subscription {
                    subscription_id: subscription.id,
                    key_id: self.settings.key_id.clone(),
                    user_email: email,
                })
            }
            CheckoutMode::Order => {
                let order = self
                    .gateway
                    .create_order(CreateOrderRequest {
                        user_id: user.id.clone(),
                    })
                    .await
                    .map_err(|e| BillingError::gateway(e.to_string()))?;

                tracing::info!(user_id = %user.id, order_id = %order.id, "Order checkout started");
                Ok(CreateCheckoutResult::Order {
                    order_id: order.id,
                    amount: order.amount,
                    currency: order.currency,
                    key_id: self.settings.key_id.clone(),
                })
            }
        }
    }

    /// Writes one captured payment and one active subscription for the caller.
    async fn demo_checkout(
        &self,
        user: &AuthenticatedUser,
        mode: CheckoutMode,
    ) -> Result<CreateCheckoutResult, BillingError> {
        let now = Timestamp::now();
        let token = uuid::Uuid::new_v4().simple().to_string();
        let plan = &self.settings.plan;

        let mut payment = Payment::confirmed(
            format!("{}{}", DEMO_PAYMENT_PREFIX, token),
            None,
            plan.amount_minor,
            plan.currency.clone(),
            Some(user.id.clone()),
            now,
        );
        payment.method = Some("demo".to_string());

        let snapshot = SubscriptionSnapshot {
            provider_subscription_id: format!("{}{}", DEMO_SUBSCRIPTION_PREFIX, token),
            status: SubscriptionStatus::Active,
            current_period_start: Some(now),
            current_period_end: Some(now.add_days(self.settings.demo_period_days)),
            user_id: Some(user.id.clone()),
            autopay: false,
        };

        self.store.upsert_payment(&payment).await?;
        self.store.upsert_subscription(&snapshot).await?;
        self.cache.invalidate(&user.id).await;

        tracing::info!(
            user_id = %user.id,
            mode = %mode,
            provider_subscription_id = %snapshot.provider_subscription_id,
            "Demo checkout granted premium"
        );

        Ok(CreateCheckoutResult::Demo {
            message: format!(
                "Demo mode: premium activated for {} days without payment",
                self.settings.demo_period_days
            ),
        })
    }
}
