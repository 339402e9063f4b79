//! Payment configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Values that mark a credential as "not really configured".
const PLACEHOLDER_MARKERS: &[&str] = &["placeholder", "your_", "xxx", "changeme", "rzp_test_mock"];

/// Payment configuration (Razorpay)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Razorpay key id (`rzp_test_...` / `rzp_live_...`), also handed to checkout
    #[serde(default)]
    pub razorpay_key_id: String,

    /// Razorpay key secret; signs checkout confirmations
    #[serde(default)]
    pub razorpay_key_secret: String,

    /// Webhook signing secret configured in the Razorpay dashboard
    #[serde(default)]
    pub razorpay_webhook_secret: String,

    /// Razorpay REST base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Pre-created Razorpay plan; when unset the plan is sent inline
    pub razorpay_plan_id: Option<String>,

    /// Plan price in paise
    #[serde(default = "default_plan_amount_minor")]
    pub plan_amount_minor: i64,

    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Plan item name shown on the Razorpay checkout
    #[serde(default = "default_plan_name")]
    pub plan_name: String,

    /// Billing period (`daily`, `weekly`, `monthly`, `yearly`)
    #[serde(default = "default_plan_period")]
    pub plan_period: String,

    /// Number of periods between charges
    #[serde(default = "default_plan_interval")]
    pub plan_interval: u32,

    /// Number of billing cycles before the subscription completes
    #[serde(default = "default_plan_total_count")]
    pub plan_total_count: u32,

    /// Retries after the first attempt for transient gateway failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff, in milliseconds
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Per-request timeout for gateway calls, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Force demo mode on or off; detected from credentials when unset
    pub demo_mode: Option<bool>,
}

impl PaymentConfig {
    /// Whether checkout should synthesize paid state instead of calling Razorpay.
    ///
    /// An explicit `demo_mode` wins. Otherwise demo mode is on exactly when
    /// the key id or key secret is empty or a placeholder.
    pub fn is_demo_mode(&self) -> bool {
        match self.demo_mode {
            Some(explicit) => explicit,
            None => {
                is_placeholder(&self.razorpay_key_id) || is_placeholder(&self.razorpay_key_secret)
            }
        }
    }

    /// Check if using Razorpay live keys
    pub fn is_live_mode(&self) -> bool {
        self.razorpay_key_id.starts_with("rzp_live_")
    }

    /// Validate payment configuration
    ///
    /// Credentials are only required when demo mode is off.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.plan_amount_minor <= 0 {
            return Err(ValidationError::InvalidPlanAmount);
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }
        if self.max_retries > 10 {
            return Err(ValidationError::TooManyRetries);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }

        if self.is_demo_mode() {
            if *environment == Environment::Production {
                return Err(ValidationError::DemoModeInProduction);
            }
            return Ok(());
        }

        if self.razorpay_key_secret.is_empty() {
            return Err(ValidationError::MissingRequired("RAZORPAY_KEY_SECRET"));
        }
        if self.razorpay_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("RAZORPAY_WEBHOOK_SECRET"));
        }
        if !self.razorpay_key_id.starts_with("rzp_") {
            return Err(ValidationError::InvalidRazorpayKeyId);
        }
        if *environment != Environment::Development && !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::ApiBaseMustBeHttps);
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            razorpay_key_id: String::new(),
            razorpay_key_secret: String::new(),
            razorpay_webhook_secret: String::new(),
            api_base_url: default_api_base_url(),
            razorpay_plan_id: None,
            plan_amount_minor: default_plan_amount_minor(),
            currency: default_currency(),
            plan_name: default_plan_name(),
            plan_period: default_plan_period(),
            plan_interval: default_plan_interval(),
            plan_total_count: default_plan_total_count(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            demo_mode: None,
        }
    }
}

fn is_placeholder(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    value.is_empty() || PLACEHOLDER_MARKERS.iter().any(|m| value.contains(m))
}

fn default_api_base_url() -> String {
    "https://api.razorpay.com/v1".to_string()
}

fn default_plan_amount_minor() -> i64 {
    99_900
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_plan_name() -> String {
    "Premium (Monthly)".to_string()
}

fn default_plan_period() -> String {
    "monthly".to_string()
}

fn default_plan_interval() -> u32 {
    1
}

fn default_plan_total_count() -> u32 {
    12
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    15
}
