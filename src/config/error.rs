//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid Razorpay key id format")]
    InvalidRazorpayKeyId,

    #[error("Razorpay API base must use HTTPS outside development")]
    ApiBaseMustBeHttps,

    #[error("Plan amount must be a positive number of paise")]
    InvalidPlanAmount,

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("Retry attempts exceed maximum allowed (10)")]
    TooManyRetries,

    #[error("Demo mode cannot be enabled in production")]
    DemoModeInProduction,

    #[error("Premium cache TTL must be between 1 and 3600 seconds")]
    InvalidCacheTtl,
}
