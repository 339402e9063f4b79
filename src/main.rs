//! UjjwalDeep billing service entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ujjwaldeep_billing::adapters::http::middleware::AuthState;
use ujjwaldeep_billing::adapters::http::{billing_router, BillingAppState};
use ujjwaldeep_billing::adapters::{
    MockPaymentGateway, PostgresBillingStore, RazorpayConfig, RazorpayGateway,
    SupabaseAuthConfig, SupabaseSessionValidator,
};
use ujjwaldeep_billing::application::handlers::billing::BillingSettings;
use ujjwaldeep_billing::application::PremiumCache;
use ujjwaldeep_billing::config::{AppConfig, ServerConfig};
use ujjwaldeep_billing::ports::PaymentGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.server);
    config.validate().context("invalid configuration")?;

    tracing::info!("Connecting to database...");
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("failed to connect to database")?;

    if config.database.run_migrations {
        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
    }

    let settings = BillingSettings::from_config(&config);
    let gateway: Arc<dyn PaymentGateway> = if settings.demo_mode {
        tracing::warn!("Razorpay credentials absent; running in demo mode");
        Arc::new(MockPaymentGateway::new())
    } else {
        let razorpay = RazorpayGateway::new(RazorpayConfig::from_payment_config(&config.payment))
            .context("failed to build Razorpay client")?;
        tracing::info!(live = config.payment.is_live_mode(), "Razorpay gateway ready");
        Arc::new(razorpay)
    };

    let auth: AuthState = Arc::new(SupabaseSessionValidator::new(
        SupabaseAuthConfig::from_auth_config(&config.auth),
    ));

    let state = BillingAppState::new(
        Arc::new(PostgresBillingStore::new(pool)),
        gateway,
        PremiumCache::new(config.billing.premium_cache_ttl()),
        settings,
    );

    let app = billing_router(state, auth)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(&config.server))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(%addr, environment = ?config.server.environment, "Billing service listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

/// JSON logs in production, human-readable elsewhere. `RUST_LOG` wins over config.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
