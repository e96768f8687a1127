//! Debt Recovery Core - API Server Binary
//!
//! Starts the HTTP API server for the payment settlement core.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin recovery-api
//!
//! # Run with environment variables
//! API_HOST=0.0.0.0 API_PORT=8080 cargo run --bin recovery-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - Token expiration in seconds (default: 3600)
//! * `API_PUBLIC_BASE_URL` - Base URL for public payment links
//! * `API_SWEEP_INTERVAL_SECS` - Expiry sweep cadence (default: 300)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error
//! * `PROCESSOR_BASE_URL` / `PROCESSOR_API_KEY` - payment processor
//! * `SMTP_*` / `SMS_*` - optional notification channels

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_ledger::BalanceLedger;
use domain_links::PaymentLinkManager;
use domain_payments::{ManualVerification, PaymentRecordStore};
use domain_settlement::ReconciliationService;
use infra_gateway::{GatewayDispatcher, HttpPaymentProcessor, ProcessorConfig, SmsConfig, SmtpConfig};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = load_config();
    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting debt recovery API server"
    );

    let state = build_state(config.clone())?;

    // Background sweep retiring overdue links; completion always wins the
    // race because the sweep re-checks status under each link's lock.
    let sweep_links = Arc::clone(&state.links);
    let sweep_interval = std::time::Duration::from_secs(config.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let expired = sweep_links.expire_overdue_links(Utc::now()).await;
            if expired > 0 {
                tracing::info!(expired, "Expiry sweep retired links");
            }
        }
    });

    let app = create_router(state);
    let addr = config.server_addr();

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wires the domain services and production adapters into the app state
fn build_state(config: ApiConfig) -> anyhow::Result<AppState> {
    let processor_config = ProcessorConfig {
        base_url: require_env("PROCESSOR_BASE_URL")?,
        api_key: require_env("PROCESSOR_API_KEY")?,
        success_url: format!("{}/payment-success", config.public_base_url),
        cancel_url: format!("{}/payment-cancel", config.public_base_url),
        timeout_secs: env_or("PROCESSOR_TIMEOUT_SECS", 10),
    };
    let processor = Arc::new(
        HttpPaymentProcessor::new(processor_config)
            .map_err(|e| anyhow::anyhow!("processor client setup failed: {e}"))?,
    );

    let smtp = smtp_config_from_env();
    let sms = sms_config_from_env();
    if smtp.is_none() {
        tracing::warn!("SMTP not configured; email dispatch will be skipped");
    }
    if sms.is_none() {
        tracing::warn!("SMS gateway not configured; SMS dispatch will be skipped");
    }
    let dispatcher = Arc::new(
        GatewayDispatcher::new(smtp, sms)
            .map_err(|e| anyhow::anyhow!("dispatcher setup failed: {e}"))?,
    );

    let ledger = Arc::new(BalanceLedger::new());
    let records = Arc::new(PaymentRecordStore::new());
    let links = Arc::new(PaymentLinkManager::new(
        Arc::clone(&ledger) as _,
        dispatcher as _,
        Arc::clone(&processor) as _,
        config.public_base_url.clone(),
    ));
    let verification = Arc::new(ManualVerification::new(
        Arc::clone(&records),
        Arc::clone(&ledger),
    ));
    let settlement = Arc::new(ReconciliationService::new(
        Arc::clone(&links),
        Arc::clone(&records),
        Arc::clone(&ledger),
        processor as _,
    ));

    Ok(AppState {
        ledger,
        records,
        links,
        verification,
        settlement,
        config,
    })
}

fn load_config() -> ApiConfig {
    ApiConfig::from_env().unwrap_or_else(|_| ApiConfig {
        host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        port: env_or("API_PORT", 8080),
        jwt_secret: std::env::var("API_JWT_SECRET")
            .unwrap_or_else(|_| "dev-secret-change-in-production".to_string()),
        jwt_expiration_secs: env_or("API_JWT_EXPIRATION_SECS", 3600),
        public_base_url: std::env::var("API_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        sweep_interval_secs: env_or("API_SWEEP_INTERVAL_SECS", 300),
        log_level: std::env::var("API_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string()),
    })
}

fn require_env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn smtp_config_from_env() -> Option<SmtpConfig> {
    Some(SmtpConfig {
        host: std::env::var("SMTP_HOST").ok()?,
        port: env_or("SMTP_PORT", 587),
        user: std::env::var("SMTP_USER").ok()?,
        password: std::env::var("SMTP_PASSWORD").ok()?,
        from_email: std::env::var("SMTP_FROM_EMAIL").ok()?,
        from_name: std::env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Collections".to_string()),
    })
}

fn sms_config_from_env() -> Option<SmsConfig> {
    Some(SmsConfig {
        api_url: std::env::var("SMS_API_URL").ok()?,
        auth_key: std::env::var("SMS_AUTH_KEY").ok()?,
        sender_id: std::env::var("SMS_SENDER_ID").unwrap_or_else(|_| "COLLECT".to_string()),
    })
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
