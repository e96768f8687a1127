//! HTTP API Layer
//!
//! REST surface for the debt-recovery settlement core using Axum.
//!
//! # Architecture
//!
//! - **Public surface**: the payment page routes under `/pay/:token` plus
//!   the processor webhook; the unguessable token is the only credential
//! - **Staff surface**: JWT-authenticated routes under `/api/v1` for
//!   manual payments, verification decisions, and link management
//! - **DTOs**: request/response objects split from the handlers
//! - **Error handling**: domain errors mapped to consistent JSON bodies

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_ledger::BalanceLedger;
use domain_links::PaymentLinkManager;
use domain_payments::{ManualVerification, PaymentRecordStore};
use domain_settlement::ReconciliationService;

use crate::config::ApiConfig;
use crate::handlers::{health, links, payments, public_pay, webhook};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<BalanceLedger>,
    pub records: Arc<PaymentRecordStore>,
    pub links: Arc<PaymentLinkManager>,
    pub verification: Arc<ManualVerification>,
    pub settlement: Arc<ReconciliationService>,
    pub config: ApiConfig,
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes: the payment page and the processor push path
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/pay/:token", get(public_pay::get_link))
        .route("/pay/:token/checkout", post(public_pay::start_checkout))
        .route("/pay/:token/verify-success", get(public_pay::verify_success))
        .route("/webhooks/processor", post(webhook::processor_webhook));

    // Staff payment routes
    let payment_routes = Router::new()
        .route("/", get(payments::list_payments))
        .route("/summary", get(payments::payments_summary))
        .route("/debtors/:debtor_id", post(payments::record_manual_payment))
        .route("/:id/verify", post(payments::verify_payment))
        .route("/generate-link", post(links::generate_links))
        .route("/links", get(links::list_links))
        .route("/links/summary", get(links::links_summary))
        .route("/links/:id", get(links::get_link))
        .route("/links/:id/analytics", get(links::link_analytics))
        .route("/links/:id/cancel", post(links::cancel_link));

    let api_routes = Router::new()
        .nest("/payments", payment_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            audit_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
