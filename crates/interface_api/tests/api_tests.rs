//! End-to-end HTTP tests over the full router

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use core_kernel::SessionStatus;
use domain_ledger::BalanceLedger;
use domain_links::PaymentLinkManager;
use domain_payments::{ManualVerification, PaymentRecordStore};
use domain_settlement::ReconciliationService;
use interface_api::auth::{create_token, roles};
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};
use test_utils::{funded_debtor, usd, RecordingDispatcher, ScriptedProcessor, SessionScript};

const JWT_SECRET: &str = "test-secret";

struct TestApp {
    server: TestServer,
    ledger: Arc<BalanceLedger>,
    processor: Arc<ScriptedProcessor>,
}

fn spawn_app() -> TestApp {
    let config = ApiConfig {
        jwt_secret: JWT_SECRET.to_string(),
        public_base_url: "http://pay.test".to_string(),
        ..ApiConfig::default()
    };

    let ledger = Arc::new(BalanceLedger::new());
    let records = Arc::new(PaymentRecordStore::new());
    let processor = Arc::new(ScriptedProcessor::new());
    let links = Arc::new(PaymentLinkManager::new(
        Arc::clone(&ledger) as _,
        Arc::new(RecordingDispatcher::new()) as _,
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
        Arc::clone(&processor) as _,
    ));

    let state = AppState {
        ledger: Arc::clone(&ledger),
        records,
        links,
        verification,
        settlement,
        config,
    };

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        ledger,
        processor,
    }
}

fn token_for(role: &str) -> String {
    let staff = core_kernel::StaffId::new();
    create_token(&staff.to_string(), vec![role.to_string()], JWT_SECRET, 60).unwrap()
}

/// Creates a debtor and a payment link through the staff API, returning
/// the public token string
async fn create_link(app: &TestApp, loan: rust_decimal::Decimal, amount: rust_decimal::Decimal) -> String {
    let debtor_id = funded_debtor(&app.ledger, usd(loan));
    let response = app
        .server
        .post("/api/v1/payments/generate-link")
        .authorization_bearer(&token_for(roles::TEAM))
        .json(&json!({
            "debtor_ids": [debtor_id],
            "amount": amount,
            "description": "Outstanding balance",
            "send_email": false,
            "send_sms": false,
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    let url = body[0]["payment_url"].as_str().unwrap();
    url.rsplit('/').next().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = spawn_app();
    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_staff_routes_require_a_token() {
    let app = spawn_app();
    let response = app.server.get("/api/v1/payments").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .get("/api/v1/payments")
        .authorization_bearer("not-a-jwt")
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_page_read_counts_views() {
    let app = spawn_app();
    let token = create_link(&app, dec!(500), dec!(200)).await;

    let response = app.server.get(&format!("/pay/{token}")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "active");
    assert_eq!(body["amount"]["currency"], "USD");
    let amount: rust_decimal::Decimal = body["amount"]["amount"].as_str().unwrap().parse().unwrap();
    assert_eq!(amount, dec!(200));
    assert!(body["debtor_name"].as_str().is_some_and(|n| !n.is_empty()));

    // View count shows up in the staff analytics
    let links: Value = app
        .server
        .get("/api/v1/payments/links")
        .authorization_bearer(&token_for(roles::TEAM))
        .await
        .json();
    assert_eq!(links[0]["view_count"], 1);
}

#[tokio::test]
async fn test_unknown_public_token_is_404() {
    let app = spawn_app();
    let response = app
        .server
        .get(&format!("/pay/{}", core_kernel::PublicLinkId::generate()))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_payment_verification_flow() {
    let app = spawn_app();
    let debtor_id = funded_debtor(&app.ledger, usd(dec!(500)));

    let response = app
        .server
        .post(&format!("/api/v1/payments/debtors/{}", debtor_id.as_uuid()))
        .authorization_bearer(&token_for(roles::TEAM))
        .json(&json!({
            "amount": dec!(150),
            "method": "bank transfer",
            "reference_number": "TXN-88421",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let record: Value = response.json();
    assert_eq!(record["status"], "pending_verification");
    let payment_id = record["id"].as_str().unwrap().to_string();

    // Team role cannot decide
    let response = app
        .server
        .post(&format!("/api/v1/payments/{payment_id}/verify"))
        .authorization_bearer(&token_for(roles::TEAM))
        .json(&json!({ "action": "approve" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    // Accountant approves; the ledger is credited
    let response = app
        .server
        .post(&format!("/api/v1/payments/{payment_id}/verify"))
        .authorization_bearer(&token_for(roles::ACCOUNTANT))
        .json(&json!({ "action": "approve" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "verified");

    let balance = app.ledger.balance(debtor_id).unwrap();
    assert_eq!(balance.amount_paid, usd(dec!(150)));
    assert_eq!(balance.remaining_balance, usd(dec!(350)));

    // A second decision conflicts
    let response = app
        .server
        .post(&format!("/api/v1/payments/{payment_id}/verify"))
        .authorization_bearer(&token_for(roles::ACCOUNTANT))
        .json(&json!({ "action": "reject", "reason": "changed my mind" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_rejection_requires_a_reason() {
    let app = spawn_app();
    let debtor_id = funded_debtor(&app.ledger, usd(dec!(500)));

    let record: Value = app
        .server
        .post(&format!("/api/v1/payments/debtors/{}", debtor_id.as_uuid()))
        .authorization_bearer(&token_for(roles::TEAM))
        .json(&json!({ "amount": dec!(100), "method": "cash" }))
        .await
        .json();

    let response = app
        .server
        .post(&format!("/api/v1/payments/{}/verify", record["id"].as_str().unwrap()))
        .authorization_bearer(&token_for(roles::ACCOUNTANT))
        .json(&json!({ "action": "reject" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_manual_payment_validation() {
    let app = spawn_app();
    let debtor_id = funded_debtor(&app.ledger, usd(dec!(500)));
    let staff = token_for(roles::TEAM);

    let response = app
        .server
        .post(&format!("/api/v1/payments/debtors/{}", debtor_id.as_uuid()))
        .authorization_bearer(&staff)
        .json(&json!({ "amount": dec!(-5), "method": "cash" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    // Unknown debtor
    let response = app
        .server
        .post(&format!(
            "/api/v1/payments/debtors/{}",
            core_kernel::DebtorId::new().as_uuid()
        ))
        .authorization_bearer(&staff)
        .json(&json!({ "amount": dec!(50), "method": "cash" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_and_poll_to_completion() {
    let app = spawn_app();
    let token = create_link(&app, dec!(500), dec!(200)).await;

    let response = app.server.post(&format!("/pay/{token}/checkout")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let session: Value = response.json();
    let session_id = session["session_id"].as_str().unwrap().to_string();
    assert!(session["checkout_url"].as_str().unwrap().starts_with("https://"));

    // Still pending before the processor settles
    let response = app
        .server
        .get(&format!("/pay/{token}/verify-success"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["state"], "pending");

    app.processor
        .script(&session_id, SessionScript::Always(SessionStatus::Paid));

    let response = app
        .server
        .get(&format!("/pay/{token}/verify-success"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["state"], "completed");
    assert_eq!(body["record"]["status"], "verified");
    assert_eq!(body["record"]["method"], "online");

    // Idempotent: a repeat poll returns the same record
    let again: Value = app
        .server
        .get(&format!("/pay/{token}/verify-success"))
        .await
        .json();
    assert_eq!(again["record"]["id"], body["record"]["id"]);
}

#[tokio::test]
async fn test_checkout_refused_on_cancelled_link() {
    let app = spawn_app();
    let token = create_link(&app, dec!(500), dec!(200)).await;

    let links: Value = app
        .server
        .get("/api/v1/payments/links")
        .authorization_bearer(&token_for(roles::TEAM))
        .await
        .json();
    let link_id = links[0]["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .post(&format!("/api/v1/payments/links/{link_id}/cancel"))
        .authorization_bearer(&token_for(roles::TEAM))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app.server.post(&format!("/pay/{token}/checkout")).await;
    assert_eq!(response.status_code(), StatusCode::GONE);

    // Cancelling twice conflicts
    let response = app
        .server
        .post(&format!("/api/v1/payments/links/{link_id}/cancel"))
        .authorization_bearer(&token_for(roles::TEAM))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_webhook_completes_the_link() {
    let app = spawn_app();
    let token = create_link(&app, dec!(500), dec!(200)).await;

    let session: Value = app
        .server
        .post(&format!("/pay/{token}/checkout"))
        .await
        .json();
    let session_id = session["session_id"].as_str().unwrap().to_string();
    app.processor
        .script(&session_id, SessionScript::Always(SessionStatus::Paid));

    let response = app
        .server
        .post("/webhooks/processor")
        .json(&json!({
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": session_id,
                "metadata": { "public_link_id": token },
            }},
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = app.server.get(&format!("/pay/{token}")).await.json();
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn test_webhook_ignores_unknown_event_types() {
    let app = spawn_app();
    let response = app
        .server
        .post("/webhooks/processor")
        .json(&json!({
            "type": "invoice.created",
            "data": { "object": { "id": "in_123" } },
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["received"], true);
}

#[tokio::test]
async fn test_generate_link_validation() {
    let app = spawn_app();
    let debtor_id = funded_debtor(&app.ledger, usd(dec!(500)));
    let staff = token_for(roles::TEAM);

    let response = app
        .server
        .post("/api/v1/payments/generate-link")
        .authorization_bearer(&staff)
        .json(&json!({
            "debtor_ids": [debtor_id],
            "amount": dec!(100),
            "expires_in_days": 0,
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .server
        .post("/api/v1/payments/generate-link")
        .authorization_bearer(&staff)
        .json(&json!({
            "debtor_ids": [core_kernel::DebtorId::new()],
            "amount": dec!(100),
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    // The debtor's balance is USD; a EUR link could never be credited
    let response = app
        .server
        .post("/api/v1/payments/generate-link")
        .authorization_bearer(&staff)
        .json(&json!({
            "debtor_ids": [debtor_id],
            "amount": dec!(100),
            "currency": "EUR",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_payment_listing_and_summaries() {
    let app = spawn_app();
    let token = create_link(&app, dec!(500), dec!(200)).await;
    let staff = token_for(roles::ACCOUNTANT);

    let session: Value = app
        .server
        .post(&format!("/pay/{token}/checkout"))
        .await
        .json();
    app.processor.script(
        session["session_id"].as_str().unwrap(),
        SessionScript::Always(SessionStatus::Paid),
    );
    app.server
        .get(&format!("/pay/{token}/verify-success"))
        .await;

    let payments: Value = app
        .server
        .get("/api/v1/payments")
        .add_query_param("status", "verified")
        .authorization_bearer(&staff)
        .await
        .json();
    assert_eq!(payments.as_array().unwrap().len(), 1);
    assert_eq!(payments[0]["channel"], "link");

    let summary: Value = app
        .server
        .get("/api/v1/payments/summary")
        .authorization_bearer(&staff)
        .await
        .json();
    assert_eq!(summary["total_verified"], 1);
    assert_eq!(summary["total_pending"], 0);

    let link_summary: Value = app
        .server
        .get("/api/v1/payments/links/summary")
        .authorization_bearer(&staff)
        .await
        .json();
    assert_eq!(link_summary["completed"], 1);
    assert_eq!(link_summary["active"], 0);
    assert_eq!(link_summary["total_collected"][0]["currency"], "USD");

    // Per-link analytics reflect the click from checkout
    let links: Value = app
        .server
        .get("/api/v1/payments/links")
        .authorization_bearer(&staff)
        .await
        .json();
    let link_id = links[0]["id"].as_str().unwrap();
    let analytics: Value = app
        .server
        .get(&format!("/api/v1/payments/links/{link_id}/analytics"))
        .authorization_bearer(&staff)
        .await
        .json();
    assert_eq!(analytics["click_count"], 1);
    assert_eq!(analytics["status"], "completed");
    assert!(analytics["completed_payment_record_id"].is_string());
}
