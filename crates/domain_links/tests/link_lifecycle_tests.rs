//! Payment link lifecycle tests

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use core_kernel::{Currency, DispatchOutcome, Money, PaymentRecordId, StaffId};
use domain_ledger::BalanceLedger;
use domain_links::{CreateLinksRequest, LinkError, LinkFilter, LinkStatus, PaymentLinkManager};
use test_utils::{funded_debtor, unreachable_debtor, usd, RecordingDispatcher, ScriptedProcessor};

struct Setup {
    ledger: Arc<BalanceLedger>,
    dispatcher: Arc<RecordingDispatcher>,
    processor: Arc<ScriptedProcessor>,
    manager: PaymentLinkManager,
}

fn setup() -> Setup {
    let ledger = Arc::new(BalanceLedger::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let processor = Arc::new(ScriptedProcessor::new());
    let manager = PaymentLinkManager::new(
        Arc::clone(&ledger) as _,
        Arc::clone(&dispatcher) as _,
        Arc::clone(&processor) as _,
        "https://pay.example.test",
    );
    Setup {
        ledger,
        dispatcher,
        processor,
        manager,
    }
}

fn request_for(debtors: Vec<core_kernel::DebtorId>) -> CreateLinksRequest {
    CreateLinksRequest {
        debtor_ids: debtors,
        amount: usd(dec!(200)),
        description: Some("Outstanding balance".to_string()),
        expires_in_days: 7,
        notify_email: true,
        notify_sms: false,
    }
}

#[tokio::test]
async fn batch_creates_one_link_per_debtor() {
    let s = setup();
    let a = funded_debtor(&s.ledger, usd(dec!(500)));
    let b = funded_debtor(&s.ledger, usd(dec!(900)));

    let creations = s
        .manager
        .create_links(request_for(vec![a, b]), StaffId::new())
        .await
        .unwrap();

    assert_eq!(creations.len(), 2);
    for creation in &creations {
        assert_eq!(creation.link.status, LinkStatus::Active);
        assert_eq!(creation.link.view_count, 0);
        assert_eq!(creation.link.click_count, 0);
        assert_eq!(creation.email, DispatchOutcome::Sent);
        assert_eq!(creation.sms, DispatchOutcome::Skipped);
    }
    assert_ne!(creations[0].link.debtor_id, creations[1].link.debtor_id);
    assert_eq!(s.dispatcher.emails_sent(), 2);

    // The emailed URL carries the public token, not the internal id
    let urls = s.dispatcher.emailed_urls();
    assert!(urls[0].starts_with("https://pay.example.test/pay/"));
    assert!(!urls[0].contains("PLNK"));
}

#[tokio::test]
async fn creation_validates_before_creating_anything() {
    let s = setup();
    let debtor = funded_debtor(&s.ledger, usd(dec!(500)));

    let empty = s
        .manager
        .create_links(request_for(vec![]), StaffId::new())
        .await;
    assert!(matches!(empty, Err(LinkError::Validation(_))));

    let mut bad_amount = request_for(vec![debtor]);
    bad_amount.amount = usd(dec!(0));
    let result = s.manager.create_links(bad_amount, StaffId::new()).await;
    assert!(matches!(result, Err(LinkError::Validation(_))));

    let mut bad_expiry = request_for(vec![debtor]);
    bad_expiry.expires_in_days = 366;
    let result = s.manager.create_links(bad_expiry, StaffId::new()).await;
    assert!(matches!(result, Err(LinkError::Validation(_))));

    let unknown = request_for(vec![debtor, core_kernel::DebtorId::new()]);
    let result = s.manager.create_links(unknown, StaffId::new()).await;
    assert!(matches!(result, Err(LinkError::Validation(_))));

    // The failed batch with one known debtor created no links at all
    assert!(s.manager.list(&LinkFilter::default()).await.is_empty());
}

#[tokio::test]
async fn dispatch_failure_does_not_roll_back_links() {
    let s = setup();
    let debtor = funded_debtor(&s.ledger, usd(dec!(500)));
    s.dispatcher.set_fail_email(true);

    let creations = s
        .manager
        .create_links(request_for(vec![debtor]), StaffId::new())
        .await
        .unwrap();

    assert!(matches!(
        creations[0].email,
        DispatchOutcome::Failed { .. }
    ));
    assert_eq!(creations[0].link.status, LinkStatus::Active);
    assert!(s
        .manager
        .get_by_token(&creations[0].link.public_link_id)
        .await
        .is_some());
}

#[tokio::test]
async fn debtor_without_email_is_skipped_not_failed() {
    let s = setup();
    let debtor = unreachable_debtor(&s.ledger, usd(dec!(500)));

    let mut request = request_for(vec![debtor]);
    request.notify_sms = true;
    let creations = s.manager.create_links(request, StaffId::new()).await.unwrap();

    assert_eq!(creations[0].email, DispatchOutcome::Skipped);
    assert_eq!(creations[0].sms, DispatchOutcome::Skipped);
}

#[tokio::test]
async fn counters_increment_only_while_payable() {
    let s = setup();
    let debtor = funded_debtor(&s.ledger, usd(dec!(500)));
    let creations = s
        .manager
        .create_links(request_for(vec![debtor]), StaffId::new())
        .await
        .unwrap();
    let token = creations[0].link.public_link_id;

    s.manager.record_view(&token).await.unwrap();
    s.manager.record_view(&token).await.unwrap();
    s.manager.record_click(&token).await.unwrap();

    let link = s.manager.get_by_token(&token).await.unwrap();
    assert_eq!(link.view_count, 2);
    assert_eq!(link.click_count, 1);

    // Cancel, then instrumentation becomes a silent no-op
    s.manager.cancel(link.id).await.unwrap();
    s.manager.record_view(&token).await.unwrap();
    let link = s.manager.get_by_token(&token).await.unwrap();
    assert_eq!(link.view_count, 2);

    // Unknown token is still an error
    let missing = s.manager.record_view(&core_kernel::PublicLinkId::generate()).await;
    assert!(matches!(missing, Err(LinkError::LinkNotFound(_))));
}

#[tokio::test]
async fn checkout_attaches_session_and_counts_click() {
    let s = setup();
    let debtor = funded_debtor(&s.ledger, usd(dec!(500)));
    let creations = s
        .manager
        .create_links(request_for(vec![debtor]), StaffId::new())
        .await
        .unwrap();
    let token = creations[0].link.public_link_id;

    let session = s.manager.start_checkout(&token).await.unwrap();
    assert!(session.checkout_url.contains(&session.session_id));

    let link = s.manager.get_by_token(&token).await.unwrap();
    assert_eq!(link.external_session_id, Some(session.session_id.clone()));
    assert_eq!(link.click_count, 1);

    // A second checkout replaces the abandoned session
    let second = s.manager.start_checkout(&token).await.unwrap();
    assert_ne!(second.session_id, session.session_id);
    let link = s.manager.get_by_token(&token).await.unwrap();
    assert_eq!(link.external_session_id, Some(second.session_id));
    assert_eq!(s.processor.sessions_created(), 2);
}

#[tokio::test]
async fn checkout_refused_on_overdue_or_terminal_links() {
    let s = setup();
    let debtor = funded_debtor(&s.ledger, usd(dec!(500)));
    let creations = s
        .manager
        .create_links(request_for(vec![debtor]), StaffId::new())
        .await
        .unwrap();
    let link = &creations[0].link;

    // Push the deadline into the past via the entry handle
    {
        let entry = s.manager.entry(link.id).unwrap();
        entry.lock().await.expires_at = Utc::now() - Duration::minutes(5);
    }
    let overdue = s.manager.start_checkout(&link.public_link_id).await;
    assert!(matches!(overdue, Err(LinkError::NotPayable(_))));

    // Processor outage propagates and leaves the link payable
    let fresh = s
        .manager
        .create_links(request_for(vec![debtor]), StaffId::new())
        .await
        .unwrap();
    s.processor.set_refuse_checkout(true);
    let outage = s
        .manager
        .start_checkout(&fresh[0].link.public_link_id)
        .await;
    assert!(matches!(outage, Err(LinkError::Processor(_))));
    let still_active = s
        .manager
        .get_by_token(&fresh[0].link.public_link_id)
        .await
        .unwrap();
    assert_eq!(still_active.status, LinkStatus::Active);
}

#[tokio::test]
async fn sweep_expires_only_overdue_active_links() {
    let s = setup();
    let debtor = funded_debtor(&s.ledger, usd(dec!(500)));
    let creations = s
        .manager
        .create_links(request_for(vec![debtor, debtor2(&s), debtor3(&s)]), StaffId::new())
        .await
        .unwrap();

    // One overdue, one cancelled, one current
    {
        let entry = s.manager.entry(creations[0].link.id).unwrap();
        entry.lock().await.expires_at = Utc::now() - Duration::hours(1);
    }
    s.manager.cancel(creations[1].link.id).await.unwrap();

    let swept = s.manager.expire_overdue_links(Utc::now()).await;
    assert_eq!(swept, 1);

    // Idempotent: a second pass finds nothing to do
    let swept_again = s.manager.expire_overdue_links(Utc::now()).await;
    assert_eq!(swept_again, 0);

    let summary = s.manager.summary().await;
    assert_eq!(summary.active, 1);
    assert_eq!(summary.expired, 1);
    assert_eq!(summary.cancelled, 1);
    assert!(summary.total_collected.is_empty());
}

fn debtor2(s: &Setup) -> core_kernel::DebtorId {
    funded_debtor(&s.ledger, usd(dec!(250)))
}

fn debtor3(s: &Setup) -> core_kernel::DebtorId {
    funded_debtor(&s.ledger, usd(dec!(750)))
}

#[tokio::test]
async fn cancel_is_single_shot() {
    let s = setup();
    let debtor = funded_debtor(&s.ledger, usd(dec!(500)));
    let creations = s
        .manager
        .create_links(request_for(vec![debtor]), StaffId::new())
        .await
        .unwrap();
    let id = creations[0].link.id;

    let cancelled = s.manager.cancel(id).await.unwrap();
    assert_eq!(cancelled.status, LinkStatus::Cancelled);

    let again = s.manager.cancel(id).await;
    assert!(matches!(again, Err(LinkError::InvalidState { .. })));

    let missing = s.manager.cancel(core_kernel::PaymentLinkId::new_v7()).await;
    assert!(matches!(missing, Err(LinkError::LinkNotFound(_))));
}

#[tokio::test]
async fn listing_and_analytics() {
    let s = setup();
    let a = funded_debtor(&s.ledger, usd(dec!(500)));
    let b = funded_debtor(&s.ledger, usd(dec!(300)));
    let creations = s
        .manager
        .create_links(request_for(vec![a, b]), StaffId::new())
        .await
        .unwrap();

    let for_a = s
        .manager
        .list(&LinkFilter {
            debtor_id: Some(a),
            ..Default::default()
        })
        .await;
    assert_eq!(for_a.len(), 1);

    let token = creations[0].link.public_link_id;
    s.manager.record_view(&token).await.unwrap();

    let analytics = s.manager.analytics(creations[0].link.id).await.unwrap();
    assert_eq!(analytics.view_count, 1);
    assert_eq!(analytics.status, LinkStatus::Active);
    assert!(analytics.days_until_expiry <= 7);
    assert!(analytics.completed_payment_record_id.is_none());
}

#[tokio::test]
async fn summary_totals_completed_links_per_currency() {
    let s = setup();
    let dollars = funded_debtor(&s.ledger, usd(dec!(500)));
    let euros = funded_debtor(&s.ledger, Money::new(dec!(300), Currency::EUR));

    let usd_links = s
        .manager
        .create_links(request_for(vec![dollars]), StaffId::new())
        .await
        .unwrap();
    let mut eur_request = request_for(vec![euros]);
    eur_request.amount = Money::new(dec!(120), Currency::EUR);
    let eur_links = s
        .manager
        .create_links(eur_request, StaffId::new())
        .await
        .unwrap();

    for creation in usd_links.iter().chain(eur_links.iter()) {
        let entry = s.manager.entry(creation.link.id).unwrap();
        entry
            .lock()
            .await
            .complete(PaymentRecordId::new_v7())
            .unwrap();
    }

    let summary = s.manager.summary().await;
    assert_eq!(summary.completed, 2);
    assert_eq!(
        summary.total_collected,
        vec![usd(dec!(200)), Money::new(dec!(120), Currency::EUR)]
    );
}

#[tokio::test]
async fn creation_rejects_currency_mismatched_amounts() {
    let s = setup();
    let debtor = funded_debtor(&s.ledger, usd(dec!(500)));

    let mut request = request_for(vec![debtor]);
    request.amount = Money::new(dec!(100), Currency::EUR);
    let err = s
        .manager
        .create_links(request, StaffId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LinkError::Validation(_)));

    // Nothing was created for the batch
    assert!(s.manager.list(&LinkFilter::default()).await.is_empty());
}
