//! Manual verification workflow tests

use std::sync::Arc;

use chrono::Utc;
use rust_decimal_macros::dec;

use core_kernel::{Currency, DebtorId, Money, StaffId};
use domain_ledger::{BalanceLedger, DebtorAccount};
use domain_payments::{
    ManualVerification, PaymentError, PaymentRecordStore, VerificationAction, VerificationStatus,
};

fn usd(amount: rust_decimal::Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

struct Setup {
    ledger: Arc<BalanceLedger>,
    records: Arc<PaymentRecordStore>,
    verification: ManualVerification,
    debtor_id: DebtorId,
}

fn setup() -> Setup {
    let ledger = Arc::new(BalanceLedger::new());
    let debtor_id = DebtorId::new();
    ledger
        .register(DebtorAccount::new(debtor_id, "Ada Clark", usd(dec!(500))))
        .unwrap();

    let records = Arc::new(PaymentRecordStore::new());
    let verification = ManualVerification::new(Arc::clone(&records), Arc::clone(&ledger));

    Setup {
        ledger,
        records,
        verification,
        debtor_id,
    }
}

#[test]
fn approve_applies_ledger_exactly_once() {
    let s = setup();
    let record = s
        .verification
        .submit_manual_payment(s.debtor_id, usd(dec!(150)), "bank_transfer", None, Utc::now())
        .unwrap();

    let decided = s
        .verification
        .decide(record.id, StaffId::new(), VerificationAction::Approve)
        .unwrap();

    assert_eq!(decided.status, VerificationStatus::Verified);
    let balance = s.ledger.balance(s.debtor_id).unwrap();
    assert_eq!(balance.remaining_balance, usd(dec!(350)));

    // Deciding again cannot re-credit
    let again = s
        .verification
        .decide(record.id, StaffId::new(), VerificationAction::Approve);
    assert!(matches!(again, Err(PaymentError::InvalidState { .. })));
    assert_eq!(
        s.ledger.balance(s.debtor_id).unwrap().remaining_balance,
        usd(dec!(350))
    );
}

#[test]
fn rejected_payment_leaves_balance_unchanged() {
    let s = setup();
    let record = s
        .verification
        .submit_manual_payment(
            s.debtor_id,
            usd(dec!(150)),
            "bank_transfer",
            Some("REF-77".to_string()),
            Utc::now(),
        )
        .unwrap();

    let decided = s
        .verification
        .decide(
            record.id,
            StaffId::new(),
            VerificationAction::Reject {
                reason: "bank reference mismatch".to_string(),
            },
        )
        .unwrap();

    assert_eq!(decided.status, VerificationStatus::Rejected);
    assert_eq!(
        decided.rejection_reason.as_deref(),
        Some("bank reference mismatch")
    );
    assert_eq!(
        s.ledger.balance(s.debtor_id).unwrap().remaining_balance,
        usd(dec!(500))
    );
}

#[test]
fn reject_then_approve_fails_invalid_state() {
    let s = setup();
    let record = s
        .verification
        .submit_manual_payment(s.debtor_id, usd(dec!(80)), "cash", None, Utc::now())
        .unwrap();

    s.verification
        .decide(
            record.id,
            StaffId::new(),
            VerificationAction::Reject {
                reason: "no deposit found".to_string(),
            },
        )
        .unwrap();

    let approve = s
        .verification
        .decide(record.id, StaffId::new(), VerificationAction::Approve);
    assert!(matches!(approve, Err(PaymentError::InvalidState { .. })));

    // Ledger untouched throughout
    assert_eq!(
        s.ledger.balance(s.debtor_id).unwrap().remaining_balance,
        usd(dec!(500))
    );
}

#[test]
fn blank_rejection_reason_is_a_validation_error() {
    let s = setup();
    let record = s
        .verification
        .submit_manual_payment(s.debtor_id, usd(dec!(80)), "cash", None, Utc::now())
        .unwrap();

    let result = s.verification.decide(
        record.id,
        StaffId::new(),
        VerificationAction::Reject {
            reason: "  ".to_string(),
        },
    );
    assert!(matches!(result, Err(PaymentError::Validation(_))));

    // Record is still decidable
    assert!(s.records.get(record.id).unwrap().is_pending());
}

#[test]
fn submission_validates_inputs() {
    let s = setup();

    let bad_amount = s.verification.submit_manual_payment(
        s.debtor_id,
        usd(dec!(0)),
        "cash",
        None,
        Utc::now(),
    );
    assert!(matches!(bad_amount, Err(PaymentError::Validation(_))));

    let bad_method =
        s.verification
            .submit_manual_payment(s.debtor_id, usd(dec!(10)), "  ", None, Utc::now());
    assert!(matches!(bad_method, Err(PaymentError::Validation(_))));

    let unknown_debtor = s.verification.submit_manual_payment(
        DebtorId::new(),
        usd(dec!(10)),
        "cash",
        None,
        Utc::now(),
    );
    assert!(matches!(unknown_debtor, Err(PaymentError::Ledger(_))));
}

#[test]
fn concurrent_decisions_settle_exactly_one() {
    let s = setup();
    let record = s
        .verification
        .submit_manual_payment(s.debtor_id, usd(dec!(100)), "cheque", None, Utc::now())
        .unwrap();

    let verification = Arc::new(s.verification);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let verification = Arc::clone(&verification);
            std::thread::spawn(move || {
                verification.decide(record.id, StaffId::new(), VerificationAction::Approve)
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(Result::is_ok)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(
        s.ledger.balance(s.debtor_id).unwrap().remaining_balance,
        usd(dec!(400))
    );
}
