//! Manual verification workflow
//!
//! Staff record offline payments (cash, bank transfer, cheque) and later
//! approve or reject them. Approval applies the ledger exactly once, inside
//! the same critical section as the status transition, so a record can
//! never be credited twice or credited without being marked verified.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use core_kernel::{DebtorId, Money, StaffId};
use domain_ledger::BalanceLedger;

use crate::error::PaymentError;
use crate::record::PaymentRecord;
use crate::store::PaymentRecordStore;

/// Staff decision over a pending record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationAction {
    Approve,
    Reject { reason: String },
}

/// The approve/reject state machine over pending manual payment records
pub struct ManualVerification {
    records: Arc<PaymentRecordStore>,
    ledger: Arc<BalanceLedger>,
}

impl ManualVerification {
    pub fn new(records: Arc<PaymentRecordStore>, ledger: Arc<BalanceLedger>) -> Self {
        Self { records, ledger }
    }

    /// Records an offline payment awaiting verification
    ///
    /// The reference number is advisory here and not used for
    /// deduplication - the actor is trusted staff, not a retrier.
    ///
    /// # Errors
    ///
    /// - `Validation` if the amount is not positive or the method is blank
    /// - `Ledger(DebtorNotFound)` if the debtor is not registered
    pub fn submit_manual_payment(
        &self,
        debtor_id: DebtorId,
        amount: Money,
        method: &str,
        reference_number: Option<String>,
        payment_date: DateTime<Utc>,
    ) -> Result<PaymentRecord, PaymentError> {
        if !amount.is_positive() {
            return Err(PaymentError::Validation(format!(
                "payment amount must be positive, got {amount}"
            )));
        }
        if method.trim().is_empty() {
            return Err(PaymentError::Validation(
                "payment method is required".to_string(),
            ));
        }
        if !self.ledger.contains(debtor_id) {
            return Err(PaymentError::Ledger(
                domain_ledger::LedgerError::DebtorNotFound(debtor_id.to_string()),
            ));
        }

        let record = self.records.insert_manual(PaymentRecord::manual(
            debtor_id,
            amount,
            method.trim(),
            reference_number,
            payment_date,
        ))?;

        tracing::info!(
            payment_id = %record.id,
            debtor_id = %debtor_id,
            amount = %amount,
            method = %record.method,
            "Manual payment submitted for verification"
        );
        Ok(record)
    }

    /// Decides a pending record
    ///
    /// Approve transitions to `Verified` and applies the ledger as one
    /// step: the pending check, the ledger call, and the status write all
    /// happen under the store lock, and a ledger failure leaves the record
    /// pending. Reject stores the (required) reason and touches no
    /// balance.
    ///
    /// # Errors
    ///
    /// - `RecordNotFound` for an unknown id
    /// - `InvalidState` if the record already left `PendingVerification`
    /// - `Validation` for a blank rejection reason
    pub fn decide(
        &self,
        payment_id: core_kernel::PaymentRecordId,
        staff: StaffId,
        action: VerificationAction,
    ) -> Result<PaymentRecord, PaymentError> {
        let ledger = Arc::clone(&self.ledger);

        let record = self.records.transition(payment_id, |record| {
            match &action {
                VerificationAction::Approve => {
                    if !record.is_pending() {
                        return Err(PaymentError::InvalidState {
                            from: format!("{:?}", record.status),
                            attempted: "Verified".to_string(),
                        });
                    }
                    // Ledger first: if the debtor vanished the record
                    // stays pending and nothing was credited.
                    ledger.apply_payment(record.debtor_id, record.amount)?;
                    record.approve(staff)?;
                }
                VerificationAction::Reject { reason } => {
                    record.reject(staff, reason)?;
                }
            }
            Ok(record.clone())
        })?;

        tracing::info!(
            payment_id = %record.id,
            staff = %staff,
            status = ?record.status,
            "Manual payment decided"
        );
        Ok(record)
    }
}
