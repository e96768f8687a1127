//! Payment record aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DebtorId, Money, PaymentRecordId, StaffId};

use crate::error::PaymentError;

/// Method string stamped on link-channel records
pub const ONLINE_METHOD: &str = "online";

/// Channel through which a payment entered the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentChannel {
    /// Staff-entered offline payment awaiting verification
    Manual,
    /// Settled through a payment link on the external processor
    Link,
}

/// Verification state of a payment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    PendingVerification,
    Verified,
    Rejected,
}

impl VerificationStatus {
    /// True once the record can no longer transition
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationStatus::PendingVerification)
    }
}

/// The authoritative record that money changed hands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Unique identifier
    pub id: PaymentRecordId,
    /// Debtor the payment reduces
    pub debtor_id: DebtorId,
    /// Payment amount (strictly positive)
    pub amount: Money,
    /// Entry channel
    pub channel: PaymentChannel,
    /// Free-form for manual payments; fixed "online" for link payments
    pub method: String,
    /// Verification state
    pub status: VerificationStatus,
    /// Bank reference for manual payments (advisory); processor
    /// transaction id for link payments (idempotency key)
    pub reference_number: Option<String>,
    /// When the debtor actually paid
    pub payment_date: DateTime<Utc>,
    /// Staff member who verified, if any
    pub verified_by: Option<StaffId>,
    /// When the record was verified
    pub verified_at: Option<DateTime<Utc>>,
    /// Why the record was rejected
    pub rejection_reason: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Creates a staff-entered record awaiting verification
    pub fn manual(
        debtor_id: DebtorId,
        amount: Money,
        method: impl Into<String>,
        reference_number: Option<String>,
        payment_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentRecordId::new_v7(),
            debtor_id,
            amount,
            channel: PaymentChannel::Manual,
            method: method.into(),
            status: VerificationStatus::PendingVerification,
            reference_number,
            payment_date,
            verified_by: None,
            verified_at: None,
            rejection_reason: None,
            created_at: Utc::now(),
        }
    }

    /// Creates an already-verified record for a processor-confirmed link
    /// payment
    ///
    /// The processor's transaction id becomes the reference number; the
    /// store rejects a second record carrying the same one.
    pub fn link_settled(debtor_id: DebtorId, amount: Money, transaction_id: impl Into<String>) -> Self {
        let now = Utc::now();

        Self {
            id: PaymentRecordId::new_v7(),
            debtor_id,
            amount,
            channel: PaymentChannel::Link,
            method: ONLINE_METHOD.to_string(),
            status: VerificationStatus::Verified,
            reference_number: Some(transaction_id.into()),
            payment_date: now,
            verified_by: None,
            verified_at: Some(now),
            rejection_reason: None,
            created_at: now,
        }
    }

    /// True while the record can still be decided
    pub fn is_pending(&self) -> bool {
        self.status == VerificationStatus::PendingVerification
    }

    /// Transitions to `Verified`, stamping the deciding staff member
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the record is pending; verified and rejected
    /// records are immutable.
    pub fn approve(&mut self, staff: StaffId) -> Result<(), PaymentError> {
        self.ensure_pending(VerificationStatus::Verified)?;
        self.status = VerificationStatus::Verified;
        self.verified_by = Some(staff);
        self.verified_at = Some(Utc::now());
        Ok(())
    }

    /// Transitions to `Rejected` with the supplied reason
    ///
    /// # Errors
    ///
    /// - `Validation` if the reason is blank
    /// - `InvalidState` unless the record is pending
    pub fn reject(&mut self, staff: StaffId, reason: &str) -> Result<(), PaymentError> {
        if reason.trim().is_empty() {
            return Err(PaymentError::Validation(
                "rejection reason is required".to_string(),
            ));
        }
        self.ensure_pending(VerificationStatus::Rejected)?;
        self.status = VerificationStatus::Rejected;
        self.verified_by = Some(staff);
        self.verified_at = Some(Utc::now());
        self.rejection_reason = Some(reason.trim().to_string());
        Ok(())
    }

    fn ensure_pending(&self, attempted: VerificationStatus) -> Result<(), PaymentError> {
        if !self.is_pending() {
            return Err(PaymentError::InvalidState {
                from: format!("{:?}", self.status),
                attempted: format!("{attempted:?}"),
            });
        }
        Ok(())
    }
}
