//! Payment link aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DebtorId, Money, PaymentLinkId, PaymentRecordId, PublicLinkId, StaffId};

use crate::error::LinkError;

/// Payment link status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Payable; awaiting completion, expiry, or cancellation
    Active,
    /// A verified payment record exists for this link
    Completed,
    /// The expiry sweep retired it unpaid
    Expired,
    /// Staff withdrew it
    Cancelled,
}

impl LinkStatus {
    /// True once the link can no longer transition
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LinkStatus::Active)
    }
}

/// A shareable, expiring payment link bound to one debtor and one amount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLink {
    /// Unique identifier
    pub id: PaymentLinkId,
    /// Opaque token used on the public payment URL
    pub public_link_id: PublicLinkId,
    /// The debtor this link collects from
    pub debtor_id: DebtorId,
    /// Amount the link collects
    pub amount: Money,
    /// Staff-supplied description shown on the payment page
    pub description: Option<String>,
    /// Lifecycle state
    pub status: LinkStatus,
    /// When the link stops being payable
    pub expires_at: DateTime<Utc>,
    /// Staff member who created it
    pub created_by: StaffId,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Payment page views
    pub view_count: u64,
    /// Checkout initiations
    pub click_count: u64,
    /// Set if and only if status is `Completed`
    pub completed_payment_record_id: Option<PaymentRecordId>,
    /// Processor correlation id, set when the debtor initiates checkout
    pub external_session_id: Option<String>,
}

impl PaymentLink {
    /// Creates an active link expiring at the given instant
    pub fn new(
        debtor_id: DebtorId,
        amount: Money,
        description: Option<String>,
        expires_at: DateTime<Utc>,
        created_by: StaffId,
    ) -> Self {
        Self {
            id: PaymentLinkId::new_v7(),
            public_link_id: PublicLinkId::generate(),
            debtor_id,
            amount,
            description,
            status: LinkStatus::Active,
            expires_at,
            created_by,
            created_at: Utc::now(),
            view_count: 0,
            click_count: 0,
            completed_payment_record_id: None,
            external_session_id: None,
        }
    }

    /// True if the link's deadline has passed, whether or not the sweep
    /// has caught up with it yet
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// True while this link may still take a payment
    pub fn is_payable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == LinkStatus::Active && !self.is_overdue_at(now)
    }

    /// Transitions to `Completed`, recording the settled payment
    ///
    /// # Errors
    ///
    /// `InvalidState` unless currently `Active`.
    pub fn complete(&mut self, record_id: PaymentRecordId) -> Result<(), LinkError> {
        self.ensure_active(LinkStatus::Completed)?;
        self.status = LinkStatus::Completed;
        self.completed_payment_record_id = Some(record_id);
        Ok(())
    }

    /// Transitions to `Expired`; the sweep is the only caller
    ///
    /// # Errors
    ///
    /// `InvalidState` unless currently `Active`.
    pub fn expire(&mut self) -> Result<(), LinkError> {
        self.ensure_active(LinkStatus::Expired)?;
        self.status = LinkStatus::Expired;
        Ok(())
    }

    /// Transitions to `Cancelled` (staff action)
    ///
    /// # Errors
    ///
    /// `InvalidState` unless currently `Active`.
    pub fn cancel(&mut self) -> Result<(), LinkError> {
        self.ensure_active(LinkStatus::Cancelled)?;
        self.status = LinkStatus::Cancelled;
        Ok(())
    }

    /// Remembers the processor session opened for this link
    ///
    /// A superseded session (debtor abandoned checkout and started over)
    /// is simply replaced; only the latest one can settle the link.
    pub fn attach_session(&mut self, session_id: impl Into<String>) {
        self.external_session_id = Some(session_id.into());
    }

    fn ensure_active(&self, attempted: LinkStatus) -> Result<(), LinkError> {
        if self.status != LinkStatus::Active {
            return Err(LinkError::InvalidState {
                from: format!("{:?}", self.status),
                attempted: format!("{attempted:?}"),
            });
        }
        Ok(())
    }
}
