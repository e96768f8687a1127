//! Port traits for the external collaborators
//!
//! The settlement core consumes three external systems through these
//! interfaces: the hosted payment processor, the communication dispatcher
//! (email/SMS), and the debtor directory. Domain crates depend only on the
//! traits; `infra_gateway` provides the production adapters and
//! `test_utils` the scripted ones.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifiers::{DebtorId, PublicLinkId};
use crate::money::{Currency, Money};

/// Errors from the external payment processor
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Timeout or network failure; transient, the caller retries per its
    /// own attempt budget and never surfaces this as a hard failure.
    #[error("Payment processor unavailable: {0}")]
    Unavailable(String),

    /// The processor does not know the session id
    #[error("Unknown checkout session: {0}")]
    UnknownSession(String),

    /// The processor rejected the request outright
    #[error("Payment processor rejected request: {0}")]
    Rejected(String),
}

impl ProcessorError {
    /// Returns true for failures that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, ProcessorError::Unavailable(_))
    }
}

/// Processor-side state of a checkout session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The debtor's payment settled on the processor's ledger
    Paid,
    /// The session exists but the debtor has not finished paying
    Pending,
    /// The session failed or was abandoned; the debtor may start another
    Failed,
}

/// Authoritative state of a session, as reported by the processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub status: SessionStatus,
    /// Link the session was opened for, when the processor echoes the
    /// creation metadata back. `None` when the processor omits it.
    pub public_link_id: Option<PublicLinkId>,
}

/// A checkout session created on the processor's hosted page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Processor's correlation id for the session
    pub session_id: String,
    /// URL the debtor is redirected to for payment
    pub checkout_url: String,
}

/// Metadata attached to a checkout session for reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    pub public_link_id: PublicLinkId,
    pub debtor_id: DebtorId,
    pub description: Option<String>,
}

/// External payment processor (hosted checkout + session status)
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Opens a hosted checkout session for the given amount
    async fn create_checkout_session(
        &self,
        amount: Money,
        metadata: &CheckoutMetadata,
    ) -> Result<CheckoutSession, ProcessorError>;

    /// Asks the processor for the authoritative state of a session
    ///
    /// Reconciliation trusts this answer, never an inbound assertion; the
    /// echoed metadata lets it reject sessions opened for another link.
    async fn get_session_state(&self, session_id: &str) -> Result<SessionState, ProcessorError>;
}

/// Contact details for a debtor, as exposed by the debtor directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtorContact {
    pub debtor_id: DebtorId,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Currency of the debtor's outstanding balance; links and payments
    /// must be denominated in it or the ledger refuses them.
    pub currency: Currency,
}

/// Read access to debtor identity
///
/// The directory is owned elsewhere (debtor CRUD is out of scope); the
/// settlement core only reads from it.
#[async_trait]
pub trait DebtorDirectory: Send + Sync {
    /// Looks up contact details; `None` if the debtor is unknown
    async fn find_contact(&self, debtor_id: DebtorId) -> Option<DebtorContact>;
}

/// Payload handed to the communication dispatcher for a payment link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub amount: Money,
    pub description: Option<String>,
    pub link_url: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Result of one dispatch attempt on one channel
///
/// Dispatch is best-effort: a failure is reported back to staff but never
/// rolls back the link it was announcing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent,
    Failed { reason: String },
    /// Channel not requested, or the debtor has no address for it
    Skipped,
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent)
    }
}

/// Best-effort email/SMS dispatch
#[async_trait]
pub trait CommunicationDispatcher: Send + Sync {
    async fn send_email(
        &self,
        contact: &DebtorContact,
        payload: &NotificationPayload,
    ) -> DispatchOutcome;

    async fn send_sms(
        &self,
        contact: &DebtorContact,
        payload: &NotificationPayload,
    ) -> DispatchOutcome;
}
