//! Settlement domain errors

use thiserror::Error;

use domain_ledger::LedgerError;
use domain_links::LinkError;
use domain_payments::PaymentError;

/// Errors that can occur during completion reconciliation
#[derive(Debug, Error)]
pub enum SettlementError {
    /// Unknown public link token
    #[error("Payment link not found: {0}")]
    LinkNotFound(String),

    /// Confirmation attempted against a terminal non-completed link, or
    /// one past its deadline. Logged for investigation: it may indicate a
    /// late processor event, and is never applied to the ledger.
    #[error("Link is not payable: {0}")]
    LinkNotPayable(String),

    /// Timeout or outage talking to the processor; transient, callers
    /// retry it within their own attempt budget.
    #[error("Payment processor unavailable: {0}")]
    ProcessorUnavailable(String),

    /// Record store refused the commit
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Ledger refused the commit
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Link state machine refused the commit
    #[error(transparent)]
    Link(#[from] LinkError),
}

impl SettlementError {
    /// True for failures that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, SettlementError::ProcessorUnavailable(_))
    }
}
