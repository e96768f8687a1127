//! Payment records domain errors

use thiserror::Error;

use domain_ledger::LedgerError;

/// Errors that can occur in the payment records domain
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Payment record not found
    #[error("Payment record not found: {0}")]
    RecordNotFound(String),

    /// Bad input; fully local, never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// Attempted transition from a state that forbids it
    #[error("Invalid state transition from {from} to {attempted}")]
    InvalidState { from: String, attempted: String },

    /// A verified record with this reference number already exists; the
    /// second confirmation for a processor transaction fails here instead
    /// of being double-applied.
    #[error("Duplicate reference number: {0}")]
    DuplicateReference(String),

    /// Ledger application failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
