//! Ledger domain errors

use thiserror::Error;

use core_kernel::MoneyError;

/// Errors that can occur in the balance ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Debtor account not found
    #[error("Debtor not found: {0}")]
    DebtorNotFound(String),

    /// Debtor account already registered
    #[error("Debtor already registered: {0}")]
    DebtorAlreadyRegistered(String),

    /// Payment amount must be strictly positive
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Money arithmetic failed (currency mismatch)
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}
