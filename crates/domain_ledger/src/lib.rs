//! Balance Ledger Domain
//!
//! Owns the debtor loan/paid/remaining invariant. Every balance mutation
//! in the system flows through [`BalanceLedger::apply_payment`], which is
//! invoked at most once per verified payment record; the callers hold that
//! one-to-one guarantee, the ledger itself does not deduplicate.
//!
//! # Invariant
//!
//! `remaining_balance = loan_amount - amount_paid` at all times, and
//! `amount_paid` only ever grows.

pub mod account;
pub mod error;
pub mod ledger;

pub use account::{BalanceSnapshot, DebtorAccount};
pub use error::LedgerError;
pub use ledger::BalanceLedger;
