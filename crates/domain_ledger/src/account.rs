//! Debtor account aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DebtorId, Money};

/// A debtor account as the ledger sees it
///
/// The remaining balance is derived, never stored, so the
/// `remaining = loan - paid` invariant holds by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtorAccount {
    /// Unique identifier
    pub id: DebtorId,
    /// Display name
    pub full_name: String,
    /// Contact email, if known
    pub email: Option<String>,
    /// Contact phone, if known
    pub phone: Option<String>,
    /// Total amount owed
    pub loan_amount: Money,
    /// Total verified payments applied so far; monotonically non-decreasing
    pub amount_paid: Money,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last balance mutation
    pub updated_at: DateTime<Utc>,
}

impl DebtorAccount {
    /// Creates a new account with nothing paid yet
    pub fn new(id: DebtorId, full_name: impl Into<String>, loan_amount: Money) -> Self {
        let now = Utc::now();

        Self {
            id,
            full_name: full_name.into(),
            email: None,
            phone: None,
            loan_amount,
            amount_paid: Money::zero(loan_amount.currency()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the contact email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the contact phone
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Amount still owed
    pub fn remaining_balance(&self) -> Money {
        self.loan_amount - self.amount_paid
    }

    /// Point-in-time view of the three balance fields
    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            debtor_id: self.id,
            loan_amount: self.loan_amount,
            amount_paid: self.amount_paid,
            remaining_balance: self.remaining_balance(),
        }
    }
}

/// The balance fields exposed to reporting and the payment page
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub debtor_id: DebtorId,
    pub loan_amount: Money,
    pub amount_paid: Money,
    pub remaining_balance: Money,
}
