//! The balance ledger - single writer of debtor balance mutations

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use core_kernel::{DebtorContact, DebtorDirectory, DebtorId, Money};

use crate::account::{BalanceSnapshot, DebtorAccount};
use crate::error::LedgerError;

/// The ledger of debtor accounts
///
/// All balance mutations go through [`apply_payment`](Self::apply_payment),
/// which runs under the write lock so concurrent applications for the same
/// debtor serialize. The ledger does not deduplicate: callers must hold a
/// uniqueness guarantee (a record's single pending-to-verified transition,
/// or a link's completion lock) before calling.
#[derive(Debug, Default)]
pub struct BalanceLedger {
    accounts: RwLock<HashMap<DebtorId, DebtorAccount>>,
}

impl BalanceLedger {
    /// Creates an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a debtor account
    ///
    /// # Errors
    ///
    /// Returns `DebtorAlreadyRegistered` if the id is taken.
    pub fn register(&self, account: DebtorAccount) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.write().expect("ledger lock poisoned");

        if accounts.contains_key(&account.id) {
            return Err(LedgerError::DebtorAlreadyRegistered(account.id.to_string()));
        }

        accounts.insert(account.id, account);
        Ok(())
    }

    /// Applies a verified payment, returning the new remaining balance
    ///
    /// Atomically increments `amount_paid`; the remaining balance is
    /// derived, so the invariant cannot be observed broken mid-update.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount` is not strictly positive
    /// - `DebtorNotFound` if the debtor is not registered
    pub fn apply_payment(&self, debtor_id: DebtorId, amount: Money) -> Result<Money, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "payment amount must be positive, got {amount}"
            )));
        }

        let mut accounts = self.accounts.write().expect("ledger lock poisoned");
        let account = accounts
            .get_mut(&debtor_id)
            .ok_or_else(|| LedgerError::DebtorNotFound(debtor_id.to_string()))?;

        account.amount_paid = account.amount_paid.checked_add(&amount)?;
        account.updated_at = Utc::now();

        let remaining = account.remaining_balance();
        tracing::info!(
            debtor_id = %debtor_id,
            amount = %amount,
            remaining = %remaining,
            "Payment applied to ledger"
        );

        Ok(remaining)
    }

    /// Returns the balance fields for a debtor
    pub fn balance(&self, debtor_id: DebtorId) -> Option<BalanceSnapshot> {
        self.accounts
            .read()
            .expect("ledger lock poisoned")
            .get(&debtor_id)
            .map(DebtorAccount::snapshot)
    }

    /// Returns a copy of the full account
    pub fn account(&self, debtor_id: DebtorId) -> Option<DebtorAccount> {
        self.accounts
            .read()
            .expect("ledger lock poisoned")
            .get(&debtor_id)
            .cloned()
    }

    /// Returns true if the debtor is registered
    pub fn contains(&self, debtor_id: DebtorId) -> bool {
        self.accounts
            .read()
            .expect("ledger lock poisoned")
            .contains_key(&debtor_id)
    }
}

#[async_trait]
impl DebtorDirectory for BalanceLedger {
    async fn find_contact(&self, debtor_id: DebtorId) -> Option<DebtorContact> {
        self.accounts
            .read()
            .expect("ledger lock poisoned")
            .get(&debtor_id)
            .map(|account| DebtorContact {
                debtor_id: account.id,
                full_name: account.full_name.clone(),
                email: account.email.clone(),
                phone: account.phone.clone(),
                currency: account.loan_amount.currency(),
            })
    }
}
