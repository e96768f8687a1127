//! Pre-built test data

use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal::Decimal;

use core_kernel::{Currency, DebtorId, Money};
use domain_ledger::{BalanceLedger, DebtorAccount};

/// Shorthand for USD amounts in tests
pub fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

/// Registers a debtor with the given loan and a generated contact profile
pub fn funded_debtor(ledger: &BalanceLedger, loan: Money) -> DebtorId {
    let debtor_id = DebtorId::new();
    let name: String = Name().fake();
    let email: String = SafeEmail().fake();

    ledger
        .register(
            DebtorAccount::new(debtor_id, name, loan)
                .with_email(email)
                .with_phone("+15550100"),
        )
        .expect("fixture debtor registration failed");
    debtor_id
}

/// Registers a debtor with no contact details (dispatch skips both channels)
pub fn unreachable_debtor(ledger: &BalanceLedger, loan: Money) -> DebtorId {
    let debtor_id = DebtorId::new();
    let name: String = Name().fake();

    ledger
        .register(DebtorAccount::new(debtor_id, name, loan))
        .expect("fixture debtor registration failed");
    debtor_id
}
