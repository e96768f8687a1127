//! Completion Reconciliation Domain
//!
//! Bridges an externally-observed fact - "the processor says the debtor
//! paid" - with this system's authoritative state. Two triggers feed one
//! idempotent function: the processor's push notification, and the
//! debtor's browser polling after the checkout redirect. Either way,
//! [`ReconciliationService::confirm_completion`] verifies the session
//! directly with the processor and commits the payment record, the ledger
//! application, and the link's terminal transition as one step under the
//! link's own lock. Money is credited exactly once, no matter how many
//! confirmations race in.

pub mod error;
pub mod reconciliation;
pub mod retry;

pub use error::SettlementError;
pub use reconciliation::{CompletionOutcome, ReconciliationService, DEFAULT_PROCESSOR_TIMEOUT};
pub use retry::RetryPolicy;
