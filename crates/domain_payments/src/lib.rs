//! Payment Records Domain
//!
//! Every payment attempt, whether staff-entered or settled through a
//! payment link, becomes a [`PaymentRecord`] in the append-only store.
//! Records are never deleted; rejected ones are retained with their
//! reason. A record leaves `PendingVerification` at most once, and each
//! `Verified` record corresponds to exactly one ledger application.
//!
//! # Lifecycle
//!
//! ```text
//! pending_verification -> verified   (staff approve, ledger applied)
//! pending_verification -> rejected   (staff reject, reason stored)
//! ```
//!
//! Link-channel records skip the pending state: reconciliation only
//! creates them once the processor has confirmed the money moved.

pub mod error;
pub mod record;
pub mod store;
pub mod verification;

pub use error::PaymentError;
pub use record::{PaymentChannel, PaymentRecord, VerificationStatus};
pub use store::{PaymentRecordStore, RecordFilter, RecordSummary};
pub use verification::{ManualVerification, VerificationAction};
