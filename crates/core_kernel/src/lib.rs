//! Core Kernel - Foundational types for the debt-recovery system
//!
//! This crate provides the building blocks shared by every domain module:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers
//! - Port traits for the external collaborators (payment processor,
//!   communication dispatcher, debtor directory)

pub mod identifiers;
pub mod money;
pub mod ports;

pub use identifiers::{DebtorId, PaymentLinkId, PaymentRecordId, PublicLinkId, StaffId};
pub use money::{Currency, Money, MoneyError};
pub use ports::{
    CheckoutMetadata, CheckoutSession, CommunicationDispatcher, DebtorContact, DebtorDirectory,
    DispatchOutcome, NotificationPayload, PaymentProcessor, ProcessorError, SessionState,
    SessionStatus,
};
