//! Test Utilities Crate
//!
//! Shared infrastructure for the debt-recovery test suite:
//!
//! - `fixtures`: funded ledgers and debtor accounts
//! - `mocks`: scripted collaborators (payment processor, communication
//!   dispatcher) implementing the core_kernel port traits

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
