//! Payment link domain errors

use thiserror::Error;

use core_kernel::ProcessorError;

/// Errors that can occur in the payment link domain
#[derive(Debug, Error)]
pub enum LinkError {
    /// Link not found by id or public token
    #[error("Payment link not found: {0}")]
    LinkNotFound(String),

    /// Bad input; fully local, never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// Attempted transition from a state that forbids it
    #[error("Invalid state transition from {from} to {attempted}")]
    InvalidState { from: String, attempted: String },

    /// The link is expired or cancelled and can no longer take a payment
    #[error("Link is not payable: {0}")]
    NotPayable(String),

    /// Checkout session creation failed on the processor side
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}
