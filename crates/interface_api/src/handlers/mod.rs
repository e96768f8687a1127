//! Request handlers

pub mod health;
pub mod links;
pub mod payments;
pub mod public_pay;
pub mod webhook;
