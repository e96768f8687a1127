//! Request/response data transfer objects

pub mod links;
pub mod payments;
pub mod public;
