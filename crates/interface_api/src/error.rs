//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain_ledger::LedgerError;
use domain_links::LinkError;
use domain_payments::PaymentError;
use domain_settlement::SettlementError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid state transition or duplicate reference
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The link is terminal or past its expiry
    #[error("Gone: {0}")]
    Gone(String),

    /// Transient upstream failure; the client retries
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Gone(msg) => (StatusCode::GONE, "link_not_payable", msg.clone()),
            ApiError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "processor_unavailable",
                msg.clone(),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
            ApiError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::RecordNotFound(msg) => ApiError::NotFound(msg),
            PaymentError::Validation(msg) => ApiError::Validation(msg),
            PaymentError::InvalidState { .. } => ApiError::Conflict(err.to_string()),
            PaymentError::DuplicateReference(_) => ApiError::Conflict(err.to_string()),
            PaymentError::Ledger(inner) => inner.into(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DebtorNotFound(msg) => ApiError::NotFound(msg),
            LedgerError::DebtorAlreadyRegistered(_) => ApiError::Conflict(err.to_string()),
            LedgerError::InvalidAmount(msg) => ApiError::Validation(msg),
            LedgerError::Money(_) => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<LinkError> for ApiError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::LinkNotFound(msg) => ApiError::NotFound(msg),
            LinkError::Validation(msg) => ApiError::Validation(msg),
            LinkError::InvalidState { .. } => ApiError::Conflict(err.to_string()),
            LinkError::NotPayable(msg) => ApiError::Gone(msg),
            LinkError::Processor(inner) => {
                if inner.is_transient() {
                    ApiError::Unavailable(inner.to_string())
                } else {
                    ApiError::BadRequest(inner.to_string())
                }
            }
        }
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::LinkNotFound(msg) => ApiError::NotFound(msg),
            SettlementError::LinkNotPayable(msg) => ApiError::Gone(msg),
            SettlementError::ProcessorUnavailable(msg) => ApiError::Unavailable(msg),
            SettlementError::Payment(inner) => inner.into(),
            SettlementError::Ledger(inner) => inner.into(),
            SettlementError::Link(inner) => inner.into(),
        }
    }
}
