//! Payment record handlers (staff surface)

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use validator::Validate;

use core_kernel::{Currency, DebtorId, Money, PaymentRecordId, StaffId};
use domain_payments::{RecordFilter, RecordSummary, VerificationAction};

use crate::auth::{has_role, roles, Claims};
use crate::dto::payments::{
    ListPaymentsQuery, PaymentResponse, RecordManualPaymentRequest, VerifyAction,
    VerifyPaymentRequest,
};
use crate::error::ApiError;
use crate::AppState;

fn staff_id(claims: &Claims) -> Result<StaffId, ApiError> {
    claims.sub.parse().map_err(|_| ApiError::Unauthorized)
}

/// Records an offline payment for a debtor, pending verification
pub async fn record_manual_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(debtor_id): Path<DebtorId>,
    Json(request): Json<RecordManualPaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    staff_id(&claims)?;
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let amount = Money::new(request.amount, request.currency.unwrap_or(Currency::USD));
    let record = state.verification.submit_manual_payment(
        debtor_id,
        amount,
        &request.method,
        request.reference_number,
        request.payment_date.unwrap_or_else(Utc::now),
    )?;

    Ok(Json(record.into()))
}

/// Lists payment records, filterable by status, channel, and debtor
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let filter = RecordFilter {
        status: query.status,
        channel: query.channel,
        debtor_id: query.debtor_id,
    };
    let records = state
        .records
        .list(&filter)
        .into_iter()
        .map(PaymentResponse::from)
        .collect();
    Ok(Json(records))
}

/// Per-status counts for the payments dashboard
pub async fn payments_summary(
    State(state): State<AppState>,
) -> Result<Json<RecordSummary>, ApiError> {
    Ok(Json(state.records.summary()))
}

/// Approves or rejects a pending manual payment
///
/// Requires the accountant role; approval credits the ledger exactly
/// once, and a second decision for the same record conflicts.
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(payment_id): Path<PaymentRecordId>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    if !has_role(&claims, roles::ACCOUNTANT) {
        return Err(ApiError::Forbidden(
            "verification requires the accountant role".to_string(),
        ));
    }
    let staff = staff_id(&claims)?;

    let action = match request.action {
        VerifyAction::Approve => VerificationAction::Approve,
        VerifyAction::Reject => VerificationAction::Reject {
            reason: request.reason.unwrap_or_default(),
        },
    };

    let record = state.verification.decide(payment_id, staff, action)?;
    Ok(Json(record.into()))
}
