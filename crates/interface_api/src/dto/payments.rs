//! Payment record DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{Currency, DebtorId, Money, PaymentRecordId, StaffId};
use domain_payments::{PaymentChannel, PaymentRecord, VerificationStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct RecordManualPaymentRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[validate(length(min = 1, message = "payment method is required"))]
    pub method: String,
    pub reference_number: Option<String>,
    /// Defaults to now when staff backfill without a date
    pub payment_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerifyAction {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub action: VerifyAction,
    /// Required when the action is `reject`
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListPaymentsQuery {
    pub status: Option<VerificationStatus>,
    pub channel: Option<PaymentChannel>,
    pub debtor_id: Option<DebtorId>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: PaymentRecordId,
    pub debtor_id: DebtorId,
    pub amount: Money,
    pub channel: PaymentChannel,
    pub method: String,
    pub status: VerificationStatus,
    pub reference_number: Option<String>,
    pub payment_date: DateTime<Utc>,
    pub verified_by: Option<StaffId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(record: PaymentRecord) -> Self {
        Self {
            id: record.id,
            debtor_id: record.debtor_id,
            amount: record.amount,
            channel: record.channel,
            method: record.method,
            status: record.status,
            reference_number: record.reference_number,
            payment_date: record.payment_date,
            verified_by: record.verified_by,
            verified_at: record.verified_at,
            rejection_reason: record.rejection_reason,
            created_at: record.created_at,
        }
    }
}
