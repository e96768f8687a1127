//! Payment link DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{
    Currency, DebtorId, DispatchOutcome, Money, PaymentLinkId, PublicLinkId,
};
use domain_links::{LinkCreation, LinkStatus, PaymentLink};

fn default_expires_in_days() -> i64 {
    7
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateLinksRequest {
    #[validate(length(min = 1, message = "at least one debtor is required"))]
    pub debtor_ids: Vec<DebtorId>,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<Currency>,
    pub description: Option<String>,
    #[serde(default = "default_expires_in_days")]
    #[validate(range(min = 1, max = 365, message = "expiry must be 1 to 365 days"))]
    pub expires_in_days: i64,
    #[serde(default = "default_true")]
    pub send_email: bool,
    #[serde(default)]
    pub send_sms: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListLinksQuery {
    pub status: Option<LinkStatus>,
    pub debtor_id: Option<DebtorId>,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub id: PaymentLinkId,
    pub public_link_id: PublicLinkId,
    pub payment_url: String,
    pub debtor_id: DebtorId,
    pub amount: Money,
    pub description: Option<String>,
    pub status: LinkStatus,
    pub expires_at: DateTime<Utc>,
    pub view_count: u64,
    pub click_count: u64,
    pub created_at: DateTime<Utc>,
}

impl LinkResponse {
    pub fn from_link(link: PaymentLink, payment_url: String) -> Self {
        Self {
            id: link.id,
            public_link_id: link.public_link_id,
            payment_url,
            debtor_id: link.debtor_id,
            amount: link.amount,
            description: link.description,
            status: link.status,
            expires_at: link.expires_at,
            view_count: link.view_count,
            click_count: link.click_count,
            created_at: link.created_at,
        }
    }
}

/// One created link with its per-channel dispatch outcomes
#[derive(Debug, Serialize)]
pub struct LinkCreationResponse {
    #[serde(flatten)]
    pub link: LinkResponse,
    pub email: DispatchOutcome,
    pub sms: DispatchOutcome,
}

impl LinkCreationResponse {
    pub fn from_creation(creation: LinkCreation, payment_url: String) -> Self {
        Self {
            link: LinkResponse::from_link(creation.link, payment_url),
            email: creation.email,
            sms: creation.sms,
        }
    }
}
