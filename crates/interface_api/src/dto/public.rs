//! Public payment page DTOs
//!
//! These responses are unauthenticated; they expose only what the payment
//! page needs (no ledger balances, no staff fields).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::Money;
use domain_links::LinkStatus;

#[derive(Debug, Serialize)]
pub struct PublicLinkResponse {
    pub amount: Money,
    pub description: Option<String>,
    pub debtor_name: String,
    pub status: LinkStatus,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Default)]
pub struct VerifySuccessQuery {
    /// Session id from the processor redirect; overrides the stored one
    pub session_id: Option<String>,
}

/// Inbound processor webhook event
///
/// Only `checkout.session.completed` is acted on; everything else is
/// acknowledged and dropped.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Deserialize)]
pub struct WebhookObject {
    /// Checkout session id
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}
