//! HTTP adapter for the hosted payment processor
//!
//! Speaks the checkout-session API: create a session, redirect the debtor
//! to its hosted page, and read the session's authoritative state back.
//! Timeouts and connection failures map to the transient
//! [`ProcessorError::Unavailable`] variant so the reconciliation layer
//! retries them instead of failing the link.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use core_kernel::{
    CheckoutMetadata, CheckoutSession, Money, PaymentProcessor, ProcessorError, PublicLinkId,
    SessionState, SessionStatus,
};

use crate::config::ProcessorConfig;

/// Production payment processor client
pub struct HttpPaymentProcessor {
    config: ProcessorConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    /// "paid" or "unpaid"
    #[serde(default)]
    payment_status: Option<String>,
    /// "open", "complete", or "expired"
    #[serde(default)]
    status: Option<String>,
    /// Echo of the key/value pairs attached at creation
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl SessionResponse {
    /// Link id echoed back in the session metadata, when parseable
    fn link_id(&self) -> Option<PublicLinkId> {
        self.metadata
            .get("public_link_id")
            .and_then(|raw| raw.parse().ok())
    }
}

impl HttpPaymentProcessor {
    pub fn new(config: ProcessorConfig) -> Result<Self, ProcessorError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProcessorError::Rejected(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn sessions_url(&self) -> String {
        format!(
            "{}/v1/checkout/sessions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

/// Maps the processor's two-field session state to ours
///
/// `payment_status` is authoritative for settlement; an expired session
/// that never settled is a failure the debtor can retry from a new
/// session.
fn map_session_state(payment_status: Option<&str>, status: Option<&str>) -> SessionStatus {
    match (payment_status, status) {
        (Some("paid"), _) => SessionStatus::Paid,
        (_, Some("expired")) => SessionStatus::Failed,
        _ => SessionStatus::Pending,
    }
}

fn map_transport_error(err: reqwest::Error) -> ProcessorError {
    if err.is_timeout() || err.is_connect() {
        ProcessorError::Unavailable(err.to_string())
    } else {
        ProcessorError::Rejected(err.to_string())
    }
}

async fn map_error_response(session_id: &str, response: reqwest::Response) -> ProcessorError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => ProcessorError::UnknownSession(session_id.to_string()),
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            ProcessorError::Unavailable(format!("processor returned {status}: {body}"))
        }
        _ => ProcessorError::Rejected(format!("processor returned {status}: {body}")),
    }
}

#[async_trait]
impl PaymentProcessor for HttpPaymentProcessor {
    async fn create_checkout_session(
        &self,
        amount: Money,
        metadata: &CheckoutMetadata,
    ) -> Result<CheckoutSession, ProcessorError> {
        let description = metadata
            .description
            .clone()
            .unwrap_or_else(|| "Debt recovery payment".to_string());

        // The processor takes form-encoded params with amounts in minor
        // units; metadata keys round-trip on the session for auditing.
        let params = [
            ("mode", "payment".to_string()),
            ("success_url", self.config.success_url.clone()),
            ("cancel_url", self.config.cancel_url.clone()),
            ("line_items[0][price_data][currency]", amount.currency().code().to_lowercase()),
            ("line_items[0][price_data][unit_amount]", amount.minor_units().to_string()),
            ("line_items[0][price_data][product_data][name]", description),
            ("line_items[0][quantity]", "1".to_string()),
            ("metadata[public_link_id]", metadata.public_link_id.to_string()),
            ("metadata[debtor_id]", metadata.debtor_id.to_string()),
        ];

        let response = self
            .client
            .post(self.sessions_url())
            .bearer_auth(&self.config.api_key)
            .form(&params)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(map_error_response("", response).await);
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| ProcessorError::Rejected(format!("malformed session response: {e}")))?;

        let checkout_url = session.url.ok_or_else(|| {
            ProcessorError::Rejected("session response missing checkout url".to_string())
        })?;

        tracing::info!(
            session_id = %session.id,
            link = %metadata.public_link_id,
            "Checkout session created"
        );

        Ok(CheckoutSession {
            session_id: session.id,
            checkout_url,
        })
    }

    async fn get_session_state(&self, session_id: &str) -> Result<SessionState, ProcessorError> {
        let url = format!("{}/{}", self.sessions_url(), session_id);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(map_error_response(session_id, response).await);
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| ProcessorError::Rejected(format!("malformed session response: {e}")))?;

        let status = map_session_state(session.payment_status.as_deref(), session.status.as_deref());
        Ok(SessionState {
            status,
            public_link_id: session.link_id(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paid_wins_regardless_of_session_status() {
        assert_eq!(
            map_session_state(Some("paid"), Some("complete")),
            SessionStatus::Paid
        );
        assert_eq!(
            map_session_state(Some("paid"), Some("expired")),
            SessionStatus::Paid
        );
    }

    #[test]
    fn test_metadata_link_id_round_trips() {
        let link = PublicLinkId::generate();
        let mut metadata = HashMap::new();
        metadata.insert("public_link_id".to_string(), link.to_string());
        let response = SessionResponse {
            id: "cs_1".to_string(),
            url: None,
            payment_status: None,
            status: None,
            metadata,
        };
        assert_eq!(response.link_id(), Some(link));

        let stripped = SessionResponse {
            id: "cs_2".to_string(),
            url: None,
            payment_status: None,
            status: None,
            metadata: HashMap::new(),
        };
        assert_eq!(stripped.link_id(), None);
    }

    #[test]
    fn test_expired_unpaid_session_is_failed() {
        assert_eq!(
            map_session_state(Some("unpaid"), Some("expired")),
            SessionStatus::Failed
        );
    }

    #[test]
    fn test_open_session_is_pending() {
        assert_eq!(
            map_session_state(Some("unpaid"), Some("open")),
            SessionStatus::Pending
        );
        assert_eq!(map_session_state(None, None), SessionStatus::Pending);
    }
}
