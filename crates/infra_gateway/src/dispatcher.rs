//! Email and SMS dispatch adapters
//!
//! Dispatch is best-effort. Every failure is folded into a
//! `DispatchOutcome::Failed` carried back to the staff response; nothing
//! here returns an error to the caller.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;

use core_kernel::{CommunicationDispatcher, DebtorContact, DispatchOutcome, NotificationPayload};

use crate::config::{SmsConfig, SmtpConfig};

/// Sends payment link notifications over SMTP and an HTTP SMS gateway
///
/// Either channel may be disabled by leaving its config out; dispatch on
/// a disabled channel reports `Skipped`, same as a debtor without an
/// address for it.
pub struct GatewayDispatcher {
    smtp: Option<SmtpChannel>,
    sms: Option<SmsChannel>,
}

struct SmtpChannel {
    config: SmtpConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

struct SmsChannel {
    config: SmsConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SmsRequest<'a> {
    sender: &'a str,
    to: &'a str,
    message: String,
}

impl GatewayDispatcher {
    pub fn new(smtp: Option<SmtpConfig>, sms: Option<SmsConfig>) -> Result<Self, DispatchSetupError> {
        let smtp = match smtp {
            Some(config) => {
                let transport =
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                        .map_err(|e| DispatchSetupError::Smtp(e.to_string()))?
                        .port(config.port)
                        .credentials(Credentials::new(
                            config.user.clone(),
                            config.password.clone(),
                        ))
                        .build();
                Some(SmtpChannel { config, transport })
            }
            None => None,
        };
        let sms = sms.map(|config| SmsChannel {
            config,
            client: reqwest::Client::new(),
        });
        Ok(Self { smtp, sms })
    }
}

/// Configuration failure while building a dispatch channel
#[derive(Debug, thiserror::Error)]
pub enum DispatchSetupError {
    #[error("SMTP relay setup failed: {0}")]
    Smtp(String),
}

/// Plain-text email body for a payment link notification
fn email_body(contact: &DebtorContact, payload: &NotificationPayload) -> String {
    let description = payload
        .description
        .as_deref()
        .unwrap_or("your outstanding balance");
    format!(
        "Dear {name},\n\n\
         A secure payment link has been created for {description}.\n\n\
         Amount due: {amount}\n\
         Pay online: {url}\n\n\
         This link expires on {expires}.\n",
        name = contact.full_name,
        description = description,
        amount = payload.amount,
        url = payload.link_url,
        expires = payload.expires_at.format("%B %-d, %Y"),
    )
}

/// SMS body; kept short for single-segment delivery
fn sms_body(payload: &NotificationPayload) -> String {
    format!(
        "Payment of {} due. Pay securely: {} (expires {})",
        payload.amount,
        payload.link_url,
        payload.expires_at.format("%Y-%m-%d"),
    )
}

/// Strips formatting characters, keeping digits and a leading +
fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .enumerate()
        .filter(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '+'))
        .map(|(_, c)| c)
        .collect()
}

#[async_trait]
impl CommunicationDispatcher for GatewayDispatcher {
    async fn send_email(
        &self,
        contact: &DebtorContact,
        payload: &NotificationPayload,
    ) -> DispatchOutcome {
        let Some(channel) = &self.smtp else {
            return DispatchOutcome::Skipped;
        };
        let Some(to) = &contact.email else {
            return DispatchOutcome::Skipped;
        };

        let from: Mailbox = match format!(
            "{} <{}>",
            channel.config.from_name, channel.config.from_email
        )
        .parse()
        {
            Ok(mailbox) => mailbox,
            Err(e) => {
                return DispatchOutcome::Failed {
                    reason: format!("invalid sender address: {e}"),
                }
            }
        };
        let to_mailbox: Mailbox = match to.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                return DispatchOutcome::Failed {
                    reason: format!("invalid recipient address: {e}"),
                }
            }
        };

        let message = match Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(format!("Payment link - {} due", payload.amount))
            .header(ContentType::TEXT_PLAIN)
            .body(email_body(contact, payload))
        {
            Ok(message) => message,
            Err(e) => {
                return DispatchOutcome::Failed {
                    reason: format!("failed to build email: {e}"),
                }
            }
        };

        match channel.transport.send(message).await {
            Ok(_) => {
                tracing::info!(debtor_id = %contact.debtor_id, to = %to, "Payment link emailed");
                DispatchOutcome::Sent
            }
            Err(e) => {
                tracing::warn!(debtor_id = %contact.debtor_id, error = %e, "Email dispatch failed");
                DispatchOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn send_sms(
        &self,
        contact: &DebtorContact,
        payload: &NotificationPayload,
    ) -> DispatchOutcome {
        let Some(channel) = &self.sms else {
            return DispatchOutcome::Skipped;
        };
        let Some(phone) = &contact.phone else {
            return DispatchOutcome::Skipped;
        };

        let to = normalize_phone(phone);
        if to.is_empty() {
            return DispatchOutcome::Failed {
                reason: "phone number has no digits".to_string(),
            };
        }

        let request = SmsRequest {
            sender: &channel.config.sender_id,
            to: &to,
            message: sms_body(payload),
        };

        let response = channel
            .client
            .post(&channel.config.api_url)
            .header("authkey", &channel.config.auth_key)
            .json(&request)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                tracing::info!(debtor_id = %contact.debtor_id, "Payment link sent by SMS");
                DispatchOutcome::Sent
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(debtor_id = %contact.debtor_id, %status, "SMS gateway rejected dispatch");
                DispatchOutcome::Failed {
                    reason: format!("SMS gateway returned {status}: {body}"),
                }
            }
            Err(e) => {
                tracing::warn!(debtor_id = %contact.debtor_id, error = %e, "SMS dispatch failed");
                DispatchOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
