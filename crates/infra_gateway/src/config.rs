//! Gateway adapter configuration

use serde::Deserialize;

/// Connection settings for the hosted payment processor
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Base URL of the processor API, e.g. `https://api.processor.com`
    pub base_url: String,

    /// Secret API key, sent as a bearer token
    pub api_key: String,

    /// Absolute URL the debtor lands on after paying; the processor
    /// appends the session id as a query parameter
    pub success_url: String,

    /// Absolute URL for an abandoned checkout
    pub cancel_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

/// SMTP settings for email dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

fn default_smtp_port() -> u16 {
    587
}

/// HTTP SMS gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    pub api_url: String,
    pub auth_key: String,
    pub sender_id: String,
}
