//! Scripted collaborators for tests
//!
//! These stand in for the production adapters in `infra_gateway`. The
//! processor mock is programmable per session so tests can walk a link
//! through pending, paid, failed, and unavailable processor answers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use core_kernel::{
    CheckoutMetadata, CheckoutSession, CommunicationDispatcher, DebtorContact, DispatchOutcome,
    Money, NotificationPayload, PaymentProcessor, ProcessorError, PublicLinkId, SessionState,
    SessionStatus,
};

/// What the scripted processor answers for one session
#[derive(Debug, Clone)]
pub enum SessionScript {
    /// Always this status
    Always(SessionStatus),
    /// One answer per call, last one repeating
    Sequence(Vec<SessionStatus>),
    /// Timeout/network failure on every call
    Unavailable,
}

/// A payment processor whose session answers are scripted by the test
#[derive(Default)]
pub struct ScriptedProcessor {
    sessions: Mutex<HashMap<String, SessionScript>>,
    /// Link each created session carries in its metadata echo; sessions
    /// scripted by hand have no entry and echo nothing.
    session_links: Mutex<HashMap<String, PublicLinkId>>,
    calls: Mutex<HashMap<String, usize>>,
    created: AtomicUsize,
    /// When set, `create_checkout_session` fails as unavailable
    refuse_checkout: AtomicBool,
}

impl ScriptedProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the answer for a session id
    pub fn script(&self, session_id: impl Into<String>, script: SessionScript) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.into(), script);
    }

    /// Number of `get_session_state` calls made for a session
    pub fn status_calls(&self, session_id: &str) -> usize {
        self.calls.lock().unwrap().get(session_id).copied().unwrap_or(0)
    }

    /// Number of checkout sessions created
    pub fn sessions_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Makes checkout creation fail until cleared
    pub fn set_refuse_checkout(&self, refuse: bool) {
        self.refuse_checkout.store(refuse, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentProcessor for ScriptedProcessor {
    async fn create_checkout_session(
        &self,
        _amount: Money,
        metadata: &CheckoutMetadata,
    ) -> Result<CheckoutSession, ProcessorError> {
        if self.refuse_checkout.load(Ordering::SeqCst) {
            return Err(ProcessorError::Unavailable("scripted outage".to_string()));
        }

        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("cs_test_{n}");
        // New sessions start pending unless the test scripts otherwise
        self.sessions
            .lock()
            .unwrap()
            .entry(session_id.clone())
            .or_insert(SessionScript::Always(SessionStatus::Pending));
        self.session_links
            .lock()
            .unwrap()
            .insert(session_id.clone(), metadata.public_link_id);

        Ok(CheckoutSession {
            checkout_url: format!(
                "https://processor.test/checkout/{}?link={}",
                session_id, metadata.public_link_id
            ),
            session_id,
        })
    }

    async fn get_session_state(&self, session_id: &str) -> Result<SessionState, ProcessorError> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            let counter = calls.entry(session_id.to_string()).or_insert(0);
            *counter += 1;
            *counter - 1
        };

        let script = self
            .sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| ProcessorError::UnknownSession(session_id.to_string()))?;

        let status = match script {
            SessionScript::Always(status) => status,
            SessionScript::Sequence(statuses) => statuses
                .get(call_index)
                .or_else(|| statuses.last())
                .copied()
                .ok_or_else(|| ProcessorError::UnknownSession(session_id.to_string()))?,
            SessionScript::Unavailable => {
                return Err(ProcessorError::Unavailable("scripted timeout".to_string()))
            }
        };

        let public_link_id = self.session_links.lock().unwrap().get(session_id).copied();
        Ok(SessionState {
            status,
            public_link_id,
        })
    }
}

/// Records every dispatch; failure per channel is switchable
#[derive(Default)]
pub struct RecordingDispatcher {
    emails: Mutex<Vec<(DebtorContact, NotificationPayload)>>,
    sms: Mutex<Vec<(DebtorContact, NotificationPayload)>>,
    fail_email: AtomicBool,
    fail_sms: AtomicBool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_email(&self, fail: bool) {
        self.fail_email.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_sms(&self, fail: bool) {
        self.fail_sms.store(fail, Ordering::SeqCst);
    }

    pub fn emails_sent(&self) -> usize {
        self.emails.lock().unwrap().len()
    }

    pub fn sms_sent(&self) -> usize {
        self.sms.lock().unwrap().len()
    }

    /// Link URLs of all sent emails
    pub fn emailed_urls(&self) -> Vec<String> {
        self.emails
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| payload.link_url.clone())
            .collect()
    }
}

#[async_trait]
impl CommunicationDispatcher for RecordingDispatcher {
    async fn send_email(
        &self,
        contact: &DebtorContact,
        payload: &NotificationPayload,
    ) -> DispatchOutcome {
        if self.fail_email.load(Ordering::SeqCst) {
            return DispatchOutcome::Failed {
                reason: "scripted email failure".to_string(),
            };
        }
        if contact.email.is_none() {
            return DispatchOutcome::Skipped;
        }
        self.emails
            .lock()
            .unwrap()
            .push((contact.clone(), payload.clone()));
        DispatchOutcome::Sent
    }

    async fn send_sms(
        &self,
        contact: &DebtorContact,
        payload: &NotificationPayload,
    ) -> DispatchOutcome {
        if self.fail_sms.load(Ordering::SeqCst) {
            return DispatchOutcome::Failed {
                reason: "scripted sms failure".to_string(),
            };
        }
        if contact.phone.is_none() {
            return DispatchOutcome::Skipped;
        }
        self.sms
            .lock()
            .unwrap()
            .push((contact.clone(), payload.clone()));
        DispatchOutcome::Sent
    }
}
