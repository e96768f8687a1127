//! The completion reconciliation service

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use core_kernel::{PaymentProcessor, ProcessorError, PublicLinkId, SessionStatus};
use domain_ledger::BalanceLedger;
use domain_links::{LinkStatus, PaymentLinkManager};
use domain_payments::{PaymentRecord, PaymentRecordStore};

use crate::error::SettlementError;

/// Ceiling on one processor status call; a timeout counts as
/// "not yet complete", never as a terminal failure.
pub const DEFAULT_PROCESSOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one confirmation attempt
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// The payment settled - either just now or on an earlier
    /// confirmation (the idempotent short-circuit returns the same record)
    Completed { record: PaymentRecord },
    /// Expected steady state during the polling window: the processor has
    /// not (yet) confirmed the session, or the session failed and the
    /// debtor may retry checkout. Not an error.
    Pending,
}

impl CompletionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CompletionOutcome::Completed { .. })
    }
}

/// Reconciles processor confirmations with records, ledger, and links
///
/// Both entry points - the webhook push and the redirect-poll pull - call
/// [`confirm_completion`](Self::confirm_completion). The whole check-then-
/// commit runs while holding the link's own mutex, so a second caller for
/// the same link waits, re-reads `Completed`, and takes the idempotent
/// path. There is no global lock; unrelated links settle concurrently.
pub struct ReconciliationService {
    links: Arc<PaymentLinkManager>,
    records: Arc<PaymentRecordStore>,
    ledger: Arc<BalanceLedger>,
    processor: Arc<dyn PaymentProcessor>,
    processor_timeout: Duration,
}

impl ReconciliationService {
    pub fn new(
        links: Arc<PaymentLinkManager>,
        records: Arc<PaymentRecordStore>,
        ledger: Arc<BalanceLedger>,
        processor: Arc<dyn PaymentProcessor>,
    ) -> Self {
        Self {
            links,
            records,
            ledger,
            processor,
            processor_timeout: DEFAULT_PROCESSOR_TIMEOUT,
        }
    }

    /// Overrides the per-call processor timeout
    pub fn with_processor_timeout(mut self, timeout: Duration) -> Self {
        self.processor_timeout = timeout;
        self
    }

    /// Confirms whether the link's payment completed, crediting it if so
    ///
    /// The algorithm, executed under the link's lock:
    ///
    /// 1. unknown token fails with `LinkNotFound`
    /// 2. `Completed` short-circuits to the existing record
    /// 3. `Expired`/`Cancelled` (or an overdue unswept link) fails with
    ///    `LinkNotPayable`
    /// 4. otherwise the processor is asked for the session's real state -
    ///    the caller's assertion is never trusted, and a session whose
    ///    metadata names a different link is ignored as `Pending`
    /// 5. on `Paid`: record + ledger + link transition commit together;
    ///    the session id is the record's reference number, so a replay
    ///    for the same session fails the uniqueness check instead of
    ///    double-crediting
    /// 6. on `Pending`: returns `Pending` without error
    /// 7. on `Failed`: the link stays active (the debtor may retry
    ///    checkout) and the outcome is `Pending`
    ///
    /// `session_override` comes from the redirect query string or webhook
    /// payload; when absent the link's stored session id is used. A link
    /// with no session at all cannot be complete yet.
    pub async fn confirm_completion(
        &self,
        token: &PublicLinkId,
        session_override: Option<&str>,
    ) -> Result<CompletionOutcome, SettlementError> {
        let entry = self
            .links
            .entry_by_token(token)
            .ok_or_else(|| SettlementError::LinkNotFound(token.to_string()))?;
        let mut link = entry.lock().await;

        match link.status {
            LinkStatus::Completed => {
                let record_id = link.completed_payment_record_id.ok_or_else(|| {
                    SettlementError::Payment(domain_payments::PaymentError::RecordNotFound(
                        format!("completed link {token} has no record"),
                    ))
                })?;
                let record = self.records.get(record_id).ok_or_else(|| {
                    SettlementError::Payment(domain_payments::PaymentError::RecordNotFound(
                        record_id.to_string(),
                    ))
                })?;
                return Ok(CompletionOutcome::Completed { record });
            }
            LinkStatus::Expired | LinkStatus::Cancelled => {
                tracing::warn!(
                    link_id = %link.id,
                    status = ?link.status,
                    "Confirmation arrived for a terminal link; rejected"
                );
                return Err(SettlementError::LinkNotPayable(format!(
                    "link {} is {:?}",
                    token, link.status
                )));
            }
            LinkStatus::Active => {}
        }

        // Active but past its deadline: refuse without transitioning; the
        // sweep owns the expired state.
        if link.is_overdue_at(Utc::now()) {
            tracing::warn!(link_id = %link.id, "Confirmation arrived past link expiry; rejected");
            return Err(SettlementError::LinkNotPayable(format!(
                "link {token} expired at {}",
                link.expires_at
            )));
        }

        let session_id = match session_override.map(str::to_owned).or_else(|| link.external_session_id.clone()) {
            Some(session_id) => session_id,
            // Checkout never started; nothing to verify.
            None => return Ok(CompletionOutcome::Pending),
        };

        let state = match tokio::time::timeout(
            self.processor_timeout,
            self.processor.get_session_state(&session_id),
        )
        .await
        {
            Err(_elapsed) => {
                return Err(SettlementError::ProcessorUnavailable(format!(
                    "session status check timed out after {:?}",
                    self.processor_timeout
                )))
            }
            Ok(Err(err)) if err.is_transient() => {
                return Err(SettlementError::ProcessorUnavailable(err.to_string()))
            }
            Ok(Err(err @ ProcessorError::UnknownSession(_))) => {
                // A session the processor forgot can never confirm; keep
                // the link payable and let the debtor start over.
                tracing::warn!(link_id = %link.id, error = %err, "Processor does not know session");
                return Ok(CompletionOutcome::Pending);
            }
            Ok(Err(err)) => {
                tracing::warn!(link_id = %link.id, error = %err, "Processor refused status check");
                return Ok(CompletionOutcome::Pending);
            }
            Ok(Ok(state)) => state,
        };

        // A session opened for another link must not settle this one,
        // whatever its status. Caller-supplied session ids make this
        // reachable from the public poll endpoint.
        if let Some(session_link) = state.public_link_id {
            if session_link != link.public_link_id {
                tracing::warn!(
                    link_id = %link.id,
                    session_id = %session_id,
                    session_link = %session_link,
                    "Session belongs to a different link; ignored"
                );
                return Ok(CompletionOutcome::Pending);
            }
        }

        match state.status {
            SessionStatus::Paid => {
                let record = self
                    .records
                    .insert_verified_link(PaymentRecord::link_settled(
                        link.debtor_id,
                        link.amount,
                        session_id.clone(),
                    ))?;

                if let Err(err) = self.ledger.apply_payment(link.debtor_id, link.amount) {
                    // Roll the record back so no orphan survives; the
                    // link stays active and untouched.
                    self.records.remove(record.id);
                    return Err(err.into());
                }

                link.complete(record.id)?;

                tracing::info!(
                    link_id = %link.id,
                    payment_id = %record.id,
                    session_id = %session_id,
                    amount = %record.amount,
                    "Payment link settled"
                );
                Ok(CompletionOutcome::Completed { record })
            }
            SessionStatus::Pending => Ok(CompletionOutcome::Pending),
            SessionStatus::Failed => {
                tracing::info!(
                    link_id = %link.id,
                    session_id = %session_id,
                    "Checkout session failed; link remains payable"
                );
                Ok(CompletionOutcome::Pending)
            }
        }
    }
}
