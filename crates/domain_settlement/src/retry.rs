//! Bounded polling after the checkout redirect
//!
//! The redirect page cannot know when the processor finalizes a session,
//! so it polls [`ReconciliationService::confirm_completion`] on a fixed
//! cadence. The budget here mirrors the hosted payment page's behavior;
//! exhausting it is not an error, the payment may still land later via
//! the processor's push notification.

use std::time::Duration;

use core_kernel::PublicLinkId;

use crate::error::SettlementError;
use crate::reconciliation::{CompletionOutcome, ReconciliationService};

/// Attempt budget and cadence for redirect-side polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum confirmation attempts before giving up as `Pending`
    pub max_attempts: u32,
    /// Delay between attempts
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            interval: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

impl ReconciliationService {
    /// Repeatedly confirms until the link completes or the budget runs out
    ///
    /// Transient processor failures consume an attempt like any other
    /// inconclusive poll. Non-transient errors abort immediately: a link
    /// that is gone or unpayable will not become payable by waiting.
    /// Returns `Pending` when the budget exhausts without a completion.
    pub async fn poll_until_complete(
        &self,
        token: &PublicLinkId,
        session_override: Option<&str>,
        policy: RetryPolicy,
    ) -> Result<CompletionOutcome, SettlementError> {
        for attempt in 1..=policy.max_attempts {
            match self.confirm_completion(token, session_override).await {
                Ok(outcome @ CompletionOutcome::Completed { .. }) => return Ok(outcome),
                Ok(CompletionOutcome::Pending) => {
                    tracing::debug!(
                        %token,
                        attempt,
                        max_attempts = policy.max_attempts,
                        "Completion not yet confirmed"
                    );
                }
                Err(err) if err.is_transient() => {
                    tracing::warn!(
                        %token,
                        attempt,
                        error = %err,
                        "Transient processor failure while polling"
                    );
                }
                Err(err) => return Err(err),
            }
            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.interval).await;
            }
        }
        Ok(CompletionOutcome::Pending)
    }
}
