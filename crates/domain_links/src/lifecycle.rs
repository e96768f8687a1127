//! Payment link lifecycle manager

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use core_kernel::{
    CheckoutMetadata, CheckoutSession, CommunicationDispatcher, Currency, DebtorDirectory,
    DebtorId, DispatchOutcome, Money, NotificationPayload, PaymentLinkId, PaymentProcessor,
    PublicLinkId, StaffId,
};

use crate::error::LinkError;
use crate::link::{LinkStatus, PaymentLink};

/// Allowed expiry window for new links, in days
pub const EXPIRY_RANGE_DAYS: std::ops::RangeInclusive<i64> = 1..=365;

/// Handle to one link and its serialization scope
///
/// Whoever holds the mutex owns every status transition and counter
/// update for that link; the reconciliation service performs its
/// check-then-commit inside the same lock.
pub type LinkEntry = Arc<Mutex<PaymentLink>>;

/// A staff request to create links for a batch of debtors
///
/// Each debtor gets its own link record (link:debtor is 1:1); the batch
/// only shares the amount, description, and expiry.
#[derive(Debug, Clone)]
pub struct CreateLinksRequest {
    pub debtor_ids: Vec<DebtorId>,
    pub amount: Money,
    pub description: Option<String>,
    pub expires_in_days: i64,
    pub notify_email: bool,
    pub notify_sms: bool,
}

/// One created link plus the dispatch outcome per requested channel
#[derive(Debug, Clone, Serialize)]
pub struct LinkCreation {
    pub link: PaymentLink,
    pub email: DispatchOutcome,
    pub sms: DispatchOutcome,
}

/// Filter for staff link listings
#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    pub status: Option<LinkStatus>,
    pub debtor_id: Option<DebtorId>,
}

/// Per-link analytics for the staff screen
#[derive(Debug, Clone, Serialize)]
pub struct LinkAnalytics {
    pub link_id: PaymentLinkId,
    pub status: LinkStatus,
    pub view_count: u64,
    pub click_count: u64,
    pub days_until_expiry: i64,
    pub completed_payment_record_id: Option<core_kernel::PaymentRecordId>,
}

/// Aggregate counts over all links
#[derive(Debug, Clone, Serialize)]
pub struct LinkSummary {
    pub active: usize,
    pub completed: usize,
    pub expired: usize,
    pub cancelled: usize,
    /// Sum of completed link amounts, one entry per currency
    pub total_collected: Vec<Money>,
}

/// Creates, tracks, and retires payment links
///
/// Links are held behind per-link async mutexes; the maps themselves are
/// only touched briefly under a std lock (never across an await).
pub struct PaymentLinkManager {
    links: RwLock<HashMap<PaymentLinkId, LinkEntry>>,
    by_token: RwLock<HashMap<PublicLinkId, PaymentLinkId>>,
    directory: Arc<dyn DebtorDirectory>,
    dispatcher: Arc<dyn CommunicationDispatcher>,
    processor: Arc<dyn PaymentProcessor>,
    /// Base URL the public payment page lives under, e.g. `https://pay.example.com`
    public_base_url: String,
}

impl PaymentLinkManager {
    pub fn new(
        directory: Arc<dyn DebtorDirectory>,
        dispatcher: Arc<dyn CommunicationDispatcher>,
        processor: Arc<dyn PaymentProcessor>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            links: RwLock::new(HashMap::new()),
            by_token: RwLock::new(HashMap::new()),
            directory,
            dispatcher,
            processor,
            public_base_url: public_base_url.into(),
        }
    }

    /// The public payment URL for a link token
    pub fn payment_url(&self, token: &PublicLinkId) -> String {
        format!("{}/pay/{}", self.public_base_url.trim_end_matches('/'), token)
    }

    /// Creates one link per debtor and dispatches the requested
    /// notifications
    ///
    /// Dispatch is best-effort: a failed email or SMS is reported in the
    /// per-debtor outcome and never rolls back the created link.
    ///
    /// # Errors
    ///
    /// `Validation` if the amount is not positive, the debtor set is
    /// empty, the expiry is outside 1..=365 days, any debtor is unknown
    /// to the directory, or the amount's currency differs from a
    /// debtor's balance currency. Validation runs before any link is
    /// created, so a failed request creates nothing.
    pub async fn create_links(
        &self,
        request: CreateLinksRequest,
        created_by: StaffId,
    ) -> Result<Vec<LinkCreation>, LinkError> {
        if request.debtor_ids.is_empty() {
            return Err(LinkError::Validation(
                "at least one debtor is required".to_string(),
            ));
        }
        if !request.amount.is_positive() {
            return Err(LinkError::Validation(format!(
                "link amount must be positive, got {}",
                request.amount
            )));
        }
        if !EXPIRY_RANGE_DAYS.contains(&request.expires_in_days) {
            return Err(LinkError::Validation(format!(
                "expires_in_days must be within {:?}, got {}",
                EXPIRY_RANGE_DAYS, request.expires_in_days
            )));
        }

        let mut contacts = Vec::with_capacity(request.debtor_ids.len());
        for debtor_id in &request.debtor_ids {
            match self.directory.find_contact(*debtor_id).await {
                Some(contact) => {
                    // A link the ledger cannot credit must never reach
                    // the debtor.
                    if contact.currency != request.amount.currency() {
                        return Err(LinkError::Validation(format!(
                            "debtor {} balance is in {}, link amount is in {}",
                            debtor_id,
                            contact.currency,
                            request.amount.currency()
                        )));
                    }
                    contacts.push(contact);
                }
                None => {
                    return Err(LinkError::Validation(format!(
                        "unknown debtor: {debtor_id}"
                    )))
                }
            }
        }

        let expires_at = Utc::now() + Duration::days(request.expires_in_days);
        let mut creations = Vec::with_capacity(contacts.len());

        for contact in contacts {
            let link = PaymentLink::new(
                contact.debtor_id,
                request.amount,
                request.description.clone(),
                expires_at,
                created_by,
            );
            let snapshot = link.clone();
            self.insert(link);

            let payload = NotificationPayload {
                amount: request.amount,
                description: request.description.clone(),
                link_url: self.payment_url(&snapshot.public_link_id),
                expires_at,
            };

            let email = if request.notify_email {
                self.dispatcher.send_email(&contact, &payload).await
            } else {
                DispatchOutcome::Skipped
            };
            let sms = if request.notify_sms {
                self.dispatcher.send_sms(&contact, &payload).await
            } else {
                DispatchOutcome::Skipped
            };

            tracing::info!(
                link_id = %snapshot.id,
                debtor_id = %contact.debtor_id,
                amount = %request.amount,
                email = ?email,
                sms = ?sms,
                "Payment link created"
            );

            creations.push(LinkCreation {
                link: snapshot,
                email,
                sms,
            });
        }

        Ok(creations)
    }

    fn insert(&self, link: PaymentLink) {
        let id = link.id;
        let token = link.public_link_id;
        self.links
            .write()
            .expect("link map lock poisoned")
            .insert(id, Arc::new(Mutex::new(link)));
        self.by_token
            .write()
            .expect("token map lock poisoned")
            .insert(token, id);
    }

    /// Looks up the serialization handle for a link by its public token
    pub fn entry_by_token(&self, token: &PublicLinkId) -> Option<LinkEntry> {
        let id = *self
            .by_token
            .read()
            .expect("token map lock poisoned")
            .get(token)?;
        self.entry(id)
    }

    /// Looks up the serialization handle for a link by id
    pub fn entry(&self, id: PaymentLinkId) -> Option<LinkEntry> {
        self.links
            .read()
            .expect("link map lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Snapshot of a link for the public payment page
    pub async fn get_by_token(&self, token: &PublicLinkId) -> Option<PaymentLink> {
        let entry = self.entry_by_token(token)?;
        let link = entry.lock().await;
        Some(link.clone())
    }

    /// Counts a payment-page view
    ///
    /// No-op (not an error) on expired or terminal links: instrumentation
    /// never blocks access to the payment UI.
    pub async fn record_view(&self, token: &PublicLinkId) -> Result<(), LinkError> {
        self.bump(token, |link| &mut link.view_count).await
    }

    /// Counts a checkout click
    pub async fn record_click(&self, token: &PublicLinkId) -> Result<(), LinkError> {
        self.bump(token, |link| &mut link.click_count).await
    }

    async fn bump(
        &self,
        token: &PublicLinkId,
        counter: impl FnOnce(&mut PaymentLink) -> &mut u64,
    ) -> Result<(), LinkError> {
        let entry = self
            .entry_by_token(token)
            .ok_or_else(|| LinkError::LinkNotFound(token.to_string()))?;
        let mut link = entry.lock().await;
        if link.is_payable_at(Utc::now()) {
            *counter(&mut link) += 1;
        }
        Ok(())
    }

    /// Opens a checkout session on the processor for an active link
    ///
    /// Stores the session id on the link (replacing any abandoned one)
    /// and counts the click. The lock is held across the processor call
    /// so a concurrent completion or sweep cannot interleave.
    ///
    /// # Errors
    ///
    /// - `LinkNotFound` for an unknown token
    /// - `NotPayable` if the link is terminal or past its expiry
    /// - `Processor` if session creation fails
    pub async fn start_checkout(&self, token: &PublicLinkId) -> Result<CheckoutSession, LinkError> {
        let entry = self
            .entry_by_token(token)
            .ok_or_else(|| LinkError::LinkNotFound(token.to_string()))?;
        let mut link = entry.lock().await;

        if !link.is_payable_at(Utc::now()) {
            return Err(LinkError::NotPayable(format!(
                "link {} is {:?}",
                token, link.status
            )));
        }

        let metadata = CheckoutMetadata {
            public_link_id: link.public_link_id,
            debtor_id: link.debtor_id,
            description: link.description.clone(),
        };
        let session = self
            .processor
            .create_checkout_session(link.amount, &metadata)
            .await?;

        link.attach_session(session.session_id.clone());
        link.click_count += 1;

        tracing::info!(
            link_id = %link.id,
            session_id = %session.session_id,
            "Checkout session opened"
        );
        Ok(session)
    }

    /// Retires every active link whose deadline has passed
    ///
    /// Idempotent: already-terminal links are skipped, and because the
    /// per-link lock is taken before the status re-check, a link that
    /// completed since the sweep started is left alone - completion wins.
    ///
    /// Returns how many links were transitioned.
    pub async fn expire_overdue_links(&self, now: DateTime<Utc>) -> usize {
        let entries: Vec<LinkEntry> = {
            let links = self.links.read().expect("link map lock poisoned");
            links.values().cloned().collect()
        };

        let mut expired = 0;
        for entry in entries {
            let mut link = entry.lock().await;
            if link.status == LinkStatus::Active && link.is_overdue_at(now) {
                // Guarded transition; status was re-read under the lock
                if link.expire().is_ok() {
                    expired += 1;
                    tracing::info!(link_id = %link.id, "Payment link expired");
                }
            }
        }
        expired
    }

    /// Staff cancellation of an active link
    ///
    /// # Errors
    ///
    /// - `LinkNotFound` for an unknown id
    /// - `InvalidState` if the link already left `Active`
    pub async fn cancel(&self, id: PaymentLinkId) -> Result<PaymentLink, LinkError> {
        let entry = self
            .entry(id)
            .ok_or_else(|| LinkError::LinkNotFound(id.to_string()))?;
        let mut link = entry.lock().await;
        link.cancel()?;
        tracing::info!(link_id = %id, "Payment link cancelled");
        Ok(link.clone())
    }

    /// Lists link snapshots matching the filter, newest first
    pub async fn list(&self, filter: &LinkFilter) -> Vec<PaymentLink> {
        let entries: Vec<LinkEntry> = {
            let links = self.links.read().expect("link map lock poisoned");
            links.values().cloned().collect()
        };

        let mut snapshots = Vec::new();
        for entry in entries {
            let link = entry.lock().await;
            let matches = filter.status.map_or(true, |s| link.status == s)
                && filter.debtor_id.map_or(true, |d| link.debtor_id == d);
            if matches {
                snapshots.push(link.clone());
            }
        }
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snapshots
    }

    /// Analytics for one link
    pub async fn analytics(&self, id: PaymentLinkId) -> Result<LinkAnalytics, LinkError> {
        let entry = self
            .entry(id)
            .ok_or_else(|| LinkError::LinkNotFound(id.to_string()))?;
        let link = entry.lock().await;
        Ok(LinkAnalytics {
            link_id: link.id,
            status: link.status,
            view_count: link.view_count,
            click_count: link.click_count,
            days_until_expiry: (link.expires_at - Utc::now()).num_days(),
            completed_payment_record_id: link.completed_payment_record_id,
        })
    }

    /// Aggregate counts across all links
    pub async fn summary(&self) -> LinkSummary {
        let entries: Vec<LinkEntry> = {
            let links = self.links.read().expect("link map lock poisoned");
            links.values().cloned().collect()
        };

        let mut summary = LinkSummary {
            active: 0,
            completed: 0,
            expired: 0,
            cancelled: 0,
            total_collected: Vec::new(),
        };
        // Totals never cross currencies; links of different currencies
        // get separate entries.
        let mut collected: BTreeMap<Currency, Money> = BTreeMap::new();
        for entry in entries {
            let link = entry.lock().await;
            match link.status {
                LinkStatus::Active => summary.active += 1,
                LinkStatus::Completed => {
                    summary.completed += 1;
                    collected
                        .entry(link.amount.currency())
                        .and_modify(|total| *total = *total + link.amount)
                        .or_insert(link.amount);
                }
                LinkStatus::Expired => summary.expired += 1,
                LinkStatus::Cancelled => summary.cancelled += 1,
            }
        }
        summary.total_collected = collected.into_values().collect();
        summary
    }
}
