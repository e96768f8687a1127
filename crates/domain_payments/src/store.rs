//! Append-only payment record store

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use serde::Serialize;

use core_kernel::{Currency, DebtorId, Money, PaymentRecordId};

use crate::error::PaymentError;
use crate::record::{PaymentChannel, PaymentRecord, VerificationStatus};

/// Filter for record listings (staff screens)
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub status: Option<VerificationStatus>,
    pub channel: Option<PaymentChannel>,
    pub debtor_id: Option<DebtorId>,
}

impl RecordFilter {
    fn matches(&self, record: &PaymentRecord) -> bool {
        self.status.map_or(true, |s| record.status == s)
            && self.channel.map_or(true, |c| record.channel == c)
            && self.debtor_id.map_or(true, |d| record.debtor_id == d)
    }
}

/// Counts consumed by the payments dashboard
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RecordSummary {
    pub total_pending: usize,
    pub total_verified: usize,
    pub total_rejected: usize,
}

/// Holds every payment attempt ever made
///
/// Records are never removed once settled; the only removal path is the
/// reconciliation rollback of a record whose ledger application failed,
/// which must not leave an orphan behind. Reference numbers of verified
/// link records form a uniqueness set: inserting a second record with the
/// same processor transaction id fails instead of double-crediting.
#[derive(Debug, Default)]
pub struct PaymentRecordStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<PaymentRecordId, PaymentRecord>,
    link_references: HashSet<String>,
}

impl PaymentRecordStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a staff-entered record in `PendingVerification`
    ///
    /// Manual reference numbers are advisory; duplicates are allowed here
    /// because the actor is trusted staff, not an automated retrier.
    pub fn insert_manual(&self, record: PaymentRecord) -> Result<PaymentRecord, PaymentError> {
        if record.channel != PaymentChannel::Manual {
            return Err(PaymentError::Validation(
                "insert_manual accepts only manual-channel records".to_string(),
            ));
        }
        if !record.amount.is_positive() {
            return Err(PaymentError::Validation(format!(
                "payment amount must be positive, got {}",
                record.amount
            )));
        }

        let mut inner = self.inner.write().expect("record store lock poisoned");
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    /// Inserts a processor-confirmed, already-verified link record
    ///
    /// # Errors
    ///
    /// `DuplicateReference` if a verified record already carries this
    /// transaction id - the second confirmation of one processor
    /// transaction is rejected at creation rather than double-applied.
    pub fn insert_verified_link(
        &self,
        record: PaymentRecord,
    ) -> Result<PaymentRecord, PaymentError> {
        if record.channel != PaymentChannel::Link
            || record.status != VerificationStatus::Verified
        {
            return Err(PaymentError::Validation(
                "insert_verified_link accepts only verified link-channel records".to_string(),
            ));
        }
        let reference = record.reference_number.clone().ok_or_else(|| {
            PaymentError::Validation("link records require a processor transaction id".to_string())
        })?;

        let mut inner = self.inner.write().expect("record store lock poisoned");
        if !inner.link_references.insert(reference.clone()) {
            return Err(PaymentError::DuplicateReference(reference));
        }
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    /// Removes a record, releasing its reference number
    ///
    /// Only the reconciliation rollback path uses this, to undo a record
    /// whose ledger application failed before anything was committed.
    pub fn remove(&self, id: PaymentRecordId) -> Option<PaymentRecord> {
        let mut inner = self.inner.write().expect("record store lock poisoned");
        let record = inner.records.remove(&id)?;
        if let Some(reference) = &record.reference_number {
            if record.channel == PaymentChannel::Link {
                inner.link_references.remove(reference);
            }
        }
        Some(record)
    }

    /// Returns a copy of a record
    pub fn get(&self, id: PaymentRecordId) -> Option<PaymentRecord> {
        self.inner
            .read()
            .expect("record store lock poisoned")
            .records
            .get(&id)
            .cloned()
    }

    /// Lists records matching the filter, newest first
    pub fn list(&self, filter: &RecordFilter) -> Vec<PaymentRecord> {
        let inner = self.inner.read().expect("record store lock poisoned");
        let mut records: Vec<_> = inner
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Per-status counts for the dashboard
    pub fn summary(&self) -> RecordSummary {
        let inner = self.inner.read().expect("record store lock poisoned");
        let mut summary = RecordSummary {
            total_pending: 0,
            total_verified: 0,
            total_rejected: 0,
        };
        for record in inner.records.values() {
            match record.status {
                VerificationStatus::PendingVerification => summary.total_pending += 1,
                VerificationStatus::Verified => summary.total_verified += 1,
                VerificationStatus::Rejected => summary.total_rejected += 1,
            }
        }
        summary
    }

    /// Sum of verified amounts for one debtor, one entry per currency
    pub fn verified_total(&self, debtor_id: DebtorId) -> Vec<Money> {
        let inner = self.inner.read().expect("record store lock poisoned");
        let mut totals: BTreeMap<Currency, Money> = BTreeMap::new();
        for record in inner
            .records
            .values()
            .filter(|r| r.debtor_id == debtor_id && r.status == VerificationStatus::Verified)
        {
            totals
                .entry(record.amount.currency())
                .and_modify(|total| *total = *total + record.amount)
                .or_insert(record.amount);
        }
        totals.into_values().collect()
    }

    /// Runs a state transition on one record under the store lock
    ///
    /// The closure sees the live record; its status guard and any ledger
    /// call execute inside the same critical section, so a racing second
    /// decision observes the already-transitioned state and fails its
    /// pending check.
    pub(crate) fn transition<T>(
        &self,
        id: PaymentRecordId,
        f: impl FnOnce(&mut PaymentRecord) -> Result<T, PaymentError>,
    ) -> Result<T, PaymentError> {
        let mut inner = self.inner.write().expect("record store lock poisoned");
        let record = inner
            .records
            .get_mut(&id)
            .ok_or_else(|| PaymentError::RecordNotFound(id.to_string()))?;
        f(record)
    }
}
