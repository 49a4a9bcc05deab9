use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{BloodRequest, BloodType, DonationRecord, DonationStatus, DonorId};

/// Donation records belonging to a single donor.
#[derive(Debug, Clone, Default)]
pub struct DonorHistory {
    donations: Vec<DonationRecord>,
}

impl DonorHistory {
    pub fn new(donations: Vec<DonationRecord>) -> Self {
        Self { donations }
    }

    /// Split a mixed record set into per-donor histories.
    pub fn group_by_donor(records: Vec<DonationRecord>) -> HashMap<DonorId, DonorHistory> {
        let mut grouped: HashMap<DonorId, DonorHistory> = HashMap::new();
        for record in records {
            grouped
                .entry(record.donor_id.clone())
                .or_default()
                .donations
                .push(record);
        }
        grouped
    }

    pub fn records(&self) -> &[DonationRecord] {
        &self.donations
    }

    fn completed(&self) -> impl Iterator<Item = &DonationRecord> {
        self.donations
            .iter()
            .filter(|record| record.status == DonationStatus::Completed)
    }

    pub fn completed_count(&self) -> u32 {
        self.completed().count() as u32
    }

    pub fn first_completed(&self) -> Option<NaiveDate> {
        self.completed().map(|record| record.donation_date).min()
    }

    pub fn last_completed(&self) -> Option<NaiveDate> {
        self.completed().map(|record| record.donation_date).max()
    }

    /// Responses of any status created at or after `cutoff`.
    pub fn responses_since(&self, cutoff: DateTime<Utc>) -> usize {
        self.donations
            .iter()
            .filter(|record| record.created_at >= cutoff)
            .count()
    }

    pub fn completed_on_or_after(&self, date: NaiveDate) -> bool {
        self.completed().any(|record| record.donation_date >= date)
    }
}

/// Snapshot of blood requests across all hospitals, used for response-rate ratios.
#[derive(Debug, Clone, Copy)]
pub struct RequestLedger<'a> {
    requests: &'a [BloodRequest],
}

impl<'a> RequestLedger<'a> {
    pub fn new(requests: &'a [BloodRequest]) -> Self {
        Self { requests }
    }

    pub fn count_since(&self, blood_type: BloodType, cutoff: DateTime<Utc>) -> usize {
        self.requests
            .iter()
            .filter(|request| request.blood_type == blood_type && request.created_at >= cutoff)
            .count()
    }
}
