use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::AuditRecord;
use super::domain::{
    BloodRequest, BloodType, DonationId, DonationRecord, DonationStatus, DonorId, DonorProfile,
    HospitalId, HospitalProfile, RequestId, StockLevel,
};

/// Half-open `[from, to)` timestamp window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from && instant < self.to
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonationFilter {
    pub donor: Option<DonorId>,
    pub request: Option<RequestId>,
    pub status: Option<DonationStatus>,
    pub created: Option<DateRange>,
}

impl DonationFilter {
    pub fn for_donor(donor: DonorId) -> Self {
        Self {
            donor: Some(donor),
            ..Self::default()
        }
    }

    pub fn for_request(request: RequestId) -> Self {
        Self {
            request: Some(request),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &DonationRecord) -> bool {
        self.donor.as_ref().map_or(true, |id| *id == record.donor_id)
            && self
                .request
                .as_ref()
                .map_or(true, |id| record.request_id.as_ref() == Some(id))
            && self.status.map_or(true, |status| status == record.status)
            && self
                .created
                .map_or(true, |range| range.contains(record.created_at))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub hospital: Option<HospitalId>,
    pub blood_type: Option<BloodType>,
    pub created: Option<DateRange>,
}

impl RequestFilter {
    pub fn matches(&self, request: &BloodRequest) -> bool {
        self.hospital
            .as_ref()
            .map_or(true, |id| *id == request.hospital_id)
            && self
                .blood_type
                .map_or(true, |blood_type| blood_type == request.blood_type)
            && self
                .created
                .map_or(true, |range| range.contains(request.created_at))
    }
}

/// Aggregate request outcomes for a hospital, refreshed after status transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalAnalytics {
    pub hospital_id: HospitalId,
    pub total_requests: u32,
    pub fulfilled_requests: u32,
    pub fulfillment_rate: f64,
}

/// Data-access seam so the engine can be exercised without a database.
pub trait DonationRepository: Send + Sync {
    /// Available donors with a blood type, optionally restricted to one type.
    fn available_donors(
        &self,
        blood_type: Option<BloodType>,
    ) -> Result<Vec<DonorProfile>, RepositoryError>;
    fn all_donors(&self) -> Result<Vec<DonorProfile>, RepositoryError>;
    fn donor(&self, id: &DonorId) -> Result<Option<DonorProfile>, RepositoryError>;
    fn hospital(&self, id: &HospitalId) -> Result<Option<HospitalProfile>, RepositoryError>;
    fn request(&self, id: &RequestId) -> Result<Option<BloodRequest>, RepositoryError>;
    fn donation(&self, id: &DonationId) -> Result<Option<DonationRecord>, RepositoryError>;
    fn donations(&self, filter: &DonationFilter) -> Result<Vec<DonationRecord>, RepositoryError>;
    fn requests(&self, filter: &RequestFilter) -> Result<Vec<BloodRequest>, RepositoryError>;
    fn stock(
        &self,
        hospital: &HospitalId,
        blood_type: BloodType,
    ) -> Result<Option<StockLevel>, RepositoryError>;

    fn insert_donation(&self, record: DonationRecord) -> Result<DonationRecord, RepositoryError>;
    fn update_donation(&self, record: DonationRecord) -> Result<(), RepositoryError>;
    fn update_request(&self, request: BloodRequest) -> Result<(), RepositoryError>;
    fn update_donor(&self, profile: DonorProfile) -> Result<(), RepositoryError>;
    fn save_hospital_analytics(&self, analytics: HospitalAnalytics) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Append-only sink for prediction audit records.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: AuditRecord) -> Result<(), AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit log unavailable: {0}")]
    Unavailable(String),
}
