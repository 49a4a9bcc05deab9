use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::analytics::activity::{DonorHistory, RequestLedger};
use crate::analytics::audit::AuditRecord;
use crate::analytics::domain::{
    BloodRequest, BloodType, DonationId, DonationRecord, DonationStatus, DonorId, DonorProfile,
    Gender, HospitalId, HospitalProfile, PersonalDetails, RequestId, RequestStatus, StockLevel,
    Urgency,
};
use crate::analytics::repository::{
    AuditError, AuditSink, DonationFilter, DonationRepository, HospitalAnalytics,
    RepositoryError, RequestFilter,
};
use crate::analytics::{analytics_router, DonorAnalyticsService, EngineConfig};

pub(super) fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn days_ago(days: i64) -> DateTime<Utc> {
    as_of() - Duration::days(days)
}

pub(super) fn date_days_ago(days: i64) -> NaiveDate {
    days_ago(days).date_naive()
}

pub(super) fn hospital() -> HospitalProfile {
    HospitalProfile {
        id: HospitalId("hos-1".to_string()),
        name: "Sassoon General".to_string(),
        city: "Pune".to_string(),
        state: "Maharashtra".to_string(),
    }
}

pub(super) fn details(city: &str, state: &str) -> PersonalDetails {
    PersonalDetails {
        gender: Some(Gender::Female),
        date_of_birth: NaiveDate::from_ymd_opt(1992, 3, 14),
        weight_kg: Some(64),
        contact_number: Some("5550100".to_string()),
        address: Some("4 Ring Road".to_string()),
        city: Some(city.to_string()),
        state: Some(state.to_string()),
        pincode: Some("411001".to_string()),
    }
}

pub(super) fn donor(id: &str, blood_type: BloodType, city: &str, state: &str) -> DonorProfile {
    DonorProfile::new(DonorId(id.to_string()), format!("Donor {id}"))
        .with_blood_type(blood_type)
        .with_details(details(city, state))
}

pub(super) fn request(
    id: &str,
    blood_type: BloodType,
    units_required: u8,
    urgency: Urgency,
    created_days_ago: i64,
) -> BloodRequest {
    BloodRequest {
        id: RequestId(id.to_string()),
        hospital_id: hospital().id,
        blood_type,
        units_required,
        urgency,
        is_active: true,
        expires_on: as_of() + Duration::days(3),
        created_at: days_ago(created_days_ago),
        fulfillment_percentage: 0.0,
        status: RequestStatus::Pending,
    }
}

pub(super) fn donation(
    id: &str,
    donor: &str,
    request: Option<&str>,
    status: DonationStatus,
    units: u16,
    days: i64,
) -> DonationRecord {
    DonationRecord {
        id: DonationId(id.to_string()),
        donor_id: DonorId(donor.to_string()),
        request_id: request.map(|r| RequestId(r.to_string())),
        status,
        units,
        donation_date: date_days_ago(days),
        created_at: days_ago(days),
    }
}

/// Completed donations every `spacing` days, the newest `newest` days ago.
pub(super) fn completed_series(donor: &str, count: usize, newest: i64, spacing: i64) -> Vec<DonationRecord> {
    (0..count)
        .map(|i| {
            donation(
                &format!("{donor}-c{i}"),
                donor,
                None,
                DonationStatus::Completed,
                1,
                newest + spacing * i as i64,
            )
        })
        .collect()
}

/// `count` requests of one type created within the last `count` days.
pub(super) fn request_series(prefix: &str, blood_type: BloodType, count: usize) -> Vec<BloodRequest> {
    (0..count)
        .map(|i| request(&format!("{prefix}-{i}"), blood_type, 1, Urgency::Normal, i as i64 + 1))
        .collect()
}

pub(super) fn history(records: Vec<DonationRecord>) -> DonorHistory {
    DonorHistory::new(records)
}

pub(super) fn ledger(requests: &[BloodRequest]) -> RequestLedger<'_> {
    RequestLedger::new(requests)
}

#[derive(Default)]
pub(super) struct MemoryState {
    pub(super) donors: Vec<DonorProfile>,
    pub(super) hospitals: Vec<HospitalProfile>,
    pub(super) requests: Vec<BloodRequest>,
    pub(super) donations: Vec<DonationRecord>,
    pub(super) stock: Vec<StockLevel>,
    pub(super) analytics: HashMap<HospitalId, HospitalAnalytics>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub(super) fn seeded(
        donors: Vec<DonorProfile>,
        requests: Vec<BloodRequest>,
        donations: Vec<DonationRecord>,
    ) -> Self {
        let repository = Self::default();
        {
            let mut state = repository.state.lock().expect("repository mutex poisoned");
            state.donors = donors;
            state.hospitals = vec![hospital()];
            state.requests = requests;
            state.donations = donations;
        }
        repository
    }

    pub(super) fn add_stock(&self, blood_type: BloodType, units_available: u32) {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        state.stock.push(StockLevel {
            hospital_id: hospital().id,
            blood_type,
            units: units_available,
            units_available,
            minimum_threshold: 10,
            critical_threshold: 5,
        });
    }

    pub(super) fn stored_request(&self, id: &str) -> BloodRequest {
        let state = self.state.lock().expect("repository mutex poisoned");
        state
            .requests
            .iter()
            .find(|request| request.id.0 == id)
            .cloned()
            .expect("request stored")
    }

    pub(super) fn stored_donor(&self, id: &str) -> DonorProfile {
        let state = self.state.lock().expect("repository mutex poisoned");
        state
            .donors
            .iter()
            .find(|donor| donor.id.0 == id)
            .cloned()
            .expect("donor stored")
    }

    pub(super) fn hospital_analytics(&self) -> Option<HospitalAnalytics> {
        let state = self.state.lock().expect("repository mutex poisoned");
        state.analytics.get(&hospital().id).cloned()
    }
}

impl DonationRepository for MemoryRepository {
    fn available_donors(
        &self,
        blood_type: Option<BloodType>,
    ) -> Result<Vec<DonorProfile>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .donors
            .iter()
            .filter(|donor| donor.is_available && donor.blood_type().is_some())
            .filter(|donor| blood_type.map_or(true, |wanted| donor.blood_type() == Some(wanted)))
            .cloned()
            .collect())
    }

    fn all_donors(&self) -> Result<Vec<DonorProfile>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.donors.clone())
    }

    fn donor(&self, id: &DonorId) -> Result<Option<DonorProfile>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.donors.iter().find(|donor| donor.id == *id).cloned())
    }

    fn hospital(&self, id: &HospitalId) -> Result<Option<HospitalProfile>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.hospitals.iter().find(|h| h.id == *id).cloned())
    }

    fn request(&self, id: &RequestId) -> Result<Option<BloodRequest>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.requests.iter().find(|r| r.id == *id).cloned())
    }

    fn donation(&self, id: &DonationId) -> Result<Option<DonationRecord>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.donations.iter().find(|d| d.id == *id).cloned())
    }

    fn donations(&self, filter: &DonationFilter) -> Result<Vec<DonationRecord>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .donations
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    fn requests(&self, filter: &RequestFilter) -> Result<Vec<BloodRequest>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .requests
            .iter()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect())
    }

    fn stock(
        &self,
        hospital: &HospitalId,
        blood_type: BloodType,
    ) -> Result<Option<StockLevel>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .stock
            .iter()
            .find(|level| level.hospital_id == *hospital && level.blood_type == blood_type)
            .cloned())
    }

    fn insert_donation(&self, record: DonationRecord) -> Result<DonationRecord, RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if state.donations.iter().any(|d| d.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        state.donations.push(record.clone());
        Ok(record)
    }

    fn update_donation(&self, record: DonationRecord) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        let slot = state
            .donations
            .iter_mut()
            .find(|d| d.id == record.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = record;
        Ok(())
    }

    fn update_request(&self, request: BloodRequest) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        let slot = state
            .requests
            .iter_mut()
            .find(|r| r.id == request.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = request;
        Ok(())
    }

    fn update_donor(&self, profile: DonorProfile) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        let slot = state
            .donors
            .iter_mut()
            .find(|d| d.id == profile.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = profile;
        Ok(())
    }

    fn save_hospital_analytics(&self, analytics: HospitalAnalytics) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        state
            .analytics
            .insert(analytics.hospital_id.clone(), analytics);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAudit {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemoryAudit {
    pub(super) fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for MemoryAudit {
    fn append(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .expect("audit mutex poisoned")
            .push(record);
        Ok(())
    }
}

pub(super) struct FailingAudit;

impl AuditSink for FailingAudit {
    fn append(&self, _record: AuditRecord) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("audit table locked".to_string()))
    }
}

pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl DonationRepository for UnavailableRepository {
    fn available_donors(&self, _: Option<BloodType>) -> Result<Vec<DonorProfile>, RepositoryError> {
        offline()
    }
    fn all_donors(&self) -> Result<Vec<DonorProfile>, RepositoryError> {
        offline()
    }
    fn donor(&self, _: &DonorId) -> Result<Option<DonorProfile>, RepositoryError> {
        offline()
    }
    fn hospital(&self, _: &HospitalId) -> Result<Option<HospitalProfile>, RepositoryError> {
        offline()
    }
    fn request(&self, _: &RequestId) -> Result<Option<BloodRequest>, RepositoryError> {
        offline()
    }
    fn donation(&self, _: &DonationId) -> Result<Option<DonationRecord>, RepositoryError> {
        offline()
    }
    fn donations(&self, _: &DonationFilter) -> Result<Vec<DonationRecord>, RepositoryError> {
        offline()
    }
    fn requests(&self, _: &RequestFilter) -> Result<Vec<BloodRequest>, RepositoryError> {
        offline()
    }
    fn stock(&self, _: &HospitalId, _: BloodType) -> Result<Option<StockLevel>, RepositoryError> {
        offline()
    }
    fn insert_donation(&self, _: DonationRecord) -> Result<DonationRecord, RepositoryError> {
        offline()
    }
    fn update_donation(&self, _: DonationRecord) -> Result<(), RepositoryError> {
        offline()
    }
    fn update_request(&self, _: BloodRequest) -> Result<(), RepositoryError> {
        offline()
    }
    fn update_donor(&self, _: DonorProfile) -> Result<(), RepositoryError> {
        offline()
    }
    fn save_hospital_analytics(&self, _: HospitalAnalytics) -> Result<(), RepositoryError> {
        offline()
    }
}

/// Donor A and B from the O- ranking scenario plus the surrounding request history.
pub(super) fn ranking_scenario() -> (Vec<DonorProfile>, Vec<BloodRequest>, Vec<DonationRecord>) {
    let mut veteran = donor("donor-a", BloodType::ONegative, "Pune", "Maharashtra");
    veteran.availability_radius_km = 20;
    let newcomer = donor("donor-b", BloodType::ONegative, "Nagpur", "Vidarbha");

    let mut requests = vec![request("req-oneg", BloodType::ONegative, 2, Urgency::Critical, 0)];
    requests.extend(request_series("hist-oneg", BloodType::ONegative, 11));

    // Eleven of the twelve donations fall inside the 180-day response window.
    let donations = completed_series("donor-a", 12, 30, 14);

    (vec![newcomer, veteran], requests, donations)
}

pub(super) fn build_service(
    repository: MemoryRepository,
) -> (
    DonorAnalyticsService<MemoryRepository, MemoryAudit>,
    Arc<MemoryRepository>,
    Arc<MemoryAudit>,
) {
    let repository = Arc::new(repository);
    let audit = Arc::new(MemoryAudit::default());
    let service =
        DonorAnalyticsService::new(repository.clone(), audit.clone(), EngineConfig::default());
    (service, repository, audit)
}

pub(super) fn analytics_router_with_service(
    service: DonorAnalyticsService<MemoryRepository, MemoryAudit>,
) -> axum::Router {
    analytics_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
