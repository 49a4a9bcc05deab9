use chrono::{DateTime, Duration, NaiveDate, Utc};
use hemovital::analytics::{
    AuditError, AuditRecord, AuditSink, BloodRequest, BloodType, DonationFilter, DonationId,
    DonationRecord, DonationRepository, DonationStatus, DonorEngagement, DonorId, DonorProfile,
    Gender, HospitalAnalytics, HospitalId, HospitalProfile, PersonalDetails, RepositoryError,
    RequestFilter, RequestId, RequestStatus, StockLevel, Urgency,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct Store {
    donors: Vec<DonorProfile>,
    hospitals: Vec<HospitalProfile>,
    requests: Vec<BloodRequest>,
    donations: Vec<DonationRecord>,
    stock: Vec<StockLevel>,
    analytics: HashMap<HospitalId, HospitalAnalytics>,
}

/// Process-local donation store. Donors keep registration order.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDonationRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryDonationRepository {
    fn store(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".to_string()))
    }

    pub(crate) fn add_hospital(&self, hospital: HospitalProfile) -> Result<(), RepositoryError> {
        self.store()?.hospitals.push(hospital);
        Ok(())
    }

    pub(crate) fn add_donor(&self, donor: DonorProfile) -> Result<(), RepositoryError> {
        self.store()?.donors.push(donor);
        Ok(())
    }

    pub(crate) fn add_request(&self, request: BloodRequest) -> Result<(), RepositoryError> {
        self.store()?.requests.push(request);
        Ok(())
    }

    pub(crate) fn add_stock(&self, level: StockLevel) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        store
            .stock
            .retain(|row| !(row.hospital_id == level.hospital_id && row.blood_type == level.blood_type));
        store.stock.push(level);
        Ok(())
    }

    pub(crate) fn hospital_analytics(
        &self,
        hospital: &HospitalId,
    ) -> Result<Option<HospitalAnalytics>, RepositoryError> {
        Ok(self.store()?.analytics.get(hospital).cloned())
    }
}

impl DonationRepository for InMemoryDonationRepository {
    fn available_donors(
        &self,
        blood_type: Option<BloodType>,
    ) -> Result<Vec<DonorProfile>, RepositoryError> {
        let store = self.store()?;
        Ok(store
            .donors
            .iter()
            .filter(|donor| donor.is_available)
            .filter(|donor| match (donor.blood_type(), blood_type) {
                (Some(own), Some(wanted)) => own == wanted,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .cloned()
            .collect())
    }

    fn all_donors(&self) -> Result<Vec<DonorProfile>, RepositoryError> {
        Ok(self.store()?.donors.clone())
    }

    fn donor(&self, id: &DonorId) -> Result<Option<DonorProfile>, RepositoryError> {
        Ok(self.store()?.donors.iter().find(|donor| donor.id == *id).cloned())
    }

    fn hospital(&self, id: &HospitalId) -> Result<Option<HospitalProfile>, RepositoryError> {
        Ok(self
            .store()?
            .hospitals
            .iter()
            .find(|hospital| hospital.id == *id)
            .cloned())
    }

    fn request(&self, id: &RequestId) -> Result<Option<BloodRequest>, RepositoryError> {
        Ok(self
            .store()?
            .requests
            .iter()
            .find(|request| request.id == *id)
            .cloned())
    }

    fn donation(&self, id: &DonationId) -> Result<Option<DonationRecord>, RepositoryError> {
        Ok(self
            .store()?
            .donations
            .iter()
            .find(|record| record.id == *id)
            .cloned())
    }

    fn donations(&self, filter: &DonationFilter) -> Result<Vec<DonationRecord>, RepositoryError> {
        Ok(self
            .store()?
            .donations
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    fn requests(&self, filter: &RequestFilter) -> Result<Vec<BloodRequest>, RepositoryError> {
        Ok(self
            .store()?
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
        Ok(self
            .store()?
            .stock
            .iter()
            .find(|level| level.hospital_id == *hospital && level.blood_type == blood_type)
            .cloned())
    }

    fn insert_donation(&self, record: DonationRecord) -> Result<DonationRecord, RepositoryError> {
        let mut store = self.store()?;
        if store.donations.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        store.donations.push(record.clone());
        Ok(record)
    }

    fn update_donation(&self, record: DonationRecord) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        let slot = store
            .donations
            .iter_mut()
            .find(|existing| existing.id == record.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = record;
        Ok(())
    }

    fn update_request(&self, request: BloodRequest) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        let slot = store
            .requests
            .iter_mut()
            .find(|existing| existing.id == request.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = request;
        Ok(())
    }

    fn update_donor(&self, profile: DonorProfile) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        let slot = store
            .donors
            .iter_mut()
            .find(|existing| existing.id == profile.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = profile;
        Ok(())
    }

    fn save_hospital_analytics(&self, analytics: HospitalAnalytics) -> Result<(), RepositoryError> {
        self.store()?
            .analytics
            .insert(analytics.hospital_id.clone(), analytics);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAuditLog {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl AuditSink for InMemoryAuditLog {
    fn append(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .map_err(|_| AuditError::Unavailable("audit lock poisoned".to_string()))?
            .push(record);
        Ok(())
    }
}

impl InMemoryAuditLog {
    pub(crate) fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

pub(crate) const DEMO_HOSPITAL: &str = "hos-pune-01";
pub(crate) const DEMO_REQUEST: &str = "req-oneg-critical";

fn demo_details(city: &str, state: &str, born: (i32, u32, u32), weight_kg: u16) -> PersonalDetails {
    PersonalDetails {
        gender: Some(Gender::Other),
        date_of_birth: NaiveDate::from_ymd_opt(born.0, born.1, born.2),
        weight_kg: Some(weight_kg),
        contact_number: Some("5550100".to_string()),
        address: Some("Ward 4".to_string()),
        city: Some(city.to_string()),
        state: Some(state.to_string()),
        pincode: Some("411001".to_string()),
    }
}

fn demo_request(
    id: String,
    blood_type: BloodType,
    units_required: u8,
    urgency: Urgency,
    created_at: DateTime<Utc>,
) -> BloodRequest {
    BloodRequest {
        id: RequestId(id),
        hospital_id: HospitalId(DEMO_HOSPITAL.to_string()),
        blood_type,
        units_required,
        urgency,
        is_active: true,
        expires_on: created_at + Duration::days(3),
        created_at,
        fulfillment_percentage: 0.0,
        status: RequestStatus::Pending,
    }
}

/// A hospital in Pune with a few donors, 60 days of request history and stock rows.
pub(crate) fn seed_demo_data(
    repository: &InMemoryDonationRepository,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    repository.add_hospital(HospitalProfile {
        id: HospitalId(DEMO_HOSPITAL.to_string()),
        name: "Sassoon General Hospital".to_string(),
        city: "Pune".to_string(),
        state: "Maharashtra".to_string(),
    })?;

    let donors = [
        ("don-asha", "Asha", BloodType::ONegative, "Pune", "Maharashtra", 20u16, 72.0),
        ("don-vikram", "Vikram", BloodType::ONegative, "Nashik", "Maharashtra", 30, 55.0),
        ("don-imran", "Imran", BloodType::OPositive, "Pune", "Maharashtra", 10, 48.0),
        ("don-lena", "Lena", BloodType::ONegative, "Indore", "Madhya Pradesh", 6, 12.0),
        ("don-ravi", "Ravi", BloodType::APositive, "Pune", "Maharashtra", 14, 25.0),
    ];
    for (id, name, blood_type, city, state, radius, engagement) in donors {
        let mut donor = DonorProfile::new(DonorId(id.to_string()), name)
            .with_blood_type(blood_type)
            .with_details(demo_details(city, state, (1990, 6, 15), 68));
        donor.availability_radius_km = radius;
        donor.engagement = DonorEngagement {
            engagement_score: engagement,
            response_rate: engagement / 100.0,
            last_activity: Some(now - Duration::days(14)),
        };
        if id == "don-asha" {
            donor.last_donation_date = Some((now - Duration::days(20)).date_naive());
            donor.total_donations = 4;
        }
        repository.add_donor(donor)?;
    }

    for day in 1..=60i64 {
        let created_at = now - Duration::days(day);
        let blood_type = match day % 3 {
            0 => BloodType::ONegative,
            1 => BloodType::OPositive,
            _ => BloodType::APositive,
        };
        let units = 1 + (day % 3) as u8;
        let mut request =
            demo_request(format!("req-hist-{day:02}"), blood_type, units, Urgency::Normal, created_at);
        request.is_active = false;
        repository.add_request(request)?;
    }
    repository.add_request(demo_request(
        DEMO_REQUEST.to_string(),
        BloodType::ONegative,
        2,
        Urgency::Critical,
        now,
    ))?;

    let mut store = repository.store()?;
    for (index, days_ago) in [20i64, 75, 140, 210].into_iter().enumerate() {
        let created_at = now - Duration::days(days_ago);
        store.donations.push(DonationRecord {
            id: DonationId(format!("don-seed-{index}")),
            donor_id: DonorId("don-asha".to_string()),
            request_id: None,
            status: DonationStatus::Completed,
            units: 1,
            donation_date: created_at.date_naive(),
            created_at,
        });
    }
    drop(store);

    for (blood_type, units_available) in [
        (BloodType::ONegative, 4u32),
        (BloodType::OPositive, 25),
        (BloodType::APositive, 0),
    ] {
        repository.add_stock(StockLevel {
            hospital_id: HospitalId(DEMO_HOSPITAL.to_string()),
            blood_type,
            units: units_available,
            units_available,
            minimum_threshold: 10,
            critical_threshold: 5,
        })?;
    }

    Ok(())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// End of `date` in UTC, used as the evaluation instant for date-only CLI input.
pub(crate) fn evaluation_instant(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(23, 59, 59)
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now)
}
