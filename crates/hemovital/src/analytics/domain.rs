use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered donors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DonorId(pub String);

/// Identifier wrapper for hospital accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HospitalId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DonationId(pub String);

impl fmt::Display for DonorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for HospitalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DonationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ABO/Rh blood type carried by donors and required by requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
}

impl BloodType {
    pub const ALL: [BloodType; 8] = [
        BloodType::OPositive,
        BloodType::ONegative,
        BloodType::APositive,
        BloodType::ANegative,
        BloodType::BPositive,
        BloodType::BNegative,
        BloodType::AbPositive,
        BloodType::AbNegative,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            BloodType::OPositive => "O+",
            BloodType::ONegative => "O-",
            BloodType::APositive => "A+",
            BloodType::ANegative => "A-",
            BloodType::BPositive => "B+",
            BloodType::BNegative => "B-",
            BloodType::AbPositive => "AB+",
            BloodType::AbNegative => "AB-",
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind} '{value}'")]
pub struct ParseDomainError {
    kind: &'static str,
    value: String,
}

impl FromStr for BloodType {
    type Err = ParseDomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        BloodType::ALL
            .into_iter()
            .find(|blood_type| blood_type.label() == normalized)
            .ok_or_else(|| ParseDomainError {
                kind: "blood type",
                value: raw.to_string(),
            })
    }
}

/// Urgency a hospital attaches to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Urgency {
    Critical,
    Urgent,
    Normal,
}

impl Urgency {
    pub const fn label(self) -> &'static str {
        match self {
            Urgency::Critical => "Critical",
            Urgency::Urgent => "Urgent",
            Urgency::Normal => "Normal",
        }
    }
}

impl FromStr for Urgency {
    type Err = ParseDomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Urgency::Critical),
            "urgent" => Ok(Urgency::Urgent),
            "normal" => Ok(Urgency::Normal),
            _ => Err(ParseDomainError {
                kind: "urgency",
                value: raw.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DonationStatus {
    Pending,
    Confirmed,
    Rejected,
    Completed,
}

impl DonationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DonationStatus::Pending => "Pending",
            DonationStatus::Confirmed => "Confirmed",
            DonationStatus::Rejected => "Rejected",
            DonationStatus::Completed => "Completed",
        }
    }

    /// Rejected and completed donations are never mutated again.
    pub const fn is_terminal(self) -> bool {
        matches!(self, DonationStatus::Rejected | DonationStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Accepted,
    Fulfilled,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Accepted => "Accepted",
            RequestStatus::Fulfilled => "Fulfilled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Optional personal fields captured on the donor profile form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub weight_kg: Option<u16>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

impl PersonalDetails {
    fn populated_fields(&self) -> usize {
        let text = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        [
            self.gender.is_some(),
            self.date_of_birth.is_some(),
            self.weight_kg.is_some_and(|kg| kg > 0),
            text(&self.contact_number),
            text(&self.address),
            text(&self.city),
            text(&self.state),
            text(&self.pincode),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }
}

/// Fields counted towards profile completeness: the personal details plus blood type.
const TRACKED_PROFILE_FIELDS: usize = 9;

/// Analytics maintained outside the engine and read during scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonorEngagement {
    pub engagement_score: f64,
    /// Fraction (0..=1) of notified requests the donor answered.
    pub response_rate: f64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Donor profile as read from the data-access layer.
///
/// Blood type and personal details are only mutable through methods so the
/// completeness percentage is recomputed on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorProfile {
    pub id: DonorId,
    pub display_name: String,
    blood_type: Option<BloodType>,
    details: PersonalDetails,
    pub is_available: bool,
    pub availability_radius_km: u16,
    pub last_donation_date: Option<NaiveDate>,
    pub total_donations: u32,
    completeness: u8,
    pub engagement: DonorEngagement,
}

impl DonorProfile {
    pub fn new(id: DonorId, display_name: impl Into<String>) -> Self {
        let mut profile = Self {
            id,
            display_name: display_name.into(),
            blood_type: None,
            details: PersonalDetails::default(),
            is_available: true,
            availability_radius_km: 10,
            last_donation_date: None,
            total_donations: 0,
            completeness: 0,
            engagement: DonorEngagement::default(),
        };
        profile.recompute_completeness();
        profile
    }

    pub fn with_blood_type(mut self, blood_type: BloodType) -> Self {
        self.set_blood_type(Some(blood_type));
        self
    }

    pub fn with_details(mut self, details: PersonalDetails) -> Self {
        self.details = details;
        self.recompute_completeness();
        self
    }

    pub fn blood_type(&self) -> Option<BloodType> {
        self.blood_type
    }

    pub fn details(&self) -> &PersonalDetails {
        &self.details
    }

    /// Completeness percentage in 0..=100.
    pub fn completeness(&self) -> u8 {
        self.completeness
    }

    pub fn set_blood_type(&mut self, blood_type: Option<BloodType>) {
        self.blood_type = blood_type;
        self.recompute_completeness();
    }

    pub fn update_details<F>(&mut self, update: F)
    where
        F: FnOnce(&mut PersonalDetails),
    {
        update(&mut self.details);
        self.recompute_completeness();
    }

    pub fn city(&self) -> Option<&str> {
        self.details.city.as_deref().filter(|city| !city.is_empty())
    }

    pub fn state(&self) -> Option<&str> {
        self.details.state.as_deref().filter(|state| !state.is_empty())
    }

    fn recompute_completeness(&mut self) {
        let populated = self.details.populated_fields() + usize::from(self.blood_type.is_some());
        self.completeness = ((populated * 100) / TRACKED_PROFILE_FIELDS).min(100) as u8;
    }
}

/// Hospital location details used for proximity scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalProfile {
    pub id: HospitalId,
    pub name: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub id: DonationId,
    pub donor_id: DonorId,
    pub request_id: Option<RequestId>,
    pub status: DonationStatus,
    pub units: u16,
    pub donation_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodRequest {
    pub id: RequestId,
    pub hospital_id: HospitalId,
    pub blood_type: BloodType,
    pub units_required: u8,
    pub urgency: Urgency,
    pub is_active: bool,
    pub expires_on: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub fulfillment_percentage: f64,
    pub status: RequestStatus,
}

impl BloodRequest {
    /// Whether donors may still respond at `as_of`.
    pub fn is_open(&self, as_of: DateTime<Utc>) -> bool {
        self.is_active && self.status != RequestStatus::Fulfilled && self.expires_on > as_of
    }

    /// Apply the confirmed unit total; a fully covered request is closed.
    pub fn apply_confirmed_units(&mut self, confirmed_units: u32) {
        if self.units_required == 0 {
            return;
        }

        let pct = f64::from(confirmed_units) / f64::from(self.units_required) * 100.0;
        self.fulfillment_percentage = pct.min(100.0);

        if self.fulfillment_percentage >= 100.0 {
            self.is_active = false;
            self.status = RequestStatus::Fulfilled;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    Critical,
    Low,
    Adequate,
}

impl StockStatus {
    pub const fn label(self) -> &'static str {
        match self {
            StockStatus::Critical => "Critical",
            StockStatus::Low => "Low",
            StockStatus::Adequate => "Adequate",
        }
    }
}

/// Inventory for one (hospital, blood type) pair. Thresholds are validated at entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub hospital_id: HospitalId,
    pub blood_type: BloodType,
    pub units: u32,
    pub units_available: u32,
    pub minimum_threshold: u32,
    pub critical_threshold: u32,
}

impl StockLevel {
    pub fn status(&self) -> StockStatus {
        if self.units_available <= self.critical_threshold {
            StockStatus::Critical
        } else if self.units_available <= self.minimum_threshold {
            StockStatus::Low
        } else {
            StockStatus::Adequate
        }
    }
}
