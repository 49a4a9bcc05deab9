use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use super::domain::{BloodRequest, BloodType, HospitalId, RequestId, RequestStatus, Urgency};

const MAX_UNITS_PER_REQUEST: u8 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read request export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid request CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {reason}")]
    InvalidRow { line: usize, reason: String },
}

/// Loads historical blood requests from a CSV export so demand can be
/// forecast for hospitals whose history lives outside the repository.
///
/// Expected header: `request_id,hospital_id,blood_type,units_required,urgency,created_at,expires_on`.
/// Timestamps accept RFC 3339 or `YYYY-MM-DD`; `expires_on` may be empty.
pub struct RequestHistoryImporter;

impl RequestHistoryImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<BloodRequest>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<BloodRequest>, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut requests = Vec::new();

        for (index, row) in csv_reader.deserialize::<RequestRow>().enumerate() {
            // Header occupies line 1.
            let line = index + 2;
            requests.push(row?.into_request(line)?);
        }

        Ok(requests)
    }
}

#[derive(Debug, Deserialize)]
struct RequestRow {
    request_id: String,
    hospital_id: String,
    blood_type: String,
    units_required: u8,
    urgency: String,
    created_at: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    expires_on: Option<String>,
}

impl RequestRow {
    fn into_request(self, line: usize) -> Result<BloodRequest, ImportError> {
        let invalid = |reason: String| ImportError::InvalidRow { line, reason };

        let blood_type: BloodType = self.blood_type.parse().map_err(|err| invalid(format!("{err}")))?;
        let urgency: Urgency = self.urgency.parse().map_err(|err| invalid(format!("{err}")))?;
        if self.units_required == 0 || self.units_required > MAX_UNITS_PER_REQUEST {
            return Err(invalid(format!(
                "units_required {} outside 1-{MAX_UNITS_PER_REQUEST}",
                self.units_required
            )));
        }

        let created_at = parse_timestamp(&self.created_at)
            .ok_or_else(|| invalid(format!("unreadable created_at '{}'", self.created_at)))?;
        let expires_on = match self.expires_on.as_deref() {
            Some(raw) => parse_timestamp(raw)
                .ok_or_else(|| invalid(format!("unreadable expires_on '{raw}'")))?,
            None => created_at,
        };

        Ok(BloodRequest {
            id: RequestId(self.request_id),
            hospital_id: HospitalId(self.hospital_id),
            blood_type,
            units_required: self.units_required,
            urgency,
            is_active: false,
            expires_on,
            created_at,
            fulfillment_percentage: 0.0,
            status: RequestStatus::Pending,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
