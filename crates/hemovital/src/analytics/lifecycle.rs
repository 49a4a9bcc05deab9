use chrono::{DateTime, Utc};

use super::domain::{
    BloodRequest, DonationId, DonationRecord, DonationStatus, DonorProfile, HospitalId,
    RequestStatus,
};
use super::eligibility::EligibilityReport;
use super::repository::HospitalAnalytics;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("cannot move donation from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("donor blood type does not match the request")]
    BloodTypeMismatch,
    #[error("donor already has a pending response to this request")]
    DuplicateResponse,
    #[error("request is no longer accepting responses")]
    RequestClosed,
    #[error("donor is not eligible: {}", .0.join(", "))]
    Ineligible(Vec<String>),
}

/// Apply a hospital or collection action to a donation.
///
/// Only `Pending -> Confirmed`, `Pending -> Rejected` and
/// `Confirmed -> Completed` are permitted.
pub fn transition(record: &mut DonationRecord, to: DonationStatus) -> Result<(), LifecycleError> {
    let allowed = matches!(
        (record.status, to),
        (DonationStatus::Pending, DonationStatus::Confirmed)
            | (DonationStatus::Pending, DonationStatus::Rejected)
            | (DonationStatus::Confirmed, DonationStatus::Completed)
    );

    if !allowed {
        return Err(LifecycleError::InvalidTransition {
            from: record.status.label(),
            to: to.label(),
        });
    }

    record.status = to;
    Ok(())
}

/// Build the pending record created when a donor answers a request.
///
/// `existing` holds the donor's current responses to the same request.
pub fn new_response(
    id: DonationId,
    donor: &DonorProfile,
    request: &BloodRequest,
    existing: &[DonationRecord],
    eligibility: &EligibilityReport,
    as_of: DateTime<Utc>,
) -> Result<DonationRecord, LifecycleError> {
    if donor.blood_type() != Some(request.blood_type) {
        return Err(LifecycleError::BloodTypeMismatch);
    }
    if !request.is_open(as_of) {
        return Err(LifecycleError::RequestClosed);
    }
    if !eligibility.eligible {
        return Err(LifecycleError::Ineligible(eligibility.reasons.clone()));
    }
    let duplicate = existing.iter().any(|record| {
        record.donor_id == donor.id
            && record.request_id.as_ref() == Some(&request.id)
            && record.status == DonationStatus::Pending
    });
    if duplicate {
        return Err(LifecycleError::DuplicateResponse);
    }

    Ok(DonationRecord {
        id,
        donor_id: donor.id.clone(),
        request_id: Some(request.id.clone()),
        status: DonationStatus::Pending,
        units: u16::from(request.units_required),
        donation_date: as_of.date_naive(),
        created_at: as_of,
    })
}

/// Units of confirmed donations, including those since collected. Pending and
/// rejected units are ignored.
pub fn confirmed_units(donations: &[DonationRecord]) -> u32 {
    donations
        .iter()
        .filter(|record| {
            matches!(
                record.status,
                DonationStatus::Confirmed | DonationStatus::Completed
            )
        })
        .map(|record| u32::from(record.units))
        .sum()
}

/// Recompute a request's fulfillment from its linked donations.
pub fn recompute_fulfillment(request: &mut BloodRequest, donations: &[DonationRecord]) {
    request.apply_confirmed_units(confirmed_units(donations));
}

pub fn engagement_score(completed_donations: u32, completeness: u8) -> f64 {
    (f64::from(completed_donations) * 10.0 + f64::from(completeness) * 0.5).min(100.0)
}

pub fn hospital_analytics(hospital_id: &HospitalId, requests: &[BloodRequest]) -> HospitalAnalytics {
    let total_requests = requests.len() as u32;
    let fulfilled_requests = requests
        .iter()
        .filter(|request| request.status == RequestStatus::Fulfilled)
        .count() as u32;
    let fulfillment_rate = if total_requests == 0 {
        0.0
    } else {
        f64::from(fulfilled_requests) / f64::from(total_requests) * 100.0
    };

    HospitalAnalytics {
        hospital_id: hospital_id.clone(),
        total_requests,
        fulfilled_requests,
        fulfillment_rate,
    }
}
