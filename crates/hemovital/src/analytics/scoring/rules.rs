use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::super::activity::{DonorHistory, RequestLedger};
use super::super::compatibility::compatibility;
use super::super::domain::{BloodType, DonorProfile, HospitalProfile, Urgency};
use super::config::{LocationCapPolicy, ScoringConfig};
use super::{ScoreComponent, ScoreFactor};

pub(crate) const LOCATION_CAP: u8 = 25;
pub(crate) const HISTORY_CAP: u8 = 20;

pub(crate) fn blood_compatibility(donor: BloodType, required: BloodType) -> ScoreComponent {
    let points = compatibility(donor, required);
    let notes = if points > 0 {
        format!("{donor} donor compatible with {required} requirement")
    } else {
        format!("{donor} donor incompatible with {required} requirement")
    };

    ScoreComponent {
        factor: ScoreFactor::BloodCompatibility,
        points,
        notes,
    }
}

fn same_place(donor: Option<&str>, hospital: &str) -> bool {
    match donor {
        Some(value) if !hospital.is_empty() => value.eq_ignore_ascii_case(hospital),
        _ => false,
    }
}

pub(crate) fn location(
    donor: &DonorProfile,
    hospital: &HospitalProfile,
    config: &ScoringConfig,
) -> ScoreComponent {
    let (proximity, place) = if same_place(donor.city(), &hospital.city) {
        (15u8, "same city")
    } else if same_place(donor.state(), &hospital.state) {
        (10u8, "same state")
    } else {
        (0u8, "outside region")
    };

    let radius_credit = (donor.availability_radius_km / 2).min(10) as u8;
    let raw = proximity + radius_credit;
    let points = match config.location_cap {
        LocationCapPolicy::ClampTotal => raw.min(LOCATION_CAP),
        LocationCapPolicy::Uncapped => raw,
    };

    ScoreComponent {
        factor: ScoreFactor::Location,
        points,
        notes: format!(
            "{place}, {} km availability radius",
            donor.availability_radius_km
        ),
    }
}

pub(crate) fn donation_history(history: &DonorHistory, today: NaiveDate) -> ScoreComponent {
    let count = history.completed_count();
    let mut points: u8 = match count {
        c if c >= 10 => 10,
        c if c >= 5 => 8,
        c if c >= 2 => 5,
        1 => 3,
        _ => 0,
    };
    let mut notes = vec![format!("{count} completed donation(s)")];

    if let Some(last) = history.last_completed() {
        let days_since = (today - last).num_days();
        if days_since <= 90 {
            points += 5;
            notes.push(format!("donated {days_since} days ago"));
        } else if days_since <= 180 {
            points += 3;
            notes.push(format!("donated {days_since} days ago"));
        }

        if let Some(first) = history.first_completed() {
            let days_active = (last - first).num_days();
            if days_active > 0 {
                let per_year = f64::from(count) / days_active as f64 * 365.0;
                if per_year >= 2.0 {
                    points += 5;
                    notes.push(format!("{per_year:.1} donations per year"));
                }
            }
        }
    }

    ScoreComponent {
        factor: ScoreFactor::DonationHistory,
        points: points.min(HISTORY_CAP),
        notes: notes.join(", "),
    }
}

pub(crate) fn response_behavior(
    donor_type: BloodType,
    history: &DonorHistory,
    ledger: &RequestLedger<'_>,
    as_of: DateTime<Utc>,
    config: &ScoringConfig,
) -> ScoreComponent {
    let cutoff = as_of - Duration::days(config.response_window_days);
    let requests = ledger.count_since(donor_type, cutoff);
    let responses = history.responses_since(cutoff);

    let (points, notes) = if requests > 0 {
        let rate = responses as f64 / requests as f64 * 100.0;
        let points = if rate >= 80.0 {
            15
        } else if rate >= 60.0 {
            12
        } else if rate >= 40.0 {
            8
        } else if rate >= 20.0 {
            5
        } else {
            3
        };
        (
            points,
            format!("responded to {responses} of {requests} {donor_type} requests ({rate:.0}%)"),
        )
    } else {
        (3, format!("no {donor_type} requests in window"))
    };

    ScoreComponent {
        factor: ScoreFactor::ResponseBehavior,
        points,
        notes,
    }
}

pub(crate) fn urgency(urgency: Urgency) -> ScoreComponent {
    let points = match urgency {
        Urgency::Critical => 10,
        Urgency::Urgent => 7,
        Urgency::Normal => 5,
    };

    ScoreComponent {
        factor: ScoreFactor::Urgency,
        points,
        notes: format!("{} request", urgency.label()),
    }
}
