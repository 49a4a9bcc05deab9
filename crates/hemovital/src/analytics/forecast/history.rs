use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::super::domain::{BloodRequest, BloodType};

/// Units requested per calendar day, oldest first, zero-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    pub start: NaiveDate,
    pub values: Vec<f64>,
}

impl DailySeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bucket a hospital's requests into one daily series per blood type,
/// covering `[today - history_days, today]` inclusive.
pub fn daily_demand(
    requests: &[BloodRequest],
    today: NaiveDate,
    history_days: u32,
) -> BTreeMap<BloodType, DailySeries> {
    let start = today - Duration::days(i64::from(history_days));
    let span = history_days as usize + 1;

    let mut series: BTreeMap<BloodType, DailySeries> = BloodType::ALL
        .into_iter()
        .map(|blood_type| {
            (
                blood_type,
                DailySeries {
                    start,
                    values: vec![0.0; span],
                },
            )
        })
        .collect();

    for request in requests {
        let day = request.created_at.date_naive();
        if day < start || day > today {
            continue;
        }
        let offset = (day - start).num_days() as usize;
        if let Some(entry) = series.get_mut(&request.blood_type) {
            entry.values[offset] += f64::from(request.units_required);
        }
    }

    series
}

/// Mean units per request of `blood_type` created at or after `cutoff`.
pub fn mean_units_since(
    requests: &[BloodRequest],
    blood_type: BloodType,
    cutoff: DateTime<Utc>,
) -> Option<(f64, usize)> {
    let units: Vec<f64> = requests
        .iter()
        .filter(|request| request.blood_type == blood_type && request.created_at >= cutoff)
        .map(|request| f64::from(request.units_required))
        .collect();

    if units.is_empty() {
        None
    } else {
        Some((units.iter().sum::<f64>() / units.len() as f64, units.len()))
    }
}
