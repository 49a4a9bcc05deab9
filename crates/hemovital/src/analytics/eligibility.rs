use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::DonorProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityConfig {
    pub minimum_age: i64,
    pub maximum_age: i64,
    pub minimum_weight_kg: u16,
    pub donation_gap_days: i64,
    /// Extra wait added to the next eligible date for underweight donors.
    pub underweight_extra_days: i64,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            minimum_age: 18,
            maximum_age: 65,
            minimum_weight_kg: 50,
            donation_gap_days: 90,
            underweight_extra_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub eligible: bool,
    pub reasons: Vec<String>,
    pub next_eligible_date: Option<NaiveDate>,
}

pub struct EligibilityRules {
    config: EligibilityConfig,
}

impl EligibilityRules {
    pub fn new(config: EligibilityConfig) -> Self {
        Self { config }
    }

    pub fn check(&self, profile: &DonorProfile, today: NaiveDate) -> EligibilityReport {
        let mut reasons = Vec::new();
        let mut next_eligible_date = None;
        let details = profile.details();

        if let Some(born) = details.date_of_birth {
            let age = (today - born).num_days() / 365;
            if age < self.config.minimum_age || age > self.config.maximum_age {
                reasons.push(format!(
                    "Age {age} not in {}-{} range",
                    self.config.minimum_age, self.config.maximum_age
                ));
            }
        }

        if self.is_underweight(profile) {
            reasons.push(format!(
                "Weight less than {}kg",
                self.config.minimum_weight_kg
            ));
        }

        if let Some(last) = profile.last_donation_date {
            let days_since = (today - last).num_days();
            if days_since < self.config.donation_gap_days {
                reasons.push(format!(
                    "Last donation was {days_since} days ago ({} days required)",
                    self.config.donation_gap_days
                ));
                next_eligible_date = Some(last + Duration::days(self.config.donation_gap_days));
            }
        }

        if !profile.is_available {
            reasons.push("Marked as unavailable".to_string());
        }

        EligibilityReport {
            eligible: reasons.is_empty(),
            reasons,
            next_eligible_date,
        }
    }

    /// Earliest date the donor may give again, never before `today`.
    pub fn next_eligible_date(&self, profile: &DonorProfile, today: NaiveDate) -> NaiveDate {
        let Some(last) = profile.last_donation_date else {
            return today;
        };

        let mut next = last + Duration::days(self.config.donation_gap_days);
        if self.is_underweight(profile) {
            next += Duration::days(self.config.underweight_extra_days);
        }
        next.max(today)
    }

    fn is_underweight(&self, profile: &DonorProfile) -> bool {
        profile
            .details()
            .weight_kg
            .is_some_and(|kg| kg > 0 && kg < self.config.minimum_weight_kg)
    }
}

impl Default for EligibilityRules {
    fn default() -> Self {
        Self::new(EligibilityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::domain::{DonorId, PersonalDetails};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn donor() -> DonorProfile {
        DonorProfile::new(DonorId("d-9".to_string()), "Ravi").with_details(PersonalDetails {
            date_of_birth: Some(date(1990, 6, 1)),
            weight_kg: Some(72),
            ..PersonalDetails::default()
        })
    }

    #[test]
    fn healthy_rested_donor_is_eligible() {
        let mut profile = donor();
        profile.last_donation_date = Some(date(2026, 1, 1));
        let report = EligibilityRules::default().check(&profile, date(2026, 6, 1));
        assert!(report.eligible);
        assert!(report.reasons.is_empty());
        assert_eq!(report.next_eligible_date, None);
    }

    #[test]
    fn recent_donation_sets_next_date() {
        let mut profile = donor();
        profile.last_donation_date = Some(date(2026, 5, 1));
        let report = EligibilityRules::default().check(&profile, date(2026, 6, 1));
        assert!(!report.eligible);
        assert_eq!(
            report.reasons,
            vec!["Last donation was 31 days ago (90 days required)"]
        );
        assert_eq!(report.next_eligible_date, Some(date(2026, 7, 30)));
    }

    #[test]
    fn collects_every_failing_rule() {
        let mut profile = donor();
        profile.update_details(|details| {
            details.date_of_birth = Some(date(2012, 1, 1));
            details.weight_kg = Some(45);
        });
        profile.is_available = false;
        let report = EligibilityRules::default().check(&profile, date(2026, 6, 1));
        assert!(!report.eligible);
        assert_eq!(report.reasons.len(), 3);
        assert!(report.reasons[0].starts_with("Age 14"));
    }

    #[test]
    fn next_date_adds_underweight_wait_and_floors_at_today() {
        let rules = EligibilityRules::default();
        let today = date(2026, 6, 1);

        let mut profile = donor();
        assert_eq!(rules.next_eligible_date(&profile, today), today);

        profile.last_donation_date = Some(date(2026, 5, 1));
        assert_eq!(rules.next_eligible_date(&profile, today), date(2026, 7, 30));

        profile.update_details(|details| details.weight_kg = Some(48));
        assert_eq!(rules.next_eligible_date(&profile, today), date(2026, 8, 29));

        profile.last_donation_date = Some(date(2025, 1, 1));
        assert_eq!(rules.next_eligible_date(&profile, today), today);
    }
}
