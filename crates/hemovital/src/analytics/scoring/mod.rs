mod config;
pub(crate) mod rules;

pub use config::{LocationCapPolicy, ScoringConfig, TieBreak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::activity::{DonorHistory, RequestLedger};
use super::domain::{BloodRequest, DonorId, DonorProfile, HospitalProfile};

/// Upper bound of the composite score.
pub const MAX_SCORE: u8 = 100;

/// Sub-scores that make up a donor's suitability for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    BloodCompatibility,
    Location,
    DonationHistory,
    ResponseBehavior,
    Urgency,
}

/// Discrete contribution to a donor score, kept for explainability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub points: u8,
    pub notes: String,
}

/// Composite score with the component trail that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorScore {
    pub donor_id: DonorId,
    pub total: u8,
    pub components: Vec<ScoreComponent>,
}

impl DonorScore {
    pub fn points_for(&self, factor: ScoreFactor) -> u8 {
        self.components
            .iter()
            .filter(|component| component.factor == factor)
            .map(|component| component.points)
            .sum()
    }
}

/// Everything the scoring rules read for one donor/request pair.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub donor: &'a DonorProfile,
    pub hospital: &'a HospitalProfile,
    pub request: &'a BloodRequest,
    pub history: &'a DonorHistory,
    pub ledger: RequestLedger<'a>,
    pub as_of: DateTime<Utc>,
}

/// Stateless scorer applying the configured weights to a donor.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a donor against a request. Returns `None` when the donor has no
    /// blood type; such donors are never ranked.
    pub fn score(&self, input: &ScoringInput<'_>) -> Option<DonorScore> {
        let donor_type = input.donor.blood_type()?;
        let today = input.as_of.date_naive();

        let components = vec![
            rules::blood_compatibility(donor_type, input.request.blood_type),
            rules::location(input.donor, input.hospital, &self.config),
            rules::donation_history(input.history, today),
            rules::response_behavior(
                donor_type,
                input.history,
                &input.ledger,
                input.as_of,
                &self.config,
            ),
            rules::urgency(input.request.urgency),
        ];

        let raw: u32 = components
            .iter()
            .map(|component| u32::from(component.points))
            .sum();

        Some(DonorScore {
            donor_id: input.donor.id.clone(),
            total: raw.min(u32::from(MAX_SCORE)) as u8,
            components,
        })
    }
}
