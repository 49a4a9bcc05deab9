//! Donor churn-risk scoring.
//!
//! Four independently bounded sub-scores (activity, engagement, profile,
//! response behaviour) are summed without an overall ceiling; the tier
//! boundaries sit well below any reachable maximum.

mod factors;

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::activity::{DonorHistory, RequestLedger};
use super::audit::{AuditRecord, PredictionKind, DEFAULT_AUDIT_CONFIDENCE};
use super::domain::{DonorId, DonorProfile};

/// Whether a donor without completed donations is penalised once or twice.
///
/// The activity rules charge both "never donated" and "no donation history"
/// when the completed count is zero. `StackNeverDonated` keeps that
/// behaviour; `SinglePenalty` drops the second charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InactivityPolicy {
    #[default]
    StackNeverDonated,
    SinglePenalty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub inactivity_policy: InactivityPolicy,
    pub high_risk_threshold: u32,
    pub medium_risk_threshold: u32,
    pub response_window_days: i64,
    pub minimum_response_rate: f64,
    /// A donor counts as retained with a completed donation inside this window.
    pub active_window_days: i64,
    pub max_factors: usize,
    pub max_recommendations: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            inactivity_policy: InactivityPolicy::default(),
            high_risk_threshold: 60,
            medium_risk_threshold: 35,
            response_window_days: 90,
            minimum_response_rate: 0.1,
            active_window_days: 180,
            max_factors: 5,
            max_recommendations: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl RiskTier {
    pub const fn label(self) -> &'static str {
        match self {
            RiskTier::High => "High",
            RiskTier::Medium => "Medium",
            RiskTier::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionAssessment {
    pub donor_id: DonorId,
    pub display_name: String,
    pub risk_score: u32,
    pub tier: RiskTier,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub engagement_score: f64,
    pub last_activity: Option<DateTime<Utc>>,
}

impl RetentionAssessment {
    pub fn audit_record(&self, as_of: DateTime<Utc>) -> AuditRecord {
        AuditRecord {
            kind: PredictionKind::RetentionRisk,
            subject: Some(self.donor_id.to_string()),
            input: json!({ "donor_id": self.donor_id }),
            output: json!({
                "risk_score": self.risk_score,
                "risk_level": self.tier.label(),
                "risk_factors": self.factors,
            }),
            confidence: DEFAULT_AUDIT_CONFIDENCE,
            recorded_at: as_of,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionSummary {
    pub total_donors: usize,
    pub high_risk_count: usize,
    pub medium_risk_count: usize,
    pub low_risk_count: usize,
    /// Percentage of donors with a completed donation in the active window.
    pub retention_rate: f64,
    pub average_engagement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRetention {
    pub high_risk: Vec<RetentionAssessment>,
    pub medium_risk: Vec<RetentionAssessment>,
    pub low_risk: Vec<RetentionAssessment>,
    pub summary: RetentionSummary,
}

impl PopulationRetention {
    pub fn audit_record(&self, subject: Option<String>, as_of: DateTime<Utc>) -> AuditRecord {
        AuditRecord {
            kind: PredictionKind::RetentionRisk,
            subject,
            input: json!({ "total_donors": self.summary.total_donors }),
            output: json!({
                "high_risk": self.summary.high_risk_count,
                "medium_risk": self.summary.medium_risk_count,
                "low_risk": self.summary.low_risk_count,
                "retention_rate": self.summary.retention_rate,
            }),
            confidence: DEFAULT_AUDIT_CONFIDENCE,
            recorded_at: as_of,
        }
    }
}

pub struct RetentionInput<'a> {
    pub donor: &'a DonorProfile,
    pub history: &'a DonorHistory,
    pub ledger: RequestLedger<'a>,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct RetentionEngine {
    config: RetentionConfig,
}

impl RetentionEngine {
    pub fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    pub fn tier_for(&self, risk_score: u32) -> RiskTier {
        if risk_score >= self.config.high_risk_threshold {
            RiskTier::High
        } else if risk_score >= self.config.medium_risk_threshold {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn assess(&self, input: &RetentionInput<'_>) -> RetentionAssessment {
        let today = input.as_of.date_naive();
        let contributions = [
            factors::activity(input.history, today, self.config.inactivity_policy),
            factors::engagement(&input.donor.engagement),
            factors::profile(input.donor),
            factors::response(
                input.donor,
                input.history,
                &input.ledger,
                input.as_of,
                &self.config,
            ),
        ];

        let risk_score: u32 = contributions.iter().map(|c| c.points).sum();
        let all_factors: Vec<String> = contributions
            .into_iter()
            .flat_map(|contribution| contribution.factors)
            .collect();

        let recommendations = factors::recommendations(
            &all_factors,
            input.donor.total_donations,
            self.config.max_recommendations,
        );

        let mut ranked = all_factors;
        ranked.truncate(self.config.max_factors);

        RetentionAssessment {
            donor_id: input.donor.id.clone(),
            display_name: input.donor.display_name.clone(),
            risk_score,
            tier: self.tier_for(risk_score),
            factors: ranked,
            recommendations,
            engagement_score: input.donor.engagement.engagement_score,
            last_activity: input.donor.engagement.last_activity,
        }
    }

    /// Assess every donor and bucket the results by tier.
    pub fn assess_population(
        &self,
        donors: &[DonorProfile],
        histories: &HashMap<DonorId, DonorHistory>,
        ledger: RequestLedger<'_>,
        as_of: DateTime<Utc>,
    ) -> PopulationRetention {
        let empty = DonorHistory::default();
        let active_since = as_of.date_naive() - Duration::days(self.config.active_window_days);

        let mut high_risk = Vec::new();
        let mut medium_risk = Vec::new();
        let mut low_risk = Vec::new();
        let mut retained = 0usize;

        for donor in donors {
            let history = histories.get(&donor.id).unwrap_or(&empty);
            if history.completed_on_or_after(active_since) {
                retained += 1;
            }

            let assessment = self.assess(&RetentionInput {
                donor,
                history,
                ledger,
                as_of,
            });
            match assessment.tier {
                RiskTier::High => high_risk.push(assessment),
                RiskTier::Medium => medium_risk.push(assessment),
                RiskTier::Low => low_risk.push(assessment),
            }
        }

        let total_donors = donors.len();
        let (retention_rate, average_engagement) = if total_donors == 0 {
            (0.0, 0.0)
        } else {
            let engagement_total: f64 = donors
                .iter()
                .map(|donor| donor.engagement.engagement_score)
                .sum();
            let average = engagement_total / total_donors as f64;
            (
                retained as f64 / total_donors as f64 * 100.0,
                (average * 10.0).round() / 10.0,
            )
        };

        let summary = RetentionSummary {
            total_donors,
            high_risk_count: high_risk.len(),
            medium_risk_count: medium_risk.len(),
            low_risk_count: low_risk.len(),
            retention_rate,
            average_engagement,
        };

        PopulationRetention {
            high_risk,
            medium_risk,
            low_risk,
            summary,
        }
    }
}
