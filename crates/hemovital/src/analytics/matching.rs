use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::activity::{DonorHistory, RequestLedger};
use super::audit::{AuditRecord, PredictionKind, DEFAULT_AUDIT_CONFIDENCE};
use super::compatibility::compatibility;
use super::domain::{BloodRequest, DonorId, DonorProfile, HospitalProfile};
use super::scoring::{DonorScore, ScoreFactor, ScoringEngine, ScoringInput, TieBreak};

const MAX_REASONS: usize = 3;
const EXPERIENCED_DONOR_THRESHOLD: u32 = 3;
const AUDITED_TOP_SCORES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTier {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
}

impl MatchTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => MatchTier::Excellent,
            65.. => MatchTier::VeryGood,
            50.. => MatchTier::Good,
            40.. => MatchTier::Fair,
            _ => MatchTier::Poor,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            MatchTier::Excellent => "Excellent",
            MatchTier::VeryGood => "Very Good",
            MatchTier::Good => "Good",
            MatchTier::Fair => "Fair",
            MatchTier::Poor => "Poor",
        }
    }
}

/// Ranked donor annotated for display. Produced per run, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub donor_id: DonorId,
    pub display_name: String,
    pub score: u8,
    pub tier: MatchTier,
    pub reasons: Vec<String>,
    pub location_score: u8,
    pub last_donation: Option<NaiveDate>,
}

/// Outcome of one matching run plus the audit snapshot describing it.
#[derive(Debug, Clone)]
pub struct MatchRun {
    pub results: Vec<MatchResult>,
    pub population: usize,
    pub qualified: usize,
    pub audit: AuditRecord,
}

/// Read-only view of everything a matching run needs.
pub struct MatchContext<'a> {
    pub request: &'a BloodRequest,
    pub hospital: &'a HospitalProfile,
    pub donors: &'a [DonorProfile],
    pub histories: &'a HashMap<DonorId, DonorHistory>,
    pub ledger: RequestLedger<'a>,
    pub as_of: DateTime<Utc>,
}

/// Score, filter and rank donors for a request.
pub fn rank_donors(engine: &ScoringEngine, context: &MatchContext<'_>, top_n: usize) -> MatchRun {
    let empty = DonorHistory::default();
    let config = engine.config();

    let mut scored: Vec<(&DonorProfile, &DonorHistory, DonorScore)> = context
        .donors
        .iter()
        .filter(|donor| donor.is_available)
        .filter_map(|donor| {
            let history = context.histories.get(&donor.id).unwrap_or(&empty);
            let input = ScoringInput {
                donor,
                hospital: context.hospital,
                request: context.request,
                history,
                ledger: context.ledger,
                as_of: context.as_of,
            };
            engine.score(&input).map(|score| (donor, history, score))
        })
        .collect();

    let population = scored.len();
    scored.retain(|(_, _, score)| score.total >= config.minimum_match_score);
    let qualified = scored.len();

    // sort_by is stable, so equal scores keep repository order under InputOrder.
    scored.sort_by(|(left, _, a), (right, _, b)| {
        let by_score = b.total.cmp(&a.total);
        match config.tie_break {
            TieBreak::InputOrder => by_score,
            TieBreak::DonorId => by_score.then_with(|| left.id.cmp(&right.id)),
        }
    });

    // Audit figures describe every qualified donor, not just the returned page.
    let top_scores: Vec<u8> = scored
        .iter()
        .take(AUDITED_TOP_SCORES)
        .map(|(_, _, score)| score.total)
        .collect();
    let average = if scored.is_empty() {
        0.0
    } else {
        scored
            .iter()
            .map(|(_, _, score)| f64::from(score.total))
            .sum::<f64>()
            / scored.len() as f64
    };

    scored.truncate(top_n);
    let results: Vec<MatchResult> = scored
        .into_iter()
        .map(|(donor, history, score)| build_result(donor, history, &score, context))
        .collect();

    let audit = AuditRecord {
        kind: PredictionKind::DonorMatch,
        subject: Some(context.request.hospital_id.to_string()),
        input: json!({
            "request_id": context.request.id,
            "blood_type": context.request.blood_type,
            "urgency": context.request.urgency,
            "population": population,
            "qualified": qualified,
        }),
        output: json!({
            "returned": results.len(),
            "top_scores": top_scores,
            "average_score": average,
        }),
        confidence: DEFAULT_AUDIT_CONFIDENCE,
        recorded_at: context.as_of,
    };

    MatchRun {
        results,
        population,
        qualified,
        audit,
    }
}

fn build_result(
    donor: &DonorProfile,
    history: &DonorHistory,
    score: &DonorScore,
    context: &MatchContext<'_>,
) -> MatchResult {
    MatchResult {
        donor_id: donor.id.clone(),
        display_name: donor.display_name.clone(),
        score: score.total,
        tier: MatchTier::from_score(score.total),
        reasons: match_reasons(donor, history, context),
        location_score: score.points_for(ScoreFactor::Location),
        last_donation: history.last_completed().or(donor.last_donation_date),
    }
}

fn match_reasons(
    donor: &DonorProfile,
    history: &DonorHistory,
    context: &MatchContext<'_>,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if donor
        .blood_type()
        .is_some_and(|blood_type| compatibility(blood_type, context.request.blood_type) > 0)
    {
        reasons.push("Blood group compatible".to_string());
    }

    let same_city = donor.city().is_some_and(|city| {
        !context.hospital.city.is_empty() && city.eq_ignore_ascii_case(&context.hospital.city)
    });
    if same_city {
        reasons.push("Same city".to_string());
    }

    let completed = history.completed_count();
    if completed >= EXPERIENCED_DONOR_THRESHOLD {
        reasons.push(format!("Experienced donor ({completed} donations)"));
    }

    if donor.is_available {
        reasons.push("Currently available".to_string());
    }

    reasons.truncate(MAX_REASONS);
    reasons
}
