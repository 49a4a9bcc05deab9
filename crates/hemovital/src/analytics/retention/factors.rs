use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::super::activity::{DonorHistory, RequestLedger};
use super::super::domain::{DonorEngagement, DonorProfile};
use super::{InactivityPolicy, RetentionConfig};

/// Risk points and the human-readable factors that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RiskContribution {
    pub points: u32,
    pub factors: Vec<String>,
}

impl RiskContribution {
    fn add(&mut self, points: u32, factor: String) {
        self.points += points;
        self.factors.push(factor);
    }
}

pub(crate) fn activity(
    history: &DonorHistory,
    today: NaiveDate,
    policy: InactivityPolicy,
) -> RiskContribution {
    let mut risk = RiskContribution::default();

    match history.last_completed() {
        Some(last) => {
            let days = (today - last).num_days();
            if days > 365 {
                risk.add(25, format!("Inactive for {days} days"));
            } else if days > 180 {
                risk.add(15, format!("No donation in {days} days"));
            }
        }
        None => risk.add(20, "Never donated".to_string()),
    }

    let stacks = matches!(policy, InactivityPolicy::StackNeverDonated);
    if history.completed_count() == 0 && stacks {
        risk.add(10, "No donation history".to_string());
    }

    risk
}

pub(crate) fn engagement(metrics: &DonorEngagement) -> RiskContribution {
    let mut risk = RiskContribution::default();
    let score = metrics.engagement_score;

    if score < 30.0 {
        risk.add(20, format!("Low engagement score ({score:.1})"));
    } else if score < 50.0 {
        risk.add(10, format!("Moderate engagement score ({score:.1})"));
    }

    if metrics.response_rate < 0.2 {
        risk.add(
            10,
            format!("Low response rate ({:.1}%)", metrics.response_rate * 100.0),
        );
    }

    risk
}

pub(crate) fn profile(donor: &DonorProfile) -> RiskContribution {
    let mut risk = RiskContribution::default();

    let completeness = donor.completeness();
    if completeness < 70 {
        risk.add(15, format!("Incomplete profile ({completeness}%)"));
    }
    if donor.blood_type().is_none() {
        risk.add(5, "Blood group not specified".to_string());
    }

    risk
}

pub(crate) fn response(
    donor: &DonorProfile,
    history: &DonorHistory,
    ledger: &RequestLedger<'_>,
    as_of: DateTime<Utc>,
    config: &RetentionConfig,
) -> RiskContribution {
    let mut risk = RiskContribution::default();
    let Some(blood_type) = donor.blood_type() else {
        return risk;
    };

    let cutoff = as_of - Duration::days(config.response_window_days);
    let requests = ledger.count_since(blood_type, cutoff);
    if requests == 0 {
        return risk;
    }

    let rate = history.responses_since(cutoff) as f64 / requests as f64;
    if rate < config.minimum_response_rate {
        risk.add(
            10,
            format!("Low recent response rate ({:.1}%)", rate * 100.0),
        );
    }

    risk
}

const KEYWORD_RECOMMENDATIONS: [(&[&str], &str); 4] = [
    (
        &["inactive", "no donation"],
        "Send reactivation campaign with impact stories",
    ),
    (
        &["engagement"],
        "Personalized engagement through community events",
    ),
    (&["profile"], "Profile completion reminder with benefits"),
    (
        &["response"],
        "Priority notifications for matching blood requests",
    ),
];

pub(crate) fn recommendations(factors: &[String], total_donations: u32, limit: usize) -> Vec<String> {
    let lowered: Vec<String> = factors.iter().map(|f| f.to_lowercase()).collect();

    let mut picked: Vec<String> = KEYWORD_RECOMMENDATIONS
        .iter()
        .filter(|(keywords, _)| {
            lowered
                .iter()
                .any(|factor| keywords.iter().any(|keyword| factor.contains(keyword)))
        })
        .map(|(_, recommendation)| recommendation.to_string())
        .collect();

    if picked.is_empty() {
        let generic = match total_donations {
            0 => "Welcome package and first-time donor guidance",
            1 | 2 => "Milestone recognition for next donation",
            _ => "Loyalty rewards and recognition",
        };
        picked.push(generic.to_string());
    }

    picked.truncate(limit);
    picked
}
