use std::collections::HashMap;
use std::sync::Arc;

use super::common::*;
use crate::analytics::activity::DonorHistory;
use crate::analytics::audit::PredictionKind;
use crate::analytics::domain::{BloodType, DonorProfile, RequestId, Urgency};
use crate::analytics::matching::{rank_donors, MatchContext, MatchRun, MatchTier};
use crate::analytics::scoring::{ScoringConfig, ScoringEngine, TieBreak};
use crate::analytics::{DonorAnalyticsService, EngineConfig, EngineError, RepositoryError};

fn run_for(engine: &ScoringEngine, donors: &[DonorProfile], top_n: usize) -> MatchRun {
    let request = request("req-apos", BloodType::APositive, 1, Urgency::Normal, 0);
    let histories = HashMap::new();
    let hospital = hospital();
    rank_donors(
        engine,
        &MatchContext {
            request: &request,
            hospital: &hospital,
            donors,
            histories: &histories,
            ledger: ledger(&[]),
            as_of: as_of(),
        },
        top_n,
    )
}

fn ids(run: &MatchRun) -> Vec<&str> {
    run.results.iter().map(|r| r.donor_id.0.as_str()).collect()
}

#[test]
fn ranking_orders_veteran_first_and_keeps_newcomer_above_threshold() {
    let (donors, requests, donations) = ranking_scenario();
    let histories = DonorHistory::group_by_donor(donations);
    let hospital = hospital();

    let run = rank_donors(
        &ScoringEngine::default(),
        &MatchContext {
            request: &requests[0],
            hospital: &hospital,
            donors: &donors,
            histories: &histories,
            ledger: ledger(&requests),
            as_of: as_of(),
        },
        15,
    );

    assert_eq!(run.population, 2);
    assert_eq!(run.qualified, 2);
    assert_eq!(ids(&run), vec!["donor-a", "donor-b"]);

    let veteran = &run.results[0];
    assert_eq!(veteran.tier, MatchTier::Excellent);
    assert_eq!(veteran.location_score, 25);
    assert_eq!(veteran.last_donation, Some(date_days_ago(30)));
    assert_eq!(
        veteran.reasons,
        vec![
            "Blood group compatible".to_string(),
            "Same city".to_string(),
            "Experienced donor (12 donations)".to_string(),
        ]
    );

    let newcomer = &run.results[1];
    assert_eq!(newcomer.score, 48);
    assert_eq!(newcomer.tier, MatchTier::Fair);
    assert_eq!(
        newcomer.reasons,
        vec![
            "Blood group compatible".to_string(),
            "Currently available".to_string(),
        ]
    );

    assert_eq!(run.audit.kind, PredictionKind::DonorMatch);
    assert_eq!(run.audit.output["returned"], 2);
    assert_eq!(run.audit.input["qualified"], 2);
}

#[test]
fn unavailable_and_low_scoring_donors_are_excluded() {
    let mut resting = donor("resting", BloodType::APositive, "Pune", "Maharashtra");
    resting.is_available = false;
    let mismatched = donor("mismatched", BloodType::BPositive, "Pune", "Maharashtra");
    let local = donor("local", BloodType::APositive, "Pune", "Maharashtra");

    let run = run_for(&ScoringEngine::default(), &[resting, mismatched, local], 15);

    // The unavailable donor is never scored; the incompatible one scores 28.
    assert_eq!(run.population, 2);
    assert_eq!(run.qualified, 1);
    assert_eq!(ids(&run), vec!["local"]);
    assert_eq!(run.results[0].score, 58);
    assert!(run.results.iter().all(|r| r.score >= 40));
}

#[test]
fn equal_scores_keep_input_order_unless_configured_by_id() {
    let donors = vec![
        donor("zeta", BloodType::APositive, "Pune", "Maharashtra"),
        donor("alpha", BloodType::APositive, "Pune", "Maharashtra"),
    ];

    let by_input = run_for(&ScoringEngine::default(), &donors, 15);
    assert_eq!(ids(&by_input), vec!["zeta", "alpha"]);

    let by_id = run_for(
        &ScoringEngine::new(ScoringConfig {
            tie_break: TieBreak::DonorId,
            ..ScoringConfig::default()
        }),
        &donors,
        15,
    );
    assert_eq!(ids(&by_id), vec!["alpha", "zeta"]);
}

#[test]
fn results_are_truncated_to_top_n() {
    let donors: Vec<DonorProfile> = (0..6)
        .map(|i| donor(&format!("d-{i}"), BloodType::APositive, "Pune", "Maharashtra"))
        .collect();

    let run = run_for(&ScoringEngine::default(), &donors, 4);

    assert_eq!(run.qualified, 6);
    assert_eq!(run.results.len(), 4);
    assert_eq!(run.audit.output["returned"], 4);
    assert_eq!(run.audit.output["top_scores"].as_array().map(Vec::len), Some(5));
}

#[test]
fn audit_summarises_all_qualified_donors() {
    let (donors, requests, donations) = ranking_scenario();
    let histories = DonorHistory::group_by_donor(donations);
    let hospital = hospital();
    let context = MatchContext {
        request: &requests[0],
        hospital: &hospital,
        donors: &donors,
        histories: &histories,
        ledger: ledger(&requests),
        as_of: as_of(),
    };

    let full = rank_donors(&ScoringEngine::default(), &context, 15);
    let first = rank_donors(&ScoringEngine::default(), &context, 1);

    assert_eq!(first.results.len(), 1);
    assert_eq!(first.audit.output["returned"], 1);
    assert_eq!(first.audit.output["top_scores"], full.audit.output["top_scores"]);
    assert_eq!(first.audit.output["average_score"], full.audit.output["average_score"]);
    let expected = full.results.iter().map(|r| f64::from(r.score)).sum::<f64>() / 2.0;
    assert_eq!(first.audit.output["average_score"], expected);
    assert_eq!(first.audit.subject.as_deref(), Some(requests[0].hospital_id.0.as_str()));
}

#[test]
fn empty_population_yields_empty_run() {
    let run = run_for(&ScoringEngine::default(), &[], 15);
    assert!(run.results.is_empty());
    assert_eq!(run.population, 0);
    assert_eq!(run.audit.output["average_score"], 0.0);
}

#[test]
fn service_matches_donors_and_records_audit() {
    let (donors, requests, donations) = ranking_scenario();
    let (service, _, audit) = build_service(MemoryRepository::seeded(donors, requests, donations));

    let matches = service
        .match_donors(&RequestId("req-oneg".to_string()), None, as_of())
        .expect("matching succeeds");

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].donor_id.0, "donor-a");
    let records = audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, PredictionKind::DonorMatch);
}

#[test]
fn service_reports_unknown_request() {
    let (service, _, audit) = build_service(MemoryRepository::seeded(vec![], vec![], vec![]));

    match service.match_donors(&RequestId("req-missing".to_string()), None, as_of()) {
        Err(EngineError::RequestNotFound(id)) => assert_eq!(id.0, "req-missing"),
        other => panic!("expected missing request, got {other:?}"),
    }
    assert!(audit.records().is_empty());
}

#[test]
fn failing_audit_sink_does_not_fail_matching() {
    let (donors, requests, donations) = ranking_scenario();
    let service = DonorAnalyticsService::new(
        Arc::new(MemoryRepository::seeded(donors, requests, donations)),
        Arc::new(FailingAudit),
        EngineConfig::default(),
    );

    let matches = service
        .match_donors(&RequestId("req-oneg".to_string()), Some(1), as_of())
        .expect("audit failure is swallowed");
    assert_eq!(matches.len(), 1);
}

#[test]
fn repository_outage_propagates() {
    let service = DonorAnalyticsService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryAudit::default()),
        EngineConfig::default(),
    );

    match service.match_donors(&RequestId("req-oneg".to_string()), None, as_of()) {
        Err(EngineError::Repository(RepositoryError::Unavailable(message))) => {
            assert_eq!(message, "database offline")
        }
        other => panic!("expected repository outage, got {other:?}"),
    }
}
