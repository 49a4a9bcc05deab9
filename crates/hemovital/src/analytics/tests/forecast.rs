use std::collections::BTreeMap;

use super::common::*;
use crate::analytics::audit::PredictionKind;
use crate::analytics::domain::{BloodRequest, BloodType, HospitalId, Urgency};
use crate::analytics::forecast::{
    ConfidenceLevel, DemandTrend, ForecastConfig, ForecastEngine, ForecastInput, ForecastMethod,
};
use crate::analytics::EngineError;

fn daily_requests(blood_type: BloodType, units: u8, days: std::ops::RangeInclusive<i64>) -> Vec<BloodRequest> {
    days.map(|day| {
        request(
            &format!("{}-{day}", blood_type.label()),
            blood_type,
            units,
            Urgency::Normal,
            day,
        )
    })
    .collect()
}

fn forecast_with(
    engine: &ForecastEngine,
    requests: &[BloodRequest],
    stock: &BTreeMap<BloodType, u32>,
    horizon_days: u32,
) -> crate::analytics::forecast::ForecastRun {
    let hospital_id = hospital().id;
    engine.forecast(&ForecastInput {
        hospital_id: &hospital_id,
        requests,
        stock,
        as_of: as_of(),
        horizon_days,
    })
}

#[test]
fn constant_demand_projects_rate_times_horizon() {
    let requests = daily_requests(BloodType::OPositive, 3, 0..=90);
    let stock = BTreeMap::from([(BloodType::OPositive, 50)]);

    let run = forecast_with(&ForecastEngine::default(), &requests, &stock, 7);
    let forecast = run
        .outlook
        .forecast(BloodType::OPositive)
        .expect("O+ forecast present");

    assert_eq!(forecast.predicted_demand, 21);
    assert_eq!(forecast.trend, DemandTrend::Stable);
    assert_eq!(forecast.method, ForecastMethod::Blended);
    assert!(forecast.confidence.score >= 0.8);
    assert_eq!(forecast.confidence.level, ConfidenceLevel::High);
    assert_eq!(forecast.confidence.data_points, 91);
    assert_eq!(forecast.current_stock, 50);
    assert_eq!(forecast.recommendation, "Adequate stock - maintain current levels");
}

#[test]
fn every_blood_type_is_forecast_and_missing_stock_reads_as_zero() {
    let requests = daily_requests(BloodType::OPositive, 3, 0..=90);

    let run = forecast_with(&ForecastEngine::default(), &requests, &BTreeMap::new(), 7);

    assert_eq!(run.outlook.forecasts.len(), BloodType::ALL.len());
    let idle = run
        .outlook
        .forecast(BloodType::AbNegative)
        .expect("AB- forecast present");
    assert_eq!(idle.predicted_demand, 0);
    assert_eq!(idle.current_stock, 0);

    let busy = run
        .outlook
        .forecast(BloodType::OPositive)
        .expect("O+ forecast present");
    assert_eq!(busy.recommendation, "Critical stock - urgent replenishment needed");
}

#[test]
fn demand_confined_to_last_week_is_increasing() {
    let requests = daily_requests(BloodType::ANegative, 2, 0..=6);

    let run = forecast_with(&ForecastEngine::default(), &requests, &BTreeMap::new(), 7);
    let forecast = run
        .outlook
        .forecast(BloodType::ANegative)
        .expect("A- forecast present");

    assert_eq!(forecast.trend, DemandTrend::Increasing);
    assert!(forecast.predicted_demand > 0);
}

#[test]
fn short_history_window_uses_fallback_estimate() {
    let engine = ForecastEngine::new(ForecastConfig {
        history_days: 3,
        ..ForecastConfig::default()
    });
    let mut requests = vec![
        request("r-1", BloodType::ONegative, 2, Urgency::Urgent, 1),
        request("r-2", BloodType::ONegative, 4, Urgency::Urgent, 10),
    ];
    // Outside the 30-day fallback lookback.
    requests.push(request("r-3", BloodType::ONegative, 10, Urgency::Urgent, 45));

    let run = forecast_with(&engine, &requests, &BTreeMap::new(), 7);

    let forecast = run
        .outlook
        .forecast(BloodType::ONegative)
        .expect("O- forecast present");
    assert_eq!(forecast.method, ForecastMethod::Fallback);
    assert_eq!(forecast.predicted_demand, 21);
    assert_eq!(forecast.trend, DemandTrend::InsufficientData);
    assert_eq!(forecast.confidence.level, ConfidenceLevel::Low);
    assert!((forecast.confidence.score - 0.3).abs() < f64::EPSILON);
    assert_eq!(forecast.confidence.data_points, 2);
    assert_eq!(forecast.recommendation, "Monitor closely - limited data available");

    let untouched = run
        .outlook
        .forecast(BloodType::BPositive)
        .expect("B+ forecast present");
    assert_eq!(untouched.predicted_demand, 7);
}

#[test]
fn zero_horizon_is_treated_as_one_day() {
    let requests = daily_requests(BloodType::OPositive, 3, 0..=90);

    let run = forecast_with(&ForecastEngine::default(), &requests, &BTreeMap::new(), 0);

    assert_eq!(run.outlook.horizon_days, 1);
    assert_eq!(
        run.outlook
            .forecast(BloodType::OPositive)
            .map(|f| f.predicted_demand),
        Some(3)
    );
}

#[test]
fn horizon_is_capped_at_configured_maximum() {
    let requests = daily_requests(BloodType::OPositive, 3, 0..=90);
    let engine = ForecastEngine::new(ForecastConfig {
        max_horizon_days: 30,
        ..ForecastConfig::default()
    });

    let run = forecast_with(&engine, &requests, &BTreeMap::new(), u32::MAX);

    assert_eq!(run.outlook.horizon_days, 30);
    assert_eq!(
        run.outlook
            .forecast(BloodType::OPositive)
            .map(|f| f.predicted_demand),
        Some(90)
    );
    assert_eq!(run.audit.input["prediction_days"], 30);
}

#[test]
fn forecast_audit_carries_hospital_and_predictions() {
    let requests = daily_requests(BloodType::OPositive, 3, 0..=90);

    let run = forecast_with(&ForecastEngine::default(), &requests, &BTreeMap::new(), 7);

    assert_eq!(run.audit.kind, PredictionKind::DemandPrediction);
    assert_eq!(run.audit.subject.as_deref(), Some("hos-1"));
    assert_eq!(run.audit.output["predictions"]["O+"], 21);
    assert_eq!(run.audit.input["prediction_days"], 7);
}

#[test]
fn service_forecast_reads_stock_and_records_audit() {
    let repository = MemoryRepository::seeded(
        vec![],
        daily_requests(BloodType::OPositive, 3, 0..=90),
        vec![],
    );
    repository.add_stock(BloodType::OPositive, 30);
    let (service, _, audit) = build_service(repository);

    let outlook = service
        .forecast_demand(&hospital().id, None, as_of())
        .expect("forecast succeeds");

    assert_eq!(outlook.horizon_days, 7);
    let forecast = outlook
        .forecast(BloodType::OPositive)
        .expect("O+ forecast present");
    assert_eq!(forecast.current_stock, 30);
    assert_eq!(forecast.recommendation, "Sufficient stock - monitor closely");
    assert_eq!(audit.records().len(), 1);
}

#[test]
fn service_forecast_rejects_unknown_hospital() {
    let (service, _, _) = build_service(MemoryRepository::seeded(vec![], vec![], vec![]));

    match service.forecast_demand(&HospitalId("hos-404".to_string()), Some(7), as_of()) {
        Err(EngineError::HospitalNotFound(id)) => assert_eq!(id.0, "hos-404"),
        other => panic!("expected missing hospital, got {other:?}"),
    }
}
