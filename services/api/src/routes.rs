use crate::infra::{evaluation_instant, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{NaiveDate, Utc};
use hemovital::analytics::forecast::ForecastInput;
use hemovital::analytics::{
    analytics_router, AuditSink, BloodType, DemandOutlook, DonationRepository,
    DonorAnalyticsService, ForecastEngine, HospitalId, RequestHistoryImporter,
};
use hemovital::error::AppError;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

/// Forecast over an uploaded request export instead of the stored history.
#[derive(Debug, Deserialize)]
pub(crate) struct ImportedForecastRequest {
    pub(crate) hospital_id: String,
    pub(crate) requests_csv: String,
    #[serde(default)]
    pub(crate) horizon_days: Option<u32>,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) stock: BTreeMap<BloodType, u32>,
}

pub(crate) fn with_analytics_routes<R, A>(
    service: Arc<DonorAnalyticsService<R, A>>,
    forecasting: Arc<ForecastEngine>,
) -> axum::Router
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    analytics_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/forecast/import",
            axum::routing::post(move |payload: Json<ImportedForecastRequest>| {
                imported_forecast_endpoint(forecasting, payload)
            }),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "initializing")
    };

    (status, Json(json!({ "status": label })))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn imported_forecast_endpoint(
    engine: Arc<ForecastEngine>,
    Json(payload): Json<ImportedForecastRequest>,
) -> Result<Json<DemandOutlook>, AppError> {
    let ImportedForecastRequest {
        hospital_id,
        requests_csv,
        horizon_days,
        today,
        stock,
    } = payload;

    let hospital_id = HospitalId(hospital_id);
    let requests = RequestHistoryImporter::from_reader(Cursor::new(requests_csv.into_bytes()))?;
    let requests: Vec<_> = requests
        .into_iter()
        .filter(|request| request.hospital_id == hospital_id)
        .collect();

    let as_of = today.map(evaluation_instant).unwrap_or_else(Utc::now);
    let run = engine.forecast(&ForecastInput {
        hospital_id: &hospital_id,
        requests: &requests,
        stock: &stock,
        as_of,
        horizon_days: horizon_days.unwrap_or(engine.config().default_horizon_days),
    });

    Ok(Json(run.outlook))
}
