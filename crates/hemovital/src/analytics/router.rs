use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{DonationId, DonorId, HospitalId, RequestId};
use super::lifecycle::LifecycleError;
use super::repository::{AuditSink, DonationRepository, RepositoryError};
use super::service::{DonorAnalyticsService, EngineError};

type SharedService<R, A> = Arc<DonorAnalyticsService<R, A>>;

/// Router builder exposing the matching, forecasting, retention and lifecycle endpoints.
pub fn analytics_router<R, A>(service: SharedService<R, A>) -> Router
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/requests/:request_id/matches",
            post(match_handler::<R, A>),
        )
        .route(
            "/api/v1/requests/:request_id/responses",
            post(respond_handler::<R, A>),
        )
        .route(
            "/api/v1/hospitals/:hospital_id/forecast",
            get(forecast_handler::<R, A>),
        )
        .route(
            "/api/v1/hospitals/:hospital_id/insights",
            get(insights_handler::<R, A>),
        )
        .route(
            "/api/v1/donors/:donor_id/retention",
            get(retention_handler::<R, A>),
        )
        .route(
            "/api/v1/donors/:donor_id/eligibility",
            get(eligibility_handler::<R, A>),
        )
        .route("/api/v1/retention", get(population_handler::<R, A>))
        .route(
            "/api/v1/donations/:donation_id/confirm",
            post(confirm_handler::<R, A>),
        )
        .route(
            "/api/v1/donations/:donation_id/reject",
            post(reject_handler::<R, A>),
        )
        .route(
            "/api/v1/donations/:donation_id/complete",
            post(complete_handler::<R, A>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MatchParams {
    top_n: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ForecastParams {
    horizon_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PopulationParams {
    hospital_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponsePayload {
    donor_id: String,
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, EngineError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

/// HTTP status for an engine failure. Shared by every surface that reports one.
pub fn engine_status(error: &EngineError) -> StatusCode {
    match error {
        error if error.is_not_found() => StatusCode::NOT_FOUND,
        EngineError::Lifecycle(
            LifecycleError::InvalidTransition { .. } | LifecycleError::DuplicateResponse,
        ) => StatusCode::CONFLICT,
        EngineError::Lifecycle(_) => StatusCode::BAD_REQUEST,
        EngineError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(error: EngineError) -> Response {
    let status = engine_status(&error);
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}

pub(crate) async fn match_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(request_id): Path<String>,
    Query(params): Query<MatchParams>,
) -> Response
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    let request_id = RequestId(request_id);
    let result = service
        .match_donors(&request_id, params.top_n, Utc::now())
        .map(|matches| {
            json!({
                "request_id": request_id,
                "matches": matches,
            })
        });
    respond(StatusCode::OK, result)
}

pub(crate) async fn respond_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(request_id): Path<String>,
    Json(payload): Json<ResponsePayload>,
) -> Response
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    let result = service.respond_to_request(
        &DonorId(payload.donor_id),
        &RequestId(request_id),
        Utc::now(),
    );
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn forecast_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(hospital_id): Path<String>,
    Query(params): Query<ForecastParams>,
) -> Response
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    let result =
        service.forecast_demand(&HospitalId(hospital_id), params.horizon_days, Utc::now());
    respond(StatusCode::OK, result)
}

pub(crate) async fn insights_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(hospital_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    let result = service.hospital_insights(&HospitalId(hospital_id), Utc::now());
    respond(StatusCode::OK, result)
}

pub(crate) async fn retention_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(donor_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    let result = service.assess_retention_risk(&DonorId(donor_id), Utc::now());
    respond(StatusCode::OK, result)
}

pub(crate) async fn eligibility_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(donor_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    let result = service.check_eligibility(&DonorId(donor_id), Utc::now().date_naive());
    respond(StatusCode::OK, result)
}

pub(crate) async fn population_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Query(params): Query<PopulationParams>,
) -> Response
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    let hospital = params.hospital_id.map(HospitalId);
    let result = service.assess_population_retention(hospital.as_ref(), Utc::now());
    respond(StatusCode::OK, result)
}

pub(crate) async fn confirm_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(donation_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    let result = service.confirm_donation(&DonationId(donation_id), Utc::now());
    respond(StatusCode::OK, result)
}

pub(crate) async fn reject_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(donation_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    let result = service.reject_donation(&DonationId(donation_id), Utc::now());
    respond(StatusCode::OK, result)
}

pub(crate) async fn complete_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(donation_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    let result = service.complete_donation(&DonationId(donation_id), Utc::now());
    respond(StatusCode::OK, result)
}
