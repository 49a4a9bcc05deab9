use crate::cli::ServeArgs;
use crate::infra::{seed_demo_data, AppState, InMemoryAuditLog, InMemoryDonationRepository};
use crate::routes::with_analytics_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use hemovital::analytics::{DonorAnalyticsService, EngineError, ForecastEngine};
use hemovital::config::AppConfig;
use hemovital::error::AppError;
use hemovital::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryDonationRepository::default());
    if args.seed_demo {
        seed_demo_data(&repository, Utc::now()).map_err(EngineError::from)?;
        info!("seeded in-memory repository with demo hospital data");
    }
    let audit = Arc::new(InMemoryAuditLog::default());
    let forecasting = Arc::new(ForecastEngine::new(config.engine.forecast.clone()));
    info!(
        minimum_match_score = config.engine.scoring.minimum_match_score,
        horizon_days = config.engine.forecast.default_horizon_days,
        donation_gap_days = config.engine.eligibility.donation_gap_days,
        "analytics engines configured"
    );
    let service = Arc::new(DonorAnalyticsService::new(
        repository,
        audit,
        config.engine.clone(),
    ));

    let app = with_analytics_routes(service, forecasting)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "donor analytics service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
