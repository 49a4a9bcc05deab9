use crate::infra::{
    evaluation_instant, seed_demo_data, InMemoryAuditLog, InMemoryDonationRepository,
    DEMO_HOSPITAL, DEMO_REQUEST,
};
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use clap::Args;
use hemovital::analytics::forecast::ForecastInput;
use hemovital::analytics::{
    BloodType, DemandOutlook, DonorAnalyticsService, DonorId, EngineConfig, EngineError,
    ForecastEngine, HospitalId, RequestHistoryImporter, RequestId,
};
use hemovital::error::AppError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Number of ranked donors to print for the demo request.
    #[arg(long)]
    pub(crate) top_n: Option<usize>,
    /// Skip the donation lifecycle portion of the demo.
    #[arg(long)]
    pub(crate) skip_lifecycle: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ForecastArgs {
    /// Hospital whose rows are taken from the export
    #[arg(long)]
    pub(crate) hospital_id: String,
    /// CSV export of historical blood requests
    #[arg(long)]
    pub(crate) requests_csv: PathBuf,
    /// Forecast horizon in days (defaults to the configured horizon)
    #[arg(long)]
    pub(crate) horizon_days: Option<u32>,
    /// Evaluation date for the forecast (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_forecast(args: ForecastArgs) -> Result<(), AppError> {
    let ForecastArgs {
        hospital_id,
        requests_csv,
        horizon_days,
        today,
    } = args;

    let hospital_id = HospitalId(hospital_id);
    let requests: Vec<_> = RequestHistoryImporter::from_path(&requests_csv)?
        .into_iter()
        .filter(|request| request.hospital_id == hospital_id)
        .collect();

    let engine = ForecastEngine::default();
    let as_of = evaluation_instant(today.unwrap_or_else(|| Local::now().date_naive()));
    let stock = BTreeMap::new();
    let run = engine.forecast(&ForecastInput {
        hospital_id: &hospital_id,
        requests: &requests,
        stock: &stock,
        as_of,
        horizon_days: horizon_days.unwrap_or(engine.config().default_horizon_days),
    });

    println!(
        "Imported {} requests for {} from {}",
        requests.len(),
        hospital_id,
        requests_csv.display()
    );
    render_outlook(&run.outlook);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        top_n,
        skip_lifecycle,
    } = args;

    let as_of = today.map(evaluation_instant).unwrap_or_else(Utc::now);
    let repository = Arc::new(InMemoryDonationRepository::default());
    seed_demo_data(&repository, as_of).map_err(EngineError::from)?;
    let audit = Arc::new(InMemoryAuditLog::default());
    let service = DonorAnalyticsService::new(
        repository.clone(),
        audit.clone(),
        EngineConfig::default(),
    );

    let hospital_id = HospitalId(DEMO_HOSPITAL.to_string());
    let request_id = RequestId(DEMO_REQUEST.to_string());

    println!("HemoVital analytics demo ({})", as_of.date_naive());
    println!("\nDonor matches for {request_id}");
    let matches = service.match_donors(&request_id, top_n, as_of)?;
    if matches.is_empty() {
        println!("- no donors cleared the minimum match score");
    }
    for (rank, result) in matches.iter().enumerate() {
        println!(
            "{}. {} ({}) score {} [{}] {}",
            rank + 1,
            result.display_name,
            result.donor_id,
            result.score,
            result.tier.label(),
            result.reasons.join("; ")
        );
    }

    let outlook = service.forecast_demand(&hospital_id, None, as_of)?;
    render_outlook(&outlook);

    let population = service.assess_population_retention(Some(&hospital_id), as_of)?;
    let summary = &population.summary;
    println!("\nRetention across {} donors", summary.total_donors);
    println!(
        "- risk tiers: {} high | {} medium | {} low",
        summary.high_risk_count, summary.medium_risk_count, summary.low_risk_count
    );
    println!(
        "- retention rate {:.1}% | average engagement {:.1}",
        summary.retention_rate, summary.average_engagement
    );
    for assessment in &population.high_risk {
        println!(
            "  - {} risk {}: {}",
            assessment.display_name,
            assessment.risk_score,
            assessment.factors.join(", ")
        );
    }

    println!("\nDashboard insights");
    for insight in service.hospital_insights(&hospital_id, as_of)? {
        println!("- {}: {}", insight.title, insight.message);
    }

    if !skip_lifecycle {
        run_lifecycle(&service, &repository, &hospital_id, &request_id, as_of)?;
    }

    println!("\n{} predictions written to the audit log", audit.records().len());
    Ok(())
}

fn run_lifecycle(
    service: &DonorAnalyticsService<InMemoryDonationRepository, InMemoryAuditLog>,
    repository: &InMemoryDonationRepository,
    hospital_id: &HospitalId,
    request_id: &RequestId,
    as_of: DateTime<Utc>,
) -> Result<(), AppError> {
    println!("\nDonation lifecycle for {request_id}");

    for donor in ["don-asha", "don-vikram", "don-lena"] {
        let donor_id = DonorId(donor.to_string());
        let pending = match service.respond_to_request(&donor_id, request_id, as_of) {
            Ok(record) => record,
            Err(EngineError::Lifecycle(err)) => {
                let eligibility = service.check_eligibility(&donor_id, as_of.date_naive())?;
                println!(
                    "- {donor_id} turned away: {err} (eligible from {})",
                    eligibility.next_eligible_date
                );
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        let confirmed = service.confirm_donation(&pending.id, as_of + Duration::hours(1))?;
        let completed = service.complete_donation(&confirmed.id, as_of + Duration::hours(4))?;
        println!(
            "- {} gave {} unit(s), donation {} is {}",
            donor_id,
            completed.units,
            completed.id,
            completed.status.label()
        );
    }

    if let Some(analytics) = repository.hospital_analytics(hospital_id).map_err(EngineError::from)? {
        println!(
            "- {} of {} requests fulfilled ({:.1}%)",
            analytics.fulfilled_requests, analytics.total_requests, analytics.fulfillment_rate
        );
    }
    Ok(())
}

fn render_outlook(outlook: &DemandOutlook) {
    println!(
        "\nDemand outlook for {} over {} days (generated {})",
        outlook.hospital_id, outlook.horizon_days, outlook.generated_on
    );
    for blood_type in BloodType::ALL {
        let Some(forecast) = outlook.forecast(blood_type) else {
            continue;
        };
        println!(
            "- {:<3} demand {:>3} | stock {:>3} | {} | confidence {} ({:.2}) | {}",
            blood_type.label(),
            forecast.predicted_demand,
            forecast.current_stock,
            forecast.trend.label(),
            forecast.confidence.level.label(),
            forecast.confidence.score,
            forecast.recommendation
        );
    }
    println!(
        "Average confidence {:.2}",
        outlook.average_confidence()
    );
}
